//! Loading and saving the repository through a durable store.

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::repository::CardRepository;
use crate::types::{Card, CardId, Deck, DeckId, StudySession};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Everything a repository persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub decks: Vec<Deck>,
    #[serde(default)]
    pub sessions: Vec<StudySession>,
}

/// Durable storage for repository snapshots.
pub trait CardStore {
    type Error: std::error::Error + From<CoreError>;

    fn load_all(&self) -> std::result::Result<Snapshot, Self::Error>;

    fn save_all(&mut self, snapshot: &Snapshot) -> std::result::Result<(), Self::Error>;
}

/// Store that keeps the last saved snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl CardStore for MemoryStore {
    type Error = CoreError;

    fn load_all(&self) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }

    fn save_all(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.snapshot = snapshot.clone();
        Ok(())
    }
}

impl CardRepository {
    /// Copy of the current contents.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cards: self.cards.values().cloned().collect(),
            decks: self.decks.values().cloned().collect(),
            sessions: self.sessions.clone(),
        }
    }

    /// Rebuild a repository scheduling with SM-2 defaults. Use
    /// [`CardRepository::restore`] on a configured repository to keep a
    /// different algorithm.
    pub fn from_snapshot(snapshot: Snapshot, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut repo = CardRepository::new(clock);
        repo.restore(snapshot)?;
        Ok(repo)
    }

    /// Replace the contents with a snapshot, keeping the clock and
    /// algorithm. Snapshots that break the card and deck invariants are
    /// rejected and leave the repository untouched.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        let mut cards = BTreeMap::new();
        for card in snapshot.cards {
            card.state
                .validate(card.created_at)
                .map_err(|e| CoreError::InvalidInput(format!("card {}: {e}", card.id)))?;
            if let Some(previous) = cards.insert(card.id, card) {
                return Err(CoreError::InvalidInput(format!(
                    "duplicate card {}", previous.id
                )));
            }
        }

        let mut owner: HashMap<CardId, DeckId> = HashMap::new();
        let mut decks = BTreeMap::new();
        for deck in snapshot.decks {
            if deck.name.trim().is_empty() {
                return Err(CoreError::InvalidInput(format!(
                    "deck {} has no name", deck.id
                )));
            }
            for card_id in &deck.card_ids {
                let card: &Card = cards.get(card_id).ok_or_else(|| {
                    CoreError::InvalidInput(format!(
                        "deck {} lists unknown card {card_id}",
                        deck.id
                    ))
                })?;
                if card.deck_id != Some(deck.id) {
                    return Err(CoreError::InvalidInput(format!(
                        "card {card_id} does not point back to deck {}",
                        deck.id
                    )));
                }
                if owner.insert(*card_id, deck.id).is_some() {
                    return Err(CoreError::InvalidInput(format!(
                        "card {card_id} appears more than once in deck membership"
                    )));
                }
            }
            if let Some(previous) = decks.insert(deck.id, deck) {
                return Err(CoreError::InvalidInput(format!(
                    "duplicate deck {}", previous.id
                )));
            }
        }

        for card in cards.values() {
            if let Some(deck_id) = card.deck_id {
                if owner.get(&card.id) != Some(&deck_id) {
                    return Err(CoreError::InvalidInput(format!(
                        "card {} claims deck {deck_id} but is not a member",
                        card.id
                    )));
                }
            }
        }

        debug!(cards = cards.len(), decks = decks.len(), "restored repository");
        self.cards = cards;
        self.decks = decks;
        self.sessions = snapshot.sessions;
        Ok(())
    }

    pub fn load<S: CardStore>(
        store: &S,
        clock: Arc<dyn Clock>,
    ) -> std::result::Result<Self, S::Error> {
        let snapshot = store.load_all()?;
        Ok(Self::from_snapshot(snapshot, clock)?)
    }

    /// Replace the contents with what the store holds, keeping the clock
    /// and algorithm.
    pub fn reload<S: CardStore>(&mut self, store: &S) -> std::result::Result<(), S::Error> {
        let snapshot = store.load_all()?;
        Ok(self.restore(snapshot)?)
    }

    pub fn flush<S: CardStore>(&self, store: &mut S) -> std::result::Result<(), S::Error> {
        store.save_all(&self.snapshot())
    }
}

//! In-memory card repository.
//!
//! Owns every card, deck and finished study session. Scheduling state is
//! only ever written through [`CardRepository::review_card`].

use crate::algorithm::{SchedulingResult, SpacedRepetitionAlgorithm, Sm2};
use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Result};
use crate::types::{
    require_text, Card, CardEdit, CardId, Deck, DeckId, NewCard, Quality, StudySession,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Store of cards, decks and session history.
pub struct CardRepository {
    pub(crate) cards: BTreeMap<CardId, Card>,
    pub(crate) decks: BTreeMap<DeckId, Deck>,
    pub(crate) sessions: Vec<StudySession>,
    clock: Arc<dyn Clock>,
    algorithm: Arc<dyn SpacedRepetitionAlgorithm>,
}

impl fmt::Debug for CardRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardRepository")
            .field("cards", &self.cards.len())
            .field("decks", &self.decks.len())
            .field("sessions", &self.sessions.len())
            .field("algorithm", &self.algorithm.name())
            .finish()
    }
}

impl CardRepository {
    /// Empty repository scheduling with SM-2.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            cards: BTreeMap::new(),
            decks: BTreeMap::new(),
            sessions: Vec::new(),
            clock,
            algorithm: Arc::new(Sm2::default()),
        }
    }

    /// Empty repository on the wall clock.
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn with_algorithm(mut self, algorithm: Arc<dyn SpacedRepetitionAlgorithm>) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn algorithm(&self) -> &dyn SpacedRepetitionAlgorithm {
        self.algorithm.as_ref()
    }

    // Cards

    /// Create a card with default scheduling state, due immediately.
    pub fn create_card(&mut self, new_card: NewCard) -> Result<&Card> {
        let deck_id = new_card.deck_id;
        if let Some(deck_id) = deck_id {
            self.deck(deck_id)?;
        }

        let now = self.now();
        let id = CardId::new();
        let mut card = new_card.into_card(id, now)?;
        card.state = self.algorithm.initial_state(now);
        self.cards.insert(id, card);
        debug!(card_id = %id, "created card");

        if let Some(deck_id) = deck_id {
            self.add_card_to_deck(deck_id, id)?;
        }
        self.card(id)
    }

    pub fn card(&self, id: CardId) -> Result<&Card> {
        self.cards.get(&id).ok_or_else(|| CoreError::card_not_found(id))
    }

    /// All cards, ordered by id.
    pub fn cards(&self) -> impl Iterator<Item = &Card> + '_ {
        self.cards.values()
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Edit front/back/tags. Scheduling fields are untouched.
    pub fn update_card(&mut self, id: CardId, edit: CardEdit) -> Result<&Card> {
        let card = self
            .cards
            .get_mut(&id)
            .ok_or_else(|| CoreError::card_not_found(id))?;
        edit.apply(card)?;
        debug!(card_id = %id, "updated card");
        Ok(&*card)
    }

    /// Delete a card and drop it from its deck.
    pub fn delete_card(&mut self, id: CardId) -> Result<Card> {
        let card = self
            .cards
            .remove(&id)
            .ok_or_else(|| CoreError::card_not_found(id))?;
        if let Some(deck) = card.deck_id.and_then(|deck_id| self.decks.get_mut(&deck_id)) {
            deck.card_ids.retain(|member| *member != id);
        }
        debug!(card_id = %id, "deleted card");
        Ok(card)
    }

    /// Apply one review. The new state is committed immediately.
    pub fn review_card(&mut self, id: CardId, quality: Quality) -> Result<SchedulingResult> {
        let now = self.clock.now();
        let card = self
            .cards
            .get_mut(&id)
            .ok_or_else(|| CoreError::card_not_found(id))?;
        let result = self.algorithm.schedule(&card.state, quality, now)?;
        card.state = result.new_state.clone();
        debug!(
            card_id = %id,
            quality = quality.value(),
            interval_days = result.new_state.interval_days,
            ease_factor = result.new_state.ease_factor,
            "reviewed card"
        );
        Ok(result)
    }

    /// Cards with `next_review_due_at <= as_of`, optionally limited to one deck.
    /// Order is unspecified.
    pub fn due_cards(&self, deck_id: Option<DeckId>, as_of: DateTime<Utc>) -> Result<Vec<&Card>> {
        match deck_id {
            Some(deck_id) => {
                let deck = self.deck(deck_id)?;
                Ok(deck
                    .card_ids
                    .iter()
                    .filter_map(|id| self.cards.get(id))
                    .filter(|card| card.state.is_due(as_of))
                    .collect())
            }
            None => Ok(self
                .cards
                .values()
                .filter(|card| card.state.is_due(as_of))
                .collect()),
        }
    }

    pub fn due_cards_now(&self, deck_id: Option<DeckId>) -> Result<Vec<&Card>> {
        self.due_cards(deck_id, self.now())
    }

    // Decks

    pub fn create_deck(&mut self, name: impl Into<String>) -> Result<&Deck> {
        let name = require_text("deck name", name.into())?;
        let id = DeckId::new();
        let deck = Deck {
            id,
            name,
            created_at: self.now(),
            card_ids: Vec::new(),
        };
        debug!(deck_id = %id, name = %deck.name, "created deck");
        Ok(&*self.decks.entry(id).or_insert(deck))
    }

    pub fn deck(&self, id: DeckId) -> Result<&Deck> {
        self.decks.get(&id).ok_or_else(|| CoreError::deck_not_found(id))
    }

    pub fn decks(&self) -> impl Iterator<Item = &Deck> + '_ {
        self.decks.values()
    }

    pub fn rename_deck(&mut self, id: DeckId, name: impl Into<String>) -> Result<&Deck> {
        let name = require_text("deck name", name.into())?;
        let deck = self
            .decks
            .get_mut(&id)
            .ok_or_else(|| CoreError::deck_not_found(id))?;
        deck.name = name;
        Ok(&*deck)
    }

    /// Delete a deck. Its cards survive without a deck.
    pub fn delete_deck(&mut self, id: DeckId) -> Result<Deck> {
        let deck = self
            .decks
            .remove(&id)
            .ok_or_else(|| CoreError::deck_not_found(id))?;
        for card_id in &deck.card_ids {
            if let Some(card) = self.cards.get_mut(card_id) {
                card.deck_id = None;
            }
        }
        debug!(deck_id = %id, cards = deck.card_ids.len(), "deleted deck");
        Ok(deck)
    }

    // Session history

    pub fn record_session(&mut self, session: StudySession) {
        self.sessions.push(session);
    }

    /// Finished sessions in completion order, optionally for one deck.
    pub fn sessions(&self, deck_id: Option<DeckId>) -> impl Iterator<Item = &StudySession> + '_ {
        self.sessions
            .iter()
            .filter(move |s| deck_id.map_or(true, |id| s.deck_id == id))
    }
}

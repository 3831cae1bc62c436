//! Deck membership and per-deck queries.

use crate::error::{CoreError, Result};
use crate::repository::CardRepository;
use crate::types::{Card, CardId, CardState, DeckId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Deck statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckStats {
    pub total_cards: usize,
    pub new_cards: usize,
    pub due_cards: usize,
    pub average_ease: f64,
    pub average_interval: f64,
}

impl CardRepository {
    /// Add a card to a deck. Returns `false` if it was already a member.
    ///
    /// A card belongs to at most one deck; adding it here moves it out of
    /// any other deck.
    pub fn add_card_to_deck(&mut self, deck_id: DeckId, card_id: CardId) -> Result<bool> {
        let deck = self.deck(deck_id)?;
        let previous = self.card(card_id)?.deck_id;
        if deck.contains(card_id) {
            return Ok(false);
        }

        if let Some(other) = previous.and_then(|id| self.decks.get_mut(&id)) {
            other.card_ids.retain(|member| *member != card_id);
        }
        if let Some(deck) = self.decks.get_mut(&deck_id) {
            deck.card_ids.push(card_id);
        }
        if let Some(card) = self.cards.get_mut(&card_id) {
            card.deck_id = Some(deck_id);
        }
        debug!(%deck_id, %card_id, moved_from = ?previous, "added card to deck");
        Ok(true)
    }

    /// Remove a card from a deck. Returns `false` if it was not a member.
    pub fn remove_card_from_deck(&mut self, deck_id: DeckId, card_id: CardId) -> Result<bool> {
        if !self.deck(deck_id)?.contains(card_id) {
            self.card(card_id)?;
            return Ok(false);
        }

        if let Some(deck) = self.decks.get_mut(&deck_id) {
            deck.card_ids.retain(|member| *member != card_id);
        }
        if let Some(card) = self.cards.get_mut(&card_id) {
            card.deck_id = None;
        }
        debug!(%deck_id, %card_id, "removed card from deck");
        Ok(true)
    }

    /// Member cards in membership order.
    pub fn cards_for_deck(&self, deck_id: DeckId) -> Result<Vec<&Card>> {
        let deck = self.deck(deck_id)?;
        deck.card_ids
            .iter()
            .map(|id| {
                self.cards.get(id).ok_or_else(|| {
                    CoreError::InvalidState(format!("deck {deck_id} lists missing card {id}"))
                })
            })
            .collect()
    }

    pub fn due_cards_for_deck(&self, deck_id: DeckId, as_of: DateTime<Utc>) -> Result<Vec<&Card>> {
        self.due_cards(Some(deck_id), as_of)
    }

    pub fn deck_stats(&self, deck_id: DeckId, as_of: DateTime<Utc>) -> Result<DeckStats> {
        let cards = self.cards_for_deck(deck_id)?;
        let total_cards = cards.len();
        let new_cards = cards.iter().filter(|c| c.state.is_new()).count();
        let due_cards = cards.iter().filter(|c| c.state.is_due(as_of)).count();

        let average_ease = if total_cards == 0 {
            CardState::DEFAULT_EASE
        } else {
            cards.iter().map(|c| c.state.ease_factor).sum::<f64>() / total_cards as f64
        };

        let scheduled: Vec<f64> = cards
            .iter()
            .filter(|c| c.state.interval_days > 0)
            .map(|c| f64::from(c.state.interval_days))
            .collect();
        let average_interval = if scheduled.is_empty() {
            0.0
        } else {
            scheduled.iter().sum::<f64>() / scheduled.len() as f64
        };

        Ok(DeckStats {
            total_cards,
            new_cards,
            due_cards,
            average_ease,
            average_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::types::{NewCard, Quality};
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn setup() -> (Arc<ManualClock>, CardRepository) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        (clock.clone(), CardRepository::new(clock))
    }

    #[test]
    fn adding_twice_is_a_no_op() {
        let (_, mut repo) = setup();
        let deck = repo.create_deck("Spanish").unwrap().id;
        let card = repo.create_card(NewCard::new("hola", "hello")).unwrap().id;

        assert!(repo.add_card_to_deck(deck, card).unwrap());
        assert!(!repo.add_card_to_deck(deck, card).unwrap());
        assert_eq!(repo.cards_for_deck(deck).unwrap().len(), 1);
        assert_eq!(repo.card(card).unwrap().deck_id, Some(deck));
    }

    #[test]
    fn adding_to_another_deck_moves_the_card() {
        let (_, mut repo) = setup();
        let first = repo.create_deck("First").unwrap().id;
        let second = repo.create_deck("Second").unwrap().id;
        let card = repo.create_card(NewCard::new("Q", "A").in_deck(first)).unwrap().id;

        assert!(repo.add_card_to_deck(second, card).unwrap());
        assert!(repo.deck(first).unwrap().is_empty());
        assert_eq!(repo.deck(second).unwrap().card_ids, vec![card]);
        assert_eq!(repo.card(card).unwrap().deck_id, Some(second));
    }

    #[test]
    fn remove_is_idempotent() {
        let (_, mut repo) = setup();
        let deck = repo.create_deck("Deck").unwrap().id;
        let card = repo.create_card(NewCard::new("Q", "A").in_deck(deck)).unwrap().id;

        assert!(repo.remove_card_from_deck(deck, card).unwrap());
        assert!(!repo.remove_card_from_deck(deck, card).unwrap());
        assert_eq!(repo.card(card).unwrap().deck_id, None);
        assert!(repo.card(card).is_ok());
    }

    #[test]
    fn membership_ops_on_unknown_ids() {
        let (_, mut repo) = setup();
        let deck = repo.create_deck("Deck").unwrap().id;
        let card = repo.create_card(NewCard::new("Q", "A")).unwrap().id;

        assert!(matches!(
            repo.add_card_to_deck(DeckId::new(), card),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            repo.add_card_to_deck(deck, CardId::new()),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            repo.remove_card_from_deck(deck, CardId::new()),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn due_cards_scoped_to_deck() {
        let (clock, mut repo) = setup();
        let deck = repo.create_deck("Deck").unwrap().id;
        let inside = repo.create_card(NewCard::new("in", "1").in_deck(deck)).unwrap().id;
        let reviewed = repo.create_card(NewCard::new("in2", "2").in_deck(deck)).unwrap().id;
        repo.create_card(NewCard::new("out", "3")).unwrap();
        repo.review_card(reviewed, Quality::new(5).unwrap()).unwrap();

        let due: Vec<CardId> = repo
            .due_cards_for_deck(deck, clock.now())
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(due, vec![inside]);
    }

    #[test]
    fn stats_for_deck() {
        let (clock, mut repo) = setup();
        let deck = repo.create_deck("Deck").unwrap().id;
        let a = repo.create_card(NewCard::new("a", "1").in_deck(deck)).unwrap().id;
        repo.create_card(NewCard::new("b", "2").in_deck(deck)).unwrap();
        repo.review_card(a, Quality::new(5).unwrap()).unwrap();

        let stats = repo.deck_stats(deck, clock.now()).unwrap();
        assert_eq!(stats.total_cards, 2);
        assert_eq!(stats.new_cards, 1);
        assert_eq!(stats.due_cards, 1);
        assert!((stats.average_ease - 2.55).abs() < 1e-9);
        assert_eq!(stats.average_interval, 1.0);

        let later = repo.deck_stats(deck, clock.now() + Duration::days(1)).unwrap();
        assert_eq!(later.due_cards, 2);
    }

    #[test]
    fn stats_for_empty_deck() {
        let (clock, mut repo) = setup();
        let deck = repo.create_deck("Empty").unwrap().id;
        let stats = repo.deck_stats(deck, clock.now()).unwrap();
        assert_eq!(stats.total_cards, 0);
        assert_eq!(stats.average_ease, 2.5);
        assert_eq!(stats.average_interval, 0.0);
    }
}

//! Factory functions for creating test data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use recall_core::{CardId, CardRepository, DeckId, ManualClock, NewCard};

/// Fixed starting instant so timestamps are reproducible.
pub fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_717_200_000, 0).expect("valid timestamp")
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

/// Repository with one deck of `num_cards` tagged cards plus one loose card.
pub fn sample_repository(
    clock: Arc<ManualClock>,
    num_cards: usize,
) -> (CardRepository, DeckId, Vec<CardId>) {
    let mut repo = CardRepository::new(clock);
    let deck = repo.create_deck("Capitals").expect("create deck").id;
    let ids = (0..num_cards)
        .map(|i| {
            repo.create_card(
                NewCard::new(format!("Question {}?", i + 1), format!("Answer {}.", i + 1))
                    .with_tags(["geo", "quiz"])
                    .in_deck(deck),
            )
            .expect("create card")
            .id
        })
        .collect();
    repo.create_card(NewCard::new("Loose question?", "Loose answer."))
        .expect("create loose card");
    (repo, deck, ids)
}

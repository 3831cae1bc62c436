//! Due-card report per deck.

use chrono::{DateTime, Utc};
use recall_core::{CardRepository, DeckId, DeckStats};
use std::fmt;

/// One line of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckReport {
    pub deck_id: DeckId,
    pub name: String,
    pub stats: DeckStats,
}

impl fmt::Display for DeckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} due / {} cards ({} new, avg ease {:.2})",
            self.name,
            self.stats.due_cards,
            self.stats.total_cards,
            self.stats.new_cards,
            self.stats.average_ease
        )
    }
}

/// Stats for every deck, sorted by name.
pub fn due_report(
    repo: &CardRepository,
    as_of: DateTime<Utc>,
) -> recall_core::Result<Vec<DeckReport>> {
    let mut reports = repo
        .decks()
        .map(|deck| -> recall_core::Result<DeckReport> {
            Ok(DeckReport {
                deck_id: deck.id,
                name: deck.name.clone(),
                stats: repo.deck_stats(deck.id, as_of)?,
            })
        })
        .collect::<recall_core::Result<Vec<_>>>()?;
    reports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(reports)
}

/// Due cards that belong to no deck.
pub fn unassigned_due(repo: &CardRepository, as_of: DateTime<Utc>) -> usize {
    repo.cards()
        .filter(|card| card.deck_id.is_none() && card.state.is_due(as_of))
        .count()
}

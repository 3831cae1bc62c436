//! Core types for the review scheduler.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|_| {
                    CoreError::InvalidInput(format!("malformed {} id: {:?}", $label, s))
                })
            }
        }
    };
}

uuid_id!(
    /// Card identifier.
    CardId,
    "card"
);
uuid_id!(
    /// Deck identifier.
    DeckId,
    "deck"
);
uuid_id!(
    /// Study session identifier.
    SessionId,
    "session"
);

/// Self-assessed recall quality, 0 (total failure) to 5 (perfect recall).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;

    /// Lowest quality that counts as a successful recall.
    pub const PASSING: u8 = 3;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(CoreError::InvalidInput(format!(
                "quality {value} is outside 0..={}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this answer counts as correct (quality >= 3).
    pub fn is_correct(self) -> bool {
        self.0 >= Self::PASSING
    }
}

impl TryFrom<u8> for Quality {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Per-card scheduling state. Only the scheduler writes these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub ease_factor: f64,
    pub interval_days: u32,
    pub streak: u32,
    pub review_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub next_review_due_at: DateTime<Utc>,
}

impl CardState {
    pub const DEFAULT_EASE: f64 = 2.5;
    pub const MINIMUM_EASE: f64 = 1.3;

    /// State of a card that has never been reviewed: due at creation time.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            ease_factor: Self::DEFAULT_EASE,
            interval_days: 0,
            streak: 0,
            review_count: 0,
            last_reviewed_at: None,
            next_review_due_at: created_at,
        }
    }

    /// Due cards have `next_review_due_at <= as_of`.
    pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
        self.next_review_due_at <= as_of
    }

    pub fn is_new(&self) -> bool {
        self.review_count == 0
    }

    /// Check the stored state against the scheduling invariants.
    pub(crate) fn validate(&self, created_at: DateTime<Utc>) -> Result<()> {
        if !self.ease_factor.is_finite() || self.ease_factor < Self::MINIMUM_EASE {
            return Err(CoreError::InvalidInput(format!(
                "ease factor {} is below {}",
                self.ease_factor,
                Self::MINIMUM_EASE
            )));
        }
        let anchor = self.last_reviewed_at.unwrap_or(created_at);
        let expected = anchor
            .checked_add_signed(Duration::days(i64::from(self.interval_days)))
            .ok_or_else(|| {
                CoreError::InvalidInput(format!(
                    "{anchor} + {} days is out of range",
                    self.interval_days
                ))
            })?;
        if self.next_review_due_at != expected {
            return Err(CoreError::InvalidInput(format!(
                "next review {} does not match {} + {} days",
                self.next_review_due_at, anchor, self.interval_days
            )));
        }
        Ok(())
    }
}

/// A question/answer learning unit with its scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<DeckId>,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub state: CardState,
}

/// Input for creating a card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deck_id: Option<DeckId>,
}

impl NewCard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_deck(mut self, deck_id: DeckId) -> Self {
        self.deck_id = Some(deck_id);
        self
    }

    /// Build a card with default scheduling state.
    pub(crate) fn into_card(self, id: CardId, now: DateTime<Utc>) -> Result<Card> {
        Ok(Card {
            id,
            deck_id: None,
            front: require_text("front", self.front)?,
            back: require_text("back", self.back)?,
            tags: normalize_tags(self.tags),
            created_at: now,
            state: CardState::new(now),
        })
    }
}

/// Content edit for an existing card. Scheduling state is not editable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardEdit {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl CardEdit {
    pub(crate) fn apply(self, card: &mut Card) -> Result<()> {
        // Validate everything before touching the card.
        let front = self.front.map(|f| require_text("front", f)).transpose()?;
        let back = self.back.map(|b| require_text("back", b)).transpose()?;

        if let Some(front) = front {
            card.front = front;
        }
        if let Some(back) = back {
            card.back = back;
        }
        if let Some(tags) = self.tags {
            card.tags = normalize_tags(tags);
        }
        Ok(())
    }
}

/// Named collection of cards. The deck owns the membership set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub card_ids: Vec<CardId>,
}

impl Deck {
    pub fn contains(&self, card_id: CardId) -> bool {
        self.card_ids.contains(&card_id)
    }

    pub fn len(&self) -> usize {
        self.card_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.card_ids.is_empty()
    }
}

/// Summary of a finished study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: SessionId,
    pub deck_id: DeckId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub correct: u32,
    pub incorrect: u32,
    /// Card ids in the order they were answered.
    pub reviewed: Vec<CardId>,
}

impl StudySession {
    pub fn duration(&self) -> Duration {
        self.ended_at - self.started_at
    }

    pub fn total_answers(&self) -> u32 {
        self.correct + self.incorrect
    }

    /// Fraction of correct answers, 0.0 if nothing was answered.
    pub fn accuracy(&self) -> f64 {
        match self.total_answers() {
            0 => 0.0,
            total => f64::from(self.correct) / f64::from(total),
        }
    }
}

pub(crate) fn require_text(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn quality_rejects_out_of_range() {
        assert!(Quality::new(5).is_ok());
        assert!(matches!(Quality::new(6), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn quality_correct_threshold() {
        assert!(!Quality::new(2).unwrap().is_correct());
        assert!(Quality::new(3).unwrap().is_correct());
    }

    #[test]
    fn quality_deserialization_is_validated() {
        assert_eq!(serde_json::from_str::<Quality>("4").unwrap().value(), 4);
        assert!(serde_json::from_str::<Quality>("6").is_err());
        assert_eq!(serde_json::to_string(&Quality::new(2).unwrap()).unwrap(), "2");
    }

    #[test]
    fn malformed_id_is_invalid_input() {
        let err = "not-a-uuid".parse::<CardId>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        let id = DeckId::new();
        assert_eq!(id.to_string().parse::<DeckId>().unwrap(), id);
    }

    #[test]
    fn new_card_state_is_due_at_creation() {
        let created = at(1_700_000_000);
        let state = CardState::new(created);
        assert_eq!(state.ease_factor, 2.5);
        assert_eq!(state.interval_days, 0);
        assert!(state.is_new());
        assert!(state.is_due(created));
        assert!(!state.is_due(created - Duration::seconds(1)));
        assert!(state.validate(created).is_ok());
    }

    #[test]
    fn validate_rejects_low_ease_and_due_mismatch() {
        let created = at(1_700_000_000);
        let mut state = CardState::new(created);
        state.ease_factor = 1.2;
        assert!(state.validate(created).is_err());

        let mut state = CardState::new(created);
        state.interval_days = 3;
        assert!(state.validate(created).is_err());
    }

    #[test]
    fn new_card_trims_and_rejects_empty_text() {
        let card = NewCard::new("  What is Rust? ", "A language")
            .with_tags(["lang", " lang ", "", "systems"])
            .into_card(CardId::new(), at(0))
            .unwrap();
        assert_eq!(card.front, "What is Rust?");
        assert_eq!(card.tags, vec!["lang".to_string(), "systems".to_string()]);

        let err = NewCard::new("   ", "x").into_card(CardId::new(), at(0));
        assert!(matches!(err, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn edit_is_all_or_nothing() {
        let mut card = NewCard::new("Q", "A").into_card(CardId::new(), at(0)).unwrap();
        let edit = CardEdit {
            front: Some("New Q".to_string()),
            back: Some(" ".to_string()),
            tags: None,
        };
        assert!(edit.apply(&mut card).is_err());
        assert_eq!(card.front, "Q");
    }

    #[test]
    fn session_accuracy() {
        let session = StudySession {
            id: SessionId::new(),
            deck_id: DeckId::new(),
            started_at: at(0),
            ended_at: at(90),
            correct: 3,
            incorrect: 1,
            reviewed: vec![],
        };
        assert_eq!(session.total_answers(), 4);
        assert_eq!(session.accuracy(), 0.75);
        assert_eq!(session.duration(), Duration::seconds(90));
    }
}

//! Spaced-repetition review core.
//!
//! Provides:
//! - SM-2 scheduling behind the `SpacedRepetitionAlgorithm` trait
//! - An in-memory card repository with deck membership and due queries
//! - A study session state machine
//! - Clock, shuffle and persistence collaborators that can be swapped in tests

pub mod algorithm;
pub mod clock;
pub mod deck;
pub mod error;
pub mod persistence;
pub mod repository;
pub mod session;
pub mod shuffle;
pub mod types;

pub use algorithm::{get_algorithm, SchedulingResult, Sm2, SpacedRepetitionAlgorithm};
pub use clock::{Clock, ManualClock, SystemClock};
pub use deck::DeckStats;
pub use error::{CoreError, Result};
pub use persistence::{CardStore, MemoryStore, Snapshot};
pub use repository::CardRepository;
pub use session::{SessionRunner, SessionStatus};
pub use shuffle::{KeepOrder, RandomShuffler, Shuffler};
pub use types::{
    Card, CardEdit, CardId, CardState, Deck, DeckId, NewCard, Quality, SessionId, StudySession,
};

//! Study session state machine.
//!
//! `NotStarted -> InProgress -> Finished`. Only [`SessionRunner::answer`]
//! changes scheduling state; `next`/`previous` just move through the queue.
//! Each answer is committed to the repository as it happens, so an
//! abandoned session keeps the reviews it already applied.

use crate::algorithm::SchedulingResult;
use crate::error::{CoreError, Result};
use crate::repository::CardRepository;
use crate::shuffle::{RandomShuffler, Shuffler};
use crate::types::{Card, CardId, DeckId, Quality, SessionId, StudySession};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Externally visible session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Finished,
}

#[derive(Debug)]
enum SessionState {
    NotStarted,
    InProgress(ActiveSession),
    Finished(StudySession),
}

#[derive(Debug)]
struct ActiveSession {
    id: SessionId,
    deck_id: DeckId,
    started_at: DateTime<Utc>,
    queue: Vec<CardId>,
    index: usize,
    correct: u32,
    incorrect: u32,
    reviewed: Vec<CardId>,
}

impl ActiveSession {
    fn current(&self) -> CardId {
        self.queue[self.index]
    }

    fn is_last(&self) -> bool {
        self.index + 1 >= self.queue.len()
    }

    fn record(&mut self, card_id: CardId, correct: bool) {
        if correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
        self.reviewed.push(card_id);
    }

    fn into_session(self, ended_at: DateTime<Utc>) -> StudySession {
        StudySession {
            id: self.id,
            deck_id: self.deck_id,
            started_at: self.started_at,
            ended_at,
            correct: self.correct,
            incorrect: self.incorrect,
            reviewed: self.reviewed,
        }
    }
}

/// Runs one study session over a deck.
///
/// Borrows the repository for the whole session, so at most one session
/// writes to it at a time.
pub struct SessionRunner<'r, S = RandomShuffler> {
    repo: &'r mut CardRepository,
    shuffler: S,
    state: SessionState,
}

impl<'r> SessionRunner<'r, RandomShuffler> {
    pub fn new(repo: &'r mut CardRepository) -> Self {
        Self::with_shuffler(repo, RandomShuffler::new())
    }
}

impl<'r, S: Shuffler> SessionRunner<'r, S> {
    pub fn with_shuffler(repo: &'r mut CardRepository, shuffler: S) -> Self {
        Self {
            repo,
            shuffler,
            state: SessionState::NotStarted,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self.state {
            SessionState::NotStarted => SessionStatus::NotStarted,
            SessionState::InProgress(_) => SessionStatus::InProgress,
            SessionState::Finished(_) => SessionStatus::Finished,
        }
    }

    pub fn repository(&self) -> &CardRepository {
        &*self.repo
    }

    /// Study order of the running session.
    pub fn queue(&self) -> &[CardId] {
        match &self.state {
            SessionState::InProgress(active) => &active.queue,
            _ => &[],
        }
    }

    pub fn position(&self) -> Option<usize> {
        match &self.state {
            SessionState::InProgress(active) => Some(active.index),
            _ => None,
        }
    }

    pub fn current_card(&self) -> Option<&Card> {
        match &self.state {
            SessionState::InProgress(active) => self.repo.card(active.current()).ok(),
            _ => None,
        }
    }

    /// Summary of the finished session.
    pub fn summary(&self) -> Option<&StudySession> {
        match &self.state {
            SessionState::Finished(session) => Some(session),
            _ => None,
        }
    }

    /// Begin studying a deck: due cards if any, otherwise the whole deck.
    pub fn start(&mut self, deck_id: DeckId) -> Result<()> {
        if !matches!(self.state, SessionState::NotStarted) {
            return Err(self.out_of_sequence("start"));
        }

        let now = self.repo.now();
        let mut queue: Vec<CardId> = self
            .repo
            .due_cards_for_deck(deck_id, now)?
            .iter()
            .map(|card| card.id)
            .collect();
        let due_only = !queue.is_empty();
        if !due_only {
            queue = self.repo.deck(deck_id)?.card_ids.clone();
        }
        if queue.is_empty() {
            return Err(CoreError::InvalidInput(format!(
                "deck {deck_id} has no cards to study"
            )));
        }

        self.shuffler.shuffle(&mut queue);
        debug!(%deck_id, cards = queue.len(), due_only, "session started");

        self.state = SessionState::InProgress(ActiveSession {
            id: SessionId::new(),
            deck_id,
            started_at: now,
            queue,
            index: 0,
            correct: 0,
            incorrect: 0,
            reviewed: Vec::new(),
        });
        Ok(())
    }

    /// Review the current card and move on. Answering the last card
    /// finishes the session.
    pub fn answer(&mut self, quality: Quality) -> Result<SchedulingResult> {
        let card_id = self.active("answer")?.current();
        let result = self.repo.review_card(card_id, quality)?;

        let active = self.active_mut("answer")?;
        active.record(card_id, quality.is_correct());
        if active.is_last() {
            self.complete()?;
        } else {
            active.index += 1;
        }
        Ok(result)
    }

    /// Move forward without reviewing. Past the last card the session finishes.
    pub fn next(&mut self) -> Result<()> {
        let active = self.active_mut("next")?;
        if active.is_last() {
            self.complete()?;
        } else {
            active.index += 1;
        }
        Ok(())
    }

    /// Move back one card; stays put on the first card.
    pub fn previous(&mut self) -> Result<()> {
        let active = self.active_mut("previous")?;
        active.index = active.index.saturating_sub(1);
        Ok(())
    }

    /// End the session early, keeping what was answered so far.
    pub fn finish(&mut self) -> Result<StudySession> {
        self.complete()
    }

    fn complete(&mut self) -> Result<StudySession> {
        let active = match std::mem::replace(&mut self.state, SessionState::NotStarted) {
            SessionState::InProgress(active) => active,
            other => {
                self.state = other;
                return Err(self.out_of_sequence("finish"));
            }
        };

        let session = active.into_session(self.repo.now());
        info!(
            session_id = %session.id,
            deck_id = %session.deck_id,
            correct = session.correct,
            incorrect = session.incorrect,
            "session finished"
        );
        self.repo.record_session(session.clone());
        self.state = SessionState::Finished(session.clone());
        Ok(session)
    }

    fn active(&self, op: &str) -> Result<&ActiveSession> {
        match &self.state {
            SessionState::InProgress(active) => Ok(active),
            _ => Err(self.out_of_sequence(op)),
        }
    }

    fn active_mut(&mut self, op: &str) -> Result<&mut ActiveSession> {
        let status = self.status();
        match &mut self.state {
            SessionState::InProgress(active) => Ok(active),
            _ => Err(CoreError::InvalidState(format!("cannot {op} a session that is {status:?}"))),
        }
    }

    fn out_of_sequence(&self, op: &str) -> CoreError {
        CoreError::InvalidState(format!("cannot {op} a session that is {:?}", self.status()))
    }
}

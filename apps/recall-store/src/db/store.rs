//! Row store for repository snapshots.

use crate::db::error::DbError;
use crate::db::schema::{NAMESPACED_TABLES, SCHEMA, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use recall_core::{
    Card, CardId, CardRepository, CardState, CardStore, Clock, Deck, DeckId, SessionId, Snapshot,
    StudySession,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

type Result<T> = std::result::Result<T, DbError>;

/// SQLite-backed [`CardStore`]. Each namespace holds one independent snapshot.
pub struct SqliteStore {
    conn: Connection,
    namespace: String,
}

impl SqliteStore {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P, namespace: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, namespace.into())
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory(namespace: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, namespace.into())
    }

    fn with_connection(conn: Connection, namespace: String) -> Result<Self> {
        if namespace.trim().is_empty() {
            return Err(DbError::InvalidData("namespace must not be empty".to_string()));
        }
        let store = Self { conn, namespace };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Same database, different namespace.
    pub fn into_namespace(self, namespace: impl Into<String>) -> Result<Self> {
        Self::with_connection(self.conn, namespace.into())
    }

    pub fn schema_version(&self) -> Result<Option<i32>> {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .optional()
            .map(Option::flatten)
            .map_err(Into::into)
    }

    /// Load this namespace into a repository.
    pub fn load_repository(&self, clock: Arc<dyn Clock>) -> Result<CardRepository> {
        CardRepository::load(self, clock)
    }

    fn load_cards(&self) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deck_id, front, back, tags, created_at, ease_factor, interval_days,
                    streak, review_count, last_reviewed_at, next_review_due_at
             FROM cards WHERE namespace = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![self.namespace], |row| {
                Ok(CardRow {
                    id: row.get(0)?,
                    deck_id: row.get(1)?,
                    front: row.get(2)?,
                    back: row.get(3)?,
                    tags: row.get(4)?,
                    created_at: row.get(5)?,
                    ease_factor: row.get(6)?,
                    interval_days: row.get(7)?,
                    streak: row.get(8)?,
                    review_count: row.get(9)?,
                    last_reviewed_at: row.get(10)?,
                    next_review_due_at: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(CardRow::into_card).collect()
    }

    fn load_decks(&self) -> Result<Vec<Deck>> {
        let mut members: HashMap<String, Vec<CardId>> = HashMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT deck_id, card_id FROM deck_cards WHERE namespace = ?1
             ORDER BY deck_id, position",
        )?;
        let pairs = stmt
            .query_map(params![self.namespace], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (deck_id, card_id) in pairs {
            members.entry(deck_id).or_default().push(parse_id(&card_id)?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, name, created_at FROM decks WHERE namespace = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![self.namespace], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, created_at)| -> Result<Deck> {
                let card_ids = members.remove(&id).unwrap_or_default();
                Ok(Deck {
                    id: parse_id(&id)?,
                    name,
                    created_at: parse_time(&created_at)?,
                    card_ids,
                })
            })
            .collect()
    }

    fn load_sessions(&self) -> Result<Vec<StudySession>> {
        let mut reviewed: HashMap<String, Vec<CardId>> = HashMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT session_id, card_id FROM session_reviews WHERE namespace = ?1
             ORDER BY session_id, position",
        )?;
        let pairs = stmt
            .query_map(params![self.namespace], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (session_id, card_id) in pairs {
            reviewed.entry(session_id).or_default().push(parse_id(&card_id)?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, deck_id, started_at, ended_at, correct, incorrect
             FROM study_sessions WHERE namespace = ?1 ORDER BY seq",
        )?;
        let rows = stmt
            .query_map(params![self.namespace], |row| {
                Ok(SessionRow {
                    id: row.get(0)?,
                    deck_id: row.get(1)?,
                    started_at: row.get(2)?,
                    ended_at: row.get(3)?,
                    correct: row.get(4)?,
                    incorrect: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| {
                let cards = reviewed.remove(&row.id).unwrap_or_default();
                row.into_session(cards)
            })
            .collect()
    }
}

impl CardStore for SqliteStore {
    type Error = DbError;

    fn load_all(&self) -> Result<Snapshot> {
        let snapshot = Snapshot {
            cards: self.load_cards()?,
            decks: self.load_decks()?,
            sessions: self.load_sessions()?,
        };
        info!(
            namespace = %self.namespace,
            cards = snapshot.cards.len(),
            decks = snapshot.decks.len(),
            sessions = snapshot.sessions.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Replace everything stored under this namespace in one transaction.
    fn save_all(&mut self, snapshot: &Snapshot) -> Result<()> {
        let namespace = self.namespace.as_str();
        let tx = self.conn.transaction()?;

        for table in NAMESPACED_TABLES {
            tx.execute(
                &format!("DELETE FROM {table} WHERE namespace = ?1"),
                params![namespace],
            )?;
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO cards (namespace, id, deck_id, front, back, tags, created_at,
                    ease_factor, interval_days, streak, review_count, last_reviewed_at,
                    next_review_due_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for card in &snapshot.cards {
                let state = &card.state;
                stmt.execute(params![
                    namespace,
                    card.id.to_string(),
                    card.deck_id.map(|id| id.to_string()),
                    card.front,
                    card.back,
                    serde_json::to_string(&card.tags)?,
                    card.created_at.to_rfc3339(),
                    state.ease_factor,
                    state.interval_days,
                    state.streak,
                    state.review_count,
                    state.last_reviewed_at.map(|t| t.to_rfc3339()),
                    state.next_review_due_at.to_rfc3339(),
                ])?;
            }
        }

        {
            let mut deck_stmt = tx.prepare(
                "INSERT INTO decks (namespace, id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut member_stmt = tx.prepare(
                "INSERT INTO deck_cards (namespace, deck_id, card_id, position)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for deck in &snapshot.decks {
                let deck_id = deck.id.to_string();
                deck_stmt.execute(params![
                    namespace,
                    deck_id,
                    deck.name,
                    deck.created_at.to_rfc3339(),
                ])?;
                for (position, card_id) in deck.card_ids.iter().enumerate() {
                    member_stmt.execute(params![
                        namespace,
                        deck_id,
                        card_id.to_string(),
                        position as i64,
                    ])?;
                }
            }
        }

        {
            let mut session_stmt = tx.prepare(
                "INSERT INTO study_sessions (namespace, id, seq, deck_id, started_at, ended_at,
                    correct, incorrect)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let mut review_stmt = tx.prepare(
                "INSERT INTO session_reviews (namespace, session_id, position, card_id)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (seq, session) in snapshot.sessions.iter().enumerate() {
                let session_id = session.id.to_string();
                session_stmt.execute(params![
                    namespace,
                    session_id,
                    seq as i64,
                    session.deck_id.to_string(),
                    session.started_at.to_rfc3339(),
                    session.ended_at.to_rfc3339(),
                    session.correct,
                    session.incorrect,
                ])?;
                for (position, card_id) in session.reviewed.iter().enumerate() {
                    review_stmt.execute(params![
                        namespace,
                        session_id,
                        position as i64,
                        card_id.to_string(),
                    ])?;
                }
            }
        }

        tx.commit()?;
        info!(
            namespace = %namespace,
            cards = snapshot.cards.len(),
            decks = snapshot.decks.len(),
            sessions = snapshot.sessions.len(),
            "saved snapshot"
        );
        Ok(())
    }
}

struct CardRow {
    id: String,
    deck_id: Option<String>,
    front: String,
    back: String,
    tags: String,
    created_at: String,
    ease_factor: f64,
    interval_days: u32,
    streak: u32,
    review_count: u32,
    last_reviewed_at: Option<String>,
    next_review_due_at: String,
}

impl CardRow {
    fn into_card(self) -> Result<Card> {
        Ok(Card {
            id: parse_id(&self.id)?,
            deck_id: self.deck_id.as_deref().map(parse_id).transpose()?,
            front: self.front,
            back: self.back,
            tags: serde_json::from_str(&self.tags)?,
            created_at: parse_time(&self.created_at)?,
            state: CardState {
                ease_factor: self.ease_factor,
                interval_days: self.interval_days,
                streak: self.streak,
                review_count: self.review_count,
                last_reviewed_at: self.last_reviewed_at.as_deref().map(parse_time).transpose()?,
                next_review_due_at: parse_time(&self.next_review_due_at)?,
            },
        })
    }
}

struct SessionRow {
    id: String,
    deck_id: String,
    started_at: String,
    ended_at: String,
    correct: u32,
    incorrect: u32,
}

impl SessionRow {
    fn into_session(self, reviewed: Vec<CardId>) -> Result<StudySession> {
        Ok(StudySession {
            id: parse_id::<SessionId>(&self.id)?,
            deck_id: parse_id::<DeckId>(&self.deck_id)?,
            started_at: parse_time(&self.started_at)?,
            ended_at: parse_time(&self.ended_at)?,
            correct: self.correct,
            incorrect: self.incorrect,
            reviewed,
        })
    }
}

fn parse_id<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = recall_core::CoreError>,
{
    value.parse().map_err(DbError::from)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidData(format!("bad timestamp {value:?}: {e}")))
}

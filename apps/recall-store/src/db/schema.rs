//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema. Every table is partitioned by `namespace`.
pub const SCHEMA: &str = r#"
-- Cards with their scheduling state
CREATE TABLE IF NOT EXISTS cards (
    namespace TEXT NOT NULL,
    id TEXT NOT NULL,
    deck_id TEXT,
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    ease_factor REAL NOT NULL DEFAULT 2.5,
    interval_days INTEGER NOT NULL DEFAULT 0,
    streak INTEGER NOT NULL DEFAULT 0,
    review_count INTEGER NOT NULL DEFAULT 0,
    last_reviewed_at TEXT,
    next_review_due_at TEXT NOT NULL,
    PRIMARY KEY (namespace, id)
);

-- Decks
CREATE TABLE IF NOT EXISTS decks (
    namespace TEXT NOT NULL,
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (namespace, id)
);

-- Deck membership, in deck order
CREATE TABLE IF NOT EXISTS deck_cards (
    namespace TEXT NOT NULL,
    deck_id TEXT NOT NULL,
    card_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (namespace, deck_id, card_id)
);

-- Finished study sessions, in completion order
CREATE TABLE IF NOT EXISTS study_sessions (
    namespace TEXT NOT NULL,
    id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    deck_id TEXT NOT NULL,
    started_at TEXT NOT NULL,
    ended_at TEXT NOT NULL,
    correct INTEGER NOT NULL,
    incorrect INTEGER NOT NULL,
    PRIMARY KEY (namespace, id)
);

-- Cards answered in each session, in answer order
CREATE TABLE IF NOT EXISTS session_reviews (
    namespace TEXT NOT NULL,
    session_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    card_id TEXT NOT NULL,
    PRIMARY KEY (namespace, session_id, position)
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(namespace, next_review_due_at);
CREATE INDEX IF NOT EXISTS idx_deck_cards_deck ON deck_cards(namespace, deck_id, position);
CREATE INDEX IF NOT EXISTS idx_sessions_seq ON study_sessions(namespace, seq);
"#;

/// Tables cleared and rewritten on every save, children first.
pub const NAMESPACED_TABLES: [&str; 5] = [
    "session_reviews",
    "study_sessions",
    "deck_cards",
    "decks",
    "cards",
];

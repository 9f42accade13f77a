// Store migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.

use rusqlite::Connection;

use crate::error::{ReelMapError, Result};

/// All migrations in order. Each migration is a SQL string.
const MIGRATIONS: &[&str] = &[
    // Migration 1: tag categories, tags, rules, file associations
    r#"
    CREATE TABLE tag_categories (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        parent_id TEXT REFERENCES tag_categories(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE tags (
        id TEXT PRIMARY KEY,
        category_id TEXT NOT NULL REFERENCES tag_categories(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        value TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE(category_id, value)
    );

    CREATE TABLE context_mappings (
        id TEXT PRIMARY KEY,
        path TEXT NOT NULL,
        context_type TEXT NOT NULL CHECK (context_type IN ('folder', 'pattern', 'filename')),
        context_value TEXT NOT NULL,
        category_id TEXT REFERENCES tag_categories(id) ON DELETE SET NULL,
        tag_id TEXT REFERENCES tags(id) ON DELETE SET NULL,
        confidence REAL NOT NULL DEFAULT 1.0,
        created_at TEXT NOT NULL
    );

    CREATE TABLE tag_rules (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        pattern TEXT NOT NULL,
        pattern_type TEXT NOT NULL CHECK (pattern_type IN ('path', 'filename', 'content')),
        category_id TEXT NOT NULL REFERENCES tag_categories(id) ON DELETE CASCADE,
        tag_template TEXT NOT NULL,
        priority INTEGER NOT NULL DEFAULT 0,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE file_tags (
        file_id TEXT NOT NULL,
        tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        source TEXT NOT NULL CHECK (source IN ('manual', 'rule', 'context')),
        rule_id TEXT REFERENCES tag_rules(id) ON DELETE SET NULL,
        confidence REAL NOT NULL DEFAULT 1.0,
        created_at TEXT NOT NULL,
        PRIMARY KEY (file_id, tag_id)
    );

    CREATE INDEX idx_tags_category ON tags(category_id);
    CREATE INDEX idx_context_mappings_path ON context_mappings(path);
    CREATE INDEX idx_tag_rules_active ON tag_rules(active, priority);
    CREATE INDEX idx_file_tags_tag ON file_tags(tag_id);
    "#,
];

/// Get current schema version from database
fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = MIGRATIONS.len() as u32;

    if current_version > target_version {
        return Err(ReelMapError::Other(format!(
            "Store schema version {} is newer than this build supports (max {})",
            current_version, target_version
        )));
    }

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        conn.execute_batch(migration)?;
        conn.execute_batch(&format!("PRAGMA user_version = {}", migration_version))?;

        log::info!("Applied store migration {}", migration_version);
    }

    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<u32> {
    get_schema_version(conn)
}

//! SQLite schema for the registry database

use crate::error::Result;
use rusqlite::Connection;

/// Create the registry tables
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS entity (
            uuid TEXT PRIMARY KEY,
            facemode INTEGER NOT NULL,  -- 0 legal person, 1 entrepreneur

            full_name TEXT,
            name TEXT,
            tin INTEGER,
            address TEXT,
            officer TEXT,
            activity_desc TEXT,
            status TEXT,

            -- Derived
            sex TEXT,
            classification_code TEXT,
            active INTEGER
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS founder (
            entity_uuid TEXT NOT NULL,
            founder_name TEXT,

            FOREIGN KEY(entity_uuid) REFERENCES entity(uuid)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS source_metadata (
            title TEXT,
            created TEXT,
            mime TEXT,
            format TEXT,
            size INTEGER,
            hash TEXT
        )
        "#,
        [],
    )?;

    Ok(())
}

/// Lookup indexes, built once after a complete load
pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_entity_address ON entity(address);
        CREATE INDEX IF NOT EXISTS idx_entity_tin ON entity(tin);
        CREATE INDEX IF NOT EXISTS idx_entity_full_name ON entity(full_name);
        CREATE INDEX IF NOT EXISTS idx_founder_entity ON founder(entity_uuid);
        CREATE INDEX IF NOT EXISTS idx_founder_name ON founder(founder_name);
        "#,
    )?;

    Ok(())
}

/// Names of the indexes [`create_indexes`] builds
pub const INDEX_NAMES: [&str; 5] = [
    "idx_entity_address",
    "idx_entity_tin",
    "idx_entity_full_name",
    "idx_founder_entity",
    "idx_founder_name",
];

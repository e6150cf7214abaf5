//! Registry storage
//!
//! [`RegistryStore`] owns the SQLite connection. [`BatchWriter`] borrows it and
//! groups accepted records into explicit transactions; the caller decides when
//! a batch is committed. Each record runs inside its own savepoint so a failing
//! insert never leaves half a record in the open batch.

use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::metadata::SourceMetadata;
use super::models::{EnrichedRecord, StructuredRecord};
use super::schema;
use crate::config::CommitInterval;
use crate::error::Result;

// ============================================================================
// Store
// ============================================================================

/// Handle to one registry database
pub struct RegistryStore {
    conn: Connection,
}

impl RegistryStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        schema::init_schema(&conn)?;
        debug!(path = %path.display(), "Opened registry database");

        Ok(Self { conn })
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert one provenance row
    pub fn record_source(&self, metadata: &SourceMetadata) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO source_metadata (title, created, mime, format, size, hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                metadata.title,
                metadata.created,
                metadata.mime,
                metadata.format,
                metadata.size,
                metadata.hash,
            ],
        )?;
        info!(title = %metadata.title, created = %metadata.created, "Recorded source metadata");
        Ok(())
    }

    pub fn create_indexes(&self) -> Result<()> {
        info!("Creating indexes");
        schema::create_indexes(&self.conn)
    }

    pub fn entity_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM entity")
    }

    pub fn founder_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM founder")
    }

    fn count(&self, sql: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

// ============================================================================
// Batch Writer
// ============================================================================

/// Appends enriched records to the store in caller-committed batches
pub struct BatchWriter<'a> {
    conn: &'a Connection,
    interval: CommitInterval,
    pending: u64,
    committed: u64,
    open: bool,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a RegistryStore, interval: CommitInterval) -> Self {
        Self {
            conn: store.connection(),
            interval,
            pending: 0,
            committed: 0,
            open: false,
        }
    }

    /// Append one record and its founders to the open batch
    ///
    /// Returns the generated entity identifier.
    pub fn write(&mut self, record: &EnrichedRecord) -> Result<String> {
        if !self.open {
            self.conn.execute_batch("BEGIN")?;
            self.open = true;
        }

        let id = Uuid::new_v4().simple().to_string();

        self.conn.execute_batch("SAVEPOINT record")?;
        match self.insert(&id, record) {
            Ok(()) => {
                self.conn.execute_batch("RELEASE record")?;
                self.pending += 1;
                Ok(id)
            },
            Err(err) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK TO record; RELEASE record") {
                    warn!(error = %rollback, "Failed to discard rejected record");
                }
                Err(err)
            },
        }
    }

    /// Whether enough records are waiting for a commit
    pub fn checkpoint_due(&self) -> bool {
        self.pending >= self.interval.get()
    }

    /// Commit the open batch, returning how many records it held
    pub fn commit(&mut self) -> Result<u64> {
        if !self.open {
            return Ok(0);
        }

        self.conn.execute_batch("COMMIT")?;
        let batch = self.pending;
        self.committed += batch;
        self.pending = 0;
        self.open = false;

        debug!(batch, committed = self.committed, "Committed batch");
        Ok(batch)
    }

    /// Accepted records not yet committed
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Records made durable so far
    pub fn committed(&self) -> u64 {
        self.committed
    }

    fn insert(&self, id: &str, enriched: &EnrichedRecord) -> Result<()> {
        let derived = &enriched.derived;
        let sex = derived.sex.map(|sex| sex.code());
        let facemode = enriched.kind().facemode();

        let mut entity = self.conn.prepare_cached(
            r#"
            INSERT INTO entity (
                uuid, facemode, full_name, name, tin, address, officer,
                activity_desc, status, sex, classification_code, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )?;

        match &enriched.record {
            StructuredRecord::LegalPerson(person) => {
                entity.execute(params![
                    id,
                    facemode,
                    person.full_name,
                    person.short_name,
                    person.tin,
                    person.address,
                    person.chief_officer,
                    person.activity,
                    person.status,
                    sex,
                    derived.classification_code,
                    derived.active,
                ])?;

                if !person.founders.is_empty() {
                    let mut founder = self
                        .conn
                        .prepare_cached("INSERT INTO founder (entity_uuid, founder_name) VALUES (?1, ?2)")?;
                    for name in &person.founders {
                        founder.execute(params![id, name])?;
                    }
                }
            },
            StructuredRecord::Entrepreneur(entrepreneur) => {
                entity.execute(params![
                    id,
                    facemode,
                    None::<&str>,
                    entrepreneur.full_name,
                    None::<&str>,
                    entrepreneur.address,
                    None::<&str>,
                    entrepreneur.activity,
                    entrepreneur.status,
                    sex,
                    derived.classification_code,
                    derived.active,
                ])?;
            },
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::registry::derive::enrich;
    use crate::registry::models::{Entrepreneur, LegalPerson};

    fn legal_person(name: &str, founders: &[&str]) -> EnrichedRecord {
        enrich(StructuredRecord::LegalPerson(LegalPerson {
            full_name: Some(name.to_string()),
            short_name: Some("ТОВ".to_string()),
            tin: Some("34567528".to_string()),
            address: Some("01001, м.Київ".to_string()),
            chief_officer: Some("КОВАЛЬ ГАННА ПЕТРІВНА".to_string()),
            activity: Some("62.01 Комп'ютерне програмування".to_string()),
            status: Some("зареєстровано".to_string()),
            founders: founders.iter().map(|f| Some(f.to_string())).collect(),
        }))
    }

    fn entrepreneur() -> EnrichedRecord {
        enrich(StructuredRecord::Entrepreneur(Entrepreneur {
            full_name: Some("ШЕВЧЕНКО ТАРАС ГРИГОРОВИЧ".to_string()),
            address: Some("м.Канів".to_string()),
            activity: Some("01.11 Вирощування зернових".to_string()),
            status: Some("припинено".to_string()),
        }))
    }

    fn interval() -> CommitInterval {
        CommitInterval::default()
    }

    #[test]
    fn test_write_legal_person_with_founders() {
        let store = RegistryStore::open_in_memory().unwrap();
        let mut writer = BatchWriter::new(&store, interval());

        let id = writer.write(&legal_person("ТОВ \"А\"", &["ІВАНЕНКО", "ПЕТРЕНКО"])).unwrap();
        writer.commit().unwrap();

        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

        let (facemode, tin_type, sex, code, active): (i64, String, String, String, bool) = store
            .connection()
            .query_row(
                "SELECT facemode, typeof(tin), sex, classification_code, active FROM entity WHERE uuid = ?1",
                [&id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .unwrap();
        assert_eq!(facemode, 0);
        assert_eq!(tin_type, "integer");
        assert_eq!(sex, "Ж");
        assert_eq!(code, "62.01");
        assert!(active);

        let founders: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM founder WHERE entity_uuid = ?1", [&id], |row| row.get(0))
            .unwrap();
        assert_eq!(founders, 2);
    }

    #[test]
    fn test_write_entrepreneur() {
        let store = RegistryStore::open_in_memory().unwrap();
        let mut writer = BatchWriter::new(&store, interval());

        let id = writer.write(&entrepreneur()).unwrap();
        writer.commit().unwrap();

        let row: (i64, Option<String>, String, Option<i64>, Option<String>, bool) = store
            .connection()
            .query_row(
                "SELECT facemode, full_name, name, tin, officer, active FROM entity WHERE uuid = ?1",
                [&id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?)),
            )
            .unwrap();
        assert_eq!(row, (1, None, "ШЕВЧЕНКО ТАРАС ГРИГОРОВИЧ".to_string(), None, None, false));
        assert_eq!(store.founder_count().unwrap(), 0);
    }

    #[test]
    fn test_checkpoint_and_counters() {
        let store = RegistryStore::open_in_memory().unwrap();
        let mut writer = BatchWriter::new(&store, interval());
        assert_eq!(writer.commit().unwrap(), 0);

        for _ in 0..1999 {
            writer.write(&entrepreneur()).unwrap();
        }
        assert!(!writer.checkpoint_due());
        writer.write(&entrepreneur()).unwrap();
        assert!(writer.checkpoint_due());
        assert_eq!(writer.pending(), 2000);

        assert_eq!(writer.commit().unwrap(), 2000);
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.committed(), 2000);
        assert!(!writer.checkpoint_due());
    }

    #[test]
    fn test_rejected_record_leaves_no_rows() {
        let store = RegistryStore::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_founder BEFORE INSERT ON founder
                 WHEN NEW.founder_name = 'BAD'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let mut writer = BatchWriter::new(&store, interval());
        writer.write(&legal_person("ТОВ \"А\"", &["ДОБРИЙ"])).unwrap();
        let err = writer.write(&legal_person("ТОВ \"Б\"", &["ДОБРИЙ", "BAD"])).unwrap_err();
        assert!(matches!(err, crate::error::IngestError::Persistence(_)));
        assert_eq!(writer.pending(), 1);
        writer.commit().unwrap();

        assert_eq!(store.entity_count().unwrap(), 1);
        assert_eq!(store.founder_count().unwrap(), 1);
    }

    #[test]
    fn test_uncommitted_batch_is_lost_on_crash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edr.sqlite");

        {
            let store = RegistryStore::open(&path).unwrap();
            let mut writer = BatchWriter::new(&store, interval());
            for _ in 0..4500 {
                writer.write(&entrepreneur()).unwrap();
                if writer.checkpoint_due() {
                    writer.commit().unwrap();
                }
            }
            assert_eq!(writer.committed(), 4000);
            assert_eq!(writer.pending(), 500);
            // Dropped with the last batch still open
        }

        let store = RegistryStore::open(&path).unwrap();
        assert_eq!(store.entity_count().unwrap(), 4000);
    }

    #[test]
    fn test_record_source() {
        let store = RegistryStore::open_in_memory().unwrap();
        store
            .record_source(&SourceMetadata {
                title: "edr.zip".to_string(),
                created: "2018-11-08".to_string(),
                mime: "application/zip".to_string(),
                format: "ZIP".to_string(),
                size: 42,
                hash: None,
            })
            .unwrap();

        let (title, hash): (String, Option<String>) = store
            .connection()
            .query_row("SELECT title, hash FROM source_metadata", [], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        assert_eq!(title, "edr.zip");
        assert!(hash.is_none());
    }
}

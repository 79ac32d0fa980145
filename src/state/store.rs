use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use super::data::Crime;
use super::error::StoreError;
use super::live::{LiveRegistry, SubscriptionId};

pub type StoreResult<T> = Result<T, StoreError>;

const SELECT_COLUMNS: &str =
    "SELECT id, title, date, date_nanos, is_solved, suspect, requires_police FROM crime";

const NANOS_PER_MILLI: u32 = 1_000_000;

/// The CrimeStore manages the SQLite crime table.
/// It is the data-access layer: queries, writes, and re-delivery of
/// live queries after every write.
pub struct CrimeStore {
    conn: Connection,
    db_path: Option<PathBuf>,
    listeners: LiveRegistry,
}

impl CrimeStore {
    /// Open (or create) the crime database at `db_path` and initialize the schema.
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path)?;

        tracing::info!(path = %db_path.display(), "crime database opened");

        let mut store = CrimeStore {
            conn,
            db_path: Some(db_path.to_path_buf()),
            listeners: LiveRegistry::default(),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Open a private in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let mut store = CrimeStore {
            conn: Connection::open_in_memory()?,
            db_path: None,
            listeners: LiveRegistry::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    /// Creates the crime table if it doesn't exist and adds columns
    /// introduced after the first release.
    fn init_schema(&mut self) -> StoreResult<()> {
        // First release layout: id, title, date, solved flag
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS crime (
                id              TEXT PRIMARY KEY NOT NULL,
                title           TEXT NOT NULL,
                date            INTEGER NOT NULL,
                is_solved       INTEGER NOT NULL
            )",
            [],
        )?;

        // Columns added later; older databases get them with defaults
        self.add_column_if_missing("suspect", "TEXT NOT NULL DEFAULT ''")?;
        self.add_column_if_missing("requires_police", "INTEGER NOT NULL DEFAULT 0")?;
        // Sub-millisecond part of `date`, which holds epoch milliseconds
        self.add_column_if_missing("date_nanos", "INTEGER NOT NULL DEFAULT 0")?;

        tracing::info!("crime schema initialized");

        Ok(())
    }

    fn add_column_if_missing(&self, column: &str, definition: &str) -> StoreResult<()> {
        let exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('crime') WHERE name = ?1",
            [column],
            |row| row.get(0),
        )?;

        if !exists {
            self.conn.execute(
                &format!("ALTER TABLE crime ADD COLUMN {column} {definition}"),
                [],
            )?;
            tracing::info!(column, "added missing crime column");
        }

        Ok(())
    }

    /// Get the path to the database file (None for in-memory stores)
    #[cfg(test)]
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Get all crimes in insertion order
    pub fn list(&self) -> StoreResult<Vec<Crime>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY rowid"))?;

        let crime_iter = stmt.query_map([], read_row)?;

        let mut crimes = Vec::new();
        for crime in crime_iter {
            crimes.push(crime?.into_crime()?);
        }

        Ok(crimes)
    }

    /// Get a single crime by id
    pub fn get(&self, id: Uuid) -> StoreResult<Option<Crime>> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id.to_string()],
                read_row,
            )
            .optional()?;

        raw.map(RawCrime::into_crime).transpose()
    }

    /// Insert a new crime. Fails with `Duplicate` if the id is taken.
    pub fn insert(&mut self, crime: &Crime) -> StoreResult<()> {
        let result = self.conn.execute(
            "INSERT INTO crime (id, title, date, date_nanos, is_solved, suspect, requires_police)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                crime.id.to_string(),
                crime.title,
                crime.date.timestamp_millis(),
                sub_millis(&crime.date),
                crime.is_solved,
                crime.suspect,
                crime.requires_police,
            ],
        );

        match result {
            Ok(_) => {}
            // Check if this is a UNIQUE constraint violation (duplicate)
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::Duplicate(crime.id));
            }
            Err(e) => return Err(e.into()),
        }

        self.notify(crime.id);
        Ok(())
    }

    /// Replace the stored fields of an existing crime. Fails with `NotFound`
    /// if no row has this id.
    pub fn update(&mut self, crime: &Crime) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE crime
             SET title = ?2, date = ?3, date_nanos = ?4, is_solved = ?5, suspect = ?6,
                 requires_police = ?7
             WHERE id = ?1",
            rusqlite::params![
                crime.id.to_string(),
                crime.title,
                crime.date.timestamp_millis(),
                sub_millis(&crime.date),
                crime.is_solved,
                crime.suspect,
                crime.requires_police,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(crime.id));
        }

        self.notify(crime.id);
        Ok(())
    }

    /// Register a live query over the whole table and deliver the current list.
    pub fn subscribe_list(
        &mut self,
        subscription: SubscriptionId,
        sender: UnboundedSender<Vec<Crime>>,
    ) -> StoreResult<()> {
        let crimes = self.list()?;
        if sender.send(crimes).is_ok() {
            self.listeners.add_list(subscription, sender);
        }
        Ok(())
    }

    /// Register a live query over one crime and deliver its current value.
    pub fn subscribe_crime(
        &mut self,
        subscription: SubscriptionId,
        id: Uuid,
        sender: UnboundedSender<Option<Crime>>,
    ) -> StoreResult<()> {
        let crime = self.get(id)?;
        if sender.send(crime).is_ok() {
            self.listeners.add_crime(subscription, id, sender);
        }
        Ok(())
    }

    pub fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.listeners.remove(subscription);
    }

    /// Number of registered live queries
    #[cfg(test)]
    pub fn subscription_count(&self) -> usize {
        self.listeners.len()
    }

    /// Re-run the live queries affected by a write to `changed`.
    fn notify(&mut self, changed: Uuid) {
        let list = if self.listeners.has_list() {
            match self.list() {
                Ok(crimes) => Some(crimes),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to refresh crime list");
                    None
                }
            }
        } else {
            None
        };

        let crime = if self.listeners.watches(changed) {
            match self.get(changed) {
                Ok(crime) => Some(crime),
                Err(e) => {
                    tracing::warn!(error = %e, %changed, "failed to refresh crime");
                    None
                }
            }
        } else {
            None
        };

        self.listeners.deliver(changed, list, crime);
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for CrimeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrimeStore")
            .field("db_path", &self.db_path)
            .field("subscriptions", &self.listeners.len())
            .finish()
    }
}

/// Nanoseconds below the millisecond, kept beside the millisecond timestamp
fn sub_millis(date: &DateTime<Utc>) -> u32 {
    date.timestamp_subsec_nanos() % NANOS_PER_MILLI
}

/// Row as stored, before id and date are parsed
struct RawCrime {
    id: String,
    title: String,
    date: i64,
    date_nanos: u32,
    is_solved: bool,
    suspect: String,
    requires_police: bool,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawCrime> {
    Ok(RawCrime {
        id: row.get(0)?,
        title: row.get(1)?,
        date: row.get(2)?,
        date_nanos: row.get(3)?,
        is_solved: row.get(4)?,
        suspect: row.get(5)?,
        requires_police: row.get(6)?,
    })
}

impl RawCrime {
    fn into_crime(self) -> StoreResult<Crime> {
        let id = Uuid::parse_str(&self.id).map_err(|_| StoreError::CorruptRow {
            column: "id",
            value: self.id.clone(),
        })?;
        let date = DateTime::<Utc>::from_timestamp_millis(self.date).ok_or(StoreError::CorruptRow {
            column: "date",
            value: self.date.to_string(),
        })?;
        if self.date_nanos >= NANOS_PER_MILLI {
            return Err(StoreError::CorruptRow {
                column: "date_nanos",
                value: self.date_nanos.to_string(),
            });
        }
        let date = date + Duration::nanoseconds(i64::from(self.date_nanos));

        Ok(Crime {
            id,
            title: self.title,
            date,
            is_solved: self.is_solved,
            suspect: self.suspect,
            requires_police: self.requires_police,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::sync::mpsc;

    fn crime(title: &str) -> Crime {
        let mut crime = Crime::new();
        crime.title = title.to_string();
        crime
    }

    #[test]
    fn test_insert_then_get() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let theft = crime("Theft");

        store.insert(&theft).unwrap();

        assert_eq!(store.get(theft.id).unwrap(), Some(theft));
    }

    #[test]
    fn test_date_keeps_full_precision() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let mut theft = crime("Theft");
        theft.date = Utc.timestamp_opt(1_700_000_000, 652_305_871).unwrap();
        store.insert(&theft).unwrap();
        assert_eq!(store.get(theft.id).unwrap(), Some(theft.clone()));

        theft.date = Utc.timestamp_opt(-86_400, 999_999_999).unwrap();
        store.update(&theft).unwrap();
        assert_eq!(store.list().unwrap(), vec![theft]);
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = CrimeStore::open_in_memory().unwrap();

        assert_eq!(store.get(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let theft = crime("Theft");
        store.insert(&theft).unwrap();

        let err = store.insert(&theft).unwrap_err();

        assert!(matches!(err, StoreError::Duplicate(id) if id == theft.id));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_update_replaces_fields() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let mut theft = crime("Theft");
        store.insert(&theft).unwrap();

        theft.is_solved = true;
        theft.suspect = "Dave".to_string();
        theft.requires_police = true;
        store.update(&theft).unwrap();

        assert_eq!(store.get(theft.id).unwrap(), Some(theft));
    }

    #[test]
    fn test_update_missing_fails() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let ghost = crime("Ghost");

        let err = store.update(&ghost).unwrap_err();

        assert!(matches!(err, StoreError::NotFound(id) if id == ghost.id));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let first = crime("First");
        let second = crime("Second");
        let third = crime("Third");
        for c in [&first, &second, &third] {
            store.insert(c).unwrap();
        }

        let ids: Vec<Uuid> = store.list().unwrap().iter().map(|c| c.id).collect();

        assert_eq!(ids, vec![first.id, second.id, third.id]);
    }

    #[test]
    fn test_open_upgrades_old_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("crime-database.db");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let id = Uuid::new_v4();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "CREATE TABLE crime (
                    id TEXT PRIMARY KEY NOT NULL,
                    title TEXT NOT NULL,
                    date INTEGER NOT NULL,
                    is_solved INTEGER NOT NULL
                )",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO crime (id, title, date, is_solved) VALUES (?1, 'Old', 1000, 1)",
                [id.to_string()],
            )
            .unwrap();
        }

        let store = CrimeStore::open(&path).unwrap();
        let old = store.get(id).unwrap().unwrap();

        assert_eq!(old.title, "Old");
        assert!(old.is_solved);
        assert_eq!(old.suspect, "");
        assert!(!old.requires_police);
        assert_eq!(old.date.timestamp_millis(), 1000);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("crime-database.db");

        let store = CrimeStore::open(&path).unwrap();

        assert_eq!(store.path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[test]
    fn test_list_subscription_refires_on_every_write() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_list(SubscriptionId(1), tx).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Vec::<Crime>::new());

        let mut theft = crime("Theft");
        store.insert(&theft).unwrap();
        assert_eq!(rx.try_recv().unwrap(), vec![theft.clone()]);

        theft.is_solved = true;
        store.update(&theft).unwrap();
        assert_eq!(rx.try_recv().unwrap(), vec![theft]);
    }

    #[test]
    fn test_crime_subscription_refires_only_for_its_id() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let mut theft = crime("Theft");
        let other = crime("Other");
        store.insert(&theft).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_crime(SubscriptionId(7), theft.id, tx).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Some(theft.clone()));

        store.insert(&other).unwrap();
        assert!(rx.try_recv().is_err());

        theft.title = "Grand theft".to_string();
        store.update(&theft).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Some(theft));
    }

    #[test]
    fn test_crime_subscription_sees_later_insert() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let theft = crime("Theft");

        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_crime(SubscriptionId(2), theft.id, tx).unwrap();
        assert_eq!(rx.try_recv().unwrap(), None);

        store.insert(&theft).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Some(theft));
    }

    #[test]
    fn test_unsubscribe_and_dropped_receivers() {
        let mut store = CrimeStore::open_in_memory().unwrap();
        let (list_tx, list_rx) = mpsc::unbounded_channel();
        let (crime_tx, _crime_rx) = mpsc::unbounded_channel();
        let theft = crime("Theft");

        store.subscribe_list(SubscriptionId(1), list_tx).unwrap();
        store.subscribe_crime(SubscriptionId(2), theft.id, crime_tx).unwrap();
        assert_eq!(store.subscription_count(), 2);

        store.unsubscribe(SubscriptionId(2));
        assert_eq!(store.subscription_count(), 1);

        // A receiver that went away is pruned on the next write
        drop(list_rx);
        store.insert(&theft).unwrap();
        assert_eq!(store.subscription_count(), 0);
    }
}

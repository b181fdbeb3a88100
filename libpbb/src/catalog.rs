use std::path::PathBuf;

use chrono::NaiveDateTime;
use eyre::Result;
use rusqlite::{Connection, params};

use crate::hash::ObjectHash;

const CREATE_SNAPSHOTS: &str = "
    CREATE TABLE IF NOT EXISTS snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        hash TEXT NOT NULL,
        branch TEXT NOT NULL,
        label TEXT,
        message TEXT,
        user TEXT,
        timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP NOT NULL
    );
";

const INSERT_SNAPSHOT: &str = "
    INSERT INTO snapshots (hash, branch, label, message, user)
    VALUES (?1, ?2, ?3, ?4, ?5)
";

const SELECT_SNAPSHOTS: &str = "
    SELECT id, hash, branch, label, message, user, timestamp
    FROM snapshots
    ORDER BY id
";

/// One row of the snapshot log.
#[derive(Clone, Debug)]
pub struct SnapshotRow {
    pub id: i64,
    pub hash: String,
    pub branch: String,
    pub label: String,
    pub message: String,
    pub user: String,
    pub timestamp: NaiveDateTime
}

/// The append-only log of snapshots, backed by a small sqlite database.
///
/// Rows are only ever inserted, never updated. Every operation opens its
/// own connection and releases it on return; the repository is
/// single-writer by design.
#[derive(Debug)]
pub struct SnapshotCatalog {
    db_path: PathBuf
}

impl SnapshotCatalog {
    pub fn new(db_path: impl Into<PathBuf>) -> SnapshotCatalog {
        SnapshotCatalog {
            db_path: db_path.into()
        }
    }

    /// Create the schema if it is not already present.
    pub fn init(&self) -> Result<()> {
        let connection = Connection::open(&self.db_path)?;

        connection.execute(CREATE_SNAPSHOTS, [])?;

        Ok(())
    }

    /// Append a row. The id is assigned by sqlite and the timestamp is the
    /// wall clock at insertion.
    pub fn insert(&self, hash: ObjectHash, branch: &str, label: &str, message: &str, user: &str) -> Result<()> {
        let connection = Connection::open(&self.db_path)?;

        connection.execute(
            INSERT_SNAPSHOT,
            params![hash.full(), branch, label, message, user]
        )?;

        Ok(())
    }

    /// All rows, in ascending id order.
    pub fn list(&self) -> Result<Vec<SnapshotRow>> {
        let connection = Connection::open(&self.db_path)?;

        let mut statement = connection.prepare(SELECT_SNAPSHOTS)?;

        let rows = statement.query_map([], |row| {
            Ok(SnapshotRow {
                id: row.get(0)?,
                hash: row.get(1)?,
                branch: row.get(2)?,
                label: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                message: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                user: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                timestamp: row.get(6)?
            })
        })?;

        let mut snapshots = vec![];

        for row in rows {
            snapshots.push(row?);
        }

        Ok(snapshots)
    }

    /// The hex hashes of every row, oldest first, duplicates included.
    pub fn hashes(&self) -> Result<Vec<String>> {
        let connection = Connection::open(&self.db_path)?;

        let mut statement = connection.prepare("SELECT hash FROM snapshots ORDER BY id")?;

        let rows = statement.query_map([], |row| row.get(0))?;

        let mut hashes = vec![];

        for row in rows {
            hashes.push(row?);
        }

        Ok(hashes)
    }
}

//! SQLite implementation of the Store trait.
//!
//! This is the persistent storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use swarmsync_core::{Address, Chunk};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::subscription::{spawn_push_feed, PushIndex, PushSubscription};
use crate::traits::{ModePut, PutResult, Store, SyncState};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations run on the blocking pool.
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    /// Bumped on every upload to wake live push feeds.
    trigger: Arc<watch::Sender<u64>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed. Chunks left pending
    /// by a previous run stay in the push index.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        let (trigger, _) = watch::channel(0);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            trigger: Arc::new(trigger),
        }
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        with_conn(Arc::clone(&self.conn), f).await
    }
}

/// Run `f` against the connection on the blocking pool.
async fn with_conn<F, T>(conn: Arc<Mutex<Connection>>, f: F) -> Result<T>
where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = conn
            .lock()
            .map_err(|e| StoreError::Task(format!("connection mutex poisoned: {}", e)))?;
        f(&mut conn)
    })
    .await
    .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
}

fn row_to_chunk(address: Vec<u8>, data: Vec<u8>) -> Result<Chunk> {
    let address = Address::try_from(address.as_slice())?;
    Ok(Chunk::new(address, data)?)
}

#[async_trait]
impl Store for SqliteStore {
    async fn put(&self, mode: ModePut, chunk: &Chunk) -> Result<PutResult> {
        let chunk = chunk.clone();

        let result = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;

                let state = match mode {
                    ModePut::Upload => SyncState::Pending,
                    ModePut::Sync => SyncState::Received,
                };

                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO chunks (address, data, state, stored_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        chunk.address().as_bytes().as_slice(),
                        chunk.data().as_ref(),
                        state.to_i64(),
                        now_millis(),
                    ],
                )?;

                if inserted == 0 {
                    return Ok(PutResult::AlreadyExists);
                }

                if mode == ModePut::Upload {
                    tx.execute(
                        "INSERT INTO push_index (address) VALUES (?1)",
                        params![chunk.address().as_bytes().as_slice()],
                    )?;
                }

                tx.commit()?;
                Ok(PutResult::Inserted)
            })
            .await?;

        if result == PutResult::Inserted && mode == ModePut::Upload {
            self.trigger.send_modify(|v| *v = v.wrapping_add(1));
        }

        Ok(result)
    }

    async fn get(&self, address: &Address) -> Result<Option<Chunk>> {
        let address = *address;

        self.with_conn(move |conn| {
            let row: Option<(Vec<u8>, Vec<u8>)> = conn
                .query_row(
                    "SELECT address, data FROM chunks WHERE address = ?1",
                    params![address.as_bytes().as_slice()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            row.map(|(address, data)| row_to_chunk(address, data))
                .transpose()
        })
        .await
    }

    async fn has(&self, address: &Address) -> Result<bool> {
        let address = *address;

        self.with_conn(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM chunks WHERE address = ?1)",
                params![address.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn set_synced(&self, address: &Address) -> Result<()> {
        let address = *address;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let updated = tx.execute(
                "UPDATE chunks SET state = ?1 WHERE address = ?2",
                params![SyncState::Synced.to_i64(), address.as_bytes().as_slice()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(address));
            }

            tx.execute(
                "DELETE FROM push_index WHERE address = ?1",
                params![address.as_bytes().as_slice()],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn sync_state(&self, address: &Address) -> Result<Option<SyncState>> {
        let address = *address;

        self.with_conn(move |conn| {
            let state: Option<i64> = conn
                .query_row(
                    "SELECT state FROM chunks WHERE address = ?1",
                    params![address.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            state
                .map(|v| {
                    SyncState::from_i64(v)
                        .ok_or_else(|| StoreError::InvalidData(format!("unknown sync state {}", v)))
                })
                .transpose()
        })
        .await
    }

    async fn pending_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM push_index", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn subscribe_push(&self) -> Result<PushSubscription> {
        let index = SqlitePushIndex {
            conn: Arc::clone(&self.conn),
        };
        Ok(spawn_push_feed(index, self.trigger.subscribe()))
    }
}

struct SqlitePushIndex {
    conn: Arc<Mutex<Connection>>,
}

#[async_trait]
impl PushIndex for SqlitePushIndex {
    async fn next_pending(&self, after: Option<u64>) -> Result<Option<(u64, Chunk)>> {
        // AUTOINCREMENT sequences start at 1.
        let after = after.map(|seq| seq as i64).unwrap_or(0);

        with_conn(Arc::clone(&self.conn), move |conn| {
            let row: Option<(i64, Vec<u8>, Vec<u8>)> = conn
                .query_row(
                    "SELECT p.seq, c.address, c.data
                     FROM push_index p JOIN chunks c ON c.address = p.address
                     WHERE p.seq > ?1
                     ORDER BY p.seq
                     LIMIT 1",
                    params![after],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            row.map(|(seq, address, data)| -> Result<(u64, Chunk)> {
                Ok((seq as u64, row_to_chunk(address, data)?))
            })
            .transpose()
        })
        .await
    }
}

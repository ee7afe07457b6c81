pub mod repository;
pub mod thresholds;

use std::path::{Path, PathBuf};

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

pub use thresholds::{MemoryThresholdStore, ThresholdStore};

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_initial.sql"))])
}

/// Settings database backed by a single `tokio_rusqlite` connection.
///
/// Only the small `app_config` table lives here, so every read and write goes
/// through the same background connection thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// `~/.flowdash/flowdash.db`, creating the directory if needed.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".flowdash");
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join("flowdash.db"))
    }

    /// Open the database at the default path.
    pub async fn open() -> Result<Self> {
        Self::open_at(Self::default_path()?).await
    }

    /// Open the database at the given path.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Self {
            conn: tokio_rusqlite::Connection::open(&path).await?,
        };
        db.migrate().await?;
        log::debug!("Opened settings database at {}", path.display());
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self> {
        let db = Self {
            conn: tokio_rusqlite::Connection::open_in_memory().await?,
        };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        self.call(|conn| {
            conn.execute_batch("PRAGMA busy_timeout=5000;")?;
            migrations().to_latest(conn)?;
            Ok(())
        })
        .await
    }

    /// Run `function` on the connection thread.
    pub async fn call<F, R>(&self, function: F) -> Result<R>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        Ok(self.conn.call(function).await?)
    }
}

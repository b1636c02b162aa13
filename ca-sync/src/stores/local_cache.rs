//! JSON file cache
//!
//! One file per collection under the cache directory, named after the
//! storage keys the web client used (`ca_t`, `ca_s`, `ca_c`, `ca_o`, `ca_e`,
//! `contacted_statuses`).

use super::LocalCache;
use async_trait::async_trait;
use ca_common::{Error, LocalSnapshot, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TEACHERS_KEY: &str = "ca_t";
pub const SLOTS_KEY: &str = "ca_s";
pub const CONFIRMATIONS_KEY: &str = "ca_c";
pub const OVERRIDES_KEY: &str = "ca_o";
pub const EXPENSES_KEY: &str = "ca_e";
pub const CONTACTED_KEY: &str = "contacted_statuses";

const ALL_KEYS: [&str; 6] = [
    TEACHERS_KEY,
    SLOTS_KEY,
    CONFIRMATIONS_KEY,
    OVERRIDES_KEY,
    EXPENSES_KEY,
    CONTACTED_KEY,
];

/// Local cache backed by JSON files in one directory
pub struct JsonFileCache {
    dir: PathBuf,
}

impl JsonFileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    async fn read_entry<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Internal(format!("Malformed cache entry {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Write via a temp file and rename so a crash never leaves half a file
    async fn write_entry<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl LocalCache for JsonFileCache {
    async fn load(&self) -> Result<LocalSnapshot> {
        let mut local = LocalSnapshot::default();
        local.snapshot.teachers = self.read_entry(TEACHERS_KEY).await?;
        local.snapshot.slots = self.read_entry(SLOTS_KEY).await?;
        local.snapshot.confirmations = self.read_entry(CONFIRMATIONS_KEY).await?;
        local.snapshot.expenses = self.read_entry(EXPENSES_KEY).await?;
        local.overrides = self.read_entry(OVERRIDES_KEY).await?;
        local.contacted = self.read_entry(CONTACTED_KEY).await?;

        debug!(
            dir = %self.dir.display(),
            teachers = local.snapshot.teachers.len(),
            slots = local.snapshot.slots.len(),
            "Loaded local cache"
        );
        Ok(local)
    }

    async fn save(&self, local: &LocalSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        self.write_entry(TEACHERS_KEY, &local.snapshot.teachers).await?;
        self.write_entry(SLOTS_KEY, &local.snapshot.slots).await?;
        self.write_entry(CONFIRMATIONS_KEY, &local.snapshot.confirmations).await?;
        self.write_entry(OVERRIDES_KEY, &local.overrides).await?;
        self.write_entry(EXPENSES_KEY, &local.snapshot.expenses).await?;
        self.write_entry(CONTACTED_KEY, &local.contacted).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        for key in ALL_KEYS {
            match tokio::fs::remove_file(self.path_for(key)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
        debug!(dir = %self.dir.display(), "Cleared local cache");
        Ok(())
    }
}

use anyhow::Result;
use kaia_types::Kei;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const LAST_SUPPLY_CHECKPOINT_KEY: &[u8] = b"last_supply_checkpoint_number";

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupted record under key {0}")]
    Corrupted(String),
    #[error("Storage is read-only")]
    ReadOnly,
}

/// Accumulated supply totals up to and including a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyCheckpoint {
    #[serde(with = "decimal")]
    pub minted: Kei,
    #[serde(with = "decimal")]
    pub burnt_fee: Kei,
}

impl SupplyCheckpoint {
    pub fn new(minted: Kei, burnt_fee: Kei) -> Self {
        Self { minted, burnt_fee }
    }
}

/// Amounts are persisted as decimal strings so readers without 128-bit
/// integer support can decode them.
mod decimal {
    use kaia_types::Kei;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Kei, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Kei, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Persistence of supply checkpoints.
///
/// One record per checkpoint block plus a single pointer to the highest
/// persisted checkpoint number.
pub trait SupplyStore: Send + Sync {
    fn read_supply_checkpoint(&self, num: u64) -> Result<Option<SupplyCheckpoint>>;
    fn write_supply_checkpoint(&self, num: u64, checkpoint: &SupplyCheckpoint) -> Result<()>;
    fn read_last_supply_checkpoint_number(&self) -> Result<Option<u64>>;
    fn write_last_supply_checkpoint_number(&self, num: u64) -> Result<()>;
}

/// Sled-backed implementation
pub struct SledStorage {
    db: Db,
    checkpoints: Tree,
    metadata: Tree,
}

impl SledStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let checkpoints = db.open_tree("supply_checkpoints")?;
        let metadata = db.open_tree("metadata")?;

        Ok(Self {
            db,
            checkpoints,
            metadata,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode_number(key: &str, bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::Corrupted(key.to_string()))?;
    Ok(u64::from_be_bytes(raw))
}

impl SupplyStore for SledStorage {
    fn read_supply_checkpoint(&self, num: u64) -> Result<Option<SupplyCheckpoint>> {
        match self.checkpoints.get(num.to_be_bytes())? {
            Some(v) => Ok(Some(
                serde_json::from_slice(&v).map_err(StorageError::Serialization)?,
            )),
            None => Ok(None),
        }
    }

    fn write_supply_checkpoint(&self, num: u64, checkpoint: &SupplyCheckpoint) -> Result<()> {
        let data = serde_json::to_vec(checkpoint).map_err(StorageError::Serialization)?;
        self.checkpoints.insert(num.to_be_bytes(), data)?;
        tracing::debug!(target: "storage", block = num, "wrote supply checkpoint");
        Ok(())
    }

    fn read_last_supply_checkpoint_number(&self) -> Result<Option<u64>> {
        self.metadata
            .get(LAST_SUPPLY_CHECKPOINT_KEY)?
            .map(|v| decode_number("last_supply_checkpoint_number", &v))
            .transpose()
    }

    fn write_last_supply_checkpoint_number(&self, num: u64) -> Result<()> {
        self.metadata
            .insert(LAST_SUPPLY_CHECKPOINT_KEY, num.to_be_bytes().to_vec())?;
        Ok(())
    }
}

/// In-memory testing backend
#[derive(Default)]
pub struct MemoryStorage {
    checkpoints: Arc<RwLock<BTreeMap<u64, SupplyCheckpoint>>>,
    last_checkpoint_number: Arc<RwLock<Option<u64>>>,
    read_only: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent write, as a full or failed disk would.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Persisted checkpoint numbers, ascending.
    pub fn checkpoint_numbers(&self) -> Vec<u64> {
        self.checkpoints.read().keys().copied().collect()
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::ReadOnly.into());
        }
        Ok(())
    }
}

impl SupplyStore for MemoryStorage {
    fn read_supply_checkpoint(&self, num: u64) -> Result<Option<SupplyCheckpoint>> {
        Ok(self.checkpoints.read().get(&num).copied())
    }

    fn write_supply_checkpoint(&self, num: u64, checkpoint: &SupplyCheckpoint) -> Result<()> {
        self.check_writable()?;
        self.checkpoints.write().insert(num, *checkpoint);
        Ok(())
    }

    fn read_last_supply_checkpoint_number(&self) -> Result<Option<u64>> {
        Ok(*self.last_checkpoint_number.read())
    }

    fn write_last_supply_checkpoint_number(&self, num: u64) -> Result<()> {
        self.check_writable()?;
        *self.last_checkpoint_number.write() = Some(num);
        Ok(())
    }
}

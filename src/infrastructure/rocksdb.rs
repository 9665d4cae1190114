use crate::domain::order::OrderRecord;
use crate::domain::ports::OrderSink;
use crate::error::{DeskError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Column Family holding the order log.
pub const CF_ORDERS: &str = "orders";

/// A persistent, append-only order log backed by RocksDB.
///
/// Records are keyed by a big-endian sequence number, so iteration returns
/// them in the order they were written. The sequence resumes after the last
/// stored key when an existing database is reopened.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbOrderSink {
    db: Arc<DB>,
    next_seq: Arc<AtomicU64>,
}

fn missing_cf() -> DeskError {
    DeskError::InternalError(Box::new(std::io::Error::other(
        "Orders column family not found",
    )))
}

impl RocksDbOrderSink {
    /// Opens or creates a RocksDB instance at the specified path, ensuring the
    /// "orders" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders])?;

        let next_seq = {
            let cf = db.cf_handle(CF_ORDERS).ok_or_else(missing_cf)?;
            match db.iterator_cf(&cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                        DeskError::InternalError(Box::new(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "Malformed order key",
                        )))
                    })?;
                    u64::from_be_bytes(bytes) + 1
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            next_seq: Arc::new(AtomicU64::new(next_seq)),
        })
    }

    /// Every stored record, oldest first.
    pub fn records(&self) -> Result<Vec<OrderRecord>> {
        let cf = self.db.cf_handle(CF_ORDERS).ok_or_else(missing_cf)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: OrderRecord = serde_json::from_slice(&value).map_err(|e| {
                DeskError::InternalError(Box::new(std::io::Error::other(format!(
                    "Failed to deserialize order: {}",
                    e
                ))))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

#[async_trait]
impl OrderSink for RocksDbOrderSink {
    async fn record(&self, order: OrderRecord) -> Result<()> {
        let cf = self.db.cf_handle(CF_ORDERS).ok_or_else(missing_cf)?;

        let key = self.next_seq.fetch_add(1, Ordering::SeqCst).to_be_bytes();
        let value = serde_json::to_vec(&order)?;
        self.db.put_cf(&cf, key, value)?;

        Ok(())
    }
}

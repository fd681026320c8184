use crate::domain::account::AccountId;
use crate::domain::order::{OrderId, OrderRecord};
use crate::domain::ports::OrderSink;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing terminal order records.
pub const CF_ORDERS: &str = "orders";

/// A persistent order record sink backed by RocksDB.
///
/// Records are keyed by order id and stored as JSON. Writes are serialized so
/// the existence check and the put cannot interleave with another writer.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbOrderSink {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbOrderSink {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "orders" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn orders_cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_ORDERS).ok_or_else(|| {
            EngineError::InternalError(Box::new(std::io::Error::other(
                "Orders column family not found",
            )))
        })
    }
}

#[async_trait]
impl OrderSink for RocksDbOrderSink {
    async fn record(&self, record: OrderRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.orders_cf()?;
        let key = record.order_id.as_str().as_bytes();

        if self.db.get_pinned_cf(cf, key)?.is_some() {
            return Err(EngineError::DuplicateOrder(record.order_id));
        }

        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<OrderRecord>> {
        let cf = self.orders_cf()?;
        match self.db.get_cf(cf, order_id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn records_for_customer(&self, customer_id: &AccountId) -> Result<Vec<OrderRecord>> {
        let cf = self.orders_cf()?;
        let mut records = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: OrderRecord = serde_json::from_slice(&value)?;
            if &record.customer_id == customer_id {
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.processed_at.cmp(&b.processed_at));
        Ok(records)
    }
}

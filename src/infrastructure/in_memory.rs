use crate::domain::account::{Account, AccountId};
use crate::domain::money::Money;
use crate::domain::order::{OrderId, OrderRecord};
use crate::domain::ports::{Catalog, CatalogView, Ledger, LedgerView, OrderSink};
use crate::domain::product::{Product, ProductId};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// A thread-safe in-memory product catalog.
///
/// Uses `Arc<RwLock<HashMap<ProductId, Product>>>`; clones share the same
/// products. Plain lookups take the read lock, `lock()` takes the write lock.
#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub async fn insert(&self, product: Product) -> Result<()> {
        product.validate()?;
        self.products.write().await.insert(product.id.clone(), product);
        Ok(())
    }

    pub async fn all(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        products
    }
}

struct InMemoryCatalogView<'a> {
    products: RwLockWriteGuard<'a, HashMap<ProductId, Product>>,
}

impl CatalogView for InMemoryCatalogView<'_> {
    fn find_by_id(&self, id: &ProductId) -> Option<Product> {
        self.products.get(id).cloned()
    }

    fn set_quantity(&mut self, id: &ProductId, quantity: u32) -> Result<()> {
        let product = self
            .products
            .get_mut(id)
            .ok_or_else(|| EngineError::ProductNotFound(id.clone()))?;
        product.quantity = quantity;
        Ok(())
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn lock<'a>(&'a self) -> Box<dyn CatalogView + 'a> {
        Box::new(InMemoryCatalogView {
            products: self.products.write().await,
        })
    }

    async fn find_by_id(&self, id: &ProductId) -> Option<Product> {
        self.products.read().await.get(id).cloned()
    }
}

/// A thread-safe in-memory ledger of account balances.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an account.
    pub async fn open_account(&self, account: Account) {
        self.accounts.write().await.insert(account.id.clone(), account);
    }

    pub async fn balance(&self, id: &AccountId) -> Option<Money> {
        self.accounts.read().await.get(id).map(|a| a.balance)
    }

    pub async fn all(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        accounts
    }
}

struct InMemoryLedgerView<'a> {
    accounts: RwLockWriteGuard<'a, HashMap<AccountId, Account>>,
}

impl InMemoryLedgerView<'_> {
    fn account_mut(&mut self, id: &AccountId) -> Result<&mut Account> {
        self.accounts
            .get_mut(id)
            .ok_or_else(|| EngineError::AccountNotFound(id.clone()))
    }
}

impl LedgerView for InMemoryLedgerView<'_> {
    fn find_account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.get(id).cloned()
    }

    fn withdraw(&mut self, id: &AccountId, amount: Money) -> Result<Money> {
        let account = self.account_mut(id)?;
        account.withdraw(amount)?;
        Ok(account.balance)
    }

    fn deposit(&mut self, id: &AccountId, amount: Money) -> Result<Money> {
        let account = self.account_mut(id)?;
        account.deposit(amount)?;
        Ok(account.balance)
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn lock<'a>(&'a self) -> Box<dyn LedgerView + 'a> {
        Box::new(InMemoryLedgerView {
            accounts: self.accounts.write().await,
        })
    }

    async fn find_account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.read().await.get(id).cloned()
    }
}

#[derive(Default)]
struct OrderLog {
    records: Vec<OrderRecord>,
    index: HashMap<OrderId, usize>,
}

/// An in-memory, append-only order record sink.
///
/// Records are kept in the order they were written.
#[derive(Default, Clone)]
pub struct InMemoryOrderSink {
    log: Arc<RwLock<OrderLog>>,
}

impl InMemoryOrderSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<OrderRecord> {
        self.log.read().await.records.clone()
    }

    pub async fn len(&self) -> usize {
        self.log.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OrderSink for InMemoryOrderSink {
    async fn record(&self, record: OrderRecord) -> Result<()> {
        let mut log = self.log.write().await;
        if log.index.contains_key(&record.order_id) {
            return Err(EngineError::DuplicateOrder(record.order_id));
        }
        let position = log.records.len();
        log.index.insert(record.order_id.clone(), position);
        log.records.push(record);
        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<OrderRecord>> {
        let log = self.log.read().await;
        Ok(log.index.get(order_id).map(|&i| log.records[i].clone()))
    }

    async fn records_for_customer(&self, customer_id: &AccountId) -> Result<Vec<OrderRecord>> {
        let log = self.log.read().await;
        Ok(log
            .records
            .iter()
            .filter(|r| &r.customer_id == customer_id)
            .cloned()
            .collect())
    }
}

//! Outbound ports the order engine depends on.
//!
//! `Catalog` and `Ledger` hand out exclusive views so that a check followed by
//! a write happens under one guard. When both are needed, the catalog is
//! always locked first.

use super::account::{Account, AccountId};
use super::money::Money;
use super::order::{OrderId, OrderRecord};
use super::product::{Product, ProductId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Exclusive access to the product catalog for the lifetime of the view.
pub trait CatalogView: Send {
    fn find_by_id(&self, id: &ProductId) -> Option<Product>;
    fn set_quantity(&mut self, id: &ProductId, quantity: u32) -> Result<()>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn lock<'a>(&'a self) -> Box<dyn CatalogView + 'a>;

    async fn find_by_id(&self, id: &ProductId) -> Option<Product> {
        self.lock().await.find_by_id(id)
    }

    async fn set_quantity(&self, id: &ProductId, quantity: u32) -> Result<()> {
        self.lock().await.set_quantity(id, quantity)
    }
}

/// Exclusive access to account balances for the lifetime of the view.
pub trait LedgerView: Send {
    fn find_account(&self, id: &AccountId) -> Option<Account>;
    /// Debits `amount`, returning the new balance.
    fn withdraw(&mut self, id: &AccountId, amount: Money) -> Result<Money>;
    /// Credits `amount`, returning the new balance.
    fn deposit(&mut self, id: &AccountId, amount: Money) -> Result<Money>;
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn lock<'a>(&'a self) -> Box<dyn LedgerView + 'a>;

    async fn find_account(&self, id: &AccountId) -> Option<Account> {
        self.lock().await.find_account(id)
    }

    async fn withdraw(&self, id: &AccountId, amount: Money) -> Result<Money> {
        self.lock().await.withdraw(id, amount)
    }

    async fn deposit(&self, id: &AccountId, amount: Money) -> Result<Money> {
        self.lock().await.deposit(id, amount)
    }
}

/// Append-only store of terminal orders.
#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Writes `record` once; a second record for the same order is rejected.
    async fn record(&self, record: OrderRecord) -> Result<()>;
    async fn get(&self, order_id: &OrderId) -> Result<Option<OrderRecord>>;
    async fn records_for_customer(&self, customer_id: &AccountId) -> Result<Vec<OrderRecord>>;
}

pub type CatalogRef = Arc<dyn Catalog>;
pub type LedgerRef = Arc<dyn Ledger>;
pub type OrderSinkRef = Arc<dyn OrderSink>;

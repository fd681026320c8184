#![allow(dead_code)]

use order_engine::domain::account::{Account, AccountId, AccountRole};
use order_engine::domain::money::Money;
use order_engine::domain::ports::{Catalog, CatalogRef, LedgerRef, OrderSinkRef};
use order_engine::domain::product::{Product, ProductId};
use order_engine::infrastructure::in_memory::{InMemoryCatalog, InMemoryLedger, InMemoryOrderSink};
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// In-memory catalog, ledger and order sink wired together.
#[derive(Clone, Default)]
pub struct Market {
    pub catalog: InMemoryCatalog,
    pub ledger: InMemoryLedger,
    pub sink: InMemoryOrderSink,
}

impl Market {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn product(&self, id: &str, seller: &str, price: Decimal, quantity: u32) -> Product {
        let product = Product::new(id, format!("Product {id}"), seller, Money::new(price), quantity)
            .expect("valid product");
        self.catalog.insert(product.clone()).await.expect("insert product");
        product
    }

    pub async fn customer(&self, id: &str, balance: Decimal) {
        self.ledger
            .open_account(Account::new(id, AccountRole::Customer, Money::new(balance)))
            .await;
    }

    pub async fn seller(&self, id: &str) {
        self.ledger
            .open_account(Account::new(id, AccountRole::Seller, Money::ZERO))
            .await;
    }

    pub async fn stock(&self, id: &str) -> u32 {
        self.catalog
            .find_by_id(&ProductId::new(id))
            .await
            .expect("product exists")
            .quantity
    }

    pub async fn balance(&self, id: &str) -> Money {
        self.ledger
            .balance(&AccountId::new(id))
            .await
            .expect("account exists")
    }

    pub fn catalog_ref(&self) -> CatalogRef {
        Arc::new(self.catalog.clone())
    }

    pub fn ledger_ref(&self) -> LedgerRef {
        Arc::new(self.ledger.clone())
    }

    pub fn sink_ref(&self) -> OrderSinkRef {
        Arc::new(self.sink.clone())
    }
}

/// Writes `lines` to a temporary CSV file.
pub fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    for line in lines {
        writeln!(file, "{line}").expect("write line");
    }
    file
}

use async_trait::async_trait;
use order_engine::application::OrderManager;
use order_engine::domain::account::{Account, AccountId, AccountRole};
use order_engine::domain::money::Money;
use order_engine::domain::order::{Order, OrderStatus};
use order_engine::domain::ports::{Catalog, Ledger, LedgerView, OrderSink};
use order_engine::error::{EngineError, Result};
use order_engine::infrastructure::in_memory::InMemoryLedger;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

mod common;
use common::Market;

async fn happy_market() -> Market {
    let market = Market::new();
    market.customer("alice", dec!(100)).await;
    market.seller("sam").await;
    market.product("a", "sam", dec!(10), 5).await;
    market
}

#[tokio::test]
async fn test_happy_path() {
    let market = happy_market().await;
    let manager = OrderManager::new(market.sink_ref());
    let lamp = market.product("a", "sam", dec!(10), 5).await;

    let handle = manager.submit(Order::direct("alice", &lamp, 2).unwrap()).unwrap();
    manager.start(market.catalog_ref(), market.ledger_ref()).await;
    let status = manager.wait_for_completion(&handle).await;
    manager.stop().await;

    assert_eq!(status, Some(OrderStatus::Completed));
    assert_eq!(market.balance("alice").await, Money::new(dec!(80)));
    assert_eq!(market.balance("sam").await, Money::new(dec!(20)));
    assert_eq!(market.stock("a").await, 3);

    let record = market.sink.get(handle.id()).await.unwrap().unwrap();
    assert_eq!(record.status, OrderStatus::Completed);
    assert_eq!(record.customer_id, AccountId::new("alice"));
    assert_eq!(record.items.len(), 1);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_state_unchanged() {
    let market = happy_market().await;
    let lamp = market.product("a", "sam", dec!(10), 1).await;
    let manager = OrderManager::new(market.sink_ref());

    let handle = manager.submit(Order::direct("alice", &lamp, 2).unwrap()).unwrap();
    manager.process_all_pending(market.catalog_ref(), market.ledger_ref()).await;

    assert_eq!(handle.status(), OrderStatus::FailedInsufficientStock);
    assert!(handle.is_processed());
    assert_eq!(market.stock("a").await, 1);
    assert_eq!(market.balance("alice").await, Money::new(dec!(100)));
}

#[tokio::test]
async fn test_insufficient_funds_leaves_state_unchanged() {
    let market = happy_market().await;
    market.customer("alice", dec!(5)).await;
    let lamp = market.product("a", "sam", dec!(10), 5).await;
    let manager = OrderManager::new(market.sink_ref());

    let handle = manager.submit(Order::direct("alice", &lamp, 1).unwrap()).unwrap();
    manager.process_all_pending(market.catalog_ref(), market.ledger_ref()).await;

    assert_eq!(handle.status(), OrderStatus::FailedInsufficientFunds);
    assert_eq!(market.stock("a").await, 5);
    assert_eq!(market.balance("alice").await, Money::new(dec!(5)));
    assert_eq!(market.balance("sam").await, Money::ZERO);
}

#[tokio::test]
async fn test_stock_sold_between_build_and_processing() {
    let market = happy_market().await;
    let lamp = market.product("a", "sam", dec!(10), 5).await;
    let manager = OrderManager::new(market.sink_ref());

    let handle = manager.submit(Order::direct("alice", &lamp, 3).unwrap()).unwrap();
    // Another session drains the stock while the order waits in the queue.
    market.catalog.set_quantity(&lamp.id, 2).await.unwrap();
    manager.process_all_pending(market.catalog_ref(), market.ledger_ref()).await;

    assert_eq!(handle.status(), OrderStatus::FailedInsufficientStock);
    assert_eq!(market.stock("a").await, 2);
}

#[tokio::test]
async fn test_multi_item_commit_is_all_or_nothing() {
    let market = happy_market().await;
    market.seller("sue").await;
    let lamp = market.product("a", "sam", dec!(10), 5).await;
    let rug = market.product("b", "sue", dec!(25), 1).await;
    let manager = OrderManager::new(market.sink_ref());

    // Fails on the second item: nothing may change.
    let mut too_many = Order::new("alice");
    too_many.add_item(&lamp, 1).unwrap();
    too_many.add_item(&rug, 2).unwrap();
    let failed = manager.submit(too_many).unwrap();

    let mut fits = Order::new("alice");
    fits.add_item(&lamp, 2).unwrap();
    fits.add_item(&rug, 1).unwrap();
    assert_eq!(fits.total_amount(), Money::new(dec!(45)));
    let ok = manager.submit(fits).unwrap();

    manager.process_all_pending(market.catalog_ref(), market.ledger_ref()).await;

    assert_eq!(failed.status(), OrderStatus::FailedInsufficientStock);
    assert_eq!(ok.status(), OrderStatus::Completed);
    assert_eq!(market.balance("alice").await, Money::new(dec!(55)));
    assert_eq!(market.balance("sam").await, Money::new(dec!(20)));
    assert_eq!(market.balance("sue").await, Money::new(dec!(25)));
    assert_eq!(market.stock("a").await, 3);
    assert_eq!(market.stock("b").await, 0);
}

#[tokio::test]
async fn test_unknown_customer_fails_without_side_effects() {
    let market = happy_market().await;
    let lamp = market.product("a", "sam", dec!(10), 5).await;
    let manager = OrderManager::new(market.sink_ref());

    let handle = manager.submit(Order::direct("nobody", &lamp, 1).unwrap()).unwrap();
    manager.process_all_pending(market.catalog_ref(), market.ledger_ref()).await;

    assert_eq!(handle.status(), OrderStatus::FailedCustomerNotFound);
    assert_eq!(market.stock("a").await, 5);
    assert_eq!(market.sink.len().await, 1);
}

#[tokio::test]
async fn test_missing_seller_is_reported_not_rolled_back() {
    let market = happy_market().await;
    let lamp = market.product("a", "sam", dec!(10), 5).await;
    let rug = market.product("b", "ghost", dec!(5), 5).await;
    let manager = OrderManager::new(market.sink_ref());

    let mut order = Order::new("alice");
    order.add_item(&lamp, 1).unwrap();
    order.add_item(&rug, 2).unwrap();
    let handle = manager.submit(order).unwrap();
    manager.process_all_pending(market.catalog_ref(), market.ledger_ref()).await;

    assert_eq!(handle.status(), OrderStatus::CompletedWithPaymentIssues);
    assert!(handle.status().is_success());
    assert_eq!(market.balance("alice").await, Money::new(dec!(80)));
    assert_eq!(market.balance("sam").await, Money::new(dec!(10)));
    assert_eq!(market.stock("a").await, 4);
    assert_eq!(market.stock("b").await, 3);
}

/// Ledger whose debits always fail, as if another session spent the money.
struct DebitFailingLedger {
    inner: InMemoryLedger,
}

struct DebitFailingView<'a> {
    inner: Box<dyn LedgerView + 'a>,
}

impl LedgerView for DebitFailingView<'_> {
    fn find_account(&self, id: &AccountId) -> Option<Account> {
        self.inner.find_account(id)
    }

    fn withdraw(&mut self, id: &AccountId, _amount: Money) -> Result<Money> {
        Err(EngineError::AccountNotFound(id.clone()))
    }

    fn deposit(&mut self, id: &AccountId, amount: Money) -> Result<Money> {
        self.inner.deposit(id, amount)
    }
}

#[async_trait]
impl Ledger for DebitFailingLedger {
    async fn lock<'a>(&'a self) -> Box<dyn LedgerView + 'a> {
        Box::new(DebitFailingView {
            inner: self.inner.lock().await,
        })
    }
}

#[tokio::test]
async fn test_failed_debit_touches_no_inventory() {
    let market = happy_market().await;
    let lamp = market.product("a", "sam", dec!(10), 5).await;
    let manager = OrderManager::new(market.sink_ref());
    let ledger = Arc::new(DebitFailingLedger {
        inner: market.ledger.clone(),
    });

    let handle = manager.submit(Order::direct("alice", &lamp, 2).unwrap()).unwrap();
    manager.process_all_pending(market.catalog_ref(), ledger).await;

    assert_eq!(handle.status(), OrderStatus::FailedPaymentError);
    assert_eq!(market.stock("a").await, 5);
    assert_eq!(market.balance("alice").await, Money::new(dec!(100)));
    assert_eq!(market.balance("sam").await, Money::ZERO);
}

#[tokio::test]
async fn test_totals_match_items() {
    let market = happy_market().await;
    let lamp = market.product("a", "sam", dec!(10.25), 5).await;
    let rug = market.product("b", "sam", dec!(0.10), 50).await;

    let mut order = Order::new("alice");
    order.add_item(&lamp, 3).unwrap();
    order.add_item(&rug, 7).unwrap();
    let expected: Money = order
        .items()
        .iter()
        .map(|item| item.line_total().unwrap())
        .sum();

    assert_eq!(order.total_amount(), expected);
    assert_eq!(order.total_amount(), Money::new(dec!(31.45)));
    assert_eq!(order.recompute_total().unwrap(), expected);
}

#[tokio::test]
async fn test_list_orders_for_customer_merges_queue_and_records() {
    let market = happy_market().await;
    market.customer("bob", dec!(100)).await;
    let lamp = market.product("a", "sam", dec!(10), 5).await;
    let manager = OrderManager::new(market.sink_ref());

    let first = manager.submit(Order::direct("alice", &lamp, 1).unwrap()).unwrap();
    manager.process_next(market.catalog_ref(), market.ledger_ref()).await;
    let second = manager.submit(Order::direct("alice", &lamp, 1).unwrap()).unwrap();
    manager.submit(Order::direct("bob", &lamp, 1).unwrap()).unwrap();

    let orders = manager
        .list_orders_for_customer(&AccountId::new("alice"))
        .await
        .unwrap();
    assert_eq!(orders.completed.len(), 1);
    assert_eq!(&orders.completed[0].order_id, first.id());
    assert_eq!(orders.pending.len(), 1);
    assert_eq!(orders.pending[0].id(), second.id());
    assert_eq!(manager.pending_count(), 2);
}

#[tokio::test]
async fn test_worker_survives_seller_overflow() {
    let market = Market::new();
    market.customer("alice", dec!(100)).await;
    market
        .ledger
        .open_account(Account::new("sam", AccountRole::Seller, Money::new(Decimal::MAX)))
        .await;
    market.seller("sue").await;
    let lamp = market.product("a", "sam", dec!(10), 5).await;
    let rug = market.product("b", "sue", dec!(25), 1).await;
    let manager = OrderManager::new(market.sink_ref());
    manager.start(market.catalog_ref(), market.ledger_ref()).await;

    let first = manager.submit(Order::direct("alice", &lamp, 1).unwrap()).unwrap();
    let second = manager.submit(Order::direct("alice", &rug, 1).unwrap()).unwrap();

    assert_eq!(
        manager.wait_for_completion(&first).await,
        Some(OrderStatus::CompletedWithPaymentIssues)
    );
    assert_eq!(
        manager.wait_for_completion(&second).await,
        Some(OrderStatus::Completed)
    );
    assert!(manager.is_running().await);
    manager.stop().await;

    assert_eq!(market.balance("alice").await, Money::new(dec!(65)));
    assert_eq!(market.balance("sam").await, Money::new(Decimal::MAX));
    assert_eq!(market.balance("sue").await, Money::new(dec!(25)));
    assert_eq!(market.stock("a").await, 4);
}

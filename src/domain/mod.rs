//! Marketplace domain: money, accounts, products, orders and the ports the
//! engine uses to reach the catalog, the ledger and the order record sink.

pub mod account;
pub mod money;
pub mod order;
pub mod ports;
pub mod product;

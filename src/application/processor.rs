use super::handle::OrderHandle;
use crate::domain::order::{Order, OrderRecord, OrderStatus};
use crate::domain::ports::{CatalogRef, CatalogView, LedgerRef, LedgerView, OrderSinkRef};
use crate::domain::product::ProductId;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Executes the validate-then-commit transaction for one order.
///
/// The catalog and ledger views are held from the first check to the last
/// write, so no other task can change stock or balances in between.
#[derive(Clone)]
pub struct OrderProcessor {
    catalog: CatalogRef,
    ledger: LedgerRef,
    sink: OrderSinkRef,
}

impl OrderProcessor {
    pub fn new(catalog: CatalogRef, ledger: LedgerRef, sink: OrderSinkRef) -> Self {
        Self {
            catalog,
            ledger,
            sink,
        }
    }

    /// Runs `handle` to a terminal status, records it and marks it processed.
    ///
    /// An order that is not `Queued` is left untouched and its current status
    /// is returned.
    pub async fn process(&self, handle: &OrderHandle) -> OrderStatus {
        let order = handle.order();
        if let Err(e) = handle.transition(OrderStatus::Processing) {
            warn!(order_id = %order.id(), error = %e, "Refusing to process order twice");
            return handle.status();
        }

        let status = self.execute(order).await;
        if let Err(e) = handle.transition(status) {
            error!(order_id = %order.id(), error = %e, "Failed to set terminal status");
        }

        if let Err(e) = self.sink.record(OrderRecord::new(order, status)).await {
            error!(order_id = %order.id(), error = %e, "Failed to record order");
        }
        handle.mark_processed();

        info!(
            order_id = %order.id(),
            customer = %order.customer_id(),
            total = %order.total_amount(),
            status = %status,
            "Order processed"
        );
        status
    }

    async fn execute(&self, order: &Order) -> OrderStatus {
        // Lock order: catalog, then ledger.
        let mut catalog = self.catalog.lock().await;
        let mut ledger = self.ledger.lock().await;

        if let Err(status) = Self::validate(order, &*catalog, &*ledger) {
            return status;
        }
        Self::commit(order, &mut *catalog, &mut *ledger)
    }

    fn validate<C, L>(order: &Order, catalog: &C, ledger: &L) -> Result<(), OrderStatus>
    where
        C: CatalogView + ?Sized,
        L: LedgerView + ?Sized,
    {
        let Some(customer) = ledger.find_account(order.customer_id()) else {
            debug!(order_id = %order.id(), customer = %order.customer_id(), "Customer not found");
            return Err(OrderStatus::FailedCustomerNotFound);
        };

        // The same product may appear on several lines.
        let mut requested: HashMap<&ProductId, u32> = HashMap::new();
        for item in order.items() {
            let total = requested.entry(&item.product_id).or_default();
            *total = total.saturating_add(item.quantity);

            let Some(product) = catalog.find_by_id(&item.product_id) else {
                debug!(order_id = %order.id(), product = %item.product_id, "Product not found");
                return Err(OrderStatus::FailedProductNotFound);
            };
            if !product.has_stock(*total) {
                debug!(
                    order_id = %order.id(),
                    product = %item.product_id,
                    requested = *total,
                    available = product.quantity,
                    "Insufficient stock"
                );
                return Err(OrderStatus::FailedInsufficientStock);
            }
        }

        if customer.balance < order.total_amount() {
            debug!(
                order_id = %order.id(),
                balance = %customer.balance,
                total = %order.total_amount(),
                "Insufficient funds"
            );
            return Err(OrderStatus::FailedInsufficientFunds);
        }
        Ok(())
    }

    fn commit<C, L>(order: &Order, catalog: &mut C, ledger: &mut L) -> OrderStatus
    where
        C: CatalogView + ?Sized,
        L: LedgerView + ?Sized,
    {
        if let Err(e) = ledger.withdraw(order.customer_id(), order.total_amount()) {
            warn!(order_id = %order.id(), error = %e, "Customer debit failed");
            return OrderStatus::FailedPaymentError;
        }

        let mut payment_issues = false;
        for item in order.items() {
            let decremented = catalog
                .find_by_id(&item.product_id)
                .and_then(|p| p.quantity.checked_sub(item.quantity))
                .map(|remaining| catalog.set_quantity(&item.product_id, remaining));
            match decremented {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    warn!(order_id = %order.id(), product = %item.product_id, error = %e, "Stock update failed");
                    payment_issues = true;
                }
                None => {
                    warn!(order_id = %order.id(), product = %item.product_id, "Stock vanished during commit");
                    payment_issues = true;
                }
            }

            let paid = item
                .line_total()
                .and_then(|amount| ledger.deposit(&item.seller_id, amount));
            if let Err(e) = paid {
                warn!(
                    order_id = %order.id(),
                    seller = %item.seller_id,
                    unit_price = %item.unit_price,
                    quantity = item.quantity,
                    error = %e,
                    "Seller payment failed"
                );
                payment_issues = true;
            }
        }

        if payment_issues {
            OrderStatus::CompletedWithPaymentIssues
        } else {
            OrderStatus::Completed
        }
    }
}

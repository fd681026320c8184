use crate::application::OrderHandle;
use crate::domain::account::AccountId;
use crate::domain::money::Money;
use crate::domain::order::{OrderId, OrderStatus};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Final state of one order as reported by the batch driver.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OrderOutcome {
    pub reference: String,
    pub customer: AccountId,
    pub total: Money,
    pub status: OrderStatus,
    pub order_id: OrderId,
}

impl OrderOutcome {
    /// Snapshot of `handle` under the caller's `reference`.
    pub fn from_handle(reference: impl Into<String>, handle: &OrderHandle) -> Self {
        let order = handle.order();
        Self {
            reference: reference.into(),
            customer: order.customer_id().clone(),
            total: order.total_amount().normalize(),
            status: handle.status(),
            order_id: order.id().clone(),
        }
    }
}

/// Writes order outcomes as CSV with a header row.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_outcomes(&mut self, outcomes: impl IntoIterator<Item = OrderOutcome>) -> Result<()> {
        for outcome in outcomes {
            self.writer.serialize(outcome)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

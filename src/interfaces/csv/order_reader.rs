use crate::domain::account::AccountId;
use crate::domain::product::ProductId;
use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use tracing::warn;

/// One `order,customer,product,quantity` row.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OrderLine {
    pub order: String,
    pub customer: AccountId,
    pub product: ProductId,
    pub quantity: u32,
}

/// All lines sharing an order reference, in file order.
#[derive(Debug, PartialEq, Clone)]
pub struct OrderRequest {
    pub reference: String,
    pub customer: AccountId,
    pub lines: Vec<(ProductId, u32)>,
}

/// Reads order lines from a CSV source.
pub struct OrderReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OrderReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes order lines.
    pub fn lines(self) -> impl Iterator<Item = Result<OrderLine>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EngineError::from))
    }
}

/// Groups lines by order reference, keeping first-appearance order.
///
/// A line whose customer differs from the first line of its order is dropped.
pub fn group_lines(lines: impl IntoIterator<Item = OrderLine>) -> Vec<OrderRequest> {
    let mut requests: Vec<OrderRequest> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for line in lines {
        match positions.get(&line.order) {
            Some(&i) if requests[i].customer == line.customer => {
                requests[i].lines.push((line.product, line.quantity));
            }
            Some(_) => {
                warn!(order = %line.order, customer = %line.customer, "Customer mismatch, line skipped");
            }
            None => {
                positions.insert(line.order.clone(), requests.len());
                requests.push(OrderRequest {
                    reference: line.order,
                    customer: line.customer,
                    lines: vec![(line.product, line.quantity)],
                });
            }
        }
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = "order, customer, product, quantity\no1, alice, a, 2\no1, alice, b, 1";
        let results: Vec<Result<OrderLine>> = OrderReader::new(data.as_bytes()).lines().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.customer, AccountId::new("alice"));
        assert_eq!(first.quantity, 2);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "order, customer, product, quantity\no1, alice, a, lots";
        let results: Vec<Result<OrderLine>> = OrderReader::new(data.as_bytes()).lines().collect();
        assert!(results[0].is_err());
    }

    #[test]
    fn test_group_lines_keeps_first_appearance() {
        let line = |order: &str, customer: &str, product: &str, quantity| OrderLine {
            order: order.to_string(),
            customer: AccountId::new(customer),
            product: ProductId::new(product),
            quantity,
        };
        let requests = group_lines(vec![
            line("o2", "bob", "a", 1),
            line("o1", "alice", "a", 2),
            line("o2", "bob", "b", 3),
            line("o1", "mallory", "c", 9),
        ]);

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].reference, "o2");
        assert_eq!(
            requests[0].lines,
            vec![(ProductId::new("a"), 1), (ProductId::new("b"), 3)]
        );
        assert_eq!(requests[1].lines, vec![(ProductId::new("a"), 2)]);
    }
}

use crate::domain::account::Account;
use crate::domain::product::Product;
use crate::error::{EngineError, Result};
use std::io::Read;

/// Reads catalog and ledger seed data from a CSV source.
///
/// Products use the header `id,name,seller,price,quantity`; accounts use
/// `id,role,balance`. Whitespace around fields is trimmed.
pub struct SeedReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> SeedReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes products, rejecting rows with a negative price.
    pub fn products(self) -> impl Iterator<Item = Result<Product>> {
        self.reader.into_deserialize().map(|result| {
            let product: Product = result.map_err(EngineError::from)?;
            product.validate()?;
            Ok(product)
        })
    }

    /// Lazily deserializes accounts, rejecting negative opening balances.
    pub fn accounts(self) -> impl Iterator<Item = Result<Account>> {
        self.reader.into_deserialize().map(|result| {
            let account: Account = result.map_err(EngineError::from)?;
            if account.balance.is_negative() {
                return Err(EngineError::ValidationError(format!(
                    "Account {} has a negative balance",
                    account.id
                )));
            }
            Ok(account)
        })
    }
}

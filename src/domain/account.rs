use crate::domain::money::Money;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a ledger account (customer, seller or admin).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Customer,
    Seller,
    Admin,
}

/// A balance-holding participant in the marketplace.
///
/// Customers are debited when their orders commit; sellers are credited with
/// the captured price of every item they sold.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub role: AccountRole,
    pub balance: Money,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, role: AccountRole, balance: Money) -> Self {
        Self {
            id: id.into(),
            role,
            balance,
        }
    }

    /// Returns the account id when this account may place orders.
    pub fn as_customer(&self) -> Option<&AccountId> {
        match self.role {
            AccountRole::Customer => Some(&self.id),
            AccountRole::Seller | AccountRole::Admin => None,
        }
    }

    /// Credits the balance.
    pub fn deposit(&mut self, amount: Money) -> Result<()> {
        if amount.is_negative() {
            return Err(EngineError::ValidationError(
                "Deposit amount must not be negative".to_string(),
            ));
        }
        self.balance = self.balance.checked_add(amount).ok_or_else(|| {
            EngineError::ValidationError(format!(
                "Deposit of {} would overflow the balance of {}",
                amount, self.id
            ))
        })?;
        Ok(())
    }

    /// Debits the balance if sufficient; otherwise leaves it untouched.
    pub fn withdraw(&mut self, amount: Money) -> Result<()> {
        if amount.is_negative() {
            return Err(EngineError::ValidationError(
                "Withdrawal amount must not be negative".to_string(),
            ));
        }
        match self.balance.checked_sub(amount) {
            Some(remaining) if self.balance >= amount => {
                self.balance = remaining;
                Ok(())
            }
            _ => Err(EngineError::InsufficientFunds {
                account: self.id.clone(),
                requested: amount,
                available: self.balance,
            }),
        }
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

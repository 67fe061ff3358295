/// Transaction types for TallyChain
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Integer token amount. Balances and deltas are always whole tokens.
pub type Amount = i64;

/// Net balance change per account. Ordered so the canonical text form is stable.
pub type Delta = BTreeMap<String, Amount>;

/// The single view validator and updater operate on. A genesis credit, a
/// transfer and a delta parsed back from storage all look the same through it.
pub trait AsDelta {
    fn delta(&self) -> &Delta;

    /// Sum of all entries, widened so it cannot overflow.
    fn delta_sum(&self) -> i128 {
        self.delta().values().map(|v| *v as i128).sum()
    }
}

impl AsDelta for Delta {
    fn delta(&self) -> &Delta {
        self
    }
}

/// One value transfer, stored as its delta mapping. Immutable once built;
/// equality is equality of the delta.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction {
    delta: Delta,
}

impl Transaction {
    /// Moves `amount` from `sender` to `receiver`: `{receiver: +amount, sender: -amount}`.
    ///
    /// Nothing is checked here. A self-transfer collapses to `{sender: -amount}`
    /// because the debit is inserted after the credit; the validator rejects it
    /// for any non-zero amount.
    pub fn transfer(sender: impl Into<String>, receiver: impl Into<String>, amount: Amount) -> Self {
        let mut delta = Delta::new();
        delta.insert(receiver.into(), amount);
        delta.insert(sender.into(), amount.wrapping_neg());
        Transaction { delta }
    }

    /// Pure credit with no sender. Only valid as the content of a genesis block.
    pub fn genesis(receiver: impl Into<String>, amount: Amount) -> Self {
        let mut delta = Delta::new();
        delta.insert(receiver.into(), amount);
        Transaction { delta }
    }

    /// Rebuilds a transaction from a delta mapping read back from storage.
    pub fn from_delta(delta: Delta) -> Self {
        Transaction { delta }
    }

    pub fn delta(&self) -> &Delta {
        &self.delta
    }

    pub fn into_delta(self) -> Delta {
        self.delta
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.delta.keys().map(String::as_str)
    }

    pub fn sum(&self) -> i128 {
        self.delta_sum()
    }
}

impl AsDelta for Transaction {
    fn delta(&self) -> &Delta {
        &self.delta
    }
}

/// Renders the compact JSON object, identical to `serde_json::to_string(self)`.
impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (account, amount)) in self.delta.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", serde_json::Value::String(account.clone()), amount)?;
        }
        f.write_str("}")
    }
}

/// Display adapter for an ordered transaction list: `[{..},{..}]`.
pub struct TransactionList<'a>(pub &'a [Transaction]);

impl fmt::Display for TransactionList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, tx) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", tx)?;
        }
        f.write_str("]")
    }
}

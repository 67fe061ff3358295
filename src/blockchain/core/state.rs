use crate::transaction::{AsDelta, Amount, TransactionRejection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Account balances derived by folding every transaction from genesis forward.
///
/// A `State` is a value: cloning is O(1) and [`State::apply`] copies the map
/// on write, so an older state stays valid after a newer one is derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    balances: Arc<BTreeMap<String, Amount>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `account`; accounts never seen hold 0.
    pub fn balance(&self, account: &str) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn contains(&self, account: &str) -> bool {
        self.balances.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Amount)> {
        self.balances.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total_supply(&self) -> i128 {
        self.balances.values().map(|v| *v as i128).sum()
    }

    /// Returns a new state with every entry of `tx` added to its account,
    /// creating accounts as needed. `self` is left untouched.
    ///
    /// This is an accumulator, not a gate: callers validate first. A balance
    /// that would leave the `Amount` range is clamped and logged.
    pub fn apply<D>(&self, tx: &D) -> State
    where
        D: AsDelta + ?Sized,
    {
        let mut next = self.clone();
        let balances = Arc::make_mut(&mut next.balances);
        for (account, change) in tx.delta() {
            let entry = balances.entry(account.clone()).or_insert(0);
            let current = *entry;
            *entry = current.checked_add(*change).unwrap_or_else(|| {
                warn!("Balance of {} overflowed applying change {}; clamping", account, change);
                current.saturating_add(*change)
            });
        }
        next
    }

    /// Like [`State::apply`], but refuses a delta that would push any balance
    /// out of the `Amount` range. Used for the unchecked genesis fold.
    pub fn checked_apply<D>(&self, tx: &D) -> Result<State, TransactionRejection>
    where
        D: AsDelta + ?Sized,
    {
        let mut next = self.clone();
        let balances = Arc::make_mut(&mut next.balances);
        for (account, change) in tx.delta() {
            let entry = balances.entry(account.clone()).or_insert(0);
            let current = *entry;
            *entry = current
                .checked_add(*change)
                .ok_or_else(|| TransactionRejection::BalanceOverflow {
                    account: account.clone(),
                })?;
        }
        Ok(next)
    }

    pub fn to_map(&self) -> BTreeMap<String, Amount> {
        self.balances.as_ref().clone()
    }
}

impl From<BTreeMap<String, Amount>> for State {
    fn from(balances: BTreeMap<String, Amount>) -> Self {
        State {
            balances: Arc::new(balances),
        }
    }
}

impl<'a> FromIterator<(&'a str, Amount)> for State {
    fn from_iter<I: IntoIterator<Item = (&'a str, Amount)>>(iter: I) -> Self {
        State::from(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        )
    }
}

/// Applies one transaction's delta to `state`, returning the new state.
pub fn update_state<D>(tx: &D, state: &State) -> State
where
    D: AsDelta + ?Sized,
{
    state.apply(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Delta, Transaction};

    #[test]
    fn test_apply_does_not_touch_input() {
        let before = State::new().apply(&Transaction::genesis("Venti", 1_000));
        let after = before.apply(&Transaction::transfer("Venti", "Alice", 100));

        assert_eq!(before.balance("Venti"), 1_000);
        assert!(!before.contains("Alice"));
        assert_eq!(after.balance("Venti"), 900);
        assert_eq!(after.balance("Alice"), 100);
    }

    #[test]
    fn test_missing_accounts_default_to_zero() {
        let state = State::new();
        assert_eq!(state.balance("ghost"), 0);
        let state = update_state(&Transaction::transfer("a", "b", 3), &state);
        assert_eq!(state.balance("a"), -3);
        assert_eq!(state.balance("b"), 3);
    }

    #[test]
    fn test_empty_delta_is_identity() {
        let state: State = [("Venti", 10)].into_iter().collect();
        assert_eq!(state.apply(&Delta::new()), state);
    }

    #[test]
    fn test_conserving_transfer_keeps_supply() {
        let state: State = [("Venti", 10), ("Alice", 5)].into_iter().collect();
        let next = state.apply(&Transaction::transfer("Alice", "Bob", 5));
        assert_eq!(next.total_supply(), state.total_supply());
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn test_checked_apply_refuses_overflow() {
        let state = State::new().apply(&Transaction::genesis("Venti", i64::MAX));
        let err = state.checked_apply(&Transaction::genesis("Venti", 1)).unwrap_err();
        assert_eq!(
            err,
            TransactionRejection::BalanceOverflow {
                account: "Venti".to_string()
            }
        );
        assert_eq!(state.balance("Venti"), i64::MAX);
        assert_eq!(
            state.checked_apply(&Transaction::transfer("Venti", "Alice", 5)).unwrap().balance("Alice"),
            5
        );
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let state: State = [("Venti", 999_999_999_999_900), ("Alice", 100)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"Alice":100,"Venti":999999999999900}"#);
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}

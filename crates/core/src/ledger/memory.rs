//! In-memory `LedgerStore` backend.
//!
//! All state lives behind one async mutex, so every operation is atomic
//! with respect to every other. Used by unit and integration tests and for
//! running the API without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use loyalty_shared::OrderNumber;

use crate::auth::{hash_password, reject_unknown_login, verify_password};
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::store::LedgerStore;
use crate::ledger::types::{Balance, Order, Withdrawal};
use crate::orders::{OrderStatus, StatusUpdate};

#[derive(Debug, Clone)]
struct OrderRow {
    owner: String,
    status: OrderStatus,
    accrual: Option<Decimal>,
    withdrawal: Option<Decimal>,
    uploaded_at: DateTime<Utc>,
    // insertion sequence; breaks timestamp ties for newest-first listings
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, String>,
    orders: HashMap<OrderNumber, OrderRow>,
    next_seq: u64,
}

impl State {
    fn require_user(&self, login: &str) -> LedgerResult<()> {
        if self.users.contains_key(login) {
            Ok(())
        } else {
            Err(LedgerError::UnknownUser(login.to_string()))
        }
    }

    fn insert(&mut self, number: OrderNumber, mut row: OrderRow) -> LedgerResult<()> {
        if self.orders.contains_key(&number) {
            return Err(LedgerError::DuplicateOrderNumber(number));
        }
        row.seq = self.next_seq;
        self.next_seq += 1;
        self.orders.insert(number, row);
        Ok(())
    }

    fn balance(&self, login: &str) -> Balance {
        let (accrued, withdrawn) = self
            .orders
            .values()
            .filter(|row| row.owner == login)
            .fold((Decimal::ZERO, Decimal::ZERO), |(accrued, withdrawn), row| {
                (
                    accrued + row.accrual.unwrap_or_default(),
                    withdrawn + row.withdrawal.unwrap_or_default(),
                )
            });
        Balance::from_totals(accrued, withdrawn)
    }

    fn owned_by<'a>(
        &'a self,
        login: &'a str,
    ) -> impl Iterator<Item = (&'a OrderNumber, &'a OrderRow)> + 'a {
        self.orders.iter().filter(move |(_, row)| row.owner == login)
    }
}

/// A `LedgerStore` held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn ping(&self) -> LedgerResult<()> {
        Ok(())
    }

    async fn is_login_available(&self, login: &str) -> LedgerResult<bool> {
        Ok(!self.state.lock().await.users.contains_key(login))
    }

    async fn register(&self, login: &str, password: &str) -> LedgerResult<()> {
        let hash = hash_password(password).map_err(|e| LedgerError::Internal(e.to_string()))?;

        let mut state = self.state.lock().await;
        if state.users.contains_key(login) {
            return Err(LedgerError::DuplicateLogin(login.to_string()));
        }
        state.users.insert(login.to_string(), hash);
        Ok(())
    }

    async fn authenticate(&self, login: &str, password: &str) -> LedgerResult<bool> {
        let hash = self.state.lock().await.users.get(login).cloned();
        match hash {
            Some(hash) => {
                verify_password(password, &hash).map_err(|e| LedgerError::Internal(e.to_string()))
            }
            None => Ok(reject_unknown_login(password)),
        }
    }

    async fn order_owner(&self, number: OrderNumber) -> LedgerResult<Option<String>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&number).map(|row| row.owner.clone()))
    }

    async fn upload_order(&self, login: &str, number: OrderNumber) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        state.require_user(login)?;
        state.insert(
            number,
            OrderRow {
                owner: login.to_string(),
                status: OrderStatus::New,
                accrual: None,
                withdrawal: None,
                uploaded_at: Utc::now(),
                seq: 0,
            },
        )
    }

    async fn orders(&self, login: &str) -> LedgerResult<Vec<Order>> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .owned_by(login)
            .filter(|(_, row)| row.withdrawal.is_none())
            .collect();
        rows.sort_by(|(_, a), (_, b)| b.seq.cmp(&a.seq));

        Ok(rows
            .into_iter()
            .map(|(number, row)| Order {
                number: *number,
                status: row.status,
                accrual: row.accrual,
                uploaded_at: row.uploaded_at,
            })
            .collect())
    }

    async fn pending_orders(&self) -> LedgerResult<Vec<OrderNumber>> {
        let state = self.state.lock().await;
        let mut pending: Vec<_> = state
            .orders
            .iter()
            .filter(|(_, row)| OrderStatus::PENDING.contains(&row.status))
            .map(|(number, row)| (row.seq, *number))
            .collect();
        pending.sort_unstable();
        Ok(pending.into_iter().map(|(_, number)| number).collect())
    }

    async fn update_order_status(
        &self,
        number: OrderNumber,
        update: StatusUpdate,
    ) -> LedgerResult<bool> {
        let mut state = self.state.lock().await;
        let Some(row) = state.orders.get_mut(&number) else {
            return Ok(false);
        };
        if !row.status.can_transition_to(update.status()) {
            return Ok(false);
        }
        row.status = update.status();
        row.accrual = update.accrual();
        Ok(true)
    }

    async fn balance(&self, login: &str) -> LedgerResult<Balance> {
        let state = self.state.lock().await;
        state.require_user(login)?;
        Ok(state.balance(login))
    }

    async fn withdraw(&self, login: &str, number: OrderNumber, sum: Decimal) -> LedgerResult<()> {
        if sum <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveSum(sum));
        }
        let mut state = self.state.lock().await;
        state.require_user(login)?;
        if state.orders.contains_key(&number) {
            return Err(LedgerError::DuplicateOrderNumber(number));
        }

        let balance = state.balance(login);
        if !balance.covers(sum) {
            return Err(LedgerError::InsufficientFunds {
                requested: sum,
                available: balance.current,
            });
        }

        state.insert(
            number,
            OrderRow {
                owner: login.to_string(),
                status: OrderStatus::Processed,
                accrual: None,
                withdrawal: Some(sum),
                uploaded_at: Utc::now(),
                seq: 0,
            },
        )
    }

    async fn withdrawals(&self, login: &str) -> LedgerResult<Vec<Withdrawal>> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .owned_by(login)
            .filter_map(|(number, row)| row.withdrawal.map(|sum| (number, row, sum)))
            .collect();
        rows.sort_by(|(_, a, _), (_, b, _)| b.seq.cmp(&a.seq));

        Ok(rows
            .into_iter()
            .map(|(number, row, sum)| Withdrawal {
                order: *number,
                sum,
                processed_at: row.uploaded_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn number(n: i64) -> OrderNumber {
        OrderNumber::new(n).unwrap()
    }

    async fn ledger_with(logins: &[&str]) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        for login in logins {
            ledger.register(login, "secret").await.unwrap();
        }
        ledger
    }

    async fn credit(ledger: &MemoryLedger, login: &str, n: i64, accrual: Decimal) {
        ledger.upload_order(login, number(n)).await.unwrap();
        let applied = ledger
            .update_order_status(number(n), StatusUpdate::processed(accrual).unwrap())
            .await
            .unwrap();
        assert!(applied);
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let ledger = ledger_with(&["alice"]).await;

        assert!(!ledger.is_login_available("alice").await.unwrap());
        assert!(ledger.is_login_available("bob").await.unwrap());
        assert!(ledger.authenticate("alice", "secret").await.unwrap());
        assert!(!ledger.authenticate("alice", "wrong").await.unwrap());
        assert!(!ledger.authenticate("bob", "secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_login_rejected() {
        let ledger = ledger_with(&["alice"]).await;
        let result = ledger.register("alice", "other").await;
        assert!(matches!(result, Err(LedgerError::DuplicateLogin(_))));
    }

    #[tokio::test]
    async fn test_concurrent_registration_has_one_winner() {
        let ledger = Arc::new(MemoryLedger::new());
        let attempts = (0..4).map(|_| {
            let ledger = Arc::clone(&ledger);
            async move { ledger.register("carol", "secret").await }
        });
        let results = futures::future::join_all(attempts).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, LedgerError::DuplicateLogin(_)))
        );
    }

    #[tokio::test]
    async fn test_upload_is_globally_unique() {
        let ledger = ledger_with(&["alice", "bob"]).await;
        ledger.upload_order("alice", number(79_927_398_713)).await.unwrap();

        let again = ledger.upload_order("alice", number(79_927_398_713)).await;
        assert!(matches!(again, Err(LedgerError::DuplicateOrderNumber(_))));
        let other = ledger.upload_order("bob", number(79_927_398_713)).await;
        assert!(matches!(other, Err(LedgerError::DuplicateOrderNumber(_))));

        assert_eq!(
            ledger.order_owner(number(79_927_398_713)).await.unwrap(),
            Some("alice".to_string())
        );
        assert_eq!(ledger.order_owner(number(18)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upload_requires_known_user() {
        let ledger = MemoryLedger::new();
        let result = ledger.upload_order("ghost", number(18)).await;
        assert!(matches!(result, Err(LedgerError::UnknownUser(_))));
    }

    #[tokio::test]
    async fn test_orders_listed_newest_first() {
        let ledger = ledger_with(&["alice"]).await;
        for n in [18, 26, 34] {
            ledger.upload_order("alice", number(n)).await.unwrap();
        }

        let listed: Vec<i64> = ledger
            .orders("alice")
            .await
            .unwrap()
            .iter()
            .map(|o| o.number.get())
            .collect();
        assert_eq!(listed, vec![34, 26, 18]);
    }

    #[tokio::test]
    async fn test_processed_update_then_invalid_is_noop() {
        let ledger = ledger_with(&["alice"]).await;
        credit(&ledger, "alice", 12_345_678_903, dec!(10.5)).await;

        let orders = ledger.orders("alice").await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Processed);
        assert_eq!(orders[0].accrual, Some(dec!(10.5)));

        let applied = ledger
            .update_order_status(number(12_345_678_903), StatusUpdate::invalid())
            .await
            .unwrap();
        assert!(!applied);

        let orders = ledger.orders("alice").await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Processed);
        assert_eq!(orders[0].accrual, Some(dec!(10.5)));
    }

    #[tokio::test]
    async fn test_processing_repeat_is_unchanged() {
        let ledger = ledger_with(&["alice"]).await;
        ledger.upload_order("alice", number(18)).await.unwrap();

        let first = ledger
            .update_order_status(number(18), StatusUpdate::processing())
            .await
            .unwrap();
        let second = ledger
            .update_order_status(number(18), StatusUpdate::processing())
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(ledger.pending_orders().await.unwrap(), vec![number(18)]);
    }

    #[tokio::test]
    async fn test_update_unknown_order_is_noop() {
        let ledger = MemoryLedger::new();
        let applied = ledger
            .update_order_status(number(18), StatusUpdate::invalid())
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_pending_excludes_terminal_and_withdrawals() {
        let ledger = ledger_with(&["alice"]).await;
        credit(&ledger, "alice", 18, dec!(100)).await;
        ledger.upload_order("alice", number(26)).await.unwrap();
        ledger.upload_order("alice", number(34)).await.unwrap();
        ledger
            .update_order_status(number(34), StatusUpdate::invalid())
            .await
            .unwrap();
        ledger.withdraw("alice", number(42), dec!(5)).await.unwrap();

        assert_eq!(ledger.pending_orders().await.unwrap(), vec![number(26)]);
    }

    #[tokio::test]
    async fn test_withdraw_and_balance() {
        let ledger = ledger_with(&["alice"]).await;
        credit(&ledger, "alice", 12_345_678_903, dec!(50.0)).await;

        ledger
            .withdraw("alice", number(98_765_432_109), dec!(20.0))
            .await
            .unwrap();
        let balance = ledger.balance("alice").await.unwrap();
        assert_eq!(balance.current, dec!(30.0));
        assert_eq!(balance.withdrawn, dec!(20.0));

        let result = ledger.withdraw("alice", number(18), dec!(40.0)).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { requested, available })
                if requested == dec!(40.0) && available == dec!(30.0)
        ));
        assert_eq!(ledger.balance("alice").await.unwrap(), balance);
        assert_eq!(ledger.order_owner(number(18)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_withdraw_rejects_used_number() {
        let ledger = ledger_with(&["alice", "bob"]).await;
        credit(&ledger, "alice", 18, dec!(100)).await;
        ledger.upload_order("bob", number(26)).await.unwrap();

        let result = ledger.withdraw("alice", number(26), dec!(1)).await;
        assert!(matches!(result, Err(LedgerError::DuplicateOrderNumber(_))));
        let result = ledger.withdraw("alice", number(18), dec!(1)).await;
        assert!(matches!(result, Err(LedgerError::DuplicateOrderNumber(_))));
    }

    #[tokio::test]
    async fn test_withdraw_rejects_non_positive_sum() {
        let ledger = ledger_with(&["alice"]).await;

        let negative = ledger.withdraw("alice", number(18), dec!(-25)).await;
        assert!(matches!(negative, Err(LedgerError::NonPositiveSum(_))));
        let zero = ledger.withdraw("alice", number(26), dec!(0)).await;
        assert!(matches!(zero, Err(LedgerError::NonPositiveSum(_))));

        let balance = ledger.balance("alice").await.unwrap();
        assert_eq!(balance.current, Decimal::ZERO);
        assert_eq!(balance.withdrawn, Decimal::ZERO);
        assert!(ledger.withdrawals("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_withdrawals_are_not_orders() {
        let ledger = ledger_with(&["alice"]).await;
        credit(&ledger, "alice", 18, dec!(100)).await;
        ledger.withdraw("alice", number(26), dec!(10)).await.unwrap();
        ledger.withdraw("alice", number(34), dec!(15)).await.unwrap();

        let orders = ledger.orders("alice").await.unwrap();
        assert_eq!(orders.len(), 1);

        let withdrawals = ledger.withdrawals("alice").await.unwrap();
        let listed: Vec<(i64, Decimal)> = withdrawals
            .iter()
            .map(|w| (w.order.get(), w.sum))
            .collect();
        assert_eq!(listed, vec![(34, dec!(15)), (26, dec!(10))]);
    }

    #[tokio::test]
    async fn test_concurrent_withdrawals_never_overdraw() {
        let ledger = Arc::new(ledger_with(&["alice"]).await);
        credit(&ledger, "alice", 18, dec!(100)).await;

        let attempts = (1..=10i64).map(|i| {
            let ledger = Arc::clone(&ledger);
            async move {
                ledger
                    .withdraw("alice", number(1_000 + i), dec!(30))
                    .await
            }
        });
        let results = futures::future::join_all(attempts).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
        let balance = ledger.balance("alice").await.unwrap();
        assert_eq!(balance.current, dec!(10));
        assert_eq!(balance.withdrawn, dec!(90));
    }
}

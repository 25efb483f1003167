//! Upload and withdrawal rules.
//!
//! The service validates input before it reaches the ledger. Order numbers
//! must pass the Luhn check, and an order uploaded by someone else is a
//! conflict rather than a duplicate. Sums are checked by the ledger itself.

use rust_decimal::Decimal;
use tracing::{debug, info};

use loyalty_shared::OrderNumber;

use crate::ledger::{LedgerError, LedgerStore};
use crate::orders::error::OrderError;

/// Result of submitting an order number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new order was created in status NEW.
    Accepted,
    /// The caller had already uploaded this number.
    AlreadyUploaded,
}

/// Stateless order rules applied on top of a `LedgerStore`.
pub struct OrderService;

impl OrderService {
    /// Uploads an order number for `login`.
    ///
    /// Repeating an upload is idempotent for the owner. If a concurrent
    /// upload wins the insert race, ownership is re-read to decide between
    /// `AlreadyUploaded` and a conflict.
    pub async fn submit(
        store: &dyn LedgerStore,
        login: &str,
        raw: &str,
    ) -> Result<SubmitOutcome, OrderError> {
        let number = OrderNumber::parse_checked(raw)?;

        if let Some(owner) = store.order_owner(number).await? {
            return Self::classify_existing(login, &owner, number);
        }

        match store.upload_order(login, number).await {
            Ok(()) => {
                info!(login, order = %number, "Order uploaded");
                Ok(SubmitOutcome::Accepted)
            }
            Err(LedgerError::DuplicateOrderNumber(_)) => {
                debug!(order = %number, "Lost upload race, re-reading owner");
                match store.order_owner(number).await? {
                    Some(owner) => Self::classify_existing(login, &owner, number),
                    None => Err(LedgerError::DuplicateOrderNumber(number).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Withdraws `sum` from `login`'s balance under order number `raw`.
    pub async fn withdraw(
        store: &dyn LedgerStore,
        login: &str,
        raw: &str,
        sum: Decimal,
    ) -> Result<OrderNumber, OrderError> {
        let number = OrderNumber::parse_checked(raw)?;

        store.withdraw(login, number, sum).await?;
        info!(login, order = %number, %sum, "Withdrawal recorded");
        Ok(number)
    }

    fn classify_existing(
        login: &str,
        owner: &str,
        number: OrderNumber,
    ) -> Result<SubmitOutcome, OrderError> {
        if owner == login {
            Ok(SubmitOutcome::AlreadyUploaded)
        } else {
            Err(OrderError::OwnedByAnotherUser(number))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::orders::StatusUpdate;
    use loyalty_shared::OrderNumberError;
    use rust_decimal_macros::dec;

    async fn ledger() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger.register("alice", "pw").await.unwrap();
        ledger.register("bob", "pw").await.unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_submit_valid_number() {
        let store = ledger().await;
        let outcome = OrderService::submit(&store, "alice", "79927398713").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Accepted);

        let again = OrderService::submit(&store, "alice", "79927398713").await.unwrap();
        assert_eq!(again, SubmitOutcome::AlreadyUploaded);
        assert_eq!(store.orders("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_checksum_failure() {
        let store = ledger().await;
        let result = OrderService::submit(&store, "alice", "79927398710").await;
        assert!(matches!(
            result,
            Err(OrderError::InvalidNumber(OrderNumberError::ChecksumMismatch(_)))
        ));
        assert!(store.orders("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_owned_by_another_user() {
        let store = ledger().await;
        OrderService::submit(&store, "alice", "12345678903").await.unwrap();
        let result = OrderService::submit(&store, "bob", "12345678903").await;
        assert!(matches!(result, Err(OrderError::OwnedByAnotherUser(_))));
    }

    #[tokio::test]
    async fn test_submit_garbage() {
        let store = ledger().await;
        let result = OrderService::submit(&store, "alice", "12ab").await;
        assert!(matches!(
            result,
            Err(OrderError::InvalidNumber(OrderNumberError::NotNumeric))
        ));
    }

    #[tokio::test]
    async fn test_withdraw_rules() {
        let store = ledger().await;
        OrderService::submit(&store, "alice", "12345678903").await.unwrap();
        store
            .update_order_status(
                OrderNumber::new(12_345_678_903).unwrap(),
                StatusUpdate::processed(dec!(50)).unwrap(),
            )
            .await
            .unwrap();

        let zero = OrderService::withdraw(&store, "alice", "2377225624", dec!(0)).await;
        assert!(matches!(
            zero,
            Err(OrderError::Ledger(LedgerError::NonPositiveSum(_)))
        ));

        let bad = OrderService::withdraw(&store, "alice", "98765432109", dec!(10)).await;
        assert!(matches!(
            bad,
            Err(OrderError::InvalidNumber(OrderNumberError::ChecksumMismatch(_)))
        ));

        let ok = OrderService::withdraw(&store, "alice", "2377225624", dec!(10))
            .await
            .unwrap();
        assert_eq!(ok.get(), 2_377_225_624);

        let reused = OrderService::withdraw(&store, "alice", "2377225624", dec!(1)).await;
        assert!(matches!(
            reused,
            Err(OrderError::Ledger(LedgerError::DuplicateOrderNumber(_)))
        ));

        let too_much = OrderService::withdraw(&store, "alice", "4561261212345467", dec!(41)).await;
        assert!(matches!(
            too_much,
            Err(OrderError::Ledger(LedgerError::InsufficientFunds { .. }))
        ));
    }
}

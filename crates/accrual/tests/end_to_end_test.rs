//! End-to-end accrual flow over the in-memory ledger.
//!
//! alice uploads an order, the daemon credits it, and withdrawals are
//! checked against the resulting balance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use loyalty_accrual::{
    AccrualDaemon, AccrualInfo, AccrualOracle, DaemonConfig, OracleError, OracleResponse,
};
use loyalty_core::ledger::{Balance, LedgerError, LedgerStore, MemoryLedger};
use loyalty_core::orders::{OracleStatus, OrderService, OrderStatus, SubmitOutcome};
use loyalty_shared::OrderNumber;

/// Oracle answering from a fixed table; unknown orders are not registered.
#[derive(Default)]
struct TableOracle {
    answers: Mutex<HashMap<OrderNumber, (OracleStatus, Option<Decimal>)>>,
}

impl TableOracle {
    fn set(&self, number: OrderNumber, status: OracleStatus, accrual: Option<Decimal>) {
        self.answers.lock().unwrap().insert(number, (status, accrual));
    }
}

#[async_trait]
impl AccrualOracle for TableOracle {
    async fn order_info(&self, number: OrderNumber) -> Result<OracleResponse, OracleError> {
        let answer = self.answers.lock().unwrap().get(&number).copied();
        Ok(match answer {
            Some((status, accrual)) => OracleResponse::Resolved(AccrualInfo {
                order: number,
                status,
                accrual,
            }),
            None => OracleResponse::NotRegistered,
        })
    }
}

fn fast_config() -> DaemonConfig {
    DaemonConfig {
        poll_interval: Duration::from_millis(10),
        no_content_delay: Duration::from_millis(10),
        default_retry_after: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn test_alice_earns_and_withdraws() {
    let ledger = Arc::new(MemoryLedger::new());
    let oracle = Arc::new(TableOracle::default());
    ledger.register("alice", "wonderland").await.unwrap();

    let outcome = OrderService::submit(ledger.as_ref(), "alice", "12345678903")
        .await
        .unwrap();
    assert_eq!(outcome, SubmitOutcome::Accepted);
    let earned = OrderNumber::new(12_345_678_903).unwrap();
    assert_eq!(
        ledger.orders("alice").await.unwrap()[0].status,
        OrderStatus::New
    );

    let daemon = AccrualDaemon::new(ledger.clone(), oracle.clone(), fast_config());
    let cancel = CancellationToken::new();

    // unknown to the oracle: stays NEW
    let report = daemon.run_cycle(&cancel).await.unwrap();
    assert_eq!(report.deferred, 1);

    oracle.set(earned, OracleStatus::Processing, None);
    daemon.run_cycle(&cancel).await.unwrap();
    assert_eq!(
        ledger.orders("alice").await.unwrap()[0].status,
        OrderStatus::Processing
    );

    oracle.set(earned, OracleStatus::Processed, Some(dec!(50.0)));
    let report = daemon.run_cycle(&cancel).await.unwrap();
    assert_eq!(report.applied, 1);

    let order = &ledger.orders("alice").await.unwrap()[0];
    assert_eq!(order.status, OrderStatus::Processed);
    assert_eq!(order.accrual, Some(dec!(50.0)));

    // withdrawal numbers go straight to the ledger here; the API adds the Luhn gate
    let debit = OrderNumber::new(98_765_432_109).unwrap();
    ledger.withdraw("alice", debit, dec!(20.0)).await.unwrap();
    let expected = Balance {
        current: dec!(30.0),
        withdrawn: dec!(20.0),
    };
    assert_eq!(ledger.balance("alice").await.unwrap(), expected);

    let again = OrderNumber::new(2_377_225_624).unwrap();
    let result = ledger.withdraw("alice", again, dec!(40.0)).await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
    assert_eq!(ledger.balance("alice").await.unwrap(), expected);

    let withdrawals = ledger.withdrawals("alice").await.unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].order, debit);
    assert_eq!(withdrawals[0].sum, dec!(20.0));
}

#[tokio::test]
async fn test_daemon_runs_until_cancelled() {
    let ledger = Arc::new(MemoryLedger::new());
    let oracle = Arc::new(TableOracle::default());
    ledger.register("alice", "wonderland").await.unwrap();
    OrderService::submit(ledger.as_ref(), "alice", "79927398713")
        .await
        .unwrap();
    oracle.set(
        OrderNumber::new(79_927_398_713).unwrap(),
        OracleStatus::Processed,
        Some(dec!(12.5)),
    );

    let daemon = AccrualDaemon::new(ledger.clone(), oracle, fast_config());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { daemon.start(cancel).await }
    });

    for _ in 0..200 {
        if ledger.pending_orders().await.unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(ledger.balance("alice").await.unwrap().current, dec!(12.5));
}

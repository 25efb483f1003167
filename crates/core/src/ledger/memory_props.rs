//! Property-based tests for the in-memory ledger.
//!
//! - Racing withdrawals never drive the balance negative
//! - Successful withdrawals never exceed the credited accruals

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use loyalty_shared::OrderNumber;

use super::memory::MemoryLedger;
use super::store::LedgerStore;
use crate::orders::StatusUpdate;

fn cents(max: i64) -> impl Strategy<Value = Decimal> {
    (1i64..max).prop_map(|c| Decimal::new(c, 2))
}

fn run_race(credits: Vec<Decimal>, requests: Vec<Decimal>) -> (Decimal, Decimal, Decimal) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .build()
        .unwrap();

    runtime.block_on(async move {
        let ledger = Arc::new(MemoryLedger::new());
        // registration hashes once; keep it out of the proptest hot loop
        ledger.register("alice", "pw").await.unwrap();

        let mut credited = Decimal::ZERO;
        for (i, amount) in (1i64..).zip(credits) {
            let number = OrderNumber::new(i).unwrap();
            ledger.upload_order("alice", number).await.unwrap();
            ledger
                .update_order_status(number, StatusUpdate::processed(amount).unwrap())
                .await
                .unwrap();
            credited += amount;
        }

        let handles: Vec<_> = (1_000i64..)
            .zip(requests)
            .map(|(n, sum)| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    let number = OrderNumber::new(n).unwrap();
                    ledger.withdraw("alice", number, sum).await.map(|()| sum)
                })
            })
            .collect();

        let mut withdrawn = Decimal::ZERO;
        for handle in handles {
            if let Ok(sum) = handle.await.unwrap() {
                withdrawn += sum;
            }
        }

        let balance = ledger.balance("alice").await.unwrap();
        assert_eq!(balance.withdrawn, withdrawn);
        (credited, withdrawn, balance.current)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_racing_withdrawals_never_overdraw(
        credits in prop::collection::vec(cents(10_000), 0..4),
        requests in prop::collection::vec(cents(10_000), 1..12),
    ) {
        let (credited, withdrawn, current) = run_race(credits, requests);
        prop_assert!(current >= Decimal::ZERO);
        prop_assert!(withdrawn <= credited);
        prop_assert_eq!(current, credited - withdrawn);
    }
}

//! Property-based tests for the order state machine.
//!
//! - Terminal statuses absorb every later update
//! - A status never moves back to NEW
//! - Only PROCESSED ever carries an accrual

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::status::{OracleStatus, OrderStatus, StatusUpdate};

fn oracle_status() -> impl Strategy<Value = OracleStatus> {
    prop_oneof![
        Just(OracleStatus::Registered),
        Just(OracleStatus::Processing),
        Just(OracleStatus::Invalid),
        Just(OracleStatus::Processed),
    ]
}

fn accrual() -> impl Strategy<Value = Option<Decimal>> {
    prop::option::of((0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2)))
}

/// Applies updates the way a store does: only legal transitions take effect.
fn replay(answers: &[(OracleStatus, Option<Decimal>)]) -> Vec<(OrderStatus, Option<Decimal>)> {
    let mut status = OrderStatus::New;
    let mut credited = None;
    let mut history = vec![(status, credited)];
    for (answer, amount) in answers {
        let update = StatusUpdate::from_oracle(*answer, *amount).unwrap();
        if status.can_transition_to(update.status()) {
            status = update.status();
            credited = update.accrual();
        }
        history.push((status, credited));
    }
    history
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_terminal_status_is_absorbing(
        answers in prop::collection::vec((oracle_status(), accrual()), 1..20)
    ) {
        let history = replay(&answers);
        if let Some(first_terminal) = history.iter().position(|(s, _)| s.is_terminal()) {
            let settled = history[first_terminal];
            for later in &history[first_terminal..] {
                prop_assert_eq!(*later, settled);
            }
        }
    }

    #[test]
    fn prop_never_returns_to_new(
        answers in prop::collection::vec((oracle_status(), accrual()), 1..20)
    ) {
        // every oracle answer targets a status reachable from NEW
        for (status, _) in replay(&answers).into_iter().skip(1) {
            prop_assert_ne!(status, OrderStatus::New);
        }
    }

    #[test]
    fn prop_accrual_only_on_processed(
        answers in prop::collection::vec((oracle_status(), accrual()), 1..20)
    ) {
        for (status, credited) in replay(&answers) {
            prop_assert_eq!(credited.is_some(), status == OrderStatus::Processed);
        }
    }
}

//! The core of the expense logic. It contains the algorithm that computes
//! the payments needed to settle debts.

use indexmap::IndexMap;
use log::Level::Debug;
use log::{debug, log_enabled, warn};

use crate::types::{Amount, Expense, Participant, ParticipantId, Settlement};

/// Balances and settlement amounts below this are treated as zero.
pub const EPSILON: Amount = 0.01;

/// Net balance of every participant. Positive means the participant must
/// receive money, negative means they owe money.
///
/// The map keeps insertion order: first every participant in the order
/// they are given, then any other id that only appears in the expenses.
pub type Balances = IndexMap<ParticipantId, Amount>;

/// Get a list of payments which settle debts computed from the list of
/// expenses in input.
///
/// The algorithm works as follows:
/// - process all expenses to get a list of people who owe money (debtors) and
///   a list of people who must receive money (creditors), both in balance order
/// - take the current debtor and the current creditor
/// - let the debtor give the smaller of debt (*d*) and credit (*c*) to the creditor
/// - move to the next creditor once *c* is (almost) zero, and to the next debtor
///   once *d* is (almost) zero
/// - stop when there are no more debtors/creditors
///
/// The solution is correct but not necessarily optimal, in the sense that it may
/// require more payments than needed: sorting by magnitude could save some of
/// them. The output order is part of the contract, so callers can show it as is.
///
/// We use floating-point math and never round the per-head shares: errors are
/// tolerated up to one cent, and only at the very end.
///
/// Without expenses or without participants there is nothing to settle.
pub fn compute_settlements(expenses: &[Expense], participants: &[Participant]) -> Vec<Settlement> {
    if expenses.is_empty() || participants.is_empty() {
        return vec![];
    }

    let balances = compute_balances(expenses, participants);

    let creditors: Vec<_> = balances
        .iter()
        .filter(|(_, a)| **a > EPSILON)
        .map(|(p, &a)| (p, a))
        .collect();
    let debtors: Vec<_> = balances
        .iter()
        .filter(|(_, a)| **a < -EPSILON)
        .map(|(p, &a)| (p, -a))
        .collect();

    if log_enabled!(Debug) {
        let sum: Amount = balances.values().sum();
        if sum.abs() > EPSILON {
            debug!("Total sum of balances should be 0, in reality it is {sum}");
            debug!("{:?}", &balances);
        }
    }

    settle(creditors, debtors)
}

/// Greedy sweep over the two lists. Both lists hold positive amounts.
fn settle(
    mut creditors: Vec<(&ParticipantId, Amount)>,
    mut debtors: Vec<(&ParticipantId, Amount)>,
) -> Vec<Settlement> {
    let mut result = vec![];
    let mut creditor_index = 0;
    let mut debtor_index = 0;

    while creditor_index < creditors.len() && debtor_index < debtors.len() {
        let (creditor, credit) = creditors[creditor_index];
        let (debtor, debt) = debtors[debtor_index];

        let amount = credit.min(debt);
        if amount > EPSILON {
            result.push(Settlement::new(debtor, creditor, amount));
        }

        creditors[creditor_index].1 -= amount;
        debtors[debtor_index].1 -= amount;

        if creditors[creditor_index].1 <= EPSILON {
            creditor_index += 1;
        }
        if debtors[debtor_index].1 <= EPSILON {
            debtor_index += 1;
        }
    }

    if creditor_index < creditors.len() {
        warn!(
            "We run out of debtors but we still have creditors: {:?}",
            &creditors[creditor_index..]
        );
    } else if debtor_index < debtors.len() {
        warn!(
            "We run out of creditors but we still have debtors: {:?}",
            &debtors[debtor_index..]
        );
    }

    result
}

/// The payer is credited the whole amount, then every member of the
/// cost-sharing set (payer included, if present) is debited an equal share.
///
/// Expenses without a cost-sharing set are skipped: they are rejected before
/// being saved, so seeing one here means the data was not validated.
pub fn compute_balances(expenses: &[Expense], participants: &[Participant]) -> Balances {
    let mut balances: Balances = participants.iter().map(|p| (p.id.clone(), 0.0)).collect();

    for expense in expenses {
        if expense.participants.is_empty() {
            warn!(
                "Skipping expense {} because nobody shares its cost",
                expense.id
            );
            continue;
        }
        compute_credit(expense, &mut balances);
        compute_debts(expense, &mut balances);
    }

    balances
}

fn compute_credit(expense: &Expense, balances: &mut Balances) {
    *balances.entry(expense.paid_by.clone()).or_insert(0.0) += expense.amount;
}

fn compute_debts(expense: &Expense, balances: &mut Balances) {
    let single_quota = expense.amount / expense.participants.len() as f64;
    for p in &expense.participants {
        *balances.entry(p.clone()).or_insert(0.0) -= single_quota;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("test")
    }

    fn abc() -> Vec<Participant> {
        vec![
            Participant::new("a", "Alice"),
            Participant::new("b", "Bob"),
            Participant::new("c", "Carol"),
        ]
    }

    fn make_expenses() -> Vec<Expense> {
        vec![
            Expense::new(1, 60.0, "a", &["a", "b", "c"], day()),
            Expense::new(2, 10.0, "b", &["b", "c"], day()),
            Expense::new(3, 33.0, "c", &["a", "b", "c", "d"], day()),
            Expense::new(4, 7.0, "d", &["a"], day()),
        ]
    }

    fn apply(balances: &Balances, settlements: &[Settlement]) -> Balances {
        let mut balances = balances.clone();
        for s in settlements {
            *balances.get_mut(&s.to).expect("test") -= s.amount;
            *balances.get_mut(&s.from).expect("test") += s.amount;
        }
        balances
    }

    #[test]
    fn test_compute_balances() {
        let balances = compute_balances(&make_expenses(), &abc());

        assert_eq!(balances.len(), 4);
        assert_abs_diff_eq!(balances["a"], 60.0 - 20.0 - 8.25 - 7.0);
        assert_abs_diff_eq!(balances["b"], 10.0 - 20.0 - 5.0 - 8.25);
        assert_abs_diff_eq!(balances["c"], 33.0 - 20.0 - 5.0 - 8.25);
        assert_abs_diff_eq!(balances["d"], 7.0 - 8.25);
    }

    #[test]
    fn test_balances_keep_participant_order() {
        let expenses = vec![Expense::new(1, 12.0, "z", &["c", "a"], day())];
        let balances = compute_balances(&expenses, &abc());
        let keys: Vec<_> = balances.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c", "z"]);
        assert_abs_diff_eq!(balances["b"], 0.0);
    }

    #[test]
    fn test_balances_sum_to_zero() {
        let expenses = vec![
            Expense::new(1, 10.0, "a", &["a", "b", "c"], day()),
            Expense::new(2, 0.07, "b", &["a", "c"], day()),
            Expense::new(3, 99.99, "c", &["a", "b", "c"], day()),
            Expense::new(4, 1.0 / 3.0, "a", &["b"], day()),
        ];
        let balances = compute_balances(&expenses, &abc());
        let sum: f64 = balances.values().sum();
        assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_three_way_split_with_participating_payer() {
        let expenses = vec![Expense::new(1, 30.0, "a", &["a", "b", "c"], day())];
        let settlements = compute_settlements(&expenses, &abc());

        assert_eq!(settlements.len(), 2);
        assert_eq!(settlements[0].from, "b");
        assert_eq!(settlements[0].to, "a");
        assert_abs_diff_eq!(settlements[0].amount, 10.0, epsilon = 1e-9);
        assert_eq!(settlements[1].from, "c");
        assert_eq!(settlements[1].to, "a");
        assert_abs_diff_eq!(settlements[1].amount, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_payer_outside_cost_sharing_set() {
        let participants = vec![
            Participant::new("p", "Payer"),
            Participant::new("a", "Alice"),
            Participant::new("b", "Bob"),
            Participant::new("c", "Carol"),
        ];
        let expenses = vec![Expense::new(1, 9.0, "p", &["a", "b", "c"], day())];

        let balances = compute_balances(&expenses, &participants);
        assert_abs_diff_eq!(balances["p"], 9.0);
        assert_abs_diff_eq!(balances["a"], -3.0);

        let settlements = compute_settlements(&expenses, &participants);
        assert_eq!(settlements.len(), 3);
        for (s, from) in settlements.iter().zip(["a", "b", "c"]) {
            assert_eq!(s.from, from);
            assert_eq!(s.to, "p");
            assert_abs_diff_eq!(s.amount, 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_greedy_order_follows_balances() {
        let settlements = compute_settlements(&make_expenses(), &abc());

        // a: +24.75, b: -23.25, c: -0.25, d: -1.25
        assert_eq!(settlements.len(), 3);
        assert_eq!(
            (settlements[0].from.as_str(), settlements[0].to.as_str()),
            ("b", "a")
        );
        assert_abs_diff_eq!(settlements[0].amount, 23.25, epsilon = 1e-9);
        assert_eq!(
            (settlements[1].from.as_str(), settlements[1].to.as_str()),
            ("c", "a")
        );
        assert_abs_diff_eq!(settlements[1].amount, 0.25, epsilon = 1e-9);
        assert_eq!(
            (settlements[2].from.as_str(), settlements[2].to.as_str()),
            ("d", "a")
        );
        assert_abs_diff_eq!(settlements[2].amount, 1.25, epsilon = 1e-9);
    }

    #[test]
    fn test_settlements_clear_all_balances() {
        let expenses = vec![
            Expense::new(1, 100.0, "a", &["a", "b", "c"], day()),
            Expense::new(2, 45.5, "b", &["a", "b"], day()),
            Expense::new(3, 12.34, "c", &["a", "b", "c"], day()),
            Expense::new(4, 80.0, "b", &["c"], day()),
        ];
        let balances = compute_balances(&expenses, &abc());
        let settlements = compute_settlements(&expenses, &abc());

        for (_, remaining) in apply(&balances, &settlements) {
            assert_abs_diff_eq!(remaining, 0.0, epsilon = EPSILON);
        }
        assert!(settlements.iter().all(|s| s.amount > EPSILON));
    }

    #[test]
    fn test_recomputation_is_stable() {
        let expenses = make_expenses();
        let first = compute_settlements(&expenses, &abc());
        let second = compute_settlements(&expenses, &abc());
        assert_eq!(first, second);
    }

    #[test]
    fn test_noise_below_one_cent_is_ignored() {
        let expenses = vec![
            Expense::new(1, 0.01, "a", &["a", "b", "c"], day()),
            Expense::new(2, 10.0, "b", &["b"], day()),
        ];
        assert!(compute_settlements(&expenses, &abc()).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(compute_settlements(&[], &[]).is_empty());
        assert!(compute_settlements(&[], &abc()).is_empty());
    }

    #[test]
    fn test_no_participants_means_no_settlements() {
        let expenses = vec![Expense::new(1, 30.0, "a", &["a", "b", "c"], day())];
        assert!(compute_settlements(&expenses, &[]).is_empty());
    }

    #[test]
    fn test_expense_without_sharers_is_skipped() {
        let expenses = vec![
            Expense::new(1, 30.0, "a", &[], day()),
            Expense::new(2, 20.0, "a", &["a", "b"], day()),
        ];
        let balances = compute_balances(&expenses, &abc());
        assert_abs_diff_eq!(balances["a"], 10.0);
        assert_abs_diff_eq!(balances["b"], -10.0);
        assert!(balances.values().all(|b| b.is_finite()));
    }
}

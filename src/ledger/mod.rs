pub mod period;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{LedgerConfig, PartialPeriodPolicy, RateTable};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{BillingStatus, Plan};

pub use period::add_periods;

/// a payment as seen by the calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

impl PaymentEntry {
    pub fn new(amount: Money, occurred_at: DateTime<Utc>) -> Self {
        Self { amount, occurred_at }
    }
}

/// billing position derived from a payment history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub plan: Plan,
    pub total_paid: Money,
    /// cost of complete periods only
    pub total_expected: Money,
    /// positive = credit, negative = debt
    pub balance: Money,
    pub next_due_amount: Money,
    pub next_due_date: Option<DateTime<Utc>>,
    pub complete_periods: u32,
    pub anchor_date: Option<DateTime<Utc>>,
    pub payment_count: usize,
    pub status: BillingStatus,
}

impl LedgerState {
    /// credit carried forward, zero when none
    pub fn credit(&self) -> Money {
        self.balance.max(Money::ZERO)
    }

    /// outstanding debt as a positive amount, zero when none
    pub fn debt(&self) -> Money {
        (-self.balance).max(Money::ZERO)
    }
}

impl BillingStatus {
    pub fn classify(payment_count: usize, complete_periods: u32, balance: Money) -> Self {
        if payment_count == 0 {
            BillingStatus::NoHistory
        } else if complete_periods == 0 {
            BillingStatus::PartialFirstPeriod
        } else if balance.is_zero() {
            BillingStatus::Current
        } else if balance.is_positive() {
            BillingStatus::InCredit
        } else {
            BillingStatus::InDebt
        }
    }
}

/// ledger calculator over a fixed rate table
///
/// every figure is recomputed from the payments handed in; no stored
/// balance is ever read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCalculator {
    rates: RateTable,
    policy: PartialPeriodPolicy,
}

impl LedgerCalculator {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            rates: config.rates,
            policy: config.partial_period_policy,
        }
    }

    /// standard rates, partial payments carried as debt
    pub fn standard() -> Self {
        Self {
            rates: RateTable::STANDARD,
            policy: PartialPeriodPolicy::CarryAsDebt,
        }
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// compute the ledger for a single-plan payment history
    ///
    /// payments may arrive in any order; they are stably sorted by
    /// `occurred_at` so equal timestamps keep their insertion order.
    pub fn compute(&self, plan: Plan, payments: &[PaymentEntry]) -> Result<LedgerState> {
        self.compute_segment(plan, payments, self.rates.first_period_total(plan))
    }

    /// compute a segment opened by a plan change
    ///
    /// the move-in fee was charged in the guest's first segment, so the
    /// first period here costs only the period rate.
    pub fn compute_after_plan_change(&self, plan: Plan, payments: &[PaymentEntry]) -> Result<LedgerState> {
        self.compute_segment(plan, payments, self.rates.period_rate(plan))
    }

    fn compute_segment(
        &self,
        plan: Plan,
        payments: &[PaymentEntry],
        first_period_total: Money,
    ) -> Result<LedgerState> {
        if let Some(bad) = payments.iter().find(|p| p.amount.is_negative()) {
            return Err(LedgerError::invalid_amount(bad.amount));
        }

        let period_rate = self.rates.period_rate(plan);

        if payments.is_empty() {
            return Ok(LedgerState {
                plan,
                total_paid: Money::ZERO,
                total_expected: Money::ZERO,
                balance: Money::ZERO,
                next_due_amount: period_rate,
                next_due_date: None,
                complete_periods: 0,
                anchor_date: None,
                payment_count: 0,
                status: BillingStatus::NoHistory,
            });
        }

        let mut ordered = payments.to_vec();
        ordered.sort_by_key(|p| p.occurred_at);

        let overflow = || LedgerError::InvalidAmount {
            amount: "payment total exceeds the representable range".to_string(),
        };
        let total_paid = Money::checked_sum(ordered.iter().map(|p| p.amount)).ok_or_else(overflow)?;

        let (complete_periods, total_expected) = if total_paid >= first_period_total {
            let additional = (total_paid - first_period_total).whole_units_of(period_rate);
            let periods = u32::try_from(additional + 1).map_err(|_| LedgerError::InvalidAmount {
                amount: total_paid.minor().to_string(),
            })?;
            let expected = period_rate
                .checked_mul(additional)
                .and_then(|later| later.checked_add(first_period_total))
                .ok_or_else(overflow)?;
            (periods, expected)
        } else {
            (0, Money::ZERO)
        };

        let balance = if complete_periods == 0 {
            match self.policy {
                PartialPeriodPolicy::CarryAsDebt => -total_paid,
                PartialPeriodPolicy::ShortfallOnly => total_paid - first_period_total,
            }
        } else {
            total_paid - total_expected
        };

        let next_due_amount = (period_rate - balance).max(Money::ZERO);

        let anchor = anchor_date(&ordered, first_period_total);
        let next_due_date = match anchor {
            Some(anchor) => Some(add_periods(anchor, plan, complete_periods.max(1))?),
            None => None,
        };

        Ok(LedgerState {
            plan,
            total_paid,
            total_expected,
            balance,
            next_due_amount,
            next_due_date,
            complete_periods,
            anchor_date: anchor,
            payment_count: ordered.len(),
            status: BillingStatus::classify(ordered.len(), complete_periods, balance),
        })
    }
}

impl Default for LedgerCalculator {
    fn default() -> Self {
        Self::standard()
    }
}

/// compute the ledger with the standard rate table
pub fn compute_ledger(plan: Plan, payments: &[PaymentEntry]) -> Result<LedgerState> {
    LedgerCalculator::standard().compute(plan, payments)
}

/// timestamp of the payment that brought the running total up to the
/// first-period total, or of the first payment when it was never reached
fn anchor_date(ordered: &[PaymentEntry], first_period_total: Money) -> Option<DateTime<Utc>> {
    let mut cumulative = Money::ZERO;
    for payment in ordered {
        cumulative += payment.amount;
        if cumulative >= first_period_total {
            return Some(payment.occurred_at);
        }
    }
    ordered.first().map(|p| p.occurred_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()
    }

    fn pay(minor: i64, at: DateTime<Utc>) -> PaymentEntry {
        PaymentEntry::new(Money::from_minor(minor), at)
    }

    #[test]
    fn test_no_history_baseline() {
        let state = compute_ledger(Plan::Weekly, &[]).unwrap();

        assert_eq!(state.total_paid, Money::ZERO);
        assert_eq!(state.total_expected, Money::ZERO);
        assert_eq!(state.balance, Money::ZERO);
        assert_eq!(state.next_due_amount, Money::from_minor(25_000));
        assert_eq!(state.next_due_date, None);
        assert_eq!(state.status, BillingStatus::NoHistory);

        let monthly = compute_ledger(Plan::Monthly, &[]).unwrap();
        assert_eq!(monthly.next_due_amount, Money::from_minor(80_000));
    }

    #[test]
    fn test_exact_first_period() {
        let state = compute_ledger(Plan::Weekly, &[pay(35_000, t0())]).unwrap();

        assert_eq!(state.total_expected, Money::from_minor(35_000));
        assert_eq!(state.balance, Money::ZERO);
        assert_eq!(state.next_due_amount, Money::from_minor(25_000));
        assert_eq!(state.complete_periods, 1);
        assert_eq!(state.next_due_date, Some(t0() + Duration::days(7)));
        assert_eq!(state.status, BillingStatus::Current);
    }

    #[test]
    fn test_partial_first_period_carried_as_debt() {
        let state = compute_ledger(Plan::Weekly, &[pay(20_000, t0())]).unwrap();

        assert_eq!(state.total_paid, Money::from_minor(20_000));
        assert_eq!(state.total_expected, Money::ZERO);
        assert_eq!(state.balance, Money::from_minor(-20_000));
        assert_eq!(state.next_due_amount, Money::from_minor(45_000));
        assert_eq!(state.complete_periods, 0);
        assert_eq!(state.anchor_date, Some(t0()));
        assert_eq!(state.next_due_date, Some(t0() + Duration::days(7)));
        assert_eq!(state.status, BillingStatus::PartialFirstPeriod);
        assert_eq!(state.debt(), Money::from_minor(20_000));
    }

    #[test]
    fn test_partial_first_period_shortfall_only() {
        let config = LedgerConfig::standard()
            .with_partial_period_policy(PartialPeriodPolicy::ShortfallOnly);
        let calculator = LedgerCalculator::new(&config);

        let state = calculator.compute(Plan::Weekly, &[pay(20_000, t0())]).unwrap();

        assert_eq!(state.total_expected, Money::ZERO);
        assert_eq!(state.balance, Money::from_minor(-15_000));
        assert_eq!(state.next_due_amount, Money::from_minor(40_000));
    }

    #[test]
    fn test_credit_roll_forward() {
        let state = compute_ledger(Plan::Weekly, &[pay(60_000, t0())]).unwrap();

        assert_eq!(state.complete_periods, 2);
        assert_eq!(state.total_expected, Money::from_minor(60_000));
        assert_eq!(state.balance, Money::ZERO);
        assert_eq!(state.next_due_date, Some(t0() + Duration::days(14)));
    }

    #[test]
    fn test_leftover_credit_reduces_next_charge() {
        // 350 first week + 100 toward the second
        let state = compute_ledger(Plan::Weekly, &[pay(45_000, t0())]).unwrap();

        assert_eq!(state.complete_periods, 1);
        assert_eq!(state.balance, Money::from_minor(10_000));
        assert_eq!(state.next_due_amount, Money::from_minor(15_000));
        assert_eq!(state.status, BillingStatus::InCredit);
        assert_eq!(state.credit(), Money::from_minor(10_000));
    }

    #[test]
    fn test_top_ups_anchor_on_crossing_payment() {
        let crossing = t0() + Duration::days(2);
        let payments = [
            pay(20_000, t0()),
            pay(15_000, crossing),
            pay(25_000, t0() + Duration::days(8)),
        ];
        let state = compute_ledger(Plan::Weekly, &payments).unwrap();

        assert_eq!(state.anchor_date, Some(crossing));
        assert_eq!(state.complete_periods, 2);
        assert_eq!(state.balance, Money::ZERO);
        assert_eq!(state.next_due_date, Some(crossing + Duration::days(14)));
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let crossing = t0() + Duration::days(1);
        let shuffled = [pay(15_000, crossing), pay(20_000, t0())];
        let ordered = [pay(20_000, t0()), pay(15_000, crossing)];

        let a = compute_ledger(Plan::Weekly, &shuffled).unwrap();
        let b = compute_ledger(Plan::Weekly, &ordered).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.anchor_date, Some(crossing));
    }

    #[test]
    fn test_monthly_month_end_clamp() {
        let jan_31 = Utc.with_ymd_and_hms(2023, 1, 31, 10, 0, 0).unwrap();
        let state = compute_ledger(Plan::Monthly, &[pay(90_000, jan_31)]).unwrap();
        assert_eq!(state.complete_periods, 1);
        assert_eq!(
            state.next_due_date,
            Some(Utc.with_ymd_and_hms(2023, 2, 28, 10, 0, 0).unwrap())
        );

        let jan_31_leap = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let leap = compute_ledger(Plan::Monthly, &[pay(90_000, jan_31_leap)]).unwrap();
        assert_eq!(
            leap.next_due_date,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_idempotent() {
        let payments = [pay(35_000, t0()), pay(30_000, t0() + Duration::days(7))];
        let first = compute_ledger(Plan::Weekly, &payments).unwrap();
        let second = compute_ledger(Plan::Weekly, &payments).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_appending_never_decreases_totals() {
        let amounts = [5_000, 20_000, 10_000, 25_000, 1, 49_999, 80_000];
        let mut history = Vec::new();
        let mut previous = compute_ledger(Plan::Weekly, &history).unwrap();

        for (day, amount) in amounts.iter().enumerate() {
            history.push(pay(*amount, t0() + Duration::days(day as i64)));
            let next = compute_ledger(Plan::Weekly, &history).unwrap();

            assert!(next.total_paid >= previous.total_paid);
            assert!(next.total_expected >= previous.total_expected);
            assert!(next.complete_periods >= previous.complete_periods);
            assert_eq!(next.total_paid, history.iter().map(|p| p.amount).sum::<Money>());
            previous = next;
        }
    }

    #[test]
    fn test_expected_is_whole_periods() {
        let state = compute_ledger(Plan::Monthly, &[pay(251_000, t0())]).unwrap();

        // 900 first month + 2 x 800, 10 left over
        assert_eq!(state.complete_periods, 3);
        assert_eq!(state.total_expected, Money::from_minor(250_000));
        assert_eq!(state.balance, Money::from_minor(1_000));
        assert_eq!(state.next_due_amount, Money::from_minor(79_000));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = compute_ledger(Plan::Weekly, &[pay(35_000, t0()), pay(-1, t0())]);
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_total_past_i64_range_rejected() {
        let result = compute_ledger(Plan::Weekly, &[pay(i64::MAX, t0()), pay(1, t0())]);
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_partial_payments_accumulate_as_debt() {
        let payments = [pay(20_000, t0()), pay(10_000, t0() + Duration::days(1))];
        let state = compute_ledger(Plan::Weekly, &payments).unwrap();

        // every payment before the first period is covered counts against the guest
        assert_eq!(state.total_paid, Money::from_minor(30_000));
        assert_eq!(state.balance, Money::from_minor(-30_000));
        assert_eq!(state.next_due_amount, Money::from_minor(55_000));
        assert_eq!(state.anchor_date, Some(t0()));
        assert_eq!(state.status, BillingStatus::PartialFirstPeriod);
    }

    #[test]
    fn test_plan_change_segment_skips_move_in_fee() {
        let calculator = LedgerCalculator::standard();
        let state = calculator
            .compute_after_plan_change(Plan::Monthly, &[pay(80_000, t0())])
            .unwrap();

        assert_eq!(state.complete_periods, 1);
        assert_eq!(state.total_expected, Money::from_minor(80_000));
        assert_eq!(state.balance, Money::ZERO);
        assert_eq!(state.next_due_amount, Money::from_minor(80_000));
        assert_eq!(state.status, BillingStatus::Current);
    }

    #[test]
    fn test_zero_rate_move_in_fee_config() {
        let rates = RateTable {
            move_in_fee: Money::ZERO,
            ..RateTable::STANDARD
        };
        let calculator = LedgerCalculator::new(&LedgerConfig::standard().with_rates(rates));
        let state = calculator.compute(Plan::Weekly, &[pay(25_000, t0())]).unwrap();

        assert_eq!(state.complete_periods, 1);
        assert_eq!(state.balance, Money::ZERO);
    }
}

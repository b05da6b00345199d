use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::Plan;

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub rates: RateTable,
    #[serde(default)]
    pub partial_period_policy: PartialPeriodPolicy,
    /// amounts below this are read as major units (dollars) during normalization
    #[serde(default = "default_display_threshold")]
    pub display_amount_threshold: Decimal,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub property: PropertyInfo,
}

/// per-plan rates and the one-time move-in fee, in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    pub weekly_rate: Money,
    pub monthly_rate: Money,
    pub move_in_fee: Money,
}

/// how payments are reported while the first period is still uncovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialPeriodPolicy {
    /// partial payments are carried as debt: balance is minus the amount paid
    ///
    /// the debt grows with each top-up until the first-period total is
    /// reached (20000 + 10000 weekly shows -30000 with 55000 due), then
    /// drops to the normal period balance.
    #[default]
    CarryAsDebt,
    /// balance is the shortfall against the first-period total
    ShortfallOnly,
}

/// payment reminder window, in whole days ahead of now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    pub lead_days_min: u32,
    pub lead_days_max: u32,
}

/// email verification code settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub code_ttl_seconds: u32,
    pub code_length: u32,
}

/// property details used in guest-facing messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    pub contact_phone: String,
    pub payment_url: String,
}

fn default_display_threshold() -> Decimal {
    dec!(1000)
}

impl RateTable {
    /// rates used by the property since launch
    pub const STANDARD: RateTable = RateTable {
        weekly_rate: Money::from_minor(25_000),
        monthly_rate: Money::from_minor(80_000),
        move_in_fee: Money::from_minor(10_000),
    };

    /// recurring charge for one period
    pub fn period_rate(&self, plan: Plan) -> Money {
        match plan {
            Plan::Weekly => self.weekly_rate,
            Plan::Monthly => self.monthly_rate,
        }
    }

    /// first period always carries the move-in fee
    pub fn first_period_total(&self, plan: Plan) -> Money {
        self.period_rate(plan) + self.move_in_fee
    }

    pub fn validate(&self) -> Result<()> {
        if !self.weekly_rate.is_positive() || !self.monthly_rate.is_positive() {
            return Err(LedgerError::InvalidConfiguration {
                message: "period rates must be positive".to_string(),
            });
        }
        if self.move_in_fee.is_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: "move-in fee cannot be negative".to_string(),
            });
        }
        for plan in [Plan::Weekly, Plan::Monthly] {
            if self.period_rate(plan).checked_add(self.move_in_fee).is_none() {
                return Err(LedgerError::InvalidConfiguration {
                    message: format!("{} first-period total overflows", plan),
                });
            }
        }
        Ok(())
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            lead_days_min: 1,
            lead_days_max: 2,
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_seconds: 600,
            code_length: 6,
        }
    }
}

impl VerificationConfig {
    pub fn code_ttl(&self) -> Duration {
        Duration::seconds(i64::from(self.code_ttl_seconds))
    }
}

impl Default for PropertyInfo {
    fn default() -> Self {
        Self {
            name: "Miami Motel".to_string(),
            contact_phone: "513-429-2251".to_string(),
            payment_url: "https://example.com/miami/apply".to_string(),
        }
    }
}

impl LedgerConfig {
    /// standard weekly/monthly rates with default policies
    pub fn standard() -> Self {
        Self {
            rates: RateTable::STANDARD,
            partial_period_policy: PartialPeriodPolicy::CarryAsDebt,
            display_amount_threshold: default_display_threshold(),
            reminders: ReminderConfig::default(),
            verification: VerificationConfig::default(),
            property: PropertyInfo::default(),
        }
    }

    pub fn with_partial_period_policy(mut self, policy: PartialPeriodPolicy) -> Self {
        self.partial_period_policy = policy;
        self
    }

    pub fn with_rates(mut self, rates: RateTable) -> Self {
        self.rates = rates;
        self
    }

    /// parse and validate a json configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.rates.validate()?;

        if self.display_amount_threshold.is_sign_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: "display amount threshold cannot be negative".to_string(),
            });
        }
        if self.reminders.lead_days_min > self.reminders.lead_days_max {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "reminder window is inverted: {}..{} days",
                    self.reminders.lead_days_min, self.reminders.lead_days_max
                ),
            });
        }
        if self.verification.code_length == 0 || self.verification.code_length > 9 {
            return Err(LedgerError::InvalidConfiguration {
                message: "verification code length must be between 1 and 9".to_string(),
            });
        }
        if self.verification.code_ttl_seconds == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "verification code ttl must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rate_table() {
        let rates = RateTable::STANDARD;
        assert_eq!(rates.period_rate(Plan::Weekly), Money::from_minor(25_000));
        assert_eq!(rates.period_rate(Plan::Monthly), Money::from_minor(80_000));
        assert_eq!(rates.first_period_total(Plan::Weekly), Money::from_minor(35_000));
        assert_eq!(rates.first_period_total(Plan::Monthly), Money::from_minor(90_000));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let json = r#"{
            "rates": { "weekly_rate": 30000, "monthly_rate": 95000, "move_in_fee": 5000 }
        }"#;
        let config = LedgerConfig::from_json(json).unwrap();

        assert_eq!(config.rates.first_period_total(Plan::Weekly), Money::from_minor(35_000));
        assert_eq!(config.partial_period_policy, PartialPeriodPolicy::CarryAsDebt);
        assert_eq!(config.display_amount_threshold, dec!(1000));
        assert_eq!(config.reminders, ReminderConfig::default());
        assert_eq!(config.verification.code_length, 6);
    }

    #[test]
    fn test_from_json_policy_override() {
        let json = r#"{
            "rates": { "weekly_rate": 25000, "monthly_rate": 80000, "move_in_fee": 10000 },
            "partial_period_policy": "shortfall_only"
        }"#;
        let config = LedgerConfig::from_json(json).unwrap();
        assert_eq!(config.partial_period_policy, PartialPeriodPolicy::ShortfallOnly);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let zero_rate = LedgerConfig::standard().with_rates(RateTable {
            weekly_rate: Money::ZERO,
            ..RateTable::STANDARD
        });
        assert!(zero_rate.validate().is_err());

        let mut inverted = LedgerConfig::standard();
        inverted.reminders = ReminderConfig {
            lead_days_min: 3,
            lead_days_max: 1,
        };
        assert!(inverted.validate().is_err());

        let bad_json = r#"{ "rates": { "weekly_rate": -1, "monthly_rate": 80000, "move_in_fee": 0 } }"#;
        assert!(matches!(
            LedgerConfig::from_json(bad_json),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            LedgerConfig::from_json("not json"),
            Err(LedgerError::Serialization(_))
        ));
    }
}

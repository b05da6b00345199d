use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LedgerError;

/// unique identifier for a guest
pub type GuestId = Uuid;

/// unique identifier for a stored payment
pub type PaymentId = Uuid;

/// billing plan; fixes the recurring rate and the period length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// 7-day periods
    Weekly,
    /// calendar-month periods
    Monthly,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Weekly => "weekly",
            Plan::Monthly => "monthly",
        }
    }

    /// line-item description used at checkout
    pub fn rate_description(&self) -> &'static str {
        match self {
            Plan::Weekly => "Weekly Room Rate",
            Plan::Monthly => "Monthly Room Rate",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Plan::Weekly),
            "monthly" => Ok(Plan::Monthly),
            _ => Err(LedgerError::InvalidPlan {
                plan: s.to_string(),
            }),
        }
    }
}

/// billing status derived from a guest's payment history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    /// no payments yet
    NoHistory,
    /// first period (with move-in fee) not yet covered
    PartialFirstPeriod,
    /// paid exactly through the last complete period
    Current,
    /// credit carried toward the next period
    InCredit,
    /// owes money against completed periods
    InDebt,
}

/// room occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Available,
    Occupied,
}

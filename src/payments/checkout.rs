use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RateTable;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::Plan;

use super::PaymentNotification;

/// checkout request from the application form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub email: String,
    pub name: String,
    pub plan: String,
    #[serde(default)]
    pub room_number: Option<String>,
    #[serde(default)]
    pub is_new_guest: bool,
}

impl CheckoutRequest {
    /// check required fields and resolve the plan
    pub fn validate(&self) -> Result<Plan> {
        if self.email.trim().is_empty() {
            return Err(LedgerError::MissingField { field: "email".to_string() });
        }
        if self.name.trim().is_empty() {
            return Err(LedgerError::MissingField { field: "name".to_string() });
        }
        self.plan.parse()
    }

    pub fn quote(&self, rates: &RateTable) -> Result<CheckoutQuote> {
        let plan = self.validate()?;
        Ok(CheckoutQuote::for_plan(plan, self.is_new_guest, rates))
    }

    /// metadata to attach to the provider session
    pub fn metadata(&self) -> Result<CheckoutMetadata> {
        let plan = self.validate()?;
        Ok(CheckoutMetadata {
            plan,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            is_new_guest: self.is_new_guest,
            room_number: self.room_number.clone().filter(|r| !r.trim().is_empty()),
        })
    }
}

/// price breakdown for a checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutQuote {
    pub plan: Plan,
    pub room_rate: Money,
    /// only charged on a guest's first checkout
    pub move_in_fee: Money,
    pub total: Money,
    pub description: String,
}

impl CheckoutQuote {
    pub fn for_plan(plan: Plan, is_new_guest: bool, rates: &RateTable) -> Self {
        let room_rate = rates.period_rate(plan);
        let move_in_fee = if is_new_guest { rates.move_in_fee } else { Money::ZERO };

        Self {
            plan,
            room_rate,
            move_in_fee,
            total: room_rate + move_in_fee,
            description: plan.rate_description().to_string(),
        }
    }
}

/// session metadata stored with the provider and read back on completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub plan: Plan,
    pub name: String,
    pub email: String,
    pub is_new_guest: bool,
    pub room_number: Option<String>,
}

impl CheckoutMetadata {
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("plan".to_string(), self.plan.to_string());
        map.insert("name".to_string(), self.name.clone());
        map.insert("email".to_string(), self.email.clone());
        map.insert("isNewGuest".to_string(), self.is_new_guest.to_string());
        if let Some(room) = &self.room_number {
            map.insert("roomNumber".to_string(), room.clone());
        }
        map
    }

    /// read metadata back; missing plan means weekly, missing name means "Guest"
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self> {
        let plan = match map.get("plan") {
            Some(plan) => plan.parse()?,
            None => Plan::Weekly,
        };
        let email = map
            .get("email")
            .filter(|e| !e.trim().is_empty())
            .cloned()
            .ok_or_else(|| LedgerError::MissingField { field: "email".to_string() })?;

        Ok(Self {
            plan,
            name: map
                .get("name")
                .filter(|n| !n.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| "Guest".to_string()),
            email,
            is_new_guest: map.get("isNewGuest").map(|v| v == "true").unwrap_or(false),
            room_number: map.get("roomNumber").filter(|r| !r.trim().is_empty()).cloned(),
        })
    }

    /// build the completion notice for a paid session
    pub fn into_notification(self, amount: Money, external_reference: String) -> PaymentNotification {
        PaymentNotification {
            amount,
            plan: self.plan,
            customer_email: self.email,
            customer_name: self.name,
            external_reference,
            is_first_payment: self.is_new_guest,
            room_number: self.room_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(plan: &str, is_new_guest: bool) -> CheckoutRequest {
        CheckoutRequest {
            email: "guest@example.com".to_string(),
            name: "Pat Doe".to_string(),
            plan: plan.to_string(),
            room_number: Some("7".to_string()),
            is_new_guest,
        }
    }

    #[test]
    fn test_quote_includes_move_in_fee_for_new_guest() {
        let quote = request("weekly", true).quote(&RateTable::STANDARD).unwrap();
        assert_eq!(quote.room_rate, Money::from_minor(25_000));
        assert_eq!(quote.move_in_fee, Money::from_minor(10_000));
        assert_eq!(quote.total, Money::from_minor(35_000));
        assert_eq!(quote.description, "Weekly Room Rate");

        let returning = request("monthly", false).quote(&RateTable::STANDARD).unwrap();
        assert_eq!(returning.move_in_fee, Money::ZERO);
        assert_eq!(returning.total, Money::from_minor(80_000));
    }

    #[test]
    fn test_request_validation() {
        assert!(matches!(
            request("yearly", true).validate(),
            Err(LedgerError::InvalidPlan { .. })
        ));

        let mut missing_name = request("weekly", true);
        missing_name.name = "  ".to_string();
        assert!(matches!(
            missing_name.validate(),
            Err(LedgerError::MissingField { field }) if field == "name"
        ));
    }

    #[test]
    fn test_metadata_map_round_trip_and_defaults() {
        let metadata = request("monthly", true).metadata().unwrap();
        let restored = CheckoutMetadata::from_map(&metadata.to_map()).unwrap();
        assert_eq!(restored, metadata);

        let mut sparse = BTreeMap::new();
        sparse.insert("email".to_string(), "x@example.com".to_string());
        let defaults = CheckoutMetadata::from_map(&sparse).unwrap();
        assert_eq!(defaults.plan, Plan::Weekly);
        assert_eq!(defaults.name, "Guest");
        assert!(!defaults.is_new_guest);

        assert!(CheckoutMetadata::from_map(&BTreeMap::new()).is_err());
    }

    #[test]
    fn test_into_notification() {
        let notification = request("weekly", true)
            .metadata()
            .unwrap()
            .into_notification(Money::from_minor(35_000), "cs_test_9".to_string());

        assert!(notification.is_first_payment);
        assert_eq!(notification.external_reference, "cs_test_9");
        assert!(notification.validate().is_ok());
    }
}

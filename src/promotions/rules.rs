// Rule value objects
//
// Plain data consumed by the validity checker and the calculator. Rows loaded
// from the database are converted into these before any rule is evaluated.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::promotions::types::{DiscountKind, OfferKind, RuleStatus};

/// Constraints shared by discount codes and pre-sale offers
///
/// All bounds are inclusive. `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConstraints {
    pub status: RuleStatus,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub min_order_amount: Option<Decimal>,
    pub max_order_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
    pub usage_count: i32,
}

impl RuleConstraints {
    /// Unrestricted, active constraints
    pub fn open() -> Self {
        Self {
            status: RuleStatus::Active,
            valid_from: None,
            valid_until: None,
            min_order_amount: None,
            max_order_amount: None,
            usage_limit: None,
            usage_limit_per_user: None,
            usage_count: 0,
        }
    }

    /// Status as seen at `now`
    ///
    /// An active rule whose window has closed reports `Expired`.
    pub fn effective_status(&self, now: DateTime<Utc>) -> RuleStatus {
        match (self.status, self.valid_until) {
            (RuleStatus::Active, Some(until)) if now > until => RuleStatus::Expired,
            (status, _) => status,
        }
    }

    /// Redemptions left before `usage_limit` is hit, `None` when unlimited
    pub fn remaining_uses(&self) -> Option<i32> {
        self.usage_limit
            .map(|limit| (limit - self.usage_count).max(0))
    }
}

impl Default for RuleConstraints {
    fn default() -> Self {
        Self::open()
    }
}

/// Discount code rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub kind: DiscountKind,
    pub value: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub constraints: RuleConstraints,
}

impl DiscountRule {
    pub fn new(kind: DiscountKind, value: Decimal) -> Self {
        Self {
            kind,
            value,
            max_discount_amount: None,
            constraints: RuleConstraints::open(),
        }
    }

    pub fn with_max_discount(mut self, cap: Decimal) -> Self {
        self.max_discount_amount = Some(cap);
        self
    }

    pub fn with_constraints(mut self, constraints: RuleConstraints) -> Self {
        self.constraints = constraints;
        self
    }
}

/// Pre-sale offer rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRule {
    pub kind: OfferKind,
    pub price: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub fixed_discount_amount: Option<Decimal>,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
    pub constraints: RuleConstraints,
}

impl OfferRule {
    pub fn new(kind: OfferKind) -> Self {
        Self {
            kind,
            price: None,
            discount_percentage: None,
            fixed_discount_amount: None,
            min_quantity: None,
            max_quantity: None,
            constraints: RuleConstraints::open(),
        }
    }
}

/// Inputs describing one attempted use of a rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedemptionContext {
    pub now: DateTime<Utc>,
    pub order_amount: Decimal,
    pub quantity: i32,
    /// Redemptions already made by the requesting user
    pub prior_user_usage: i32,
}

impl RedemptionContext {
    pub fn new(now: DateTime<Utc>, order_amount: Decimal) -> Self {
        Self {
            now,
            order_amount,
            quantity: 1,
            prior_user_usage: 0,
        }
    }

    pub fn with_quantity(mut self, quantity: i32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_prior_usage(mut self, prior_user_usage: i32) -> Self {
        self.prior_user_usage = prior_user_usage;
        self
    }
}

// Validity Checker
//
// Decides whether a discount code or pre-sale offer may be applied to an order.
// Checks run in a fixed order and the first failing check is reported.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::promotions::rules::{OfferRule, RedemptionContext, RuleConstraints};
use crate::promotions::types::RuleStatus;

/// Reason a rule cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    NotActive,
    NotYetStarted,
    Expired,
    BelowMinimumOrder,
    AboveMaximumOrder,
    UsageLimitReached,
    PerUserLimitReached,
    BelowMinimumQuantity,
    AboveMaximumQuantity,
}

impl InvalidReason {
    /// Message shown to the end user
    pub fn user_message(&self) -> &'static str {
        match self {
            InvalidReason::NotActive => "This promotion is not active.",
            InvalidReason::NotYetStarted => "This promotion has not started yet.",
            InvalidReason::Expired => "This promotion has expired.",
            InvalidReason::BelowMinimumOrder => {
                "The order amount is below the minimum required for this promotion."
            }
            InvalidReason::AboveMaximumOrder => {
                "The order amount exceeds the maximum allowed for this promotion."
            }
            InvalidReason::UsageLimitReached => "This promotion has reached its usage limit.",
            InvalidReason::PerUserLimitReached => {
                "You have already used this promotion the maximum number of times."
            }
            InvalidReason::BelowMinimumQuantity => {
                "The requested quantity is below the minimum for this offer."
            }
            InvalidReason::AboveMaximumQuantity => {
                "The requested quantity exceeds the maximum for this offer."
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::NotActive => "not_active",
            InvalidReason::NotYetStarted => "not_yet_started",
            InvalidReason::Expired => "expired",
            InvalidReason::BelowMinimumOrder => "below_minimum_order",
            InvalidReason::AboveMaximumOrder => "above_maximum_order",
            InvalidReason::UsageLimitReached => "usage_limit_reached",
            InvalidReason::PerUserLimitReached => "per_user_limit_reached",
            InvalidReason::BelowMinimumQuantity => "below_minimum_quantity",
            InvalidReason::AboveMaximumQuantity => "above_maximum_quantity",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

/// Stateless checker for rule validity
pub struct ValidityChecker;

impl ValidityChecker {
    /// Check the constraints shared by codes and offers
    ///
    /// Order of checks:
    /// 1. status must be active
    /// 2. `now >= valid_from`
    /// 3. `now <= valid_until`
    /// 4. `order_amount >= min_order_amount`
    /// 5. `order_amount <= max_order_amount`
    /// 6. `usage_count < usage_limit`
    /// 7. `prior_user_usage < usage_limit_per_user`
    pub fn check(rule: &RuleConstraints, ctx: &RedemptionContext) -> Result<(), InvalidReason> {
        if rule.status != RuleStatus::Active {
            return Err(InvalidReason::NotActive);
        }

        if let Some(valid_from) = rule.valid_from {
            if ctx.now < valid_from {
                return Err(InvalidReason::NotYetStarted);
            }
        }

        if let Some(valid_until) = rule.valid_until {
            if ctx.now > valid_until {
                return Err(InvalidReason::Expired);
            }
        }

        if let Some(min) = rule.min_order_amount {
            if ctx.order_amount < min {
                return Err(InvalidReason::BelowMinimumOrder);
            }
        }

        if let Some(max) = rule.max_order_amount {
            if ctx.order_amount > max {
                return Err(InvalidReason::AboveMaximumOrder);
            }
        }

        if let Some(limit) = rule.usage_limit {
            if rule.usage_count >= limit {
                return Err(InvalidReason::UsageLimitReached);
            }
        }

        if let Some(per_user) = rule.usage_limit_per_user {
            if ctx.prior_user_usage >= per_user {
                return Err(InvalidReason::PerUserLimitReached);
            }
        }

        Ok(())
    }

    /// Check a pre-sale offer: shared constraints, then quantity bounds
    pub fn check_offer(offer: &OfferRule, ctx: &RedemptionContext) -> Result<(), InvalidReason> {
        Self::check(&offer.constraints, ctx)?;

        if let Some(min) = offer.min_quantity {
            if ctx.quantity < min {
                return Err(InvalidReason::BelowMinimumQuantity);
            }
        }

        if let Some(max) = offer.max_quantity {
            if ctx.quantity > max {
                return Err(InvalidReason::AboveMaximumQuantity);
            }
        }

        Ok(())
    }
}

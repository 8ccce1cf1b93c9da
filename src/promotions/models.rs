use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::promotions::rules::{DiscountRule, OfferRule, RuleConstraints};
use crate::promotions::types::{DiscountKind, OfferKind, RuleStatus};
use crate::promotions::validity::InvalidReason;
use crate::validation::{
    validate_code_format, validate_non_negative, validate_order_amount, validate_ordered,
    validate_percentage,
};

/// Discount code as stored in the database
///
/// `kind` is kept as raw text so that unknown kinds decode instead of failing
/// the row; `rule()` maps it onto `DiscountKind`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiscountCode {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
    pub value: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub max_order_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
    pub usage_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub status: RuleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DiscountCode {
    pub fn kind(&self) -> DiscountKind {
        DiscountKind::from_db(&self.kind)
    }

    pub fn constraints(&self) -> RuleConstraints {
        RuleConstraints {
            status: self.status,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            min_order_amount: self.min_order_amount,
            max_order_amount: self.max_order_amount,
            usage_limit: self.usage_limit,
            usage_limit_per_user: self.usage_limit_per_user,
            usage_count: self.usage_count,
        }
    }

    pub fn rule(&self) -> DiscountRule {
        DiscountRule {
            kind: self.kind(),
            value: self.value,
            max_discount_amount: self.max_discount_amount,
            constraints: self.constraints(),
        }
    }
}

/// Pre-sale offer as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PreSaleOffer {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub product_id: Option<i32>,
    pub kind: String,
    pub original_price: Decimal,
    pub price: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub fixed_discount_amount: Option<Decimal>,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
    pub min_order_amount: Option<Decimal>,
    pub max_order_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
    pub usage_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub status: RuleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PreSaleOffer {
    pub fn kind(&self) -> OfferKind {
        OfferKind::from_db(&self.kind)
    }

    pub fn rule(&self) -> OfferRule {
        OfferRule {
            kind: self.kind(),
            price: self.price,
            discount_percentage: self.discount_percentage,
            fixed_discount_amount: self.fixed_discount_amount,
            min_quantity: self.min_quantity,
            max_quantity: self.max_quantity,
            constraints: RuleConstraints {
                status: self.status,
                valid_from: self.valid_from,
                valid_until: self.valid_until,
                min_order_amount: self.min_order_amount,
                max_order_amount: self.max_order_amount,
                usage_limit: self.usage_limit,
                usage_limit_per_user: self.usage_limit_per_user,
                usage_count: self.usage_count,
            },
        }
    }
}

/// Input for creating a discount code
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_new_discount_code"))]
pub struct NewDiscountCode {
    #[validate(custom = "validate_code_format")]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    #[validate(custom = "validate_non_negative")]
    pub value: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub max_discount_amount: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub min_order_amount: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub max_order_amount: Option<Decimal>,
    #[validate(range(min = 0, message = "Usage limit must not be negative"))]
    pub usage_limit: Option<i32>,
    #[validate(range(min = 0, message = "Per-user usage limit must not be negative"))]
    pub usage_limit_per_user: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: RuleStatus,
}

fn validate_new_discount_code(input: &NewDiscountCode) -> Result<(), ValidationError> {
    if input.kind == DiscountKind::Percentage && input.value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_out_of_range"));
    }
    validate_ordered(input.min_order_amount, input.max_order_amount, "order_amount_bounds")?;
    validate_ordered(input.valid_from, input.valid_until, "validity_window")?;
    Ok(())
}

/// Input for creating a pre-sale offer
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_new_pre_sale_offer"))]
pub struct NewPreSaleOffer {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub product_id: Option<i32>,
    pub kind: OfferKind,
    #[validate(custom = "validate_non_negative")]
    pub original_price: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_percentage")]
    pub discount_percentage: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub fixed_discount_amount: Option<Decimal>,
    #[validate(range(min = 1, message = "Minimum quantity must be at least 1"))]
    pub min_quantity: Option<i32>,
    #[validate(range(min = 1, message = "Maximum quantity must be at least 1"))]
    pub max_quantity: Option<i32>,
    #[validate(custom = "validate_non_negative")]
    pub min_order_amount: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub max_order_amount: Option<Decimal>,
    #[validate(range(min = 0, message = "Usage limit must not be negative"))]
    pub usage_limit: Option<i32>,
    #[validate(range(min = 0, message = "Per-user usage limit must not be negative"))]
    pub usage_limit_per_user: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: RuleStatus,
}

fn validate_new_pre_sale_offer(input: &NewPreSaleOffer) -> Result<(), ValidationError> {
    validate_ordered(input.min_quantity, input.max_quantity, "quantity_bounds")?;
    validate_ordered(input.min_order_amount, input.max_order_amount, "order_amount_bounds")?;
    validate_ordered(input.valid_from, input.valid_until, "validity_window")?;
    Ok(())
}

/// Recorded use of a discount code
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiscountRedemption {
    pub id: Uuid,
    pub discount_code_id: i32,
    pub user_id: i32,
    pub order_id: Uuid,
    pub order_amount: Decimal,
    pub discount_amount: Decimal,
    pub redeemed_at: DateTime<Utc>,
}

/// Recorded purchase under a pre-sale offer
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfferRedemption {
    pub id: Uuid,
    pub pre_sale_offer_id: i32,
    pub user_id: i32,
    pub order_id: Uuid,
    pub quantity: i32,
    pub original_price: Decimal,
    pub final_price: Decimal,
    pub redeemed_at: DateTime<Utc>,
}

/// Request DTO for redeeming a discount code against an order
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RedeemCodeRequest {
    #[validate(length(min = 1, message = "Code must not be empty"))]
    pub code: String,
    pub user_id: i32,
    pub order_id: Uuid,
    #[validate(custom = "validate_order_amount")]
    pub order_amount: Decimal,
}

/// Request DTO for buying a quantity under a pre-sale offer
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClaimOfferRequest {
    pub offer_id: i32,
    pub user_id: i32,
    pub order_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Order total checked against the offer's order bounds;
    /// defaults to `original_price * quantity`
    #[validate(custom = "validate_order_amount")]
    pub order_amount: Option<Decimal>,
}

/// Discount code after a successful redemption, with the recorded use
#[derive(Debug, Clone)]
pub struct RedeemedDiscount {
    pub code: DiscountCode,
    pub redemption: DiscountRedemption,
}

/// Offer after a successful claim, with the recorded purchase
#[derive(Debug, Clone)]
pub struct ClaimedOffer {
    pub offer: PreSaleOffer,
    pub redemption: OfferRedemption,
}

/// Outcome of an atomic check-and-redeem
#[derive(Debug, Clone)]
pub enum RedemptionOutcome<T> {
    Redeemed(T),
    Rejected(InvalidReason),
}

impl<T> RedemptionOutcome<T> {
    pub fn is_redeemed(&self) -> bool {
        matches!(self, RedemptionOutcome::Redeemed(_))
    }

    pub fn into_result(self) -> Result<T, InvalidReason> {
        match self {
            RedemptionOutcome::Redeemed(value) => Ok(value),
            RedemptionOutcome::Rejected(reason) => Err(reason),
        }
    }
}

/// Computed discount for a code applied to an order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountQuote {
    pub rule_id: i32,
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub order_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub max_order_amount: Option<Decimal>,
}

/// Computed price for a quantity of an offer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferQuote {
    pub rule_id: i32,
    pub title: String,
    pub kind: OfferKind,
    pub original_price: Decimal,
    pub quantity: i32,
    pub final_price: Decimal,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
}

/// Response DTO for a validity check
///
/// `quote` is present only when `valid` is true; `reason` only when it is false.
/// `status` is the rule's status at evaluation time, so a lapsed window reads `expired`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidityResponse<Q> {
    pub valid: bool,
    pub status: RuleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<InvalidReason>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<Q>,
}

impl<Q> ValidityResponse<Q> {
    pub fn valid(status: RuleStatus, quote: Q) -> Self {
        Self {
            valid: true,
            status,
            reason: None,
            message: "Promotion is valid.".to_string(),
            quote: Some(quote),
        }
    }

    pub fn invalid(status: RuleStatus, reason: InvalidReason) -> Self {
        Self {
            valid: false,
            status,
            reason: Some(reason),
            message: reason.user_message().to_string(),
            quote: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_code() -> DiscountCode {
        let now = Utc::now();
        DiscountCode {
            id: 1,
            code: "SAVE20".to_string(),
            name: "Save 20".to_string(),
            description: None,
            kind: "percentage".to_string(),
            value: dec!(20),
            max_discount_amount: Some(dec!(15)),
            min_order_amount: Some(dec!(50)),
            max_order_amount: None,
            usage_limit: Some(100),
            usage_limit_per_user: Some(1),
            usage_count: 3,
            valid_from: None,
            valid_until: None,
            status: RuleStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn sample_new_code() -> NewDiscountCode {
        NewDiscountCode {
            code: "SAVE20".to_string(),
            name: "Save 20".to_string(),
            description: None,
            kind: DiscountKind::Percentage,
            value: dec!(20),
            max_discount_amount: None,
            min_order_amount: None,
            max_order_amount: None,
            usage_limit: None,
            usage_limit_per_user: None,
            valid_from: None,
            valid_until: None,
            status: RuleStatus::Active,
        }
    }

    #[test]
    fn test_discount_code_rule_conversion() {
        let rule = sample_code().rule();
        assert_eq!(rule.kind, DiscountKind::Percentage);
        assert_eq!(rule.max_discount_amount, Some(dec!(15)));
        assert_eq!(rule.constraints.usage_count, 3);
        assert_eq!(rule.constraints.min_order_amount, Some(dec!(50)));
    }

    #[test]
    fn test_unknown_stored_kind_becomes_other() {
        let code = DiscountCode {
            kind: "seasonal_bonus".to_string(),
            ..sample_code()
        };
        assert_eq!(code.kind(), DiscountKind::Other);
    }

    #[test]
    fn test_new_discount_code_valid() {
        assert!(sample_new_code().validate().is_ok());
    }

    #[test]
    fn test_new_discount_code_rejects_negative_cap() {
        let input = NewDiscountCode {
            max_discount_amount: Some(dec!(-1)),
            ..sample_new_code()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_new_discount_code_rejects_bad_code() {
        let input = NewDiscountCode {
            code: "no spaces allowed".to_string(),
            ..sample_new_code()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_new_discount_code_rejects_inverted_bounds() {
        let input = NewDiscountCode {
            min_order_amount: Some(dec!(100)),
            max_order_amount: Some(dec!(50)),
            ..sample_new_code()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_new_discount_code_rejects_percentage_over_100() {
        let input = NewDiscountCode {
            value: dec!(120),
            ..sample_new_code()
        };
        assert!(input.validate().is_err());

        let input = NewDiscountCode {
            kind: DiscountKind::FixedAmount,
            value: dec!(120),
            ..sample_new_code()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_new_discount_code_status_defaults_to_active() {
        let input: NewDiscountCode = serde_json::from_value(serde_json::json!({
            "code": "WELCOME",
            "name": "Welcome",
            "kind": "fixed_amount",
            "value": "5.00"
        }))
        .unwrap();
        assert_eq!(input.status, RuleStatus::Active);
        assert_eq!(input.value, dec!(5.00));
    }

    #[test]
    fn test_validity_response_serialization() {
        let invalid: ValidityResponse<DiscountQuote> =
            ValidityResponse::invalid(RuleStatus::Active, InvalidReason::UsageLimitReached);
        let json = serde_json::to_value(&invalid).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["status"], "active");
        assert_eq!(json["reason"], "usage_limit_reached");
        assert_eq!(json["message"], "This promotion has reached its usage limit.");
        assert!(json.get("quote").is_none());
    }

    #[test]
    fn test_redeem_request_rejects_unstorable_amount() {
        let request = RedeemCodeRequest {
            code: "SAVE20".to_string(),
            user_id: 1,
            order_id: Uuid::new_v4(),
            order_amount: Decimal::MAX,
        };
        assert!(request.validate().is_err());

        let request = RedeemCodeRequest {
            order_amount: dec!(250.00),
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_claim_request_rejects_unstorable_amount() {
        let request = ClaimOfferRequest {
            offer_id: 1,
            user_id: 1,
            order_id: Uuid::new_v4(),
            quantity: 2,
            order_amount: Some(Decimal::MAX),
        };
        assert!(request.validate().is_err());

        let request = ClaimOfferRequest {
            order_amount: None,
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_redemption_outcome_into_result() {
        let outcome: RedemptionOutcome<i32> = RedemptionOutcome::Rejected(InvalidReason::Expired);
        assert!(!outcome.is_redeemed());
        assert_eq!(outcome.into_result(), Err(InvalidReason::Expired));
    }
}

// Domain type definitions for promotions
// Shared enums used by discount codes and pre-sale offers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a discount code
///
/// Determines how `value` is interpreted when computing the discount amount.
/// Unknown stored kinds decode to `Other` so that a malformed record still
/// yields a flat discount instead of failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the order amount (e.g., 20 = 20% off)
    Percentage,

    /// `value` is a currency amount taken off the order
    FixedAmount,

    /// `value` is a flat amount; shipping cost itself is handled by the caller
    FreeShipping,

    /// `value` is a flat amount; no per-unit logic for codes
    BuyOneGetOne,

    /// Catch-all, `value` is used as a flat amount
    #[serde(other)]
    Other,
}

impl DiscountKind {
    pub const ALL: [DiscountKind; 5] = [
        DiscountKind::Percentage,
        DiscountKind::FixedAmount,
        DiscountKind::FreeShipping,
        DiscountKind::BuyOneGetOne,
        DiscountKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Percentage => "percentage",
            DiscountKind::FixedAmount => "fixed_amount",
            DiscountKind::FreeShipping => "free_shipping",
            DiscountKind::BuyOneGetOne => "buy_one_get_one",
            DiscountKind::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DiscountKind::Percentage => "Percentage",
            DiscountKind::FixedAmount => "Fixed Amount",
            DiscountKind::FreeShipping => "Free Shipping",
            DiscountKind::BuyOneGetOne => "Buy One Get One",
            DiscountKind::Other => "Other",
        }
    }

    /// Decode a stored kind, falling back to `Other` for anything unrecognised
    pub fn from_db(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "percentage" => DiscountKind::Percentage,
            "fixed_amount" => DiscountKind::FixedAmount,
            "free_shipping" => DiscountKind::FreeShipping,
            "buy_one_get_one" => DiscountKind::BuyOneGetOne,
            _ => DiscountKind::Other,
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of a pre-sale offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    /// Percentage off the original price (`discount_percentage`)
    Discount,

    /// Fixed amount off the original price (`fixed_discount_amount`)
    FixedAmount,

    /// Original price, shipping is waived by the caller
    FreeShipping,

    /// Pay for every other unit
    BuyOneGetOne,

    /// The offer's own price
    #[serde(other)]
    Other,
}

impl OfferKind {
    pub const ALL: [OfferKind; 5] = [
        OfferKind::Discount,
        OfferKind::FixedAmount,
        OfferKind::FreeShipping,
        OfferKind::BuyOneGetOne,
        OfferKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OfferKind::Discount => "discount",
            OfferKind::FixedAmount => "fixed_amount",
            OfferKind::FreeShipping => "free_shipping",
            OfferKind::BuyOneGetOne => "buy_one_get_one",
            OfferKind::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OfferKind::Discount => "Discount",
            OfferKind::FixedAmount => "Fixed Amount",
            OfferKind::FreeShipping => "Free Shipping",
            OfferKind::BuyOneGetOne => "Buy One Get One",
            OfferKind::Other => "Other",
        }
    }

    /// Decode a stored kind, falling back to `Other` for anything unrecognised
    pub fn from_db(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "discount" => OfferKind::Discount,
            "fixed_amount" => OfferKind::FixedAmount,
            "free_shipping" => OfferKind::FreeShipping,
            "buy_one_get_one" => OfferKind::BuyOneGetOne,
            _ => OfferKind::Other,
        }
    }
}

impl fmt::Display for OfferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Administrative status of a rule
///
/// Only `Active` rules can be applied. `Expired` may be stored explicitly or
/// derived from `valid_until` (see `RuleConstraints::effective_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Active,
    Inactive,
    Expired,
}

impl RuleStatus {
    pub const ALL: [RuleStatus; 3] = [RuleStatus::Active, RuleStatus::Inactive, RuleStatus::Expired];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Active => "active",
            RuleStatus::Inactive => "inactive",
            RuleStatus::Expired => "expired",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RuleStatus::Active => "Active",
            RuleStatus::Inactive => "Inactive",
            RuleStatus::Expired => "Expired",
        }
    }
}

impl Default for RuleStatus {
    fn default() -> Self {
        RuleStatus::Active
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(RuleStatus::Active),
            "inactive" => Ok(RuleStatus::Inactive),
            "expired" => Ok(RuleStatus::Expired),
            _ => Err(format!("Invalid rule status: {}", s)),
        }
    }
}

/// How buy-one-get-one offers treat the requested quantity
///
/// The legacy formula multiplied `base * ceil(qty / 2)` by the quantity a
/// second time. `SourceParity` keeps that result for reconciliation against
/// historical orders; `PairFree` charges for `ceil(qty / 2)` units once.
///
/// Base 20, quantity 3: `PairFree` gives 40.00 and `SourceParity` 120.00.
/// The product notes for this case quote 60.00 as the corrected price, which
/// is full price for every unit and neither mode; the pricing owner should
/// confirm which figure is intended before `PairFree` ships as the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BogoPricing {
    PairFree,
    SourceParity,
}

impl Default for BogoPricing {
    fn default() -> Self {
        BogoPricing::PairFree
    }
}

impl fmt::Display for BogoPricing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BogoPricing::PairFree => write!(f, "pair_free"),
            BogoPricing::SourceParity => write!(f, "source_parity"),
        }
    }
}

impl std::str::FromStr for BogoPricing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pair_free" => Ok(BogoPricing::PairFree),
            "source_parity" => Ok(BogoPricing::SourceParity),
            _ => Err(format!("Invalid BOGO pricing mode: {}", s)),
        }
    }
}

/// Entry of a static lookup table (kinds, statuses)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LookupEntry {
    pub value: &'static str,
    pub label: &'static str,
}

pub fn discount_kind_lookup() -> Vec<LookupEntry> {
    DiscountKind::ALL
        .iter()
        .map(|kind| LookupEntry { value: kind.as_str(), label: kind.label() })
        .collect()
}

pub fn offer_kind_lookup() -> Vec<LookupEntry> {
    OfferKind::ALL
        .iter()
        .map(|kind| LookupEntry { value: kind.as_str(), label: kind.label() })
        .collect()
}

pub fn status_lookup() -> Vec<LookupEntry> {
    RuleStatus::ALL
        .iter()
        .map(|status| LookupEntry { value: status.as_str(), label: status.label() })
        .collect()
}

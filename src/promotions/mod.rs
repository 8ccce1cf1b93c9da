// Promotions module
//
// Discount codes and pre-sale offers: rule types, the validity checker, the
// price calculator, persistence with atomic redemption, and the service that
// ties them together.

pub mod calculator;
pub mod error;
pub mod models;
pub mod repository;
pub mod rules;
pub mod service;
pub mod types;
pub mod validity;

pub use calculator::{round_currency, DiscountCalculator};
pub use error::{PromoError, PromoResult};
pub use models::*;
pub use repository::{DiscountCodeRepository, PreSaleOfferRepository};
pub use rules::{DiscountRule, OfferRule, RedemptionContext, RuleConstraints};
pub use service::{evaluate_code, evaluate_offer, PromotionService};
pub use types::{BogoPricing, DiscountKind, LookupEntry, OfferKind, RuleStatus};
pub use validity::{InvalidReason, ValidityChecker};

#[cfg(test)]
mod tests;

// Promotion rules for discount codes and pre-sale offers
//
// Validity checking and price computation are pure functions in
// `promotions::{validity, calculator}`. `promotions::PromotionService` adds
// persistence and atomic redemption on top of a Postgres pool.

pub mod config;
pub mod db;
pub mod promotions;
pub mod telemetry;
pub mod validation;

pub use config::{AppConfig, ConfigError};
pub use promotions::{
    BogoPricing, DiscountCalculator, DiscountKind, DiscountRule, InvalidReason, OfferKind,
    OfferRule, PromoError, PromoResult, PromotionService, RedemptionContext, RuleConstraints,
    RuleStatus, ValidityChecker,
};

/// Connect, migrate, and build a service from configuration
pub async fn connect(config: &AppConfig) -> PromoResult<PromotionService> {
    let pool = db::create_pool(config).await?;
    db::run_migrations(&pool).await?;
    Ok(PromotionService::from_pool(pool, config.bogo_pricing))
}

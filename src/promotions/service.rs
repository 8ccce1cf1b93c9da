use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use validator::{Validate, ValidationError};

use crate::promotions::calculator::DiscountCalculator;
use crate::promotions::error::{PromoError, PromoResult};
use crate::promotions::models::{
    ClaimOfferRequest, ClaimedOffer, DiscountCode, DiscountQuote, NewDiscountCode,
    NewPreSaleOffer, OfferQuote, PreSaleOffer, RedeemCodeRequest, RedeemedDiscount,
    RedemptionOutcome, ValidityResponse,
};
use crate::promotions::repository::{DiscountCodeRepository, PreSaleOfferRepository};
use crate::promotions::rules::RedemptionContext;
use crate::promotions::types::{
    discount_kind_lookup, offer_kind_lookup, status_lookup, BogoPricing, LookupEntry, RuleStatus,
};
use crate::promotions::validity::ValidityChecker;
use crate::validation::{validate_order_amount, validate_quantity};

/// Check a code against an order and build the quote when it passes
pub fn evaluate_code(code: &DiscountCode, ctx: &RedemptionContext) -> ValidityResponse<DiscountQuote> {
    let rule = code.rule();
    let status = rule.constraints.effective_status(ctx.now);
    match ValidityChecker::check(&rule.constraints, ctx) {
        Ok(()) => {
            let discount_amount = DiscountCalculator::compute_discount(&rule, ctx.order_amount);
            ValidityResponse::valid(status, DiscountQuote {
                rule_id: code.id,
                code: code.code.clone(),
                kind: rule.kind,
                value: code.value,
                order_amount: ctx.order_amount,
                discount_amount,
                final_amount: DiscountCalculator::apply_discount(&rule, ctx.order_amount),
                max_discount_amount: code.max_discount_amount,
                min_order_amount: code.min_order_amount,
                max_order_amount: code.max_order_amount,
            })
        }
        Err(reason) => ValidityResponse::invalid(status, reason),
    }
}

/// Check an offer for a quantity and build the quote when it passes
pub fn evaluate_offer(
    offer: &PreSaleOffer,
    ctx: &RedemptionContext,
    bogo: BogoPricing,
) -> ValidityResponse<OfferQuote> {
    let rule = offer.rule();
    let status = rule.constraints.effective_status(ctx.now);
    match ValidityChecker::check_offer(&rule, ctx) {
        Ok(()) => ValidityResponse::valid(status, OfferQuote {
            rule_id: offer.id,
            title: offer.title.clone(),
            kind: rule.kind,
            original_price: offer.original_price,
            quantity: ctx.quantity,
            final_price: DiscountCalculator::compute_final_price(
                &rule,
                offer.original_price,
                ctx.quantity,
                bogo,
            ),
            min_quantity: offer.min_quantity,
            max_quantity: offer.max_quantity,
        }),
        Err(reason) => ValidityResponse::invalid(status, reason),
    }
}

fn check_input(field: &str, result: Result<(), ValidationError>) -> PromoResult<()> {
    result.map_err(|e| PromoError::Validation(format!("{}: {}", field, e.code)))
}

/// Service for discount code and pre-sale offer business logic
#[derive(Clone)]
pub struct PromotionService {
    codes: DiscountCodeRepository,
    offers: PreSaleOfferRepository,
    bogo: BogoPricing,
}

impl PromotionService {
    /// Create a new PromotionService
    pub fn new(codes: DiscountCodeRepository, offers: PreSaleOfferRepository, bogo: BogoPricing) -> Self {
        Self { codes, offers, bogo }
    }

    /// Create a PromotionService with repositories over one pool
    pub fn from_pool(pool: PgPool, bogo: BogoPricing) -> Self {
        Self::new(
            DiscountCodeRepository::new(pool.clone()),
            PreSaleOfferRepository::new(pool),
            bogo,
        )
    }

    pub fn bogo_pricing(&self) -> BogoPricing {
        self.bogo
    }

    pub fn discount_kinds() -> Vec<LookupEntry> {
        discount_kind_lookup()
    }

    pub fn offer_kinds() -> Vec<LookupEntry> {
        offer_kind_lookup()
    }

    pub fn statuses() -> Vec<LookupEntry> {
        status_lookup()
    }

    /// Create a discount code from administrative input
    pub async fn create_code(&self, input: NewDiscountCode) -> PromoResult<DiscountCode> {
        input.validate()?;

        let code = self.codes.create(&input).await?;
        tracing::info!("Created discount code {} (id {})", code.code, code.id);
        Ok(code)
    }

    /// Create a pre-sale offer from administrative input
    pub async fn create_offer(&self, input: NewPreSaleOffer) -> PromoResult<PreSaleOffer> {
        input.validate()?;

        let offer = self.offers.create(&input).await?;
        tracing::info!("Created pre-sale offer '{}' (id {})", offer.title, offer.id);
        Ok(offer)
    }

    pub async fn get_code(&self, code: &str) -> PromoResult<DiscountCode> {
        tracing::debug!("Fetching discount code {}", code);

        self.codes
            .find_by_code(code)
            .await?
            .ok_or_else(|| PromoError::CodeNotFound(code.to_string()))
    }

    pub async fn get_offer(&self, id: i32) -> PromoResult<PreSaleOffer> {
        tracing::debug!("Fetching pre-sale offer {}", id);

        self.offers
            .find_by_id(id)
            .await?
            .ok_or(PromoError::OfferNotFound(id))
    }

    /// Check whether a code applies to an order right now
    ///
    /// Read-only: nothing is redeemed. Use `redeem_code` to consume a use.
    pub async fn validate_code(
        &self,
        code: &str,
        user_id: i32,
        order_amount: Decimal,
    ) -> PromoResult<ValidityResponse<DiscountQuote>> {
        self.validate_code_at(code, user_id, order_amount, Utc::now()).await
    }

    pub async fn validate_code_at(
        &self,
        code: &str,
        user_id: i32,
        order_amount: Decimal,
        now: DateTime<Utc>,
    ) -> PromoResult<ValidityResponse<DiscountQuote>> {
        check_input("order_amount", validate_order_amount(&order_amount))?;

        let discount_code = self.get_code(code).await?;
        let prior_user_usage = self
            .codes
            .count_user_redemptions(discount_code.id, user_id)
            .await?;

        let ctx = RedemptionContext::new(now, order_amount).with_prior_usage(prior_user_usage);
        let response = evaluate_code(&discount_code, &ctx);

        match response.reason {
            Some(reason) => tracing::debug!("Code {} rejected for user {}: {}", discount_code.code, user_id, reason.as_str()),
            None => tracing::debug!("Code {} valid for user {}", discount_code.code, user_id),
        }

        Ok(response)
    }

    /// Quote the final price for a quantity under an offer
    pub async fn quote_offer(
        &self,
        offer_id: i32,
        user_id: i32,
        quantity: i32,
        order_amount: Option<Decimal>,
    ) -> PromoResult<ValidityResponse<OfferQuote>> {
        self.quote_offer_at(offer_id, user_id, quantity, order_amount, Utc::now()).await
    }

    pub async fn quote_offer_at(
        &self,
        offer_id: i32,
        user_id: i32,
        quantity: i32,
        order_amount: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> PromoResult<ValidityResponse<OfferQuote>> {
        check_input("quantity", validate_quantity(quantity))?;
        if let Some(amount) = &order_amount {
            check_input("order_amount", validate_order_amount(amount))?;
        }

        let offer = self.get_offer(offer_id).await?;
        let prior_user_usage = self.offers.count_user_claims(offer.id, user_id).await?;

        let order_amount =
            order_amount.unwrap_or_else(|| offer.original_price * Decimal::from(quantity));
        let ctx = RedemptionContext::new(now, order_amount)
            .with_quantity(quantity)
            .with_prior_usage(prior_user_usage);

        Ok(evaluate_offer(&offer, &ctx, self.bogo))
    }

    /// Redeem a code against an order, atomically with its usage counters
    pub async fn redeem_code(
        &self,
        request: RedeemCodeRequest,
    ) -> PromoResult<RedemptionOutcome<RedeemedDiscount>> {
        request.validate()?;

        let outcome = self.codes.redeem(&request, Utc::now()).await?;
        match &outcome {
            RedemptionOutcome::Redeemed(redeemed) => tracing::info!(
                "Redeemed code {} for order {}: discount {}",
                redeemed.code.code,
                redeemed.redemption.order_id,
                redeemed.redemption.discount_amount
            ),
            RedemptionOutcome::Rejected(reason) => tracing::warn!(
                "Rejected redemption of code {} by user {}: {}",
                request.code,
                request.user_id,
                reason.as_str()
            ),
        }

        Ok(outcome)
    }

    /// Record a purchase under an offer, atomically with its usage counters
    pub async fn claim_offer(
        &self,
        request: ClaimOfferRequest,
    ) -> PromoResult<RedemptionOutcome<ClaimedOffer>> {
        request.validate()?;

        let outcome = self.offers.claim(&request, Utc::now(), self.bogo).await?;
        match &outcome {
            RedemptionOutcome::Redeemed(claimed) => tracing::info!(
                "Claimed offer {} for order {}: {} x {} = {}",
                claimed.offer.id,
                claimed.redemption.order_id,
                claimed.redemption.quantity,
                claimed.redemption.original_price,
                claimed.redemption.final_price
            ),
            RedemptionOutcome::Rejected(reason) => tracing::warn!(
                "Rejected claim on offer {} by user {}: {}",
                request.offer_id,
                request.user_id,
                reason.as_str()
            ),
        }

        Ok(outcome)
    }

    pub async fn set_code_status(&self, id: i32, status: RuleStatus) -> PromoResult<DiscountCode> {
        let code = self
            .codes
            .set_status(id, status)
            .await?
            .ok_or(PromoError::CodeIdNotFound(id))?;

        tracing::info!("Discount code {} is now {}", code.code, status);
        Ok(code)
    }

    pub async fn set_offer_status(&self, id: i32, status: RuleStatus) -> PromoResult<PreSaleOffer> {
        let offer = self
            .offers
            .set_status(id, status)
            .await?
            .ok_or(PromoError::OfferNotFound(id))?;

        tracing::info!("Pre-sale offer {} is now {}", offer.id, status);
        Ok(offer)
    }

    pub async fn duplicate_code(&self, id: i32, new_code: Option<&str>) -> PromoResult<DiscountCode> {
        let copy = self.codes.duplicate(id, new_code).await?;
        tracing::info!("Duplicated discount code {} as {} (id {})", id, copy.code, copy.id);
        Ok(copy)
    }

    pub async fn duplicate_offer(&self, id: i32) -> PromoResult<PreSaleOffer> {
        let copy = self.offers.duplicate(id).await?;
        tracing::info!("Duplicated pre-sale offer {} as id {}", id, copy.id);
        Ok(copy)
    }

    /// Soft delete a code; history and redemptions are retained
    pub async fn delete_code(&self, id: i32) -> PromoResult<()> {
        if !self.codes.soft_delete(id).await? {
            tracing::debug!("Discount code {} not found for deletion", id);
            return Err(PromoError::CodeIdNotFound(id));
        }

        tracing::info!("Deleted discount code {}", id);
        Ok(())
    }

    pub async fn delete_offer(&self, id: i32) -> PromoResult<()> {
        if !self.offers.soft_delete(id).await? {
            tracing::debug!("Pre-sale offer {} not found for deletion", id);
            return Err(PromoError::OfferNotFound(id));
        }

        tracing::info!("Deleted pre-sale offer {}", id);
        Ok(())
    }
}

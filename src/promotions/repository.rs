use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::promotions::calculator::DiscountCalculator;
use crate::promotions::error::{PromoError, PromoResult};
use crate::promotions::models::{
    ClaimOfferRequest, ClaimedOffer, DiscountCode, DiscountRedemption, NewDiscountCode,
    NewPreSaleOffer, OfferRedemption, PreSaleOffer, RedeemCodeRequest, RedeemedDiscount,
    RedemptionOutcome,
};
use crate::promotions::rules::RedemptionContext;
use crate::promotions::types::{BogoPricing, RuleStatus};
use crate::promotions::validity::{InvalidReason, ValidityChecker};
use crate::validation::{normalize_code, validate_code_format, MAX_CODE_LEN};

const CODE_COLUMNS: &str = "id, code, name, description, kind, value, max_discount_amount, \
    min_order_amount, max_order_amount, usage_limit, usage_limit_per_user, usage_count, \
    valid_from, valid_until, status, created_at, updated_at, deleted_at";

const COPY_SUFFIX: &str = "-COPY";

const OFFER_COLUMNS: &str = "id, title, description, product_id, kind, original_price, price, \
    discount_percentage, fixed_discount_amount, min_quantity, max_quantity, \
    min_order_amount, max_order_amount, usage_limit, usage_limit_per_user, usage_count, \
    valid_from, valid_until, status, created_at, updated_at, deleted_at";

/// Repository for discount code operations
#[derive(Clone)]
pub struct DiscountCodeRepository {
    pool: PgPool,
}

impl DiscountCodeRepository {
    /// Create a new DiscountCodeRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new discount code; the code string is stored normalised
    pub async fn create(&self, input: &NewDiscountCode) -> PromoResult<DiscountCode> {
        let code = normalize_code(&input.code);
        let sql = format!(
            r#"
            INSERT INTO discount_codes (
                code, name, description, kind, value, max_discount_amount,
                min_order_amount, max_order_amount, usage_limit, usage_limit_per_user,
                valid_from, valid_until, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            CODE_COLUMNS
        );

        sqlx::query_as::<_, DiscountCode>(&sql)
            .bind(&code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.kind.as_str())
            .bind(input.value)
            .bind(input.max_discount_amount)
            .bind(input.min_order_amount)
            .bind(input.max_order_amount)
            .bind(input.usage_limit)
            .bind(input.usage_limit_per_user)
            .bind(input.valid_from)
            .bind(input.valid_until)
            .bind(input.status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PromoError::from_insert(e, &code))
    }

    /// Find a live (not soft-deleted) code by its code string
    pub async fn find_by_code(&self, code: &str) -> PromoResult<Option<DiscountCode>> {
        let sql = format!(
            "SELECT {} FROM discount_codes WHERE code = $1 AND deleted_at IS NULL",
            CODE_COLUMNS
        );

        let found = sqlx::query_as::<_, DiscountCode>(&sql)
            .bind(normalize_code(code))
            .fetch_optional(&self.pool)
            .await?;

        Ok(found)
    }

    /// Find a live code by ID
    pub async fn find_by_id(&self, id: i32) -> PromoResult<Option<DiscountCode>> {
        let sql = format!(
            "SELECT {} FROM discount_codes WHERE id = $1 AND deleted_at IS NULL",
            CODE_COLUMNS
        );

        let found = sqlx::query_as::<_, DiscountCode>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found)
    }

    /// Number of times a user has redeemed a code
    pub async fn count_user_redemptions(&self, code_id: i32, user_id: i32) -> PromoResult<i32> {
        let count: i32 = sqlx::query_scalar(
            "SELECT COUNT(*)::INT FROM discount_code_redemptions WHERE discount_code_id = $1 AND user_id = $2",
        )
        .bind(code_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Change the administrative status of a live code
    pub async fn set_status(&self, id: i32, status: RuleStatus) -> PromoResult<Option<DiscountCode>> {
        let sql = format!(
            r#"
            UPDATE discount_codes
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            CODE_COLUMNS
        );

        let updated = sqlx::query_as::<_, DiscountCode>(&sql)
            .bind(status)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    /// Soft delete a code; returns false when no live code had this ID
    pub async fn soft_delete(&self, id: i32) -> PromoResult<bool> {
        let result = sqlx::query(
            "UPDATE discount_codes SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Copy a code under a new code string
    ///
    /// The copy starts inactive with a zero usage count. Without `new_code`
    /// the source code gets a `-COPY` suffix.
    pub async fn duplicate(&self, id: i32, new_code: Option<&str>) -> PromoResult<DiscountCode> {
        if let Some(requested) = new_code {
            copy_code("", Some(requested))?;
        }

        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM discount_codes WHERE id = $1 AND deleted_at IS NULL",
            CODE_COLUMNS
        );
        let source = sqlx::query_as::<_, DiscountCode>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(PromoError::CodeIdNotFound(id))?;

        let code = copy_code(&source.code, new_code)?;

        let insert = format!(
            r#"
            INSERT INTO discount_codes (
                code, name, description, kind, value, max_discount_amount,
                min_order_amount, max_order_amount, usage_limit, usage_limit_per_user,
                valid_from, valid_until, status, usage_count
            )
            SELECT $1, name, description, kind, value, max_discount_amount,
                   min_order_amount, max_order_amount, usage_limit, usage_limit_per_user,
                   valid_from, valid_until, $2, 0
            FROM discount_codes
            WHERE id = $3
            RETURNING {}
            "#,
            CODE_COLUMNS
        );
        let copy = sqlx::query_as::<_, DiscountCode>(&insert)
            .bind(&code)
            .bind(RuleStatus::Inactive)
            .bind(source.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| PromoError::from_insert(e, &code))?;

        tx.commit().await?;

        Ok(copy)
    }

    /// Validate and redeem a code in one transaction
    ///
    /// The code row is locked with `FOR UPDATE` while the per-user count is
    /// read, the rule is checked, the discount computed and the counter
    /// incremented. The increment is itself conditional on the usage limit.
    pub async fn redeem(
        &self,
        request: &RedeemCodeRequest,
        now: DateTime<Utc>,
    ) -> PromoResult<RedemptionOutcome<RedeemedDiscount>> {
        let code = normalize_code(&request.code);
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM discount_codes WHERE code = $1 AND deleted_at IS NULL FOR UPDATE",
            CODE_COLUMNS
        );
        let locked = sqlx::query_as::<_, DiscountCode>(&select)
            .bind(&code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PromoError::CodeNotFound(code.clone()))?;

        let prior_user_usage: i32 = sqlx::query_scalar(
            "SELECT COUNT(*)::INT FROM discount_code_redemptions WHERE discount_code_id = $1 AND user_id = $2",
        )
        .bind(locked.id)
        .bind(request.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let rule = locked.rule();
        let ctx = RedemptionContext::new(now, request.order_amount).with_prior_usage(prior_user_usage);
        if let Err(reason) = ValidityChecker::check(&rule.constraints, &ctx) {
            tx.rollback().await?;
            return Ok(RedemptionOutcome::Rejected(reason));
        }

        let discount_amount = DiscountCalculator::compute_discount(&rule, request.order_amount);

        let increment = format!(
            r#"
            UPDATE discount_codes
            SET usage_count = usage_count + 1, updated_at = NOW()
            WHERE id = $1 AND (usage_limit IS NULL OR usage_count < usage_limit)
            RETURNING {}
            "#,
            CODE_COLUMNS
        );
        let updated = sqlx::query_as::<_, DiscountCode>(&increment)
            .bind(locked.id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Ok(RedemptionOutcome::Rejected(InvalidReason::UsageLimitReached));
        };

        let redemption = sqlx::query_as::<_, DiscountRedemption>(
            r#"
            INSERT INTO discount_code_redemptions
                (id, discount_code_id, user_id, order_id, order_amount, discount_amount, redeemed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, discount_code_id, user_id, order_id, order_amount, discount_amount, redeemed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(updated.id)
        .bind(request.user_id)
        .bind(request.order_id)
        .bind(request.order_amount)
        .bind(discount_amount)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RedemptionOutcome::Redeemed(RedeemedDiscount {
            code: updated,
            redemption,
        }))
    }
}

/// Code string for a copy of `source`
///
/// A requested code is normalised and must pass the code format. The default
/// shortens `source` so that the suffixed code still fits the column.
fn copy_code(source: &str, requested: Option<&str>) -> PromoResult<String> {
    let code = match requested {
        Some(code) => normalize_code(code),
        None => {
            let stem: String = source.chars().take(MAX_CODE_LEN - COPY_SUFFIX.len()).collect();
            format!("{}{}", stem, COPY_SUFFIX)
        }
    };

    validate_code_format(&code)
        .map_err(|_| PromoError::Validation(format!("code: invalid format '{}'", code)))?;
    Ok(code)
}

/// Repository for pre-sale offer operations
#[derive(Clone)]
pub struct PreSaleOfferRepository {
    pool: PgPool,
}

impl PreSaleOfferRepository {
    /// Create a new PreSaleOfferRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &NewPreSaleOffer) -> PromoResult<PreSaleOffer> {
        let sql = format!(
            r#"
            INSERT INTO pre_sale_offers (
                title, description, product_id, kind, original_price, price,
                discount_percentage, fixed_discount_amount, min_quantity, max_quantity,
                min_order_amount, max_order_amount, usage_limit, usage_limit_per_user,
                valid_from, valid_until, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );

        let offer = sqlx::query_as::<_, PreSaleOffer>(&sql)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.product_id)
            .bind(input.kind.as_str())
            .bind(input.original_price)
            .bind(input.price)
            .bind(input.discount_percentage)
            .bind(input.fixed_discount_amount)
            .bind(input.min_quantity)
            .bind(input.max_quantity)
            .bind(input.min_order_amount)
            .bind(input.max_order_amount)
            .bind(input.usage_limit)
            .bind(input.usage_limit_per_user)
            .bind(input.valid_from)
            .bind(input.valid_until)
            .bind(input.status)
            .fetch_one(&self.pool)
            .await?;

        Ok(offer)
    }

    /// Find a live offer by ID
    pub async fn find_by_id(&self, id: i32) -> PromoResult<Option<PreSaleOffer>> {
        let sql = format!(
            "SELECT {} FROM pre_sale_offers WHERE id = $1 AND deleted_at IS NULL",
            OFFER_COLUMNS
        );

        let found = sqlx::query_as::<_, PreSaleOffer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found)
    }

    /// Number of purchases a user has made under an offer
    pub async fn count_user_claims(&self, offer_id: i32, user_id: i32) -> PromoResult<i32> {
        let count: i32 = sqlx::query_scalar(
            "SELECT COUNT(*)::INT FROM pre_sale_offer_redemptions WHERE pre_sale_offer_id = $1 AND user_id = $2",
        )
        .bind(offer_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn set_status(&self, id: i32, status: RuleStatus) -> PromoResult<Option<PreSaleOffer>> {
        let sql = format!(
            r#"
            UPDATE pre_sale_offers
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );

        let updated = sqlx::query_as::<_, PreSaleOffer>(&sql)
            .bind(status)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    pub async fn soft_delete(&self, id: i32) -> PromoResult<bool> {
        let result = sqlx::query(
            "UPDATE pre_sale_offers SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Copy an offer; the copy is inactive, unused and titled "<title> (Copy)"
    pub async fn duplicate(&self, id: i32) -> PromoResult<PreSaleOffer> {
        let sql = format!(
            r#"
            INSERT INTO pre_sale_offers (
                title, description, product_id, kind, original_price, price,
                discount_percentage, fixed_discount_amount, min_quantity, max_quantity,
                min_order_amount, max_order_amount, usage_limit, usage_limit_per_user,
                valid_from, valid_until, status, usage_count
            )
            SELECT title || ' (Copy)', description, product_id, kind, original_price, price,
                   discount_percentage, fixed_discount_amount, min_quantity, max_quantity,
                   min_order_amount, max_order_amount, usage_limit, usage_limit_per_user,
                   valid_from, valid_until, $1, 0
            FROM pre_sale_offers
            WHERE id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );

        sqlx::query_as::<_, PreSaleOffer>(&sql)
            .bind(RuleStatus::Inactive)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PromoError::OfferNotFound(id))
    }

    /// Validate and record a purchase under an offer in one transaction
    pub async fn claim(
        &self,
        request: &ClaimOfferRequest,
        now: DateTime<Utc>,
        bogo: BogoPricing,
    ) -> PromoResult<RedemptionOutcome<ClaimedOffer>> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM pre_sale_offers WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            OFFER_COLUMNS
        );
        let locked = sqlx::query_as::<_, PreSaleOffer>(&select)
            .bind(request.offer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(PromoError::OfferNotFound(request.offer_id))?;

        let prior_user_usage: i32 = sqlx::query_scalar(
            "SELECT COUNT(*)::INT FROM pre_sale_offer_redemptions WHERE pre_sale_offer_id = $1 AND user_id = $2",
        )
        .bind(locked.id)
        .bind(request.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let rule = locked.rule();
        let order_amount = request
            .order_amount
            .unwrap_or_else(|| locked.original_price * Decimal::from(request.quantity));
        let ctx = RedemptionContext::new(now, order_amount)
            .with_quantity(request.quantity)
            .with_prior_usage(prior_user_usage);
        if let Err(reason) = ValidityChecker::check_offer(&rule, &ctx) {
            tx.rollback().await?;
            return Ok(RedemptionOutcome::Rejected(reason));
        }

        let final_price = DiscountCalculator::compute_final_price(
            &rule,
            locked.original_price,
            request.quantity,
            bogo,
        );

        let increment = format!(
            r#"
            UPDATE pre_sale_offers
            SET usage_count = usage_count + 1, updated_at = NOW()
            WHERE id = $1 AND (usage_limit IS NULL OR usage_count < usage_limit)
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );
        let updated = sqlx::query_as::<_, PreSaleOffer>(&increment)
            .bind(locked.id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Ok(RedemptionOutcome::Rejected(InvalidReason::UsageLimitReached));
        };

        let redemption = sqlx::query_as::<_, OfferRedemption>(
            r#"
            INSERT INTO pre_sale_offer_redemptions
                (id, pre_sale_offer_id, user_id, order_id, quantity, original_price, final_price, redeemed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, pre_sale_offer_id, user_id, order_id, quantity, original_price, final_price, redeemed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(updated.id)
        .bind(request.user_id)
        .bind(request.order_id)
        .bind(request.quantity)
        .bind(updated.original_price)
        .bind(final_price)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RedemptionOutcome::Redeemed(ClaimedOffer {
            offer: updated,
            redemption,
        }))
    }
}

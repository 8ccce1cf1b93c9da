// Discount Calculator
//
// Computes the discount granted by a code and the final price of a pre-sale
// offer. Both functions are total over non-negative inputs.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::promotions::rules::{DiscountRule, OfferRule};
use crate::promotions::types::{BogoPricing, DiscountKind, OfferKind};

/// Round to cents, half away from zero
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Service for discount and offer price calculations
pub struct DiscountCalculator;

impl DiscountCalculator {
    /// Discount granted by a code on an order
    ///
    /// Percentage kinds scale with `order_amount`; every other kind grants
    /// `value` as a flat amount. The result is capped by
    /// `max_discount_amount` and then rounded to cents.
    pub fn compute_discount(rule: &DiscountRule, order_amount: Decimal) -> Decimal {
        let raw = match rule.kind {
            DiscountKind::Percentage => percentage_of(order_amount, rule.value),
            DiscountKind::FixedAmount
            | DiscountKind::FreeShipping
            | DiscountKind::BuyOneGetOne
            | DiscountKind::Other => rule.value,
        }
        .max(Decimal::ZERO);

        let capped = match rule.max_discount_amount {
            Some(cap) if raw > cap => cap,
            _ => raw,
        };

        round_currency(capped)
    }

    /// Order amount left after the code's discount, never below zero
    pub fn apply_discount(rule: &DiscountRule, order_amount: Decimal) -> Decimal {
        let discount = Self::compute_discount(rule, order_amount);
        round_currency((order_amount - discount).max(Decimal::ZERO))
    }

    /// Final price for `quantity` units of an offer
    ///
    /// `original_price` is the product's regular unit price. Buy-one-get-one
    /// already accounts for quantity in its unit formula; `bogo` decides
    /// whether quantity is applied a second time (see `BogoPricing`).
    /// Non-positive quantities price at zero and the result never goes below zero.
    pub fn compute_final_price(
        offer: &OfferRule,
        original_price: Decimal,
        quantity: i32,
        bogo: BogoPricing,
    ) -> Decimal {
        let base_price = original_price.max(Decimal::ZERO);
        let offer_price = offer.price.unwrap_or(base_price);
        let qty = Decimal::from(quantity.max(0));

        let per_unit = match offer.kind {
            OfferKind::Discount => match offer.discount_percentage {
                Some(pct) => base_price - percentage_of(base_price, pct),
                None => offer_price,
            },
            OfferKind::FixedAmount => match offer.fixed_discount_amount {
                Some(fixed) => (base_price - fixed).max(Decimal::ZERO),
                None => offer_price,
            },
            OfferKind::FreeShipping => base_price,
            OfferKind::BuyOneGetOne => {
                let bundle = saturating_mul(base_price, Decimal::from(paid_units(quantity)));
                return match bogo {
                    BogoPricing::PairFree => round_currency(bundle),
                    BogoPricing::SourceParity => round_currency(saturating_mul(bundle, qty)),
                };
            }
            OfferKind::Other => offer_price,
        };

        round_currency(saturating_mul(per_unit.max(Decimal::ZERO), qty))
    }
}

/// `amount * pct / 100`; when the product overflows, divides first and
/// saturates at `amount`
fn percentage_of(amount: Decimal, pct: Decimal) -> Decimal {
    match amount.checked_mul(pct) {
        Some(product) => product / Decimal::ONE_HUNDRED,
        None => (amount / Decimal::ONE_HUNDRED)
            .checked_mul(pct)
            .unwrap_or(amount),
    }
}

fn saturating_mul(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or(Decimal::MAX)
}

/// Units charged under buy-one-get-one: `ceil(quantity / 2)`
fn paid_units(quantity: i32) -> i32 {
    if quantity <= 0 {
        0
    } else {
        (quantity + 1) / 2
    }
}

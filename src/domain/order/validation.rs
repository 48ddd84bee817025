use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Order;
use super::errors::{Rule, ValidationErrors, Violation};

// ============================================================================
// Order Invariants
// ============================================================================
//
// Checked before an order is persisted:
// 1. sum(items.total_price) + delivery_cost + custom_fee == amount (±0.01)
// 2. every item carries the order's track_number
// 3. at least one item
// 4. date_created is not in the future
// 5. required scalar fields, non-negative money, email/phone formats
//
// ============================================================================

/// Allowed absolute difference between the computed total and `payment.amount`.
pub const AMOUNT_TOLERANCE: f64 = 0.01;

const MAX_SIGNATURE_LEN: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex is valid")
});

static E164_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{0,14}$").expect("phone regex is valid"));

/// Validate an order against the current wall clock.
pub fn validate_order(order: &Order) -> Result<(), ValidationErrors> {
    validate_order_at(order, Utc::now())
}

/// Validate an order, treating `now` as the present moment.
pub fn validate_order_at(order: &Order, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
    let mut check = Checker::default();

    check.required("order_uid", &order.order_uid);
    check.required("track_number", &order.track_number);
    check.required("entry", &order.entry);
    check.required("locale", &order.locale);
    check.required("customer_id", &order.customer_id);
    check.required("delivery_service", &order.delivery_service);
    check.required("shardkey", &order.shardkey);
    check.required("oof_shard", &order.oof_shard);
    check.positive("sm_id", order.sm_id as f64);
    if order.internal_signature.chars().count() > MAX_SIGNATURE_LEN {
        check.report("internal_signature", Rule::TooLong(MAX_SIGNATURE_LEN));
    }
    if order.date_created > now {
        check.report("date_created", Rule::InFuture);
    }

    let delivery = &order.delivery;
    check.required("delivery.name", &delivery.name);
    check.required("delivery.zip", &delivery.zip);
    check.required("delivery.city", &delivery.city);
    check.required("delivery.address", &delivery.address);
    check.required("delivery.region", &delivery.region);
    if check.required("delivery.phone", &delivery.phone) && !E164_RE.is_match(&delivery.phone) {
        check.report("delivery.phone", Rule::InvalidPhone);
    }
    if check.required("delivery.email", &delivery.email) && !EMAIL_RE.is_match(&delivery.email) {
        check.report("delivery.email", Rule::InvalidEmail);
    }

    let payment = &order.payment;
    check.required("payment.transaction", &payment.transaction);
    check.required("payment.provider", &payment.provider);
    if check.required("payment.currency", &payment.currency) && payment.currency.chars().count() != 3 {
        check.report("payment.currency", Rule::Length(3));
    }
    check.non_negative("payment.amount", payment.amount);
    check.non_negative("payment.delivery_cost", payment.delivery_cost);
    check.non_negative("payment.goods_total", payment.goods_total);
    check.non_negative("payment.custom_fee", payment.custom_fee);

    if order.items.is_empty() {
        check.report("items", Rule::TooFew(1));
    }
    for (i, item) in order.items.iter().enumerate() {
        let field = |name: &str| format!("items[{}].{}", i, name);
        check.positive(&field("chrt_id"), item.chrt_id as f64);
        check.positive(&field("nm_id"), item.nm_id as f64);
        check.required(&field("name"), &item.name);
        check.non_negative(&field("price"), item.price);
        check.non_negative(&field("sale"), item.sale);
        check.non_negative(&field("total_price"), item.total_price);
        if check.required(&field("track_number"), &item.track_number)
            && item.track_number != order.track_number
        {
            check.report(&field("track_number"), Rule::TrackMismatch(order.track_number.clone()));
        }
    }

    let total: f64 = order.items.iter().map(|item| item.total_price).sum::<f64>()
        + payment.delivery_cost
        + payment.custom_fee;
    if (total - payment.amount).abs() > AMOUNT_TOLERANCE {
        check.report("payment.amount", Rule::TotalMismatch(total));
    }

    check.finish()
}

#[derive(Default)]
struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    fn report(&mut self, field: &str, rule: Rule) {
        self.violations.push(Violation {
            field: field.to_string(),
            rule,
        });
    }

    /// Returns whether the value is present, so format checks can be chained.
    fn required(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.report(field, Rule::Required);
            return false;
        }
        true
    }

    fn non_negative(&mut self, field: &str, value: f64) {
        if value.is_nan() || value < 0.0 {
            self.report(field, Rule::Negative);
        }
    }

    fn positive(&mut self, field: &str, value: f64) {
        if value <= 0.0 {
            self.report(field, Rule::NotPositive);
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::new(self.violations))
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

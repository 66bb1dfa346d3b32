//! crates/study_market_core/src/pricing.rs
//!
//! The plan catalogue and the order price/delivery estimator.
//!
//! The estimate is a pure function of page count, plan, deadline and the
//! current instant. A tight deadline overrides the plan's own multiplier;
//! the two are never combined.

use chrono::{DateTime, Utc};

pub const DEFAULT_PRICE_PER_PAGE: f64 = 50.0;
pub const DEFAULT_URGENCY_MULTIPLIER: f64 = 1.0;

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// A fixed pricing tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub price_per_page: f64,
    pub original_price: Option<f64>,
    pub urgency_multiplier: f64,
    pub delivery_time: &'static str,
    pub description: &'static str,
    pub features: &'static [&'static str],
    pub popular: bool,
}

const PLANS: [Plan; 3] = [
    Plan {
        id: "basic",
        name: "Basic",
        price_per_page: 50.0,
        original_price: None,
        urgency_multiplier: 1.0,
        delivery_time: "3-7 days",
        description: "Perfect for simple assignments and homework",
        features: &[
            "Simple assignments",
            "3-7 days delivery",
            "Basic formatting",
            "Email support",
            "One revision included",
        ],
        popular: false,
    },
    Plan {
        id: "standard",
        name: "Standard",
        price_per_page: 75.0,
        original_price: Some(100.0),
        urgency_multiplier: 1.5,
        delivery_time: "1-3 days",
        description: "Most popular choice for complex assignments",
        features: &[
            "Complex assignments",
            "1-3 days delivery",
            "Professional formatting",
            "Priority support",
            "Unlimited revisions",
            "Plagiarism report",
            "Research sources included",
        ],
        popular: true,
    },
    Plan {
        id: "premium",
        name: "Premium",
        price_per_page: 100.0,
        original_price: None,
        urgency_multiplier: 2.0,
        delivery_time: "24 hours",
        description: "For urgent and high-priority assignments",
        features: &[
            "Urgent assignments",
            "24 hours delivery",
            "Custom design & formatting",
            "24/7 priority support",
            "Unlimited revisions",
            "Detailed plagiarism report",
            "Expert consultation",
            "Progress updates",
        ],
        popular: false,
    },
];

impl Plan {
    /// All plans, cheapest first.
    pub fn catalogue() -> &'static [Plan] {
        &PLANS
    }

    /// Looks a plan up by id, case-insensitively.
    pub fn find(id: &str) -> Option<&'static Plan> {
        PLANS.iter().find(|plan| plan.id.eq_ignore_ascii_case(id))
    }
}

/// The computed estimate for an order.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub pages: u32,
    pub urgency_multiplier: f64,
    pub price: i64,
    pub delivery_time: String,
}

/// Interprets free-form page input the way a form field would: leading
/// whitespace, an optional sign and a run of digits. Anything unparsable,
/// zero or negative counts as a single page; counts past `u32::MAX` saturate.
pub fn parse_pages(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.chars().next() {
        Some('-') => (true, &trimmed[1..]),
        Some('+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if negative || digits.is_empty() {
        return 1;
    }
    // Only digits remain, so a parse failure means overflow.
    match digits.parse::<u32>() {
        Ok(0) => 1,
        Ok(pages) => pages,
        Err(_) => u32::MAX,
    }
}

/// Clamps a numeric page count to at least one page.
pub fn clamp_pages(pages: i64) -> u32 {
    if pages < 1 {
        1
    } else {
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

/// Whole days until the deadline, rounded up and never below one.
/// A deadline in the past therefore counts as one day away.
pub fn days_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds() as f64;
    let days = (millis / MILLIS_PER_DAY).ceil() as i64;
    days.max(1)
}

/// Resolves the urgency multiplier. First match wins:
/// deadline within one day -> 2, within three days -> 1.5, else the plan's multiplier.
pub fn urgency_multiplier(
    plan_multiplier: f64,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    match deadline.map(|d| days_until(d, now)) {
        Some(days) if days <= 1 => 2.0,
        Some(days) if days <= 3 => 1.5,
        _ => plan_multiplier,
    }
}

fn default_delivery_time(pages: u32) -> String {
    let days = ((pages as f64) * 0.5).ceil().max(1.0) as u64;
    if days > 1 {
        format!("{} days", days)
    } else {
        format!("{} day", days)
    }
}

/// Estimates price and delivery time for an order.
pub fn estimate(
    pages: u32,
    plan: Option<&Plan>,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Estimate {
    let pages = pages.max(1);
    let price_per_page = plan.map_or(DEFAULT_PRICE_PER_PAGE, |p| p.price_per_page);
    let plan_multiplier = plan.map_or(DEFAULT_URGENCY_MULTIPLIER, |p| p.urgency_multiplier);
    let multiplier = urgency_multiplier(plan_multiplier, deadline, now);

    let price = (pages as f64 * price_per_page * multiplier).round() as i64;
    let delivery_time = match plan {
        Some(plan) => plan.delivery_time.to_string(),
        None => default_delivery_time(pages),
    };

    Estimate {
        pages,
        urgency_multiplier: multiplier,
        price,
        delivery_time,
    }
}

//! Customer behavior insights.

/// Segment redemption insights used when a source has none of its own.
pub const DEFAULT_CUSTOMER_INSIGHTS: &[&str] = &[
    "Value-Oriented Mobile Users redeem app offers 1.002x more often.",
    "Efficient Drive-Thru Diners redeem 1.004x more often via Drive-Thru.",
];

#[must_use]
pub fn default_customer_insights() -> Vec<String> {
    DEFAULT_CUSTOMER_INSIGHTS
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

//! Ride earnings and Swiss VAT rates.
//!
//! Rates as published by the Swiss Federal Tax Administration (2024).

use serde::{Deserialize, Serialize};

/// Standard VAT rate.
pub const BASE_VAT_RATE: f64 = 0.081;

/// Reduced VAT rate.
pub const REDUCED_VAT_RATE: f64 = 0.026;

/// Special VAT rate for accommodation services.
pub const SPECIAL_VAT_RATE: f64 = 0.038;

/// Charges making up the earnings of a single ride.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EarningInput {
    pub base_charge: f64,
    pub time_offering: f64,
    pub distance_charge: f64,
    pub special_discount: f64,
}

/// Returns the ride earning: base, time and distance charges minus the discount.
#[must_use]
pub fn calculate_earning(input: &EarningInput) -> f64 {
    input.base_charge + input.time_offering + input.distance_charge - input.special_discount
}

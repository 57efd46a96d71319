//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Lowest rating a review may carry.
pub const MIN_RATING: u8 = 1;

/// Highest rating a review may carry.
pub const MAX_RATING: u8 = 5;

/// Largest party size accepted on a single reservation.
pub const MAX_PARTY_SIZE: u32 = 20;

lazy_static! {
    static ref EVENT_TIME_RE: Regex =
        Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid time regex");
}

/// Validates that a review rating is within the valid range (1 to 5).
pub fn validate_rating(rating: u8) -> Result<(), ValidationError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        let mut err = ValidationError::new("rating_range");
        err.message = Some("Rating must be between 1 and 5".into());
        Err(err)
    }
}

/// Clamps an arbitrary persisted rating value into the valid range.
///
/// Older documents carry ratings written before clamping was enforced.
pub fn clamp_rating(raw: i64) -> u8 {
    raw.clamp(i64::from(MIN_RATING), i64::from(MAX_RATING)) as u8
}

/// Validates that a reservation party size is within range (1 to 20).
pub fn validate_party_size(size: u32) -> Result<(), ValidationError> {
    if (1..=MAX_PARTY_SIZE).contains(&size) {
        Ok(())
    } else {
        let mut err = ValidationError::new("party_size_range");
        err.message = Some("Party size must be between 1 and 20".into());
        Err(err)
    }
}

/// Validates that an event time string is 24h `HH:MM`.
pub fn validate_event_time(time: &str) -> Result<(), ValidationError> {
    if EVENT_TIME_RE.is_match(time) {
        Ok(())
    } else {
        let mut err = ValidationError::new("event_time_format");
        err.message = Some("Event time must be formatted as HH:MM".into());
        Err(err)
    }
}

/// Validates that a price is non-negative (zero means free).
pub fn validate_price(price: f64) -> Result<(), ValidationError> {
    if price >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("price_range");
        err.message = Some("Price must be non-negative".into());
        Err(err)
    }
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

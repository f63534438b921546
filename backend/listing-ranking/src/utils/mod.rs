// Utility functions for listing-ranking

use crate::models::GeoPoint;
use chrono::{DateTime, Datelike, FixedOffset, Timelike};

/// Mean Earth radius used for great-circle distances, in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Great-circle distance between two points (haversine), in meters
pub fn haversine_meters(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// 32-bit FNV-1a over the UTF-16 code units of `input`.
///
/// Hashing code units (not bytes) keeps rotation keys stable with the values
/// the storefront has always produced for non-ASCII listing ids.
pub fn fnv1a_32(input: &str) -> u32 {
    input.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// Map a string onto `[0, 1)` deterministically
pub fn hash_to_unit(input: &str) -> f64 {
    f64::from(fnv1a_32(input)) / (f64::from(u32::MAX) + 1.0)
}

/// Rotation bucket key `Y-M-D-H` in the viewer's local time.
///
/// The hour is floored to a multiple of `period_hours` so a period of 1 reseeds
/// every hour and a period of 24 once a day.
pub fn rotation_bucket(now: &DateTime<FixedOffset>, period_hours: u32) -> String {
    let period = period_hours.clamp(1, 24);
    let hour = now.hour() - now.hour() % period;

    format!("{}-{}-{}-{}", now.year(), now.month(), now.day(), hour)
}

/// Minutes elapsed since local midnight
pub fn minutes_since_midnight(now: &DateTime<FixedOffset>) -> u32 {
    now.hour() * 60 + now.minute()
}

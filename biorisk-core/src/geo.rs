//! Great-circle radius filtering of risk records around a site

use crate::record::RiskRecord;

/// Earth radius used by the risk search service, in miles
pub const EARTH_RADIUS_MILES: f64 = 3960.0;

/// Default search radius around a hotel site, in miles
pub const DEFAULT_RADIUS_MILES: f64 = 5.0;

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinates {
            latitude,
            longitude,
        }
    }
}

/// Haversine distance between two points, in miles
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Clamp guards asin against h drifting just above 1.0 for antipodal points
    2.0 * h.sqrt().min(1.0).asin() * EARTH_RADIUS_MILES
}

/// Keep records within `radius_miles` of `center` (inclusive), in input order
///
/// Records without both coordinates cannot be placed and are dropped.
pub fn filter_within_radius(
    risks: &[RiskRecord],
    center: Coordinates,
    radius_miles: f64,
) -> Vec<RiskRecord> {
    let mut unplaced = 0usize;
    let kept: Vec<RiskRecord> = risks
        .iter()
        .filter(|risk| match risk.coordinates() {
            Some((lat, lon)) => haversine_miles(center, Coordinates::new(lat, lon)) <= radius_miles,
            None => {
                unplaced += 1;
                false
            }
        })
        .cloned()
        .collect();

    if unplaced > 0 {
        tracing::debug!(unplaced, "dropped risk records without coordinates");
    }
    tracing::debug!(
        kept = kept.len(),
        total = risks.len(),
        radius_miles,
        "applied radius filter"
    );
    kept
}

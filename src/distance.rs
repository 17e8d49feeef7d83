//! Great-circle distances between consecutive position reports.

use std::collections::HashMap;

use crate::model::{GroupBy, GroupKey, PositionReport};

/// Mean earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Haversine distance in nautical miles between two (lat, lon) points in degrees.
pub fn haversine_distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // rounding can push `a` slightly outside [0, 1]
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_NM * c
}

/// Sets `distance` on every report to the distance from the report before it
/// in the same group, following the current ordering of `reports`.
///
/// The first report of each group gets `0.0`. Reports where either side lacks
/// a position get `None`.
pub fn annotate_distances(reports: &mut [PositionReport], group_by: GroupBy) {
    let mut previous: HashMap<GroupKey, Option<(f64, f64)>> = HashMap::new();

    for report in reports.iter_mut() {
        let current = report.position();
        report.distance = match previous.insert(group_by.key(report), current) {
            None => Some(0.0),
            Some(prev) => match (prev, current) {
                (Some(a), Some(b)) => Some(haversine_distance(a, b)),
                _ => None,
            },
        };
    }
}

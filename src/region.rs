//! Geofences: rectangular regions of interest and polygon areas.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geo::{Contains, LineString, Point};
use serde::{Deserialize, Serialize};

use crate::model::{NavigationalStatus, PositionReport};

/// Reports at or below this speed count as stopped when no report in the
/// area is flagged as anchored.
const STOPPED_SOG: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BoundingBox {
    #[serde(rename = "LAT_MIN")]
    pub lat_min: f64,
    #[serde(rename = "LAT_MAX")]
    pub lat_max: f64,
    #[serde(rename = "LON_MIN")]
    pub lon_min: f64,
    #[serde(rename = "LON_MAX")]
    pub lon_max: f64,
}

impl BoundingBox {
    /// Strict containment: points on an edge are outside.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat > self.lat_min && lat < self.lat_max && lon > self.lon_min && lon < self.lon_max
    }
}

/// An area given as a ring of (lon, lat) vertices. The ring is closed
/// implicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    shape: geo::Polygon<f64>,
}

impl Polygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Polygon {
            shape: geo::Polygon::new(LineString::from(vertices), vec![]),
        }
    }

    /// True when the point lies in the interior; boundary points are outside.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        // a closed ring needs at least three distinct vertices
        if self.shape.exterior().0.len() < 4 {
            return false;
        }
        self.shape.contains(&Point::new(lon, lat))
    }

    fn contains_report(&self, report: &PositionReport) -> bool {
        report
            .position()
            .is_some_and(|(lat, lon)| self.contains(lat, lon))
    }
}

/// Times of the first and last stop a vessel made inside `area`.
fn stop_window(
    group: &[&PositionReport],
    area: &Polygon,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let inside: Vec<&PositionReport> = group
        .iter()
        .copied()
        .filter(|r| area.contains_report(r) && r.timestamp.is_some())
        .collect();
    if inside.is_empty() {
        return None;
    }

    let anchored: Vec<_> = inside
        .iter()
        .filter(|r| r.navigational_status == Some(NavigationalStatus::Anchor))
        .collect();
    let stops: Vec<&&PositionReport> = if anchored.is_empty() {
        inside
            .iter()
            .filter(|r| r.sog.is_some_and(|sog| sog <= STOPPED_SOG))
            .collect()
    } else {
        anchored
    };

    let first = stops.first()?.timestamp?;
    let last = stops.last()?.timestamp?;
    Some((first, last))
}

fn between(
    group: &[&PositionReport],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<PositionReport> {
    group
        .iter()
        .filter(|r| r.timestamp.is_some_and(|t| t >= start && t <= end))
        .map(|r| (*r).clone())
        .collect()
}

/// Extracts the voyages between two areas.
///
/// Returns `(to, from)`: for every vessel that stopped in both areas, `to`
/// holds the reports from its last stop in `area_a` up to its first stop in
/// `area_b`, and `from` the reports from its last stop in `area_b` up to its
/// first stop in `area_a`. A window whose end precedes its start is empty.
pub fn trips_between(
    reports: &[PositionReport],
    area_a: &Polygon,
    area_b: &Polygon,
) -> (Vec<PositionReport>, Vec<PositionReport>) {
    let mut vessels: BTreeMap<&str, Vec<&PositionReport>> = BTreeMap::new();
    for r in reports {
        vessels.entry(r.mmsi.as_str()).or_default().push(r);
    }

    let mut to = Vec::new();
    let mut from = Vec::new();
    for group in vessels.values_mut() {
        group.sort_by_key(|r| r.timestamp);

        let (Some((first_a, last_a)), Some((first_b, last_b))) =
            (stop_window(group, area_a), stop_window(group, area_b))
        else {
            continue;
        };

        to.extend(between(group, last_a, first_b));
        from.extend(between(group, last_b, first_a));
    }

    (to, from)
}

//! Row filters over a cleaned report set.
//!
//! Every filter takes the reports by value and returns the survivors in their
//! original order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{GroupBy, PositionReport};
use crate::region::BoundingBox;

/// Columns that can be required to be non-null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Column {
    #[serde(rename = "MMSI")]
    Mmsi,
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "latitude")]
    Latitude,
    #[serde(rename = "longitude")]
    Longitude,
    #[serde(rename = "SOG")]
    Sog,
    #[serde(rename = "navigational_status")]
    NavigationalStatus,
    #[serde(rename = "ship_type")]
    ShipType,
    #[serde(rename = "ship_subtype")]
    ShipSubtype,
    #[serde(rename = "length")]
    Length,
    #[serde(rename = "width")]
    Width,
}

impl Column {
    pub fn is_present(&self, report: &PositionReport) -> bool {
        match self {
            Column::Mmsi => !report.mmsi.is_empty(),
            Column::Time => report.timestamp.is_some(),
            Column::Latitude => report.latitude.is_some_and(|v| !v.is_nan()),
            Column::Longitude => report.longitude.is_some_and(|v| !v.is_nan()),
            Column::Sog => report.sog.is_some_and(|v| !v.is_nan()),
            Column::NavigationalStatus => report.navigational_status.is_some(),
            Column::ShipType => report.ship_type.is_some(),
            Column::ShipSubtype => report.ship_subtype.is_some(),
            Column::Length => report.length.is_some_and(|v| !v.is_nan()),
            Column::Width => report.width.is_some_and(|v| !v.is_nan()),
        }
    }
}

pub fn filter_missing_value(
    reports: Vec<PositionReport>,
    required: &[Column],
) -> Vec<PositionReport> {
    reports
        .into_iter()
        .filter(|r| required.iter().all(|c| c.is_present(r)))
        .collect()
}

/// MMSIs of single vessels have 9 digits and start with 2-7. Others belong to
/// base stations, SAR aircraft, AtoNs and similar transmitters.
pub fn is_vessel_mmsi(mmsi: &str) -> bool {
    mmsi.len() == 9
        && mmsi.bytes().all(|b| b.is_ascii_digit())
        && matches!(mmsi.as_bytes()[0], b'2'..=b'7')
}

pub fn filter_mmsi(reports: Vec<PositionReport>) -> Vec<PositionReport> {
    reports
        .into_iter()
        .filter(|r| is_vessel_mmsi(&r.mmsi))
        .collect()
}

/// Drops reports at or above `threshold` knots, and reports without a speed.
pub fn filter_sog(reports: Vec<PositionReport>, threshold: f64) -> Vec<PositionReport> {
    reports
        .into_iter()
        .filter(|r| r.sog.is_some_and(|sog| sog < threshold))
        .collect()
}

/// Drops every group with fewer than `threshold` reports.
pub fn filter_minority(
    reports: Vec<PositionReport>,
    threshold: usize,
    group_by: GroupBy,
) -> Vec<PositionReport> {
    let mut counts = HashMap::new();
    for r in &reports {
        *counts.entry(group_by.key(r)).or_insert(0usize) += 1;
    }

    reports
        .into_iter()
        .filter(|r| counts[&group_by.key(r)] >= threshold)
        .collect()
}

/// Keeps reports strictly inside `region`.
pub fn remove_outliers(reports: Vec<PositionReport>, region: &BoundingBox) -> Vec<PositionReport> {
    reports
        .into_iter()
        .filter(|r| r.position().is_some_and(|(lat, lon)| region.contains(lat, lon)))
        .collect()
}

/// Keeps the first report for every (MMSI, timestamp) pair.
pub fn drop_duplicates(reports: Vec<PositionReport>) -> Vec<PositionReport> {
    let mut seen = HashSet::new();
    reports
        .into_iter()
        .filter(|r| seen.insert((r.mmsi.clone(), r.timestamp)))
        .collect()
}

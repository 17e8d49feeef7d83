//! Trip segmentation.
//!
//! A trip is a maximal run of one vessel's time-ordered reports in which
//! consecutive reports are at most `max_time_diff` seconds apart. Trip ids
//! come from a [`TripCounter`] that is threaded through every vessel of a
//! dataset, so ids are unique across the whole dataset. Start every new
//! dataset from `TripCounter::default()`.

use chrono::TimeDelta;
use log::debug;

use crate::distance::haversine_distance;
use crate::model::PositionReport;

#[derive(Debug, Clone, PartialEq)]
pub struct TripRules {
    /// Seconds; a larger gap between two reports starts a new trip.
    pub max_time_diff: i64,
    /// Nautical miles; only used when `split_on_distance` is set.
    pub max_dis_diff: f64,
    pub split_on_distance: bool,
}

impl Default for TripRules {
    fn default() -> Self {
        TripRules {
            max_time_diff: 3600,
            max_dis_diff: 10.0,
            split_on_distance: false,
        }
    }
}

/// Number of trip ids handed out so far; also the next id to assign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TripCounter(u64);

impl TripCounter {
    pub fn total(&self) -> u64 {
        self.0
    }
}

impl TripRules {
    /// `max_time_diff` as a duration, saturating outside chrono's range.
    pub fn max_gap(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.max_time_diff).unwrap_or(if self.max_time_diff > 0 {
            TimeDelta::MAX
        } else {
            TimeDelta::MIN
        })
    }

    fn starts_new_trip(&self, prev: &PositionReport, current: &PositionReport) -> bool {
        let time_gap = match (prev.timestamp, current.timestamp) {
            (Some(a), Some(b)) => b - a > self.max_gap(),
            _ => false,
        };
        if time_gap {
            return true;
        }

        if self.split_on_distance {
            if let (Some(a), Some(b)) = (prev.position(), current.position()) {
                return haversine_distance(a, b) > self.max_dis_diff;
            }
        }

        false
    }

    /// Assigns trip ids to one vessel's reports, which must already be sorted
    /// by timestamp. Returns the counter to pass to the next partition.
    pub fn split_partition(
        &self,
        partition: &mut [PositionReport],
        counter: TripCounter,
    ) -> TripCounter {
        if partition.is_empty() {
            return counter;
        }

        let mut trip = counter.0;
        partition[0].trip_id = Some(trip);
        for i in 1..partition.len() {
            if self.starts_new_trip(&partition[i - 1], &partition[i]) {
                trip += 1;
            }
            partition[i].trip_id = Some(trip);
        }

        TripCounter(trip + 1)
    }
}

/// Sorts `reports` by (MMSI, timestamp) and segments every vessel into trips,
/// continuing from `counter`.
pub fn split_trips_from(
    reports: &mut [PositionReport],
    rules: &TripRules,
    counter: TripCounter,
) -> TripCounter {
    reports.sort_by(|a, b| {
        a.mmsi
            .cmp(&b.mmsi)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });

    let mut counter = counter;
    let mut start = 0;
    while start < reports.len() {
        let mut end = start + 1;
        while end < reports.len() && reports[end].mmsi == reports[start].mmsi {
            end += 1;
        }
        counter = rules.split_partition(&mut reports[start..end], counter);
        start = end;
    }

    debug!("assigned {} trips to {} reports", counter.total(), reports.len());
    counter
}

/// Segments a whole dataset, starting the trip ids at zero.
pub fn split_trips(reports: &mut [PositionReport], rules: &TripRules) -> TripCounter {
    split_trips_from(reports, rules, TripCounter::default())
}

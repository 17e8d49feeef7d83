//! Density based outlier removal.
//!
//! Each trip is clustered on raw (lat, lon) degrees with DBSCAN and only the
//! reports of its largest cluster survive. Neighbourhood queries are brute
//! force, so a trip of n reports costs O(n^2); trips are clustered in parallel.

use std::collections::{HashMap, VecDeque};

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::model::PositionReport;

const NOISE: i32 = -1;
const UNVISITED: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DbscanConfig {
    pub enabled: bool,
    /// Neighbourhood radius in degrees.
    pub eps: f64,
    /// Points (the point itself included) needed to form a core point.
    pub min_samples: usize,
}

impl Default for DbscanConfig {
    fn default() -> Self {
        DbscanConfig {
            enabled: false,
            eps: 0.01,
            min_samples: 5,
        }
    }
}

fn neighbours(points: &[(f64, f64)], idx: usize, eps: f64) -> Vec<usize> {
    let (x, y) = points[idx];
    points
        .iter()
        .enumerate()
        .filter(|(_, (px, py))| ((px - x).powi(2) + (py - y).powi(2)).sqrt() <= eps)
        .map(|(i, _)| i)
        .collect()
}

/// Labels every point with its cluster number, or `-1` for noise.
pub fn dbscan(points: &[(f64, f64)], eps: f64, min_samples: usize) -> Vec<i32> {
    let mut labels = vec![UNVISITED; points.len()];
    let mut cluster = 0;

    for i in 0..points.len() {
        if labels[i] != UNVISITED {
            continue;
        }
        let seeds = neighbours(points, i, eps);
        if seeds.len() < min_samples {
            labels[i] = NOISE;
            continue;
        }

        labels[i] = cluster;
        let mut queue: VecDeque<usize> = seeds.into_iter().filter(|&j| j != i).collect();
        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE {
                // border point
                labels[j] = cluster;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = cluster;
            let reach = neighbours(points, j, eps);
            if reach.len() >= min_samples {
                queue.extend(reach);
            }
        }
        cluster += 1;
    }

    labels
}

/// Label of the biggest cluster; ties go to the cluster found first.
fn largest_cluster(labels: &[i32]) -> Option<i32> {
    let mut sizes: HashMap<i32, usize> = HashMap::new();
    for &l in labels.iter().filter(|&&l| l != NOISE) {
        *sizes.entry(l).or_default() += 1;
    }
    sizes
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(label, _)| label)
}

/// Keeps, per trip, only the reports in the trip's largest DBSCAN cluster.
///
/// Reports without a position are treated as noise. A trip with no cluster
/// at all is dropped entirely.
pub fn filter_outliers_dbscan(
    reports: Vec<PositionReport>,
    eps: f64,
    min_samples: usize,
) -> Vec<PositionReport> {
    let mut trips: HashMap<Option<u64>, Vec<usize>> = HashMap::new();
    for (i, r) in reports.iter().enumerate() {
        trips.entry(r.trip_id).or_default().push(i);
    }

    let keep_lists: Vec<Vec<usize>> = trips
        .par_iter()
        .map(|(_, members)| {
            let located: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&i| reports[i].position().is_some())
                .collect();
            let points: Vec<(f64, f64)> = located
                .iter()
                .filter_map(|&i| reports[i].position())
                .collect();

            let labels = dbscan(&points, eps, min_samples);
            match largest_cluster(&labels) {
                Some(best) => located
                    .into_iter()
                    .zip(labels)
                    .filter(|(_, l)| *l == best)
                    .map(|(i, _)| i)
                    .collect(),
                None => Vec::new(),
            }
        })
        .collect();

    let mut keep = vec![false; reports.len()];
    for i in keep_lists.into_iter().flatten() {
        keep[i] = true;
    }

    let before = reports.len();
    let kept: Vec<PositionReport> = reports
        .into_iter()
        .zip(keep)
        .filter(|(_, k)| *k)
        .map(|(r, _)| r)
        .collect();
    debug!("dbscan dropped {} of {} reports", before - kept.len(), before);
    kept
}

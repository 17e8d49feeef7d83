//! Vessel metadata enrichment and categorical encoding.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CleanError;
use crate::model::{PositionReport, VesselInfo};

/// Read-only source of static vessel attributes keyed by MMSI.
pub trait VesselDirectory {
    fn vessel_info(&self, mmsi: &str) -> Option<VesselInfo>;
}

/// What to do with reports whose MMSI has no metadata entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingVessel {
    /// Abort enrichment with [`CleanError::UnknownVessel`].
    #[default]
    Fail,
    /// Fill in `Other` with empty subtype and unknown dimensions.
    FillDefaults,
    /// Leave the reports as they are.
    Keep,
}

/// Vessel metadata stored as one JSON object keyed by MMSI.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct VesselRegistry {
    vessels: BTreeMap<String, VesselInfo>,
}

impl VesselRegistry {
    pub fn load(path: &Path) -> Result<Self, CleanError> {
        let reader = BufReader::new(File::open(path)?);
        let registry: VesselRegistry = serde_json::from_reader(reader)?;
        info!("loaded {} vessels from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> Result<(), CleanError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn insert(&mut self, mmsi: impl Into<String>, info: VesselInfo) {
        self.vessels.insert(mmsi.into(), info);
    }

    pub fn contains(&self, mmsi: &str) -> bool {
        self.vessels.contains_key(mmsi)
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }
}

impl VesselDirectory for VesselRegistry {
    fn vessel_info(&self, mmsi: &str) -> Option<VesselInfo> {
        self.vessels.get(mmsi).cloned()
    }
}

fn apply(report: &mut PositionReport, info: &VesselInfo) {
    report.ship_type = Some(info.vessel_type);
    report.ship_subtype = Some(info.vessel_subtype.clone());
    report.length = info.vessel_length;
    report.width = info.vessel_width;
}

/// Overwrites ship type, subtype, length and width of every report with the
/// directory's entry for its MMSI. The directory is asked once per vessel.
pub fn complete_missing_value<D: VesselDirectory + ?Sized>(
    mut reports: Vec<PositionReport>,
    directory: &D,
    policy: MissingVessel,
) -> Result<Vec<PositionReport>, CleanError> {
    let mut cache: HashMap<String, Option<VesselInfo>> = HashMap::new();

    for report in reports.iter_mut() {
        if !cache.contains_key(&report.mmsi) {
            let found = directory.vessel_info(&report.mmsi);
            if found.is_none() {
                match policy {
                    MissingVessel::Fail => {
                        return Err(CleanError::UnknownVessel(report.mmsi.clone()))
                    }
                    MissingVessel::FillDefaults => {
                        warn!("vessel {} not in registry, using defaults", report.mmsi)
                    }
                    MissingVessel::Keep => {
                        warn!("vessel {} not in registry, keeping its own columns", report.mmsi)
                    }
                }
            }
            cache.insert(report.mmsi.clone(), found);
        }

        match (&cache[&report.mmsi], policy) {
            (Some(info), _) => apply(report, info),
            (None, MissingVessel::FillDefaults) => apply(report, &VesselInfo::default()),
            (None, _) => {}
        }
    }

    Ok(reports)
}

/// Category name of an enum value as it is written to csv.
fn category_label<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_value(value) {
        Ok(Value::String(label)) => Some(label),
        _ => None,
    }
}

/// Dense codes over the distinct labels present, sorted by name.
fn category_codes(labels: &[Option<String>]) -> BTreeMap<&str, i32> {
    labels
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .zip(0..)
        .collect()
}

fn code_of(codes: &BTreeMap<&str, i32>, label: &Option<String>) -> i32 {
    label
        .as_deref()
        .and_then(|l| codes.get(l).copied())
        .unwrap_or(-1)
}

/// Replaces ship type and navigational status by integer category codes.
/// Missing values get `-1`.
pub fn encode_categories(reports: &mut [PositionReport]) {
    let ship_labels: Vec<Option<String>> = reports
        .iter()
        .map(|r| r.ship_type.as_ref().and_then(category_label))
        .collect();
    let status_labels: Vec<Option<String>> = reports
        .iter()
        .map(|r| r.navigational_status.as_ref().and_then(category_label))
        .collect();
    let ship_types = category_codes(&ship_labels);
    let statuses = category_codes(&status_labels);

    for (i, r) in reports.iter_mut().enumerate() {
        r.ship_type_code = Some(code_of(&ship_types, &ship_labels[i]));
        r.navigational_status_code = Some(code_of(&statuses, &status_labels[i]));
    }
}

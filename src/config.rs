//! YAML settings for a cleaning run.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::dbscan::DbscanConfig;
use crate::enrich::MissingVessel;
use crate::error::CleanError;
use crate::filters::Column;
use crate::region::BoundingBox;
use crate::time::default_formats;
use crate::trips::TripRules;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    /// Seconds between two reports before a new trip starts.
    pub max_time_diff: i64,
    /// Nautical miles between two reports before a new trip starts, when
    /// `split_on_distance` is set.
    pub max_dis_diff: f64,
    #[serde(default)]
    pub split_on_distance: bool,
    /// Raw csv header -> canonical column name.
    #[serde(default)]
    pub column_rename_dict: HashMap<String, String>,
    #[serde(flatten)]
    pub region: BoundingBox,
    #[serde(rename = "SOG_threshold")]
    pub sog_threshold: f64,
    /// Minimum number of reports per vessel.
    pub minority_threshold: usize,
    /// Minimum number of reports per trip, unchecked when absent.
    #[serde(default)]
    pub trip_minority_threshold: Option<usize>,
    #[serde(default = "default_required_columns")]
    pub required_columns: Vec<Column>,
    #[serde(default = "default_formats")]
    pub timestamp_formats: Vec<String>,
    /// Vessel metadata JSON; enrichment is skipped when absent.
    #[serde(default)]
    pub vessels_info_dic_dir: Option<PathBuf>,
    #[serde(default)]
    pub missing_vessel: MissingVessel,
    #[serde(default)]
    pub dbscan: DbscanConfig,
}

fn default_required_columns() -> Vec<Column> {
    vec![
        Column::Mmsi,
        Column::Time,
        Column::Latitude,
        Column::Longitude,
        Column::Sog,
    ]
}

impl Settings {
    pub fn trip_rules(&self) -> TripRules {
        TripRules {
            max_time_diff: self.max_time_diff,
            max_dis_diff: self.max_dis_diff,
            split_on_distance: self.split_on_distance,
        }
    }

    /// Canonical name for a raw header.
    pub fn rename_column<'a>(&'a self, header: &'a str) -> &'a str {
        let header = header.trim();
        self.column_rename_dict
            .get(header)
            .map(String::as_str)
            .unwrap_or(header)
    }

    /// Rejects values the cleaning steps cannot work with.
    pub fn validate(&self) -> Result<(), CleanError> {
        if self.max_time_diff < 0 || TimeDelta::try_seconds(self.max_time_diff).is_none() {
            return Err(CleanError::InvalidSetting(format!(
                "max_time_diff {} is out of range",
                self.max_time_diff
            )));
        }
        if self.timestamp_formats.is_empty() {
            return Err(CleanError::InvalidSetting(
                "timestamp_formats is empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn get_config(path: &Path) -> Result<Settings, CleanError> {
    let file = File::open(path)?;
    let settings: Settings = serde_yaml::from_reader(file)?;
    settings.validate()?;
    Ok(settings)
}

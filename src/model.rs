use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::time::{format_timestamp, parse_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum NavigationalStatus {
    #[serde(rename = "Unknown value")]
    Unknown,
    #[serde(rename = "Under way using engine")]
    Under,
    #[serde(rename = "Engaged in fishing")]
    Engaged,
    #[serde(rename = "Moored")]
    Moored,
    #[serde(rename = "At anchor")]
    Anchor,
    #[serde(rename = "Restricted maneuverability")]
    Restricted,
    #[serde(rename = "Constrained by her draught")]
    Constrained,
    #[serde(rename = "Not under command")]
    Not,
    #[serde(rename = "Under way sailing")]
    Sailing,
    #[serde(rename = "Aground")]
    Aground,
    #[serde(alias = "Reserved for future use [11]")]
    #[serde(alias = "Reserved for future use [13]")]
    #[serde(alias = "Reserved for future amendment [HSC]")]
    Reserved,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum ShipType {
    Tanker,
    Cargo,
    Fishing,
    Passenger,
    Sailing,
    SAR,
    Pleasure,
    Reserved,
    Tug,
    WIG,
    Medical,
    #[serde(alias = "Anti-pollution")]
    AntiPollution,
    #[serde(alias = "Towing long/wide")]
    Towing,
    Pilot,
    Dredging,
    Military,
    HSC,
    #[serde(alias = "Law enforcement")]
    Law,
    #[serde(alias = "Port tender")]
    Port,
    #[serde(alias = "Diving")]
    Diving,
    #[serde(alias = "Spare 1")]
    #[serde(alias = "Spare 2")]
    Spare,
    Undefined,
    #[serde(other)]
    Other,
}

impl ShipType {
    /// Maps the first word of a registry keyword ("Cargo", "Tanker", ...) to a
    /// ship type. Anything outside the categories the registry publishes is `Other`.
    pub fn from_registry_keyword(keyword: &str) -> ShipType {
        match keyword {
            "Sailing" => ShipType::Sailing,
            "Pleasure" => ShipType::Pleasure,
            "Cargo" => ShipType::Cargo,
            "Fishing" => ShipType::Fishing,
            "Passenger" => ShipType::Passenger,
            "Tanker" => ShipType::Tanker,
            "Tug" => ShipType::Tug,
            "SAR" => ShipType::SAR,
            "HSC" => ShipType::HSC,
            "Dredging" => ShipType::Dredging,
            "Military" => ShipType::Military,
            _ => ShipType::Other,
        }
    }
}

/// One row of an AIS csv file, after the header row went through the
/// configured column renaming. Unparseable cells become `None`.
//1.	time				Timestamp from the AIS basestation
//2.	MMSI				MMSI number of vessel
//3.	latitude			Latitude of message report (e.g. 57.8794)
//4.	longitude			Longitude of message report (e.g. 17.9125)
//5.	navigational_status		e.g.: 'Engaged in fishing', 'Under way using engine'
//6.	SOG				Speed over ground from AIS message if available
//7.	ship_type			Describes the AIS ship type of this vessel
//8.	width/length			Vessel dimensions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(rename = "MMSI", default)]
    pub mmsi: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,
    #[serde(rename = "SOG", default, deserialize_with = "csv::invalid_option")]
    pub sog: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub navigational_status: Option<NavigationalStatus>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub ship_type: Option<ShipType>,
    #[serde(default)]
    pub ship_subtype: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub length: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub width: Option<f64>,
}

/// A single AIS position report plus the columns derived while cleaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionReport {
    #[serde(rename = "MMSI")]
    pub mmsi: String,
    #[serde(rename = "time", serialize_with = "serialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "SOG")]
    pub sog: Option<f64>,
    pub navigational_status: Option<NavigationalStatus>,
    pub ship_type: Option<ShipType>,
    pub ship_subtype: Option<String>,
    /// Decimeters.
    pub length: Option<f64>,
    /// Decimeters.
    pub width: Option<f64>,
    /// Nautical miles to the previous report of the same group.
    pub distance: Option<f64>,
    #[serde(rename = "trips_id")]
    pub trip_id: Option<u64>,
    pub ship_type_code: Option<i32>,
    pub navigational_status_code: Option<i32>,
}

impl PositionReport {
    pub fn from_record(record: Record, timestamp_formats: &[String]) -> PositionReport {
        let timestamp = record
            .time
            .as_deref()
            .and_then(|t| parse_timestamp(t, timestamp_formats));

        PositionReport {
            mmsi: record.mmsi.map(|m| m.trim().to_string()).unwrap_or_default(),
            timestamp,
            latitude: record.latitude,
            longitude: record.longitude,
            sog: record.sog,
            navigational_status: record.navigational_status,
            ship_type: record.ship_type,
            ship_subtype: record.ship_subtype.filter(|s| !s.is_empty()),
            length: record.length,
            width: record.width,
            ..Default::default()
        }
    }

    /// Position as (lat, lon) when both coordinates are present.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

fn serialize_timestamp<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}

/// Column a per-group operation partitions the reports by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Vessel,
    Trip,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Vessel(String),
    Trip(Option<u64>),
}

impl GroupBy {
    pub fn key(&self, report: &PositionReport) -> GroupKey {
        match self {
            GroupBy::Vessel => GroupKey::Vessel(report.mmsi.clone()),
            GroupBy::Trip => GroupKey::Trip(report.trip_id),
        }
    }
}

/// Static vessel attributes as stored in the vessel metadata file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VesselInfo {
    pub vessel_type: ShipType,
    #[serde(default)]
    pub vessel_subtype: String,
    /// Decimeters, `None` when unknown.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vessel_length: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vessel_width: Option<f64>,
}

impl Default for VesselInfo {
    fn default() -> Self {
        VesselInfo {
            vessel_type: ShipType::Other,
            vessel_subtype: String::new(),
            vessel_length: None,
            vessel_width: None,
        }
    }
}

/// Accepts a number, a numeric string, an empty string or null.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ship_type_from_registry_keyword() {
        assert_eq!(ShipType::from_registry_keyword("Cargo"), ShipType::Cargo);
        assert_eq!(ShipType::from_registry_keyword("HSC"), ShipType::HSC);
        assert_eq!(ShipType::from_registry_keyword("Yacht"), ShipType::Other);
    }

    #[test]
    fn test_unlisted_ship_type_is_other() {
        let t: ShipType = serde_json::from_str(r#""Hovercraft""#).unwrap();
        assert_eq!(t, ShipType::Other);
        let t: ShipType = serde_json::from_str(r#""Towing long/wide""#).unwrap();
        assert_eq!(t, ShipType::Towing);
        assert_eq!(serde_json::to_string(&ShipType::Other).unwrap(), r#""Other""#);
    }

    #[test]
    fn test_vessel_info_accepts_empty_dimensions() {
        let info: VesselInfo = serde_json::from_str(
            r#"{"vessel_type": "Tanker", "vessel_subtype": "Oil Products Tanker",
                "vessel_length": "", "vessel_width": 32.0}"#,
        )
        .unwrap();
        assert_eq!(info.vessel_type, ShipType::Tanker);
        assert_eq!(info.vessel_length, None);
        assert_eq!(info.vessel_width, Some(32.0));

        let info: VesselInfo =
            serde_json::from_str(r#"{"vessel_type": "Other", "vessel_length": "1830"}"#).unwrap();
        assert_eq!(info.vessel_length, Some(1830.0));
        assert_eq!(info.vessel_subtype, "");
    }

    #[test]
    fn test_record_from_csv_row() {
        let data = "\
time,MMSI,latitude,longitude,navigational_status,SOG,ship_type,width,length
2023-09-20 00:00:01 UTC,219000873,56.99,10.30,Under way using engine,,Cargo,24,129
2023-09-20 00:00:02.5 UTC,219000873,bad,10.31,Reserved for future use [11],7.2,Anti-pollution,,
";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let records = rdr
            .deserialize::<Record>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        let formats = crate::time::default_formats();
        let first = PositionReport::from_record(records[0].clone(), &formats);
        assert_eq!(first.mmsi, "219000873");
        assert_eq!(first.sog, None);
        assert_eq!(first.navigational_status, Some(NavigationalStatus::Under));
        assert_eq!(first.ship_type, Some(ShipType::Cargo));
        assert_eq!(first.length, Some(129.0));

        let second = PositionReport::from_record(records[1].clone(), &formats);
        assert_eq!(second.latitude, None);
        assert_eq!(second.navigational_status, Some(NavigationalStatus::Reserved));
        assert_eq!(second.ship_type, Some(ShipType::AntiPollution));
        assert!(second.timestamp.is_some());
    }
}

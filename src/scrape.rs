//! Best-effort vessel metadata scraper.
//!
//! Ship type and subtype come from the keywords meta tag of a public vessel
//! details page; length and width come from a JSON ship lookup API. Both
//! lookups report failures as [`ScrapeError`]; [`VesselScraper::lookup_best_effort`]
//! logs them and falls back to defaults.

use std::time::Duration;

use log::{info, warn};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use serde_json::Value;

use crate::enrich::{VesselDirectory, VesselRegistry};
use crate::error::ScrapeError;
use crate::model::{ShipType, VesselInfo};

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/104.0.0.0 Safari/537.36";

// layout of the comma separated keywords: "vessel NAME, ..., <subtype>, <type> ..."
const SUBTYPE_FIELD: usize = 2;
const SUBTYPE_PREFIX_LEN: usize = 13;
const TYPE_FIELD: usize = 3;

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Vessel details page, `{mmsi}` is substituted.
    pub details_url: String,
    pub referer: String,
    /// Endpoint receiving a form-encoded `mmsi` field.
    pub dimensions_url: String,
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            details_url: "https://www.marinetraffic.com/en/ais/details/ships/mmsi:{mmsi}"
                .to_string(),
            referer: "https://www.marinetraffic.com/".to_string(),
            dimensions_url: "http://www.shipfinder.com/ship/GetShip".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct VesselScraper {
    config: ScraperConfig,
    client: Client,
    meta_tag: Regex,
    attribute: Regex,
}

impl VesselScraper {
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            client,
            meta_tag: meta_tag_regex(),
            attribute: attribute_regex(),
        })
    }

    pub fn with_defaults() -> Result<Self, ScrapeError> {
        Self::new(ScraperConfig::default())
    }

    /// Ship type and subtype from the vessel details page.
    pub fn fetch_type(&self, mmsi: &str) -> Result<(ShipType, String), ScrapeError> {
        let url = self.config.details_url.replace("{mmsi}", mmsi);
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_AGENT)
            .header(REFERER, &self.config.referer)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()?;
        if response.status().as_u16() != 200 {
            return Err(ScrapeError::Status(response.status().as_u16()));
        }

        let html = response.text()?;
        parse_type_keywords(&self.meta_tag, &self.attribute, &html)
    }

    /// Length and width in decimeters from the ship lookup API.
    pub fn fetch_dimensions(&self, mmsi: &str) -> Result<(f64, f64), ScrapeError> {
        let response = self
            .client
            .post(&self.config.dimensions_url)
            .form(&[("mmsi", mmsi)])
            .send()?;
        if response.status().as_u16() != 200 {
            return Err(ScrapeError::Status(response.status().as_u16()));
        }

        parse_dimensions(&response.text()?)
    }

    /// Runs both lookups; whatever fails is logged and left at its default.
    pub fn lookup_best_effort(&self, mmsi: &str) -> VesselInfo {
        let mut info = VesselInfo::default();

        match self.fetch_type(mmsi) {
            Ok((vessel_type, subtype)) => {
                info.vessel_type = vessel_type;
                info.vessel_subtype = subtype;
            }
            Err(e) => warn!("type lookup for {mmsi} failed ({}): {e}", e.kind()),
        }

        match self.fetch_dimensions(mmsi) {
            Ok((length, width)) => {
                info.vessel_length = Some(length);
                info.vessel_width = Some(width);
            }
            Err(e) => warn!("dimension lookup for {mmsi} failed ({}): {e}", e.kind()),
        }

        info
    }

    /// Scrapes every MMSI not yet in `registry`. Returns how many were added.
    pub fn collect_missing<'a>(
        &self,
        mmsis: impl IntoIterator<Item = &'a str>,
        registry: &mut VesselRegistry,
    ) -> usize {
        let mut added = 0;
        for mmsi in mmsis {
            if registry.contains(mmsi) {
                continue;
            }
            registry.insert(mmsi, self.lookup_best_effort(mmsi));
            added += 1;
        }
        info!("scraped {added} vessels, registry holds {}", registry.len());
        added
    }
}

impl VesselDirectory for VesselScraper {
    fn vessel_info(&self, mmsi: &str) -> Option<VesselInfo> {
        Some(self.lookup_best_effort(mmsi))
    }
}

fn meta_tag_regex() -> Regex {
    Regex::new(r"(?is)<meta\s[^>]*>").expect("static regex")
}

fn attribute_regex() -> Regex {
    Regex::new(r#"([A-Za-z_:-]+)\s*=\s*"([^"]*)""#).expect("static regex")
}

/// Extracts (type, subtype) from the keywords meta tag of a details page.
fn parse_type_keywords(
    meta_tag: &Regex,
    attribute: &Regex,
    html: &str,
) -> Result<(ShipType, String), ScrapeError> {
    let keywords = meta_tag
        .find_iter(html)
        .map(|tag| {
            attribute
                .captures_iter(tag.as_str())
                .map(|c| (c[1].to_ascii_lowercase(), c[2].to_string()))
                .collect::<Vec<_>>()
        })
        .find_map(|attrs| {
            let get = |name: &str| attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
            let content = get("content")?;
            let matches = content.starts_with("vessel ")
                && get("data-react-helmet") == Some("true")
                && get("name") == Some("keywords");
            matches.then(|| content.to_string())
        })
        .ok_or(ScrapeError::MissingField("keywords"))?;

    let fields: Vec<&str> = keywords.split(',').collect();

    let type_word = fields
        .get(TYPE_FIELD)
        .and_then(|f| f.get(1..))
        .and_then(|f| f.split(' ').next())
        .ok_or(ScrapeError::MissingField("vessel_type"))?;
    let subtype = fields
        .get(SUBTYPE_FIELD)
        .and_then(|f| f.get(SUBTYPE_PREFIX_LEN..))
        .ok_or(ScrapeError::MissingField("vessel_subtype"))?;

    Ok((ShipType::from_registry_keyword(type_word), subtype.trim().to_string()))
}

fn as_f64(value: &Value, field: &'static str) -> Result<f64, ScrapeError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ScrapeError::Parse(format!("{field} is not a float"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ScrapeError::Parse(format!("{field} '{s}' is not a number"))),
        Value::Null => Err(ScrapeError::MissingField(field)),
        other => Err(ScrapeError::Parse(format!("{field} has unexpected value {other}"))),
    }
}

/// Extracts (length, width) from a `{"data": [{"length": .., "width": ..}]}` body.
pub fn parse_dimensions(body: &str) -> Result<(f64, f64), ScrapeError> {
    let json: Value = serde_json::from_str(body).map_err(|e| ScrapeError::Parse(e.to_string()))?;
    let ship = json
        .get("data")
        .and_then(|d| d.get(0))
        .ok_or(ScrapeError::MissingField("data"))?;

    let length = as_f64(ship.get("length").unwrap_or(&Value::Null), "length")?;
    let width = as_f64(ship.get("width").unwrap_or(&Value::Null), "width")?;
    Ok((length, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords_page(content: &str, helmet: &str) -> String {
        format!(
            r#"<html><head>
<meta charset="utf-8">
<meta name="description" content="vessel details">
<meta data-react-helmet="{helmet}" name="keywords" content="{content}">
</head><body></body></html>"#
        )
    }

    fn parse(html: &str) -> Result<(ShipType, String), ScrapeError> {
        parse_type_keywords(&meta_tag_regex(), &attribute_regex(), html)
    }

    #[test]
    fn test_parse_type_keywords() {
        let html = keywords_page(
            "vessel ICE MOON, IMO 9428217, ship type is General Cargo, Cargo vessel, AIS",
            "true",
        );
        let (vessel_type, subtype) = parse(&html).unwrap();
        assert_eq!(vessel_type, ShipType::Cargo);
        assert_eq!(subtype, "General Cargo");
    }

    #[test]
    fn test_unlisted_type_becomes_other() {
        let html = keywords_page(
            "vessel SEA BIRD, IMO 1234567, ship type is Yacht, Yacht vessel",
            "true",
        );
        assert_eq!(parse(&html).unwrap().0, ShipType::Other);
    }

    #[test]
    fn test_missing_keywords() {
        let err = parse(&keywords_page("vessel A, B, ship type is X, Cargo", "false")).unwrap_err();
        assert_eq!(err.kind(), "missing-field");

        let err = parse(&keywords_page("vessel A, B", "true")).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingField("vessel_type")));
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(
            parse_dimensions(r#"{"data": [{"length": "1290", "width": 240}]}"#).unwrap(),
            (1290.0, 240.0)
        );

        let err = parse_dimensions(r#"{"data": []}"#).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingField("data")));

        let err = parse_dimensions(r#"{"data": [{"length": "n/a", "width": 1}]}"#).unwrap_err();
        assert_eq!(err.kind(), "parse");

        let err = parse_dimensions("<html>").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_unreachable_service_falls_back_to_defaults() {
        let scraper = VesselScraper::new(ScraperConfig {
            details_url: "http://127.0.0.1:9/{mmsi}".to_string(),
            referer: String::new(),
            dimensions_url: "http://127.0.0.1:9/".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        assert_eq!(scraper.lookup_best_effort("219000001"), VesselInfo::default());

        let mut registry = VesselRegistry::default();
        assert_eq!(scraper.collect_missing(["219000001", "219000001"], &mut registry), 1);
        assert_eq!(registry.vessel_info("219000001"), Some(VesselInfo::default()));
    }
}

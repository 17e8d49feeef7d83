pub mod config;
pub mod dbscan;
pub mod distance;
pub mod enrich;
pub mod error;
pub mod files;
pub mod filters;
pub mod model;
pub mod region;
pub mod scrape;
pub mod time;
pub mod trips;

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::info;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use config::{get_config, Settings};
use enrich::{VesselDirectory, VesselRegistry};
use error::CleanError;
use model::{GroupBy, PositionReport, Record};

#[derive(Debug)]
pub struct Config {
    paths: Vec<String>,
    settings: PathBuf,
    output_dir: PathBuf,
    collect_vessels: bool,
}

fn cli() -> Command {
    Command::new("deep_sea")
        .version("0.1")
        .about("clean AIS csv files and split them into trips")
        .arg(
            Arg::new("paths")
                .short('f')
                .long("file-path")
                .action(ArgAction::Append)
                .required(true)
                .help("csv file to clean, may be repeated"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .required(true)
                .help("yaml settings file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output-dir")
                .default_value("cleaned")
                .help("directory receiving the cleaned files"),
        )
        .arg(
            Arg::new("collect-vessels")
                .long("collect-vessels")
                .action(ArgAction::SetTrue)
                .help("scrape metadata for every vessel in the files into the vessel registry"),
        )
}

pub fn get_arg() -> Result<Config> {
    config_from(&cli().get_matches())
}

fn config_from(matches: &ArgMatches) -> Result<Config> {
    let files = matches
        .get_many::<String>("paths")
        .unwrap_or_default()
        .cloned()
        .collect::<Vec<String>>();
    let settings = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .context("missing --config")?;
    let output_dir = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .context("missing --output-dir")?;

    Ok(Config {
        paths: files,
        settings,
        output_dir,
        collect_vessels: matches.get_flag("collect-vessels"),
    })
}

pub fn run(config: Config) -> Result<()> {
    info!("config is {:?}", config);

    let settings = get_config(&config.settings)
        .with_context(|| format!("failed to load settings {}", config.settings.display()))?;

    if config.collect_vessels {
        return collect_vessels(&config, &settings);
    }

    let registry = match &settings.vessels_info_dic_dir {
        Some(path) => Some(
            VesselRegistry::load(path)
                .with_context(|| format!("failed to load vessel registry {}", path.display()))?,
        ),
        None => None,
    };

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    config
        .paths
        .par_iter()
        .map(|x| {
            let directory = registry.as_ref().map(|r| r as &dyn VesselDirectory);
            process_file(x, &settings, directory, &config.output_dir)
        })
        .collect::<Result<_>>()
}

fn collect_vessels(config: &Config, settings: &Settings) -> Result<()> {
    let Some(registry_path) = &settings.vessels_info_dic_dir else {
        bail!("--collect-vessels needs vessels_info_dic_dir in the settings");
    };

    let mut registry = if registry_path.exists() {
        VesselRegistry::load(registry_path)?
    } else {
        VesselRegistry::default()
    };

    let per_file = config
        .paths
        .par_iter()
        .map(|p| {
            read_reports(Path::new(p), settings).with_context(|| format!("failed to read {p}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let mmsis: BTreeSet<String> = per_file
        .into_iter()
        .flat_map(filters::filter_mmsi)
        .map(|r| r.mmsi)
        .collect();

    let scraper = scrape::VesselScraper::with_defaults()?;
    scraper.collect_missing(mmsis.iter().map(String::as_str), &mut registry);
    registry.save(registry_path)?;

    Ok(())
}

/// Reads an AIS csv file, renaming its header row through the settings.
pub fn read_reports(path: &Path, settings: &Settings) -> Result<Vec<PositionReport>, CleanError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: csv::StringRecord = rdr
        .headers()?
        .iter()
        .map(|h| settings.rename_column(h))
        .collect();

    let mut reports = Vec::new();
    for result in rdr.records() {
        let record: Record = result?.deserialize(Some(&headers))?;
        reports.push(PositionReport::from_record(record, &settings.timestamp_formats));
    }
    Ok(reports)
}

pub fn write_reports(path: &Path, reports: &[PositionReport]) -> Result<(), CleanError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in reports {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

fn log_step(step: &str, before: usize, reports: &[PositionReport]) {
    info!("{step}: {before} -> {} records", reports.len());
}

/// Runs the full cleaning chain over one dataset. Trip ids start at zero.
pub fn clean(
    reports: Vec<PositionReport>,
    settings: &Settings,
    directory: Option<&dyn VesselDirectory>,
) -> Result<Vec<PositionReport>, CleanError> {
    let n = reports.len();
    let reports = filters::filter_missing_value(reports, &settings.required_columns);
    log_step("missing values", n, &reports);

    let n = reports.len();
    let reports = filters::filter_mmsi(reports);
    log_step("mmsi", n, &reports);

    let n = reports.len();
    let reports = filters::filter_sog(reports, settings.sog_threshold);
    log_step("speed", n, &reports);

    let n = reports.len();
    let reports = filters::remove_outliers(reports, &settings.region);
    log_step("region", n, &reports);

    let n = reports.len();
    let reports = filters::drop_duplicates(reports);
    log_step("duplicates", n, &reports);

    let n = reports.len();
    let mut reports =
        filters::filter_minority(reports, settings.minority_threshold, GroupBy::Vessel);
    log_step("vessel minority", n, &reports);

    let counter = trips::split_trips(&mut reports, &settings.trip_rules());
    info!("split {} records into {} trips", reports.len(), counter.total());
    distance::annotate_distances(&mut reports, GroupBy::Trip);

    if settings.dbscan.enabled {
        let n = reports.len();
        reports = dbscan::filter_outliers_dbscan(
            reports,
            settings.dbscan.eps,
            settings.dbscan.min_samples,
        );
        log_step("dbscan", n, &reports);
        // dropped points change the predecessor of their successors
        distance::annotate_distances(&mut reports, GroupBy::Trip);
    }

    if let Some(threshold) = settings.trip_minority_threshold {
        let n = reports.len();
        reports = filters::filter_minority(reports, threshold, GroupBy::Trip);
        log_step("trip minority", n, &reports);
    }

    if let Some(directory) = directory {
        reports = enrich::complete_missing_value(reports, directory, settings.missing_vessel)?;
    }

    enrich::encode_categories(&mut reports);
    Ok(reports)
}

pub fn process_file(
    path: &str,
    settings: &Settings,
    directory: Option<&dyn VesselDirectory>,
    output_dir: &Path,
) -> Result<()> {
    let reports = read_reports(Path::new(path), settings)
        .with_context(|| format!("failed to read {path}"))?;
    let read = reports.len();

    let cleaned =
        clean(reports, settings, directory).with_context(|| format!("failed to clean {path}"))?;

    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("ais");
    let out = output_dir.join(format!("{stem}_cleaned.csv"));
    write_reports(&out, &cleaned).with_context(|| format!("failed to write {}", out.display()))?;

    info!("{} has {} of {} records passed.", path, cleaned.len(), read);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ShipType, VesselInfo};

    const RAW: &str = "\
# Timestamp,Type of mobile,MMSI,Latitude,Longitude,Navigational status,SOG,Ship type
2023-09-20 00:00:00 UTC,Class A,219000001,56.000,11.000,Under way using engine,10.0,Cargo
2023-09-20 00:01:00 UTC,Class A,219000001,56.010,11.000,Under way using engine,10.0,Cargo
2023-09-20 00:01:00 UTC,Class A,219000001,56.010,11.000,Under way using engine,10.0,Cargo
2023-09-20 00:02:00.500 UTC,Class A,219000001,56.020,11.000,Under way using engine,10.0,Cargo
2023-09-20 03:00:00 UTC,Class A,219000001,56.500,11.500,Moored,0.0,Cargo
2023-09-20 03:01:00 UTC,Class A,219000001,56.500,11.500,Moored,0.0,Cargo
2023-09-20 00:00:00 UTC,Class A,219000002,57.000,12.000,Engaged in fishing,4.0,Fishing
2023-09-20 00:01:00 UTC,Class A,219000002,57.001,12.000,Engaged in fishing,,Fishing
2023-09-20 00:02:00 UTC,Class A,219000002,57.002,12.000,Engaged in fishing,62.0,Fishing
2023-09-20 00:00:00 UTC,Base Station,992191234,56.500,11.500,Unknown value,0.0,Undefined
2023-09-20 00:00:00 UTC,Class A,219000003,60.000,11.000,Under way using engine,10.0,Cargo
garbage,Class A,219000001,56.100,11.000,Under way using engine,10.0,Cargo
";

    fn settings() -> Settings {
        serde_yaml::from_str(
            r##"
max_time_diff: 3600
max_dis_diff: 10.0
column_rename_dict:
  "# Timestamp": time
  Latitude: latitude
  Longitude: longitude
  Navigational status: navigational_status
  Ship type: ship_type
LAT_MIN: 55.5
LAT_MAX: 58.0
LON_MIN: 10.3
LON_MAX: 13.0
SOG_threshold: 50.0
minority_threshold: 2
"##,
        )
        .unwrap()
    }

    fn write_raw(dir: &Path) -> PathBuf {
        let path = dir.join("aisdk-2023-09-20.csv");
        fs::write(&path, RAW).unwrap();
        path
    }

    #[test]
    fn test_cli_defaults_and_repeated_files() {
        let matches = cli()
            .try_get_matches_from(["deep_sea", "-f", "a.csv", "-f", "b.csv", "-c", "s.yaml"])
            .unwrap();
        let config = config_from(&matches).unwrap();
        assert_eq!(config.paths, vec!["a.csv", "b.csv"]);
        assert_eq!(config.settings, PathBuf::from("s.yaml"));
        assert_eq!(config.output_dir, PathBuf::from("cleaned"));
        assert!(!config.collect_vessels);

        let matches = cli()
            .try_get_matches_from(["deep_sea", "-f", "a.csv", "-c", "s.yaml", "-o", "out"])
            .unwrap();
        assert_eq!(config_from(&matches).unwrap().output_dir, PathBuf::from("out"));

        assert!(cli().try_get_matches_from(["deep_sea", "-f", "a.csv"]).is_err());
    }

    #[test]
    fn test_read_reports_renames_headers() {
        let dir = tempfile::tempdir().unwrap();
        let reports = read_reports(&write_raw(dir.path()), &settings()).unwrap();
        assert_eq!(reports.len(), 12);
        assert_eq!(reports[0].mmsi, "219000001");
        assert_eq!(reports[0].latitude, Some(56.0));
        assert_eq!(reports[0].ship_type, Some(ShipType::Cargo));
        assert!(reports[3].timestamp.is_some());
        assert_eq!(reports[7].sog, None);
        assert_eq!(reports[11].timestamp, None);
    }

    #[test]
    fn test_clean_chain() {
        let dir = tempfile::tempdir().unwrap();
        let reports = read_reports(&write_raw(dir.path()), &settings()).unwrap();
        let cleaned = clean(reports, &settings(), None).unwrap();

        // vessel 219000002 keeps a single valid report and falls under the minority threshold
        assert!(cleaned.iter().all(|r| r.mmsi == "219000001"));
        assert_eq!(cleaned.len(), 5);

        let trips: Vec<_> = cleaned.iter().map(|r| r.trip_id.unwrap()).collect();
        assert_eq!(trips, vec![0, 0, 0, 1, 1]);
        assert_eq!(cleaned[0].distance, Some(0.0));
        assert!(cleaned[1].distance.unwrap() > 0.5);
        assert_eq!(cleaned[3].distance, Some(0.0));
        assert_eq!(cleaned[4].distance, Some(0.0));
        assert!(cleaned.iter().all(|r| r.ship_type_code == Some(0)));
        let statuses: Vec<_> = cleaned
            .iter()
            .map(|r| r.navigational_status_code.unwrap())
            .collect();
        assert_eq!(statuses, vec![1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_clean_with_registry() {
        let dir = tempfile::tempdir().unwrap();
        let reports = read_reports(&write_raw(dir.path()), &settings()).unwrap();

        let mut registry = VesselRegistry::default();
        registry.insert(
            "219000001",
            VesselInfo {
                vessel_type: ShipType::Tanker,
                vessel_subtype: "Oil Products Tanker".to_string(),
                vessel_length: Some(1830.0),
                vessel_width: Some(320.0),
            },
        );
        let cleaned = clean(reports.clone(), &settings(), Some(&registry)).unwrap();
        assert!(cleaned.iter().all(|r| r.ship_type == Some(ShipType::Tanker)));
        assert!(cleaned.iter().all(|r| r.length == Some(1830.0)));

        let mut strict = settings();
        strict.minority_threshold = 1;
        let err = clean(reports, &strict, Some(&registry)).unwrap_err();
        assert!(matches!(err, CleanError::UnknownVessel(_)));
    }

    #[test]
    fn test_process_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_raw(dir.path());
        let out_dir = dir.path().join("out");
        fs::create_dir(&out_dir).unwrap();

        process_file(input.to_str().unwrap(), &settings(), None, &out_dir).unwrap();

        let written = fs::read_to_string(out_dir.join("aisdk-2023-09-20_cleaned.csv")).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next().unwrap(),
            "MMSI,time,latitude,longitude,SOG,navigational_status,ship_type,ship_subtype,\
             length,width,distance,trips_id,ship_type_code,navigational_status_code"
        );
        assert!(lines.next().unwrap().starts_with(
            "219000001,2023-09-20 00:00:00 UTC,56.0,11.0,10.0,Under way using engine,Cargo,"
        ));
        assert_eq!(written.lines().count(), 6);

        // output reads back through the default settings layout
        let mut reread_settings = settings();
        reread_settings.column_rename_dict.clear();
        let reread =
            read_reports(&out_dir.join("aisdk-2023-09-20_cleaned.csv"), &reread_settings).unwrap();
        assert_eq!(reread.len(), 5);
        assert_eq!(reread[2].timestamp, {
            let mut expected = reread[1].timestamp.unwrap();
            expected += chrono::TimeDelta::milliseconds(60_500);
            Some(expected)
        });
    }
}

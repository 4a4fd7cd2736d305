use log::{debug, info, warn};

use attendance_report::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::dash::config_reader::*;
use crate::dash::gallery::*;

pub mod config_reader;
pub mod gallery;
pub mod io_common;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum DashError {
    #[snafu(display("Error opening workbook {path}"))]
    OpeningWorkbook {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Sheet {sheet} is missing from the workbook"))]
    MissingSheet { sheet: String },
    #[snafu(display("Sheet {sheet} has no column {column}"))]
    SchemaMismatch { sheet: String, column: String },
    #[snafu(display("Sheet {sheet}, row {row}: cannot read date {value:?}"))]
    MalformedDate {
        sheet: String,
        row: usize,
        value: String,
    },
    #[snafu(display("Sheet {sheet}, row {row}: no value in column {column}"))]
    MissingValue {
        sheet: String,
        row: usize,
        column: String,
    },
    #[snafu(display("Cannot read date range endpoint {value:?}"))]
    InvalidDateRange { value: String },
    #[snafu(display("Error reading file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error in JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the report to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The report differs from the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;

/// The options of one run, once the command line and the configuration file
/// are merged.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunSettings {
    pub input: PathBuf,
    pub sheets: SheetNames,
    pub asset_dir: PathBuf,
    pub endpoints: Vec<NaiveDate>,
    pub out: Option<String>,
    pub reference: Option<String>,
}

/// Command line options override the configuration file.
pub fn resolve_settings(args: &Args) -> DashResult<RunSettings> {
    let (config, base_dir) = match &args.config {
        Some(p) => {
            let config = read_config(p)?;
            let dir = Path::new(p).parent().map(|d| d.to_path_buf());
            (config, dir)
        }
        None => (DashboardConfig::default(), None),
    };
    let base = base_dir.as_deref();

    let input = match (&args.input, &config.file_path) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(p)) => resolve_path(base, p),
        (None, None) => {
            whatever!("No input workbook: use --input or set filePath in the configuration")
        }
    };
    let asset_dir = match (&args.assets, &config.asset_directory) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(p)) => resolve_path(base, p),
        (None, None) => PathBuf::from(DEFAULT_ASSET_DIR),
    };
    let endpoint_values: Vec<String> = match &args.dates {
        Some(dates) if !dates.is_empty() => dates.clone(),
        _ => config.date_range.clone().unwrap_or_default(),
    };
    let out = args.out.clone().or_else(|| {
        config
            .output_path
            .as_ref()
            .map(|p| resolve_path(base, p).display().to_string())
    });

    Ok(RunSettings {
        input,
        sheets: config.sheet_names(),
        asset_dir,
        endpoints: parse_endpoints(&endpoint_values)?,
        out,
        reference: args.reference.clone(),
    })
}

fn date_js(d: &NaiveDate) -> JSValue {
    json!(d.format("%Y-%m-%d").to_string())
}

fn kind_js(k: &Option<ParticipantKind>) -> JSValue {
    match k {
        Some(k) => json!(k.as_str()),
        None => JSValue::Null,
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn range_js(selection: &DateSelection, bounds: Option<(NaiveDate, NaiveDate)>) -> JSValue {
    let available = match bounds {
        Some((start, end)) => json!({"start": date_js(&start), "end": date_js(&end)}),
        None => JSValue::Null,
    };
    // Without a selection, the whole span of the data is shown.
    let (filtered, start, end) = match (selection, bounds) {
        (DateSelection::Between(start, end), _) => (true, date_js(start), date_js(end)),
        (DateSelection::All, Some((start, end))) => (false, date_js(&start), date_js(&end)),
        (DateSelection::All, None) => (false, JSValue::Null, JSValue::Null),
    };
    json!({"filtered": filtered, "start": start, "end": end, "available": available})
}

fn notice(code: &str, message: &str) -> JSValue {
    info!("{}", message);
    json!({"code": code, "message": message})
}

fn notices_js(report: &Report, gallery: &[GalleryEntry]) -> Vec<JSValue> {
    let mut res: Vec<JSValue> = Vec::new();
    if report.event_summaries.is_empty() {
        res.push(notice(
            "no_events",
            "No encounter found for the selected range.",
        ));
    }
    if report.roster.is_empty() {
        res.push(notice(
            "no_attendees",
            "No participant found for the selected range.",
        ));
    }
    if report.locations.is_empty() {
        res.push(notice(
            "no_coordinates",
            "No coordinates available for the selected range.",
        ));
    }
    if report.event_dates.is_empty() {
        res.push(notice("no_dates", "No date found for the selected range."));
    } else if gallery.iter().all(|g| g.path.is_none()) {
        res.push(notice(
            "no_photos",
            "No photo found for the selected dates.",
        ));
    }
    res
}

/// Assembles the document handed over to the presentation layer.
pub fn report_to_json(
    selection: &DateSelection,
    bounds: Option<(NaiveDate, NaiveDate)>,
    report: &Report,
    gallery: &[GalleryEntry],
) -> JSValue {
    let k = &report.kpis;
    let kpis = json!({
        "uniqueAdults": k.unique_adults,
        "uniqueChildren": k.unique_children,
        "encounters": k.total_event_dates,
        "meanAdultAttendance": k.mean_adult_attendance,
        "adultAttendanceRate": k.adult_attendance_rate,
    });

    let presence_over_time: Vec<JSValue> = report
        .presence_over_time
        .iter()
        .map(|dc| json!({"date": date_js(&dc.date), "count": dc.count}))
        .collect();

    let presence_by_kind: Vec<JSValue> = report
        .presence_by_kind
        .iter()
        .map(|kc| {
            json!({"date": date_js(&kc.date), "kind": kc.kind.as_str(), "count": kc.count})
        })
        .collect();

    let event_summaries: Vec<JSValue> = report
        .event_summaries
        .iter()
        .map(|s| {
            json!({
                "date": date_js(&s.date),
                "adultsPresent": s.adults_present,
                "childrenPresent": s.children_present,
                "visitors": s.visitors,
                "dynamic": s.dynamic,
                "dynamicTheme": s.dynamic_theme,
                "minister": s.minister,
                "sermonTheme": s.sermon_theme,
                "baseVerse": s.base_verse,
                "locationOwner": s.location_owner,
            })
        })
        .collect();

    let roster: Vec<JSValue> = report
        .roster
        .iter()
        .map(|r| {
            json!({
                "date": date_js(&r.date),
                "participant": r.participant,
                "kind": kind_js(&r.kind),
            })
        })
        .collect();

    let locations: Vec<JSValue> = report
        .locations
        .iter()
        .map(|g| json!({"lat": g.latitude, "lon": g.longitude, "neighborhood": g.neighborhood}))
        .collect();

    // Dates without a photo are left out of the gallery.
    let gallery_js: Vec<JSValue> = gallery
        .iter()
        .filter_map(|g| {
            g.path.as_ref().map(|p| {
                json!({
                    "date": date_js(&g.date),
                    "caption": g.caption,
                    "path": p.display().to_string(),
                })
            })
        })
        .collect();

    json!({
        "range": range_js(selection, bounds),
        "kpis": kpis,
        "presenceOverTime": presence_over_time,
        "presenceByKind": presence_by_kind,
        "eventSummaries": event_summaries,
        "roster": roster,
        "locations": locations,
        "gallery": gallery_js,
        "notices": notices_js(report, gallery),
    })
}

fn log_kpis(k: &Kpis) {
    info!("Participants (adults): {}", k.unique_adults);
    info!("Children (kids/teen/baby): {}", k.unique_children);
    info!("Encounters: {}", k.total_event_dates);
    info!("Mean attendance (adults): {}", round1(k.mean_adult_attendance));
    info!("Attendance rate (adults): {}%", round1(k.adult_attendance_rate));
}

/// Runs the pipeline on loaded tables and renders the result.
pub fn build_dashboard(tables: &Tables, endpoints: &[NaiveDate], asset_dir: &Path) -> JSValue {
    let enriched = enrich(tables);
    let bounds = date_bounds(&enriched);
    let selection = DateSelection::from_endpoints(endpoints);
    let filtered = filter_records(&enriched, &selection);
    let report = build_report(&filtered);
    log_kpis(&report.kpis);
    let gallery = find_photos(asset_dir, &report.event_dates);
    debug!("build_dashboard: gallery: {:?}", gallery);
    report_to_json(&selection, bounds, &report, &gallery)
}

fn write_output(out: Option<&str>, contents: &str) -> DashResult<()> {
    match out {
        None | Some("stdout") => {
            println!("{}", contents);
        }
        Some(path) => {
            info!("Writing report to {:?}", path);
            fs::write(path, contents).context(WritingOutputSnafu { path })?;
        }
    }
    Ok(())
}

/// Compares the report with a reference report, printing the differences.
pub fn check_reference(reference_path: &str, pretty_report: &str) -> DashResult<()> {
    let contents =
        fs::read_to_string(reference_path).context(OpeningFileSnafu { path: reference_path })?;
    let reference_js: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let pretty_reference =
        serde_json::to_string_pretty(&reference_js).context(ParsingJsonSnafu {})?;
    if pretty_reference != pretty_report {
        warn!("Found differences with the reference report");
        print_diff(pretty_reference.as_str(), pretty_report, "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("The report matches the reference {:?}", reference_path);
    Ok(())
}

pub fn run_report(args: &Args) -> DashResult<()> {
    let settings = resolve_settings(args)?;
    info!("settings: {:?}", settings);

    let tables = io_xlsx::read_workbook(&settings.input, &settings.sheets)?;
    let report_js = build_dashboard(&tables, &settings.endpoints, &settings.asset_dir);

    let pretty = serde_json::to_string_pretty(&report_js).context(ParsingJsonSnafu {})?;
    write_output(settings.out.as_deref(), &pretty)?;

    if let Some(reference) = &settings.reference {
        check_reference(reference, &pretty)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_report::builder::Builder;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fixture_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/dados_connect.xlsx")
    }

    fn no_photos() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/no_photos")
    }

    fn sample_tables() -> Tables {
        let mut b = Builder::new();
        b.add_participant_simple("A", "adulto");
        b.add_participant_simple("B", "kids");
        b.add_attendance_simple("A", d(2024, 1, 1), "presente");
        b.add_attendance_simple("B", d(2024, 1, 1), "presente");
        b.add_attendance_simple("A", d(2024, 1, 8), "ausente");
        let mut e = EventInfo::new(d(2024, 1, 1));
        e.minister = Some("Rui".to_string());
        e.latitude = Some(-23.5);
        e.longitude = Some(-46.6);
        b.add_event(e);
        b.build()
    }

    fn codes(js: &JSValue) -> Vec<String> {
        js["notices"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["code"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn json_sections() {
        let js = build_dashboard(&sample_tables(), &[], &no_photos());
        assert_eq!(js["kpis"]["uniqueAdults"], json!(1));
        assert_eq!(js["kpis"]["uniqueChildren"], json!(1));
        assert_eq!(js["kpis"]["encounters"], json!(2));
        assert_eq!(js["kpis"]["adultAttendanceRate"], json!(50.0));
        assert_eq!(
            js["presenceOverTime"],
            json!([{"date": "2024-01-01", "count": 2}])
        );
        assert_eq!(js["presenceByKind"].as_array().unwrap().len(), 2);
        assert_eq!(js["eventSummaries"][0]["minister"], json!("Rui"));
        assert_eq!(js["eventSummaries"][0]["dynamic"], JSValue::Null);
        assert_eq!(js["roster"][0]["kind"], json!("adulto"));
        // Neither participant has a neighborhood.
        assert_eq!(js["locations"], json!([]));
        assert_eq!(
            js["range"],
            json!({
                "filtered": false,
                "start": "2024-01-01",
                "end": "2024-01-08",
                "available": {"start": "2024-01-01", "end": "2024-01-08"}
            })
        );
        assert_eq!(codes(&js), vec!["no_coordinates", "no_photos"]);
    }

    #[test]
    fn json_empty_range() {
        let js = build_dashboard(
            &sample_tables(),
            &[d(2025, 1, 1), d(2025, 2, 1)],
            &no_photos(),
        );
        assert_eq!(js["kpis"]["uniqueAdults"], json!(0));
        assert_eq!(js["kpis"]["meanAdultAttendance"], json!(0.0));
        assert_eq!(js["kpis"]["adultAttendanceRate"], json!(0.0));
        for section in [
            "presenceOverTime",
            "presenceByKind",
            "eventSummaries",
            "roster",
            "locations",
            "gallery",
        ] {
            assert_eq!(js[section], json!([]), "{}", section);
        }
        assert_eq!(js["range"]["filtered"], json!(true));
        assert_eq!(
            codes(&js),
            vec!["no_events", "no_attendees", "no_coordinates", "no_dates"]
        );
    }

    #[test]
    fn rounding() {
        assert_eq!(round1(66.666), 66.7);
        assert_eq!(round1(0.0), 0.0);
    }

    #[test]
    fn reference_comparison() {
        let dir =
            std::env::temp_dir().join(format!("connectdash-reference-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let js = build_dashboard(&sample_tables(), &[], &no_photos());
        let pretty = serde_json::to_string_pretty(&js).unwrap();

        // The reference may be formatted differently.
        let same = dir.join("same.json");
        fs::write(&same, serde_json::to_string(&js).unwrap()).unwrap();
        assert!(check_reference(same.to_str().unwrap(), &pretty).is_ok());

        let mut other_js = js.clone();
        other_js["kpis"]["uniqueAdults"] = json!(3);
        let other = dir.join("other.json");
        fs::write(&other, serde_json::to_string(&other_js).unwrap()).unwrap();
        let err = check_reference(other.to_str().unwrap(), &pretty).unwrap_err();
        assert!(matches!(err, DashError::ReferenceMismatch { .. }));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn settings_from_config() {
        let dir = std::env::temp_dir().join(format!("connectdash-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("connect.json");
        fs::write(
            &config_path,
            r#"{"filePath": "dados.xlsx", "dateRange": ["2024-01-01", "2024-01-31"], "assetDirectory": "fotos"}"#,
        )
        .unwrap();
        let args = Args {
            config: Some(config_path.display().to_string()),
            reference: None,
            out: None,
            input: None,
            dates: Some(vec!["2024-02-01".to_string()]),
            assets: None,
            verbose: false,
        };
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.input, dir.join("dados.xlsx"));
        assert_eq!(settings.asset_dir, dir.join("fotos"));
        // The command line wins, even with a single endpoint.
        assert_eq!(settings.endpoints, vec![d(2024, 2, 1)]);
        assert_eq!(settings.sheets, SheetNames::default());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn settings_need_an_input() {
        let args = Args {
            config: None,
            reference: None,
            out: None,
            input: None,
            dates: None,
            assets: None,
            verbose: false,
        };
        assert!(matches!(
            resolve_settings(&args),
            Err(DashError::Whatever { .. })
        ));
    }

    #[test]
    fn missing_workbook() {
        let err = io_xlsx::read_workbook(Path::new("does/not/exist.xlsx"), &SheetNames::default())
            .unwrap_err();
        assert!(matches!(err, DashError::OpeningWorkbook { .. }));
    }

    #[test]
    fn fixture_workbook() {
        let tables = io_xlsx::read_workbook(&fixture_path(), &SheetNames::default()).unwrap();
        assert_eq!(tables.participants.len(), 5);
        assert_eq!(tables.attendance.len(), 9);
        assert_eq!(tables.events.len(), 3);

        let js = build_dashboard(&tables, &[], &no_photos());
        assert_eq!(js["kpis"]["uniqueAdults"], json!(3));
        assert_eq!(js["kpis"]["uniqueChildren"], json!(2));
        assert_eq!(js["kpis"]["encounters"], json!(3));
        assert_eq!(js["kpis"]["meanAdultAttendance"], json!(2.0));
        assert_eq!(js["kpis"]["adultAttendanceRate"], json!(6.0 / 7.0 * 100.0));
        assert_eq!(
            js["presenceOverTime"],
            json!([
                {"date": "2024-01-01", "count": 4},
                {"date": "2024-01-08", "count": 2},
                {"date": "2024-01-15", "count": 2}
            ])
        );
        assert_eq!(js["eventSummaries"][2]["visitors"], json!(1));
        assert_eq!(js["eventSummaries"][2]["dynamic"], json!("quiz"));
        // Eva has no neighborhood.
        assert_eq!(
            js["locations"],
            json!([
                {"lat": -23.55, "lon": -46.63, "neighborhood": "Centro"},
                {"lat": -23.55, "lon": -46.63, "neighborhood": "Vila Nova"}
            ])
        );

        let js = build_dashboard(&tables, &[d(2024, 1, 8), d(2024, 1, 15)], &no_photos());
        assert_eq!(js["kpis"]["encounters"], json!(2));
        assert_eq!(js["roster"][0]["date"], json!("2024-01-15"));
    }

    #[test]
    fn fixture_missing_sheet() {
        let sheets = SheetNames {
            event_info: "f_info".to_string(),
            ..SheetNames::default()
        };
        let err = io_xlsx::read_workbook(&fixture_path(), &sheets).unwrap_err();
        assert!(matches!(err, DashError::MissingSheet { ref sheet } if sheet == "f_info"));
    }
}

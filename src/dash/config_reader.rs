use crate::dash::io_common::parse_date_str;
use crate::dash::*;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PARTICIPANTS_SHEET: &str = "d_participantes";
pub const DEFAULT_ATTENDANCE_SHEET: &str = "f_presenca_connect";
pub const DEFAULT_EVENT_INFO_SHEET: &str = "f_connect_info";

/// The names of the three sheets of the workbook.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SheetNames {
    pub participants: String,
    pub attendance: String,
    pub event_info: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        SheetNames {
            participants: DEFAULT_PARTICIPANTS_SHEET.to_string(),
            attendance: DEFAULT_ATTENDANCE_SHEET.to_string(),
            event_info: DEFAULT_EVENT_INFO_SHEET.to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "participantsSheet")]
    pub participants_sheet: Option<String>,
    #[serde(rename = "attendanceSheet")]
    pub attendance_sheet: Option<String>,
    #[serde(rename = "eventInfoSheet")]
    pub event_info_sheet: Option<String>,
    #[serde(rename = "assetDirectory")]
    pub asset_directory: Option<String>,
    #[serde(rename = "dateRange")]
    pub date_range: Option<Vec<String>>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

impl DashboardConfig {
    pub fn sheet_names(&self) -> SheetNames {
        let default = SheetNames::default();
        SheetNames {
            participants: self
                .participants_sheet
                .clone()
                .unwrap_or(default.participants),
            attendance: self.attendance_sheet.clone().unwrap_or(default.attendance),
            event_info: self.event_info_sheet.clone().unwrap_or(default.event_info),
        }
    }
}

pub fn read_config(path: &str) -> DashResult<DashboardConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: DashboardConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}: {:?}", path, config);
    Ok(config)
}

/// Parses the endpoints of a date range given as text.
pub fn parse_endpoints(values: &[String]) -> DashResult<Vec<NaiveDate>> {
    let mut res: Vec<NaiveDate> = Vec::new();
    for v in values.iter() {
        let d = parse_date_str(v).context(InvalidDateRangeSnafu { value: v.clone() })?;
        res.push(d);
    }
    Ok(res)
}

/// Resolves a path of the configuration file against the directory of that file.
pub fn resolve_path(base_dir: Option<&Path>, p: &str) -> PathBuf {
    let path = Path::new(p);
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

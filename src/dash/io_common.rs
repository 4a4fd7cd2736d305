// Primitives for reading spreadsheet cells.

use calamine::DataType;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// The text content of a cell, trimmed. Blank cells have no content.
pub fn cell_to_string(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        DataType::Int(i) => Some(i.to_string()),
        // Keys typed as numbers come back as floats: 12.0 is the key "12".
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        DataType::Float(f) => Some(f.to_string()),
        DataType::Bool(b) => Some(b.to_string()),
        DataType::DateTime(f) => excel_serial_to_date(*f).map(|d| d.format("%Y-%m-%d").to_string()),
        _ => None,
    }
}

pub fn is_blank_row(row: &[DataType]) -> bool {
    row.iter().all(|c| cell_to_string(c).is_none())
}

/// Converts a date serial number of the 1900 date system.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let days = serial.floor() as i64;
    // Excel counts a 29th of February 1900 that never existed.
    let base = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    base.checked_add_signed(Duration::days(days))
}

pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    for fmt in DATE_FORMATS.iter() {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Reads a date cell, with day precision.
pub fn cell_to_date(cell: &DataType) -> Option<NaiveDate> {
    match cell {
        DataType::DateTime(f) | DataType::Float(f) => excel_serial_to_date(*f),
        DataType::Int(i) => excel_serial_to_date(*i as f64),
        DataType::String(s) => parse_date_str(s),
        _ => None,
    }
}

/// Reads a number, accepting text with a decimal comma.
pub fn cell_to_f64(cell: &DataType) -> Option<f64> {
    let res = match cell {
        DataType::Float(f) => Some(*f),
        DataType::Int(i) => Some(*i as f64),
        DataType::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    res.filter(|f| f.is_finite())
}

/// A cell as shown in error messages.
pub fn describe_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Empty => "<empty>".to_string(),
        _ => format!("{:?}", cell),
    }
}

/// Maps each column name of the header to its position. The first column
/// with a given name wins.
pub fn header_positions(header: &[DataType]) -> HashMap<String, usize> {
    let mut res: HashMap<String, usize> = HashMap::new();
    for (idx, cell) in header.iter().enumerate() {
        if let DataType::String(s) = cell {
            res.entry(s.trim().to_string()).or_insert(idx);
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn serial_dates() {
        assert_eq!(excel_serial_to_date(45292.0), Some(d(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(45292.75), Some(d(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(1.0), Some(d(1900, 1, 1)));
        assert_eq!(excel_serial_to_date(61.0), Some(d(1900, 3, 1)));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn date_cells() {
        let expected = Some(d(2024, 1, 31));
        assert_eq!(cell_to_date(&DataType::DateTime(45322.0)), expected);
        assert_eq!(cell_to_date(&DataType::Float(45322.0)), expected);
        assert_eq!(cell_to_date(&DataType::Int(45322)), expected);
        for s in [
            "2024-01-31",
            " 2024-01-31 ",
            "2024-01-31 19:30:00",
            "2024-01-31T19:30:00",
            "31/01/2024",
            "31-01-2024",
        ] {
            assert_eq!(cell_to_date(&DataType::String(s.to_string())), expected, "{}", s);
        }
        assert_eq!(cell_to_date(&DataType::String("amanhã".to_string())), None);
        assert_eq!(cell_to_date(&DataType::String("2024-02-30".to_string())), None);
        assert_eq!(cell_to_date(&DataType::Empty), None);
        assert_eq!(cell_to_date(&DataType::Bool(true)), None);
    }

    #[test]
    fn string_cells() {
        assert_eq!(
            cell_to_string(&DataType::String("  Ana ".to_string())),
            Some("Ana".to_string())
        );
        assert_eq!(cell_to_string(&DataType::String("   ".to_string())), None);
        assert_eq!(cell_to_string(&DataType::Float(12.0)), Some("12".to_string()));
        assert_eq!(cell_to_string(&DataType::Float(1.5)), Some("1.5".to_string()));
        assert_eq!(cell_to_string(&DataType::Int(7)), Some("7".to_string()));
        assert_eq!(cell_to_string(&DataType::Empty), None);
        assert!(is_blank_row(&[DataType::Empty, DataType::String(" ".to_string())]));
        assert!(!is_blank_row(&[DataType::Empty, DataType::Int(0)]));
    }

    #[test]
    fn number_cells() {
        assert_eq!(cell_to_f64(&DataType::Float(-23.55)), Some(-23.55));
        assert_eq!(cell_to_f64(&DataType::String("-23,55".to_string())), Some(-23.55));
        assert_eq!(cell_to_f64(&DataType::String("n/a".to_string())), None);
        assert_eq!(cell_to_f64(&DataType::Empty), None);
    }

    #[test]
    fn header() {
        let header = vec![
            DataType::String(" data".to_string()),
            DataType::Empty,
            DataType::String("presenca".to_string()),
            DataType::String("data".to_string()),
        ];
        let pos = header_positions(&header);
        assert_eq!(pos.get("data"), Some(&0));
        assert_eq!(pos.get("presenca"), Some(&2));
        assert_eq!(pos.len(), 2);
    }
}

// Reads the three tables out of the workbook.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use attendance_report::builder::Builder;
use attendance_report::*;
use calamine::{open_workbook, DataType, Reader, Xlsx};
use chrono::NaiveDate;

use crate::dash::config_reader::SheetNames;
use crate::dash::io_common::*;
use crate::dash::*;

pub type SheetRows = Vec<Vec<DataType>>;

pub const COL_PARTICIPANT: &str = "participantes";
pub const COL_KIND: &str = "tipo";
pub const COL_NEIGHBORHOOD: &str = "bairro";
pub const COL_DATE: &str = "data";
pub const COL_PRESENCE: &str = "presenca";
pub const COL_OBS: &str = "obs";
pub const COL_DYNAMIC: &str = "dinamica";
pub const COL_DYNAMIC_THEME: &str = "tema_dinamica";
pub const COL_MINISTER: &str = "ministro";
pub const COL_SERMON_THEME: &str = "tema_ministracao";
pub const COL_BASE_VERSE: &str = "versiculo_base";
pub const COL_LOCATION_OWNER: &str = "prop_local";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";

pub fn read_workbook(path: &Path, sheets: &SheetNames) -> DashResult<Tables> {
    let path_s = path.display().to_string();
    info!("read_workbook: opening {:?}", path_s);
    let mut workbook: Xlsx<_> =
        open_workbook(path).context(OpeningWorkbookSnafu { path: path_s.clone() })?;
    debug!("read_workbook: sheets: {:?}", workbook.sheet_names());

    let participants = sheet_rows(&mut workbook, &path_s, &sheets.participants)?;
    let attendance = sheet_rows(&mut workbook, &path_s, &sheets.attendance)?;
    let events = sheet_rows(&mut workbook, &path_s, &sheets.event_info)?;
    tables_from_rows(&participants, &attendance, &events, sheets)
}

fn sheet_rows<RS: Read + Seek>(
    workbook: &mut Xlsx<RS>,
    path: &str,
    sheet: &str,
) -> DashResult<SheetRows> {
    let wrange = workbook
        .worksheet_range(sheet)
        .context(MissingSheetSnafu { sheet })?
        .context(OpeningWorkbookSnafu { path })?;
    let rows: SheetRows = wrange.rows().map(|r| r.to_vec()).collect();
    debug!("sheet_rows: {:?}: {:?} rows", sheet, rows.len());
    Ok(rows)
}

/// Builds the tables out of the raw rows of each sheet, header included.
pub fn tables_from_rows(
    participants: &[Vec<DataType>],
    attendance: &[Vec<DataType>],
    events: &[Vec<DataType>],
    sheets: &SheetNames,
) -> DashResult<Tables> {
    let participant_cols = SheetColumns::new(&sheets.participants, participants);
    let attendance_cols = SheetColumns::new(&sheets.attendance, attendance);
    let event_cols = SheetColumns::new(&sheets.event_info, events);

    // The kind may live on either sheet, but it has to live somewhere.
    if participant_cols.optional(COL_KIND).is_none() {
        attendance_cols.required(COL_KIND)?;
    }

    let mut builder = Builder::new();
    for p in read_participants(&participant_cols, participants)? {
        builder.add_participant(p);
    }
    for a in read_attendance(&attendance_cols, attendance)? {
        builder.add_attendance(a);
    }
    for e in read_events(&event_cols, events)? {
        builder.add_event(e);
    }
    let tables = builder.build();
    info!(
        "tables_from_rows: {:?} participants, {:?} attendance records, {:?} encounters",
        tables.participants.len(),
        tables.attendance.len(),
        tables.events.len()
    );
    Ok(tables)
}

/// The header of a sheet.
struct SheetColumns<'a> {
    sheet: &'a str,
    positions: HashMap<String, usize>,
}

impl<'a> SheetColumns<'a> {
    fn new(sheet: &'a str, rows: &[Vec<DataType>]) -> SheetColumns<'a> {
        let positions = rows
            .first()
            .map(|header| header_positions(header))
            .unwrap_or_default();
        SheetColumns { sheet, positions }
    }

    fn required(&self, column: &str) -> DashResult<usize> {
        let idx = self.positions.get(column).context(SchemaMismatchSnafu {
            sheet: self.sheet,
            column,
        })?;
        Ok(*idx)
    }

    fn optional(&self, column: &str) -> Option<usize> {
        self.positions.get(column).cloned()
    }

    // Rows are numbered as in the spreadsheet: the header is row 1.
    fn data_rows<'r>(
        &self,
        rows: &'r [Vec<DataType>],
    ) -> impl Iterator<Item = (usize, &'r Vec<DataType>)> {
        rows.iter()
            .enumerate()
            .skip(1)
            .map(|(idx, row)| (idx + 1, row))
            .filter(|(_, row)| !is_blank_row(row))
    }

    fn text(&self, row: &[DataType], col: Option<usize>) -> Option<String> {
        col.and_then(|idx| row.get(idx)).and_then(cell_to_string)
    }

    fn key(&self, row: &[DataType], col: usize, lineno: usize, column: &str) -> DashResult<String> {
        row.get(col)
            .and_then(cell_to_string)
            .context(MissingValueSnafu {
                sheet: self.sheet,
                row: lineno,
                column,
            })
    }

    fn date(&self, row: &[DataType], col: usize, lineno: usize) -> DashResult<NaiveDate> {
        let cell = row.get(col).unwrap_or(&DataType::Empty);
        cell_to_date(cell).context(MalformedDateSnafu {
            sheet: self.sheet,
            row: lineno,
            value: describe_cell(cell),
        })
    }

    fn number(&self, row: &[DataType], col: Option<usize>) -> Option<f64> {
        col.and_then(|idx| row.get(idx)).and_then(cell_to_f64)
    }
}

fn read_participants(
    cols: &SheetColumns,
    rows: &[Vec<DataType>],
) -> DashResult<Vec<Participant>> {
    let key_idx = cols.required(COL_PARTICIPANT)?;
    let kind_idx = cols.optional(COL_KIND);
    let neighborhood_idx = cols.optional(COL_NEIGHBORHOOD);

    let mut res: Vec<Participant> = Vec::new();
    for (lineno, row) in cols.data_rows(rows) {
        let p = Participant {
            key: cols.key(row, key_idx, lineno, COL_PARTICIPANT)?,
            kind: cols
                .text(row, kind_idx)
                .and_then(|s| ParticipantKind::parse(&s)),
            neighborhood: cols.text(row, neighborhood_idx),
        };
        debug!("read_participants: row {:?}: {:?}", lineno, p);
        res.push(p);
    }
    Ok(res)
}

fn read_attendance(
    cols: &SheetColumns,
    rows: &[Vec<DataType>],
) -> DashResult<Vec<AttendanceRecord>> {
    let date_idx = cols.required(COL_DATE)?;
    let key_idx = cols.required(COL_PARTICIPANT)?;
    let presence_idx = cols.required(COL_PRESENCE)?;
    let kind_idx = cols.optional(COL_KIND);
    let obs_idx = cols.optional(COL_OBS);

    let mut res: Vec<AttendanceRecord> = Vec::new();
    for (lineno, row) in cols.data_rows(rows) {
        let presence_label = cols.text(row, Some(presence_idx)).unwrap_or_default();
        let rec = AttendanceRecord {
            participant: cols.key(row, key_idx, lineno, COL_PARTICIPANT)?,
            date: cols.date(row, date_idx, lineno)?,
            presence: Presence::parse(&presence_label),
            kind: cols
                .text(row, kind_idx)
                .and_then(|s| ParticipantKind::parse(&s)),
            obs: cols.text(row, obs_idx),
        };
        if let Presence::Other(label) = &rec.presence {
            warn!(
                "read_attendance: {} row {}: unknown attendance status {:?}",
                cols.sheet, lineno, label
            );
        }
        debug!("read_attendance: row {:?}: {:?}", lineno, rec);
        res.push(rec);
    }
    Ok(res)
}

fn read_events(cols: &SheetColumns, rows: &[Vec<DataType>]) -> DashResult<Vec<EventInfo>> {
    let date_idx = cols.required(COL_DATE)?;
    let dynamic_idx = cols.optional(COL_DYNAMIC);
    let dynamic_theme_idx = cols.optional(COL_DYNAMIC_THEME);
    let minister_idx = cols.optional(COL_MINISTER);
    let sermon_theme_idx = cols.optional(COL_SERMON_THEME);
    let base_verse_idx = cols.optional(COL_BASE_VERSE);
    let location_owner_idx = cols.optional(COL_LOCATION_OWNER);
    let latitude_idx = cols.optional(COL_LATITUDE);
    let longitude_idx = cols.optional(COL_LONGITUDE);

    let mut res: Vec<EventInfo> = Vec::new();
    for (lineno, row) in cols.data_rows(rows) {
        let e = EventInfo {
            date: cols.date(row, date_idx, lineno)?,
            dynamic: cols.text(row, dynamic_idx),
            dynamic_theme: cols.text(row, dynamic_theme_idx),
            minister: cols.text(row, minister_idx),
            sermon_theme: cols.text(row, sermon_theme_idx),
            base_verse: cols.text(row, base_verse_idx),
            location_owner: cols.text(row, location_owner_idx),
            latitude: cols.number(row, latitude_idx),
            longitude: cols.number(row, longitude_idx),
        };
        debug!("read_events: row {:?}: {:?}", lineno, e);
        res.push(e);
    }
    Ok(res)
}

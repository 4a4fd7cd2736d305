// ********* Input data structures ***********

use chrono::NaiveDate;

/// The category of a participant, as written in the `tipo` column.
///
/// Labels are matched after trimming, without regard to case. Any label that
/// is not one of the known categories is kept verbatim.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum ParticipantKind {
    Adult,
    Kids,
    Teen,
    Baby,
    Other(String),
}

impl ParticipantKind {
    /// Parses a sheet label. Blank labels do not describe a kind.
    pub fn parse(label: &str) -> Option<ParticipantKind> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return None;
        }
        let res = match trimmed.to_lowercase().as_str() {
            "adulto" => ParticipantKind::Adult,
            "kids" => ParticipantKind::Kids,
            "teen" => ParticipantKind::Teen,
            "baby" => ParticipantKind::Baby,
            _ => ParticipantKind::Other(trimmed.to_string()),
        };
        Some(res)
    }

    /// Kids, teens and babies are all counted as children.
    pub fn is_child(&self) -> bool {
        matches!(
            self,
            ParticipantKind::Kids | ParticipantKind::Teen | ParticipantKind::Baby
        )
    }

    pub fn is_adult(&self) -> bool {
        *self == ParticipantKind::Adult
    }

    pub fn as_str(&self) -> &str {
        match self {
            ParticipantKind::Adult => "adulto",
            ParticipantKind::Kids => "kids",
            ParticipantKind::Teen => "teen",
            ParticipantKind::Baby => "baby",
            ParticipantKind::Other(s) => s.as_str(),
        }
    }
}

/// The attendance status of a participant for one encounter (`presenca`).
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Presence {
    Present,
    Absent,
    Other(String),
}

impl Presence {
    pub fn parse(label: &str) -> Presence {
        let trimmed = label.trim();
        match trimmed.to_lowercase().as_str() {
            "presente" => Presence::Present,
            "ausente" => Presence::Absent,
            _ => Presence::Other(trimmed.to_string()),
        }
    }

    pub fn is_present(&self) -> bool {
        *self == Presence::Present
    }

    pub fn as_str(&self) -> &str {
        match self {
            Presence::Present => "presente",
            Presence::Absent => "ausente",
            Presence::Other(s) => s.as_str(),
        }
    }
}

/// The observation tag that marks a visitor.
pub const VISITOR_TAG: &str = "visitante";

pub fn is_visitor_tag(obs: &str) -> bool {
    obs.trim().eq_ignore_ascii_case(VISITOR_TAG)
}

/// One row of the participant dimension.
#[derive(PartialEq, Debug, Clone)]
pub struct Participant {
    pub key: String,
    pub kind: Option<ParticipantKind>,
    /// The `bairro` column.
    pub neighborhood: Option<String>,
}

/// One row of the attendance facts: a participant on a given encounter date.
#[derive(PartialEq, Debug, Clone)]
pub struct AttendanceRecord {
    pub participant: String,
    pub date: NaiveDate,
    pub presence: Presence,
    /// The `tipo` column, when the attendance sheet carries it.
    pub kind: Option<ParticipantKind>,
    pub obs: Option<String>,
}

/// The description of one encounter.
#[derive(PartialEq, Debug, Clone)]
pub struct EventInfo {
    pub date: NaiveDate,
    pub dynamic: Option<String>,
    pub dynamic_theme: Option<String>,
    pub minister: Option<String>,
    pub sermon_theme: Option<String>,
    pub base_verse: Option<String>,
    pub location_owner: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl EventInfo {
    pub fn new(date: NaiveDate) -> EventInfo {
        EventInfo {
            date,
            dynamic: None,
            dynamic_theme: None,
            minister: None,
            sermon_theme: None,
            base_verse: None,
            location_owner: None,
            latitude: None,
            longitude: None,
        }
    }
}

/// The three raw tables, as loaded from the workbook.
///
/// A value of this type is never mutated once built: a reload produces a new
/// one (see [crate::snapshot::SnapshotStore]).
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Tables {
    pub participants: Vec<Participant>,
    pub attendance: Vec<AttendanceRecord>,
    pub events: Vec<EventInfo>,
}

/// An attendance record joined with its participant and its encounter.
///
/// The participant and event fields are empty when the join found no match.
#[derive(PartialEq, Debug, Clone)]
pub struct EnrichedRecord {
    pub date: NaiveDate,
    pub participant: String,
    pub presence: Presence,
    pub obs: Option<String>,
    pub kind: Option<ParticipantKind>,
    pub neighborhood: Option<String>,
    pub event: Option<EventInfo>,
}

impl EnrichedRecord {
    pub fn is_present(&self) -> bool {
        self.presence.is_present()
    }

    pub fn is_adult(&self) -> bool {
        self.kind.as_ref().map(|k| k.is_adult()).unwrap_or(false)
    }

    pub fn is_child(&self) -> bool {
        self.kind.as_ref().map(|k| k.is_child()).unwrap_or(false)
    }

    pub fn is_visitor(&self) -> bool {
        self.obs.as_deref().map(is_visitor_tag).unwrap_or(false)
    }

    /// Both coordinates, if the encounter has them.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let e = self.event.as_ref()?;
        match (e.latitude, e.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

// ********* Filter **********

/// The date interval selected by the caller.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DateSelection {
    /// No filtering: every record passes.
    All,
    /// Both bounds are inclusive.
    Between(NaiveDate, NaiveDate),
}

impl DateSelection {
    /// Builds a selection out of the endpoints picked by the user.
    ///
    /// A date picker may hand over a half-filled range while the user is still
    /// choosing. Anything other than exactly two endpoints is treated as no
    /// filter at all.
    pub fn from_endpoints(endpoints: &[NaiveDate]) -> DateSelection {
        match endpoints {
            [start, end] => DateSelection::Between(*start, *end),
            [] | [_] => DateSelection::All,
            _ => {
                log::warn!(
                    "DateSelection: expected two endpoints, got {:?}: not filtering",
                    endpoints
                );
                DateSelection::All
            }
        }
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        match self {
            DateSelection::All => true,
            DateSelection::Between(start, end) => start <= date && date <= end,
        }
    }
}

// ******** Output data structures *********

/// The headline numbers of the dashboard.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Kpis {
    pub unique_adults: usize,
    pub unique_children: usize,
    pub total_event_dates: usize,
    /// Mean number of adults present per encounter, over the encounters that
    /// had at least one adult present.
    pub mean_adult_attendance: f64,
    /// Percentage in [0, 100].
    pub adult_attendance_rate: f64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DateCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct KindDateCount {
    pub date: NaiveDate,
    pub kind: ParticipantKind,
    pub count: usize,
}

/// One line of the per-encounter summary table.
#[derive(PartialEq, Debug, Clone)]
pub struct EventSummary {
    pub date: NaiveDate,
    pub adults_present: usize,
    pub children_present: usize,
    pub visitors: usize,
    pub dynamic: Option<String>,
    pub dynamic_theme: Option<String>,
    pub minister: Option<String>,
    pub sermon_theme: Option<String>,
    pub base_verse: Option<String>,
    pub location_owner: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RosterEntry {
    pub date: NaiveDate,
    pub participant: String,
    pub kind: Option<ParticipantKind>,
}

/// A place shown on the map: the coordinates of an encounter and the
/// neighborhood of a participant who attended it.
#[derive(PartialEq, Debug, Clone)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub neighborhood: String,
}

/// Everything the presentation layer needs for one render.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Report {
    pub kpis: Kpis,
    pub presence_over_time: Vec<DateCount>,
    pub presence_by_kind: Vec<KindDateCount>,
    pub event_summaries: Vec<EventSummary>,
    pub roster: Vec<RosterEntry>,
    pub locations: Vec<GeoPoint>,
    /// Distinct dates of the filtered records, ascending.
    pub event_dates: Vec<NaiveDate>,
}

impl Report {
    /// True when the filter left no record at all.
    pub fn is_empty(&self) -> bool {
        self.event_dates.is_empty()
    }

    /// True when at least one participant was present in the selection.
    pub fn has_presence(&self) -> bool {
        !self.presence_over_time.is_empty()
    }
}

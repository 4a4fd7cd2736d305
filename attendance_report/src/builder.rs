pub use crate::config::*;

use chrono::NaiveDate;

/// A builder for assembling the raw tables.
///
/// The spreadsheet reader of `connectdash` uses it, and it is the simplest way
/// to feed records from any other source.
///
/// ```
/// use attendance_report::builder::Builder;
/// use attendance_report::{render, DateSelection};
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let mut builder = Builder::new();
/// builder.add_participant_simple("Anna", "adulto");
/// builder.add_attendance_simple("Anna", date, "presente");
///
/// let report = render(&builder.build(), &DateSelection::All);
/// assert_eq!(report.kpis.unique_adults, 1);
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    pub(crate) _participants: Vec<Participant>,
    pub(crate) _attendance: Vec<AttendanceRecord>,
    pub(crate) _events: Vec<EventInfo>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    pub fn add_participant(&mut self, participant: Participant) {
        self._participants.push(participant);
    }

    /// Adds a participant with a kind label such as `adulto` or `kids`.
    pub fn add_participant_simple(&mut self, key: &str, kind: &str) {
        self.add_participant(Participant {
            key: key.to_string(),
            kind: ParticipantKind::parse(kind),
            neighborhood: None,
        })
    }

    pub fn add_attendance(&mut self, record: AttendanceRecord) {
        self._attendance.push(record);
    }

    /// Adds an attendance record with a status label such as `presente`.
    /// The kind of the participant is taken from the participant table.
    pub fn add_attendance_simple(&mut self, participant: &str, date: NaiveDate, presence: &str) {
        self.add_attendance(AttendanceRecord {
            participant: participant.to_string(),
            date,
            presence: Presence::parse(presence),
            kind: None,
            obs: None,
        })
    }

    pub fn add_event(&mut self, event: EventInfo) {
        self._events.push(event);
    }

    pub fn build(self) -> Tables {
        Tables {
            participants: self._participants,
            attendance: self._attendance,
            events: self._events,
        }
    }
}

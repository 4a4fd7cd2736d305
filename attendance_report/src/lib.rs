mod config;
pub mod builder;
pub mod manual;
pub mod snapshot;

use chrono::NaiveDate;
use log::{debug, info, warn};

use std::collections::{hash_map::Entry, BTreeMap, BTreeSet, HashMap, HashSet};

pub use crate::config::*;

/// Joins the attendance facts with the participants and the encounters.
///
/// Both joins are left joins: every attendance record yields exactly one
/// enriched record, in the same order. When a participant key or an encounter
/// date appears more than once in its table, the first occurrence is used.
pub fn enrich(tables: &Tables) -> Vec<EnrichedRecord> {
    info!(
        "enrich: {:?} attendance records, {:?} participants, {:?} encounters",
        tables.attendance.len(),
        tables.participants.len(),
        tables.events.len()
    );
    let participants = index_participants(&tables.participants);
    let events = index_events(&tables.events);
    warn_duplicate_attendance(&tables.attendance);

    let mut res: Vec<EnrichedRecord> = Vec::with_capacity(tables.attendance.len());
    for rec in tables.attendance.iter() {
        let participant = participants.get(rec.participant.as_str()).copied();
        if participant.is_none() {
            debug!(
                "enrich: participant {:?} has no entry in the participant table",
                rec.participant
            );
        }
        // The kind written on the attendance row takes precedence.
        let kind = rec
            .kind
            .clone()
            .or_else(|| participant.and_then(|p| p.kind.clone()));
        res.push(EnrichedRecord {
            date: rec.date,
            participant: rec.participant.clone(),
            presence: rec.presence.clone(),
            obs: rec.obs.clone(),
            kind,
            neighborhood: participant.and_then(|p| p.neighborhood.clone()),
            event: events.get(&rec.date).map(|e| (*e).clone()),
        });
    }
    res
}

fn index_participants(participants: &[Participant]) -> HashMap<&str, &Participant> {
    let mut res: HashMap<&str, &Participant> = HashMap::new();
    for p in participants.iter() {
        match res.entry(p.key.as_str()) {
            Entry::Occupied(_) => {
                warn!(
                    "index_participants: duplicate participant {:?}, keeping the first one",
                    p.key
                );
            }
            Entry::Vacant(v) => {
                v.insert(p);
            }
        }
    }
    res
}

fn index_events(events: &[EventInfo]) -> HashMap<NaiveDate, &EventInfo> {
    let mut res: HashMap<NaiveDate, &EventInfo> = HashMap::new();
    for e in events.iter() {
        match res.entry(e.date) {
            Entry::Occupied(_) => {
                warn!(
                    "index_events: duplicate encounter on {}, keeping the first one",
                    e.date
                );
            }
            Entry::Vacant(v) => {
                v.insert(e);
            }
        }
    }
    res
}

// Duplicated (participant, date) pairs are kept. They are only reported.
fn warn_duplicate_attendance(attendance: &[AttendanceRecord]) {
    let mut seen: HashSet<(&str, NaiveDate)> = HashSet::new();
    let mut reported: HashSet<(&str, NaiveDate)> = HashSet::new();
    for rec in attendance.iter() {
        let k = (rec.participant.as_str(), rec.date);
        if !seen.insert(k) && reported.insert(k) {
            warn!(
                "enrich: participant {:?} appears more than once on {}",
                rec.participant, rec.date
            );
        }
    }
}

/// Keeps the records whose date falls in the selection, preserving their order.
pub fn filter_records(
    records: &[EnrichedRecord],
    selection: &DateSelection,
) -> Vec<EnrichedRecord> {
    let res: Vec<EnrichedRecord> = records
        .iter()
        .filter(|r| selection.contains(&r.date))
        .cloned()
        .collect();
    info!(
        "filter_records: {:?} -> {:?} records for {:?}",
        records.len(),
        res.len(),
        selection
    );
    res
}

/// The earliest and latest dates of the records, if there are any.
///
/// This is the range offered by default when the caller did not pick one.
pub fn date_bounds(records: &[EnrichedRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let min = records.iter().map(|r| r.date).min()?;
    let max = records.iter().map(|r| r.date).max()?;
    Some((min, max))
}

/// Runs the full pipeline on one snapshot of the tables.
pub fn render(tables: &Tables, selection: &DateSelection) -> Report {
    let enriched = enrich(tables);
    let filtered = filter_records(&enriched, selection);
    build_report(&filtered)
}

/// Computes all the metrics, series and tables of the dashboard.
///
/// An empty input is valid and produces zeros and empty tables.
pub fn build_report(records: &[EnrichedRecord]) -> Report {
    let present: Vec<&EnrichedRecord> = records.iter().filter(|r| r.is_present()).collect();
    debug!(
        "build_report: {:?} records, {:?} present",
        records.len(),
        present.len()
    );
    Report {
        kpis: compute_kpis(records),
        presence_over_time: presence_over_time(&present),
        presence_by_kind: presence_by_kind(&present),
        event_summaries: event_summaries(&present),
        roster: roster(&present),
        locations: locations(records),
        event_dates: records
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<NaiveDate>>()
            .into_iter()
            .collect(),
    }
}

fn compute_kpis(records: &[EnrichedRecord]) -> Kpis {
    let adults: Vec<&EnrichedRecord> = records.iter().filter(|r| r.is_adult()).collect();

    let unique_adults = adults
        .iter()
        .map(|r| r.participant.as_str())
        .collect::<HashSet<&str>>()
        .len();
    let unique_children = records
        .iter()
        .filter(|r| r.is_child())
        .map(|r| r.participant.as_str())
        .collect::<HashSet<&str>>()
        .len();
    let total_event_dates = records
        .iter()
        .map(|r| r.date)
        .collect::<HashSet<NaiveDate>>()
        .len();

    let mut adults_present_by_date: HashMap<NaiveDate, usize> = HashMap::new();
    for r in adults.iter().filter(|r| r.is_present()) {
        *adults_present_by_date.entry(r.date).or_insert(0) += 1;
    }
    let adults_present: usize = adults_present_by_date.values().sum();

    // Only the dates with at least one adult present are in the map.
    let mean_adult_attendance = if adults_present_by_date.is_empty() {
        0.0
    } else {
        adults_present as f64 / adults_present_by_date.len() as f64
    };

    let adult_attendance_rate = if adults.is_empty() {
        0.0
    } else {
        adults_present as f64 / adults.len() as f64 * 100.0
    };

    Kpis {
        unique_adults,
        unique_children,
        total_event_dates,
        mean_adult_attendance,
        adult_attendance_rate,
    }
}

// Dates without anyone present do not appear: the series is not zero-filled.
fn presence_over_time(present: &[&EnrichedRecord]) -> Vec<DateCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for r in present.iter() {
        *counts.entry(r.date).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| DateCount { date, count })
        .collect()
}

fn presence_by_kind(present: &[&EnrichedRecord]) -> Vec<KindDateCount> {
    // Keyed by label so that the order within a date is alphabetical.
    let mut counts: BTreeMap<(NaiveDate, String), (ParticipantKind, usize)> = BTreeMap::new();
    for r in present.iter() {
        if let Some(kind) = &r.kind {
            counts
                .entry((r.date, kind.as_str().to_string()))
                .or_insert_with(|| (kind.clone(), 0))
                .1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|((date, _), (kind, count))| KindDateCount { date, kind, count })
        .collect()
}

fn event_summaries(present: &[&EnrichedRecord]) -> Vec<EventSummary> {
    let mut summaries: BTreeMap<NaiveDate, EventSummary> = BTreeMap::new();
    for r in present.iter() {
        let summary = summaries.entry(r.date).or_insert_with(|| {
            let e = r.event.as_ref();
            EventSummary {
                date: r.date,
                adults_present: 0,
                children_present: 0,
                visitors: 0,
                dynamic: e.and_then(|e| e.dynamic.clone()),
                dynamic_theme: e.and_then(|e| e.dynamic_theme.clone()),
                minister: e.and_then(|e| e.minister.clone()),
                sermon_theme: e.and_then(|e| e.sermon_theme.clone()),
                base_verse: e.and_then(|e| e.base_verse.clone()),
                location_owner: e.and_then(|e| e.location_owner.clone()),
            }
        });
        if r.is_adult() {
            summary.adults_present += 1;
        }
        if r.is_child() {
            summary.children_present += 1;
        }
        if r.is_visitor() {
            summary.visitors += 1;
        }
    }
    summaries.into_values().rev().collect()
}

fn roster(present: &[&EnrichedRecord]) -> Vec<RosterEntry> {
    let mut res: Vec<RosterEntry> = present
        .iter()
        .map(|r| RosterEntry {
            date: r.date,
            participant: r.participant.clone(),
            kind: r.kind.clone(),
        })
        .collect();
    // Stable: within a date, the input order is kept.
    res.sort_by(|a, b| b.date.cmp(&a.date));
    res
}

// Records without a neighborhood are not placed on the map.
fn locations(records: &[EnrichedRecord]) -> Vec<GeoPoint> {
    let mut seen: HashSet<(u64, u64, &str)> = HashSet::new();
    let mut res: Vec<GeoPoint> = Vec::new();
    for r in records.iter() {
        let neighborhood = match &r.neighborhood {
            Some(n) => n,
            None => continue,
        };
        if let Some((latitude, longitude)) = r.coordinates() {
            let k = (latitude.to_bits(), longitude.to_bits(), neighborhood.as_str());
            if seen.insert(k) {
                res.push(GeoPoint {
                    latitude,
                    longitude,
                    neighborhood: neighborhood.clone(),
                });
            }
        }
    }
    res
}

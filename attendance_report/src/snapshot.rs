use log::info;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{render, DateSelection, Report, Tables};

/// Holds the tables shared by all the renders.
///
/// Renders take their own `Arc` to the current tables and never lock while
/// computing. A reload swaps the whole snapshot: renders already in progress
/// keep working on the previous one.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Tables>>,
}

impl SnapshotStore {
    pub fn new(tables: Tables) -> SnapshotStore {
        SnapshotStore {
            current: RwLock::new(Arc::new(tables)),
        }
    }

    pub fn current(&self) -> Arc<Tables> {
        // The lock only guards a pointer swap, a poisoned lock still holds a valid Arc.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Installs new tables and returns the previous snapshot.
    pub fn replace(&self, tables: Tables) -> Arc<Tables> {
        info!(
            "SnapshotStore: installing {:?} attendance records",
            tables.attendance.len()
        );
        let fresh = Arc::new(tables);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, fresh)
    }

    pub fn render(&self, selection: &DateSelection) -> Report {
        let tables = self.current();
        render(&tables, selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use chrono::NaiveDate;
    use std::thread;

    fn tables_with(n: u32) -> Tables {
        let mut b = Builder::new();
        b.add_participant_simple("A", "adulto");
        for day in 1..=n {
            let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
            b.add_attendance_simple("A", date, "presente");
        }
        b.build()
    }

    #[test]
    fn previous_snapshot_stays_valid() {
        let store = SnapshotStore::new(tables_with(2));
        let in_flight = store.current();
        let previous = store.replace(tables_with(5));
        assert!(Arc::ptr_eq(&in_flight, &previous));
        assert_eq!(in_flight.attendance.len(), 2);
        assert_eq!(store.current().attendance.len(), 5);
        assert_eq!(render(&in_flight, &DateSelection::All).kpis.total_event_dates, 2);
        assert_eq!(store.render(&DateSelection::All).kpis.total_event_dates, 5);
    }

    #[test]
    fn concurrent_renders() {
        let store = SnapshotStore::new(tables_with(4));
        let start = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| store.render(&DateSelection::Between(start, end))))
                .collect();
            for h in handles {
                let report = h.join().unwrap();
                assert_eq!(report.kpis.total_event_dates, 2);
            }
        });
    }
}

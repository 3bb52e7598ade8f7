use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::models::{
    BreakfastRecord, LONGEST_STREAK_KEY, RECORDS_KEY, WidgetGlance,
};
use crate::store::{NoopRefresher, WidgetRefresher};
use crate::storage::Storage;

/// The widget process's own entry into the shared namespace: a read path for
/// rendering and two externally-triggerable write actions. It is a second
/// independent writer against the same keys and record format, so the
/// last-writer-wins contract applies between it and the app process.
///
/// It deliberately leaves `longestStreak` and achievement state alone; the
/// app recomputes those the next time it records or reloads.
pub struct WidgetClient {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    refresher: Arc<dyn WidgetRefresher>,
}

impl WidgetClient {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_parts(storage, Arc::new(SystemClock), Arc::new(NoopRefresher))
    }

    #[must_use]
    pub fn with_parts(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        refresher: Arc<dyn WidgetRefresher>,
    ) -> Self {
        Self {
            storage,
            clock,
            refresher,
        }
    }

    /// One fresh read of the namespace, reduced to what the widget renders.
    #[must_use]
    pub fn glance(&self) -> WidgetGlance {
        self.storage.synchronize();
        let records = crate::models::decode_records(self.storage.get(RECORDS_KEY).as_ref());
        let today = self.clock.today();
        let current = crate::models::compute_streak(&records, today);
        let longest = self
            .storage
            .get(LONGEST_STREAK_KEY)
            .and_then(|v| v.as_u64())
            .map_or(0, |v| v as u32);
        WidgetGlance {
            date: today.format("%Y-%m-%d").to_string(),
            eaten: records.get(&today).map(|r| r.eaten),
            current_streak: current,
            longest_streak: longest.max(current),
            can_record: !records.contains_key(&today),
        }
    }

    /// Widget tap action: "ate breakfast".
    pub fn mark_eaten(&self) {
        self.write_today(true);
    }

    /// Widget tap action: "skipped breakfast".
    pub fn mark_skipped(&self) {
        self.write_today(false);
    }

    fn write_today(&self, eaten: bool) {
        // Pick up the latest snapshot before overwriting; whichever write
        // lands last in the namespace wins.
        self.storage.synchronize();
        let mut records = crate::models::decode_records(self.storage.get(RECORDS_KEY).as_ref());
        let day = self.clock.today();
        records.insert(
            day,
            BreakfastRecord {
                day,
                eaten,
                note: None,
            },
        );
        match crate::models::encode_records(&records) {
            Ok(value) => self.storage.set(RECORDS_KEY, value),
            Err(e) => warn!("dropped widget write, failed to encode: {e}"),
        }
        self.refresher.request_refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::{MemoryStorage, SharedDefaults};
    use crate::store::BreakfastRecordStore;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_widget_write_visible_to_fresh_store() {
        let today = day(2024, 6, 15);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.json");

        // Widget process writes through its own handle on the namespace.
        let widget = WidgetClient::with_parts(
            Arc::new(SharedDefaults::open(&path)),
            Arc::new(FixedClock::on_day(today)),
            Arc::new(NoopRefresher),
        );
        widget.mark_eaten();

        // A freshly constructed store over a separate handle sees it.
        let store = BreakfastRecordStore::with_parts(
            Arc::new(SharedDefaults::open(&path)),
            Arc::new(FixedClock::on_day(today)),
            Arc::new(NoopRefresher),
        );
        assert_eq!(
            store.has_eaten_breakfast(crate::models::day_start_local(today)),
            Some(true)
        );
        assert_eq!(store.streak_count(), 1);
    }

    #[test]
    fn test_glance_over_app_written_state() {
        let today = day(2024, 6, 15);
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(FixedClock::on_day(today));

        let mut store = BreakfastRecordStore::with_parts(
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(NoopRefresher),
        );
        store.record_breakfast(
            true,
            crate::models::day_start_local(today - chrono::Duration::days(1)),
        );
        store.record_today(true);

        let widget = WidgetClient::with_parts(
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(NoopRefresher),
        );
        let glance = widget.glance();
        assert_eq!(glance.date, "2024-06-15");
        assert_eq!(glance.eaten, Some(true));
        assert_eq!(glance.current_streak, 2);
        assert_eq!(glance.longest_streak, 2);
        assert!(!glance.can_record);
    }

    #[test]
    fn test_glance_empty_namespace() {
        let widget = WidgetClient::with_parts(
            Arc::new(MemoryStorage::new()),
            Arc::new(FixedClock::on_day(day(2024, 6, 15))),
            Arc::new(NoopRefresher),
        );
        let glance = widget.glance();
        assert_eq!(glance.eaten, None);
        assert_eq!(glance.current_streak, 0);
        assert!(glance.can_record);
    }

    #[test]
    fn test_last_writer_wins_between_processes() {
        let today = day(2024, 6, 15);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.json");
        let clock = Arc::new(FixedClock::on_day(today));

        let mut store = BreakfastRecordStore::with_parts(
            Arc::new(SharedDefaults::open(&path)),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(NoopRefresher),
        );
        let widget = WidgetClient::with_parts(
            Arc::new(SharedDefaults::open(&path)),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(NoopRefresher),
        );

        store.record_today(true);
        widget.mark_skipped();

        // The widget wrote last; its value is what the namespace holds.
        assert_eq!(widget.glance().eaten, Some(false));
        store.reload();
        assert_eq!(
            store.has_eaten_breakfast(crate::models::day_start_local(today)),
            Some(false)
        );
    }

    #[test]
    fn test_widget_does_not_touch_longest_streak() {
        let today = day(2024, 6, 15);
        let storage = Arc::new(MemoryStorage::new());
        storage.set(LONGEST_STREAK_KEY, serde_json::Value::from(9_u64));

        let widget = WidgetClient::with_parts(
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(FixedClock::on_day(today)),
            Arc::new(NoopRefresher),
        );
        widget.mark_eaten();
        assert_eq!(
            storage.get(LONGEST_STREAK_KEY).and_then(|v| v.as_u64()),
            Some(9)
        );
        assert_eq!(widget.glance().longest_streak, 9);
    }
}

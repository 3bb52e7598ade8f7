use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local};
use serde_json::Value;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::models::{
    ACHIEVEMENT_UNLOCKS_KEY, ACHIEVEMENTS, Achievement, AchievementDef, BreakfastRecord,
    DEFAULT_REMINDER_HOUR, DEFAULT_REMINDER_MINUTE, LONGEST_STREAK_KEY, RECORDS_KEY, RecordMap,
    REMINDER_ENABLED_KEY, REMINDER_TIME_KEY, ReminderConfig, Stats,
};
use crate::storage::Storage;

/// External "please re-render" signal sent to the widget-hosting surface
/// after every successful write. The default does nothing; the app shell
/// wires in the real one.
pub trait WidgetRefresher: Send + Sync {
    fn request_refresh(&self);
}

pub struct NoopRefresher;

impl WidgetRefresher for NoopRefresher {
    fn request_refresh(&self) {}
}

/// Single authority for breakfast records, streak and achievement
/// derivation, and the read/write contract over the shared namespace.
///
/// Nothing here returns an error except reminder-time validation: decode
/// failures load as empty history and failed persists drop the write, per
/// the cross-process contract.
pub struct BreakfastRecordStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    refresher: Arc<dyn WidgetRefresher>,
    records: RecordMap,
    longest_streak: u32,
    unlocked: BTreeSet<String>,
    unlock_times: BTreeMap<String, f64>,
    newly_unlocked: Vec<Achievement>,
}

impl BreakfastRecordStore {
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
        let mut store = Self {
            storage,
            clock,
            refresher,
            records: RecordMap::new(),
            longest_streak: 0,
            unlocked: BTreeSet::new(),
            unlock_times: BTreeMap::new(),
            newly_unlocked: Vec::new(),
        };
        store.load();
        store
    }

    fn load(&mut self) {
        // Rebuilding from storage is never a recording action; anything
        // queued for announcement before this point is stale.
        self.newly_unlocked.clear();
        self.records = crate::models::decode_records(self.storage.get(RECORDS_KEY).as_ref());
        self.longest_streak = self
            .storage
            .get(LONGEST_STREAK_KEY)
            .and_then(|v| v.as_u64())
            .map_or(0, |v| v as u32);
        self.unlock_times =
            crate::models::decode_unlocks(self.storage.get(ACHIEVEMENT_UNLOCKS_KEY).as_ref());

        // Unlocked state is monotonic: a persisted timestamp proves it, and
        // so does the persisted longest streak (records may have been
        // written by the widget process, which never evaluates milestones).
        self.unlocked = self.unlock_times.keys().cloned().collect();
        for def in ACHIEVEMENTS {
            if self.longest_streak >= def.required_streak {
                self.unlocked.insert(def.name.to_string());
            }
        }

        // Passive recomputation: unlock presentation stays suppressed.
        self.evaluate_achievements(false);
    }

    /// Re-read the shared namespace, picking up writes from the other
    /// process, and rebuild derived state. Never announces unlocks.
    pub fn reload(&mut self) {
        self.storage.synchronize();
        self.load();
    }

    // --- Record operations ---

    /// Record today's breakfast. The user-initiated path: newly crossed
    /// milestones are surfaced via [`Self::take_newly_unlocked`].
    pub fn record_today(&mut self, eaten: bool) {
        self.record_breakfast(eaten, self.clock.now());
    }

    pub fn record_breakfast(&mut self, eaten: bool, at: DateTime<Local>) {
        self.record_breakfast_with_note(eaten, at, None);
    }

    pub fn record_breakfast_with_note(
        &mut self,
        eaten: bool,
        at: DateTime<Local>,
        note: Option<String>,
    ) {
        let day = at.date_naive();
        self.records.insert(day, BreakfastRecord { day, eaten, note });
        self.persist_records();

        let current = self.streak_count();
        if current > self.longest_streak {
            self.longest_streak = current;
            self.storage
                .set(LONGEST_STREAK_KEY, Value::from(u64::from(current)));
        }
        self.evaluate_achievements(true);
        self.refresher.request_refresh();
    }

    /// The recorded outcome for the day containing `on`, or `None` when that
    /// day is unrecorded (distinct from an explicit skip).
    #[must_use]
    pub fn has_eaten_breakfast(&self, on: DateTime<Local>) -> Option<bool> {
        self.records.get(&on.date_naive()).map(|r| r.eaten)
    }

    #[must_use]
    pub fn record_for(&self, on: DateTime<Local>) -> Option<&BreakfastRecord> {
        self.records.get(&on.date_naive())
    }

    /// True while today's normalized day has no record. The day key comes
    /// from the live clock, so crossing midnight re-opens recording with no
    /// explicit reset.
    #[must_use]
    pub fn can_record_today(&self) -> bool {
        !self.records.contains_key(&self.clock.today())
    }

    /// The record set is untouched; each new day is automatically unrecorded
    /// until written. This only tells observers that a new day has begun.
    pub fn reset_daily_selection(&self) {
        self.refresher.request_refresh();
    }

    /// Privileged: remove exactly today's entry and recompute. Callers gate
    /// this behind their own authorization.
    pub fn clear_today_record(&mut self) {
        let today = self.clock.today();
        if self.records.remove(&today).is_some() {
            self.persist_records();
        }
        self.evaluate_achievements(false);
        self.refresher.request_refresh();
    }

    fn persist_records(&self) {
        match crate::models::encode_records(&self.records) {
            Ok(value) => self.storage.set(RECORDS_KEY, value),
            Err(e) => warn!("dropped record write, failed to encode: {e}"),
        }
    }

    // --- Derived state ---

    #[must_use]
    pub fn streak_count(&self) -> u32 {
        crate::models::compute_streak(&self.records, self.clock.today())
    }

    #[must_use]
    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    #[must_use]
    pub fn compute_stats(&self) -> Stats {
        crate::models::compute_stats(&self.records, self.clock.today(), self.longest_streak)
    }

    // --- Achievements ---

    /// Recompute milestone state against the current streak. Newly crossed
    /// thresholds are persisted either way; they are surfaced to the caller
    /// only when `announce` is true, i.e. from a user-initiated recording
    /// action and never from passive recomputation.
    fn evaluate_achievements(&mut self, announce: bool) {
        let current = self.streak_count();
        let mut changed = false;
        for def in ACHIEVEMENTS {
            if current < def.required_streak || self.unlocked.contains(def.name) {
                continue;
            }
            self.unlocked.insert(def.name.to_string());
            #[allow(clippy::cast_precision_loss)]
            self.unlock_times
                .insert(def.name.to_string(), self.clock.now().timestamp() as f64);
            changed = true;
            if announce {
                self.newly_unlocked.push(self.achievement_for(def));
            }
        }
        if changed {
            match serde_json::to_value(&self.unlock_times) {
                Ok(value) => self.storage.set(ACHIEVEMENT_UNLOCKS_KEY, value),
                Err(e) => warn!("dropped unlock write, failed to encode: {e}"),
            }
        }
    }

    fn achievement_for(&self, def: &AchievementDef) -> Achievement {
        Achievement {
            name: def.name.to_string(),
            title: def.title.to_string(),
            required_streak: def.required_streak,
            unlocked: self.unlocked.contains(def.name),
            unlocked_at: self.unlock_times.get(def.name).copied(),
        }
    }

    /// Read-only snapshot of every milestone, ascending by threshold.
    #[must_use]
    pub fn achievements(&self) -> Vec<Achievement> {
        ACHIEVEMENTS.iter().map(|d| self.achievement_for(d)).collect()
    }

    /// Drain the milestones unlocked by recording actions since the last
    /// call. The presentation layer shows its celebratory overlay from this.
    pub fn take_newly_unlocked(&mut self) -> Vec<Achievement> {
        std::mem::take(&mut self.newly_unlocked)
    }

    // --- Reminder ---

    #[must_use]
    pub fn reminder(&self) -> ReminderConfig {
        let enabled = self
            .storage
            .get(REMINDER_ENABLED_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let (hour, minute) = self
            .storage
            .get(REMINDER_TIME_KEY)
            .and_then(|v| v.as_f64())
            .map_or(
                (DEFAULT_REMINDER_HOUR, DEFAULT_REMINDER_MINUTE),
                crate::models::reminder_from_seconds,
            );
        ReminderConfig {
            enabled,
            hour,
            minute,
        }
    }

    pub fn set_reminder_enabled(&self, enabled: bool) {
        self.storage.set(REMINDER_ENABLED_KEY, Value::from(enabled));
    }

    pub fn set_reminder_time(&self, hour: u32, minute: u32) -> Result<()> {
        crate::models::validate_reminder_time(hour, minute)?;
        self.storage.set(
            REMINDER_TIME_KEY,
            Value::from(crate::models::reminder_seconds(hour, minute)),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryStorage;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRefresher {
        count: AtomicUsize,
    }

    impl CountingRefresher {
        fn new() -> Self {
            Self {
                count: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    impl WidgetRefresher for CountingRefresher {
        fn request_refresh(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn harness(
        today: NaiveDate,
    ) -> (
        BreakfastRecordStore,
        Arc<MemoryStorage>,
        Arc<FixedClock>,
        Arc<CountingRefresher>,
    ) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(FixedClock::on_day(today));
        let refresher = Arc::new(CountingRefresher::new());
        let store = BreakfastRecordStore::with_parts(
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&refresher) as Arc<dyn WidgetRefresher>,
        );
        (store, storage, clock, refresher)
    }

    fn at(day: NaiveDate, hour: u32) -> DateTime<Local> {
        crate::models::day_start_local(day) + chrono::Duration::hours(i64::from(hour))
    }

    #[test]
    fn test_record_then_read_round_trip_ignores_time_of_day() {
        let today = day(2024, 6, 15);
        let (mut store, _, _, _) = harness(today);

        store.record_breakfast(true, at(today, 7));
        assert_eq!(store.has_eaten_breakfast(at(today, 22)), Some(true));

        store.record_breakfast(false, at(today, 23));
        assert_eq!(store.has_eaten_breakfast(at(today, 1)), Some(false));
    }

    #[test]
    fn test_unrecorded_day_is_none_not_false() {
        let today = day(2024, 6, 15);
        let (store, _, _, _) = harness(today);
        assert_eq!(store.has_eaten_breakfast(at(today, 9)), None);
    }

    #[test]
    fn test_recording_twice_is_idempotent() {
        let today = day(2024, 6, 15);
        let (mut store, _, _, _) = harness(today);

        store.record_today(true);
        store.record_today(true);
        assert_eq!(store.has_eaten_breakfast(at(today, 9)), Some(true));
        assert_eq!(store.streak_count(), 1);
    }

    #[test]
    fn test_streak_spans_recorded_days() {
        let today = day(2024, 6, 15);
        let (mut store, _, _, _) = harness(today);

        store.record_breakfast(true, at(today - chrono::Duration::days(2), 8));
        store.record_breakfast(true, at(today - chrono::Duration::days(1), 8));
        store.record_breakfast(true, at(today, 8));
        assert_eq!(store.streak_count(), 3);
    }

    #[test]
    fn test_longest_streak_is_monotonic() {
        let today = day(2024, 6, 15);
        let (mut store, storage, clock, _) = harness(today);

        store.record_breakfast(true, at(today - chrono::Duration::days(2), 8));
        store.record_breakfast(true, at(today - chrono::Duration::days(1), 8));
        store.record_breakfast(true, at(today, 8));
        assert_eq!(store.longest_streak(), 3);

        // A break and a shorter new streak never lowers it.
        clock.advance_days(2);
        store.record_today(true);
        assert_eq!(store.streak_count(), 1);
        assert_eq!(store.longest_streak(), 3);
        assert_eq!(
            storage.get(LONGEST_STREAK_KEY).and_then(|v| v.as_u64()),
            Some(3)
        );
    }

    #[test]
    fn test_achievement_stays_unlocked_after_streak_reset() {
        let today = day(2024, 6, 15);
        let (mut store, _, clock, _) = harness(today);

        for i in (0..7).rev() {
            store.record_breakfast(true, at(today - chrono::Duration::days(i), 8));
        }
        let week = store
            .achievements()
            .into_iter()
            .find(|a| a.required_streak == 7)
            .unwrap();
        assert!(week.unlocked);
        assert!(week.unlocked_at.is_some());

        // Break the streak down to zero.
        clock.advance_days(1);
        store.record_today(false);
        assert_eq!(store.streak_count(), 0);
        let week = store
            .achievements()
            .into_iter()
            .find(|a| a.required_streak == 7)
            .unwrap();
        assert!(week.unlocked);
    }

    #[test]
    fn test_unlocks_announced_only_for_recording_actions() {
        let today = day(2024, 6, 15);
        let (mut store, storage, clock, _) = harness(today);

        store.record_today(true);
        let newly = store.take_newly_unlocked();
        assert_eq!(newly.len(), 1);
        assert_eq!(newly[0].name, "first_breakfast");
        // Drained after the first read.
        assert!(store.take_newly_unlocked().is_empty());

        // A fresh store over history that already crosses a threshold must
        // not announce on load.
        for i in 1..7 {
            store.record_breakfast(true, at(today - chrono::Duration::days(i), 8));
        }
        store.take_newly_unlocked();
        storage.remove(ACHIEVEMENT_UNLOCKS_KEY);
        storage.remove(LONGEST_STREAK_KEY);
        let mut fresh = BreakfastRecordStore::with_parts(
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(NoopRefresher),
        );
        assert!(fresh.take_newly_unlocked().is_empty());
        // State still advanced silently.
        assert!(
            fresh
                .achievements()
                .iter()
                .find(|a| a.required_streak == 7)
                .unwrap()
                .unlocked
        );
    }

    #[test]
    fn test_longest_streak_derives_unlocked_without_timestamp() {
        let today = day(2024, 6, 15);
        let storage = Arc::new(MemoryStorage::new());
        storage.set(LONGEST_STREAK_KEY, Value::from(14_u64));

        let store = BreakfastRecordStore::with_parts(
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(FixedClock::on_day(today)),
            Arc::new(NoopRefresher),
        );
        let two_weeks = store
            .achievements()
            .into_iter()
            .find(|a| a.required_streak == 14)
            .unwrap();
        assert!(two_weeks.unlocked);
        assert!(two_weeks.unlocked_at.is_none());
        let month = store
            .achievements()
            .into_iter()
            .find(|a| a.required_streak == 30)
            .unwrap();
        assert!(!month.unlocked);
    }

    #[test]
    fn test_can_record_today_reopens_after_midnight() {
        let today = day(2024, 6, 15);
        let (mut store, _, clock, _) = harness(today);

        assert!(store.can_record_today());
        store.record_today(true);
        assert!(!store.can_record_today());

        // No reset call: the rollover alone re-opens recording.
        clock.advance_days(1);
        assert!(store.can_record_today());
    }

    #[test]
    fn test_clear_today_record_removes_exactly_today() {
        let today = day(2024, 6, 15);
        let (mut store, _, _, _) = harness(today);

        store.record_breakfast(true, at(today - chrono::Duration::days(1), 8));
        store.record_today(true);
        assert_eq!(store.streak_count(), 2);

        store.clear_today_record();
        assert_eq!(store.has_eaten_breakfast(at(today, 9)), None);
        assert!(store.can_record_today());
        // Yesterday survives; unrecorded today is skipped by the walk.
        assert_eq!(store.streak_count(), 1);
    }

    #[test]
    fn test_every_write_signals_the_widget() {
        let today = day(2024, 6, 15);
        let (mut store, _, _, refresher) = harness(today);

        store.record_today(true);
        assert_eq!(refresher.count(), 1);
        store.clear_today_record();
        assert_eq!(refresher.count(), 2);
        store.reset_daily_selection();
        assert_eq!(refresher.count(), 3);
    }

    #[test]
    fn test_fresh_store_sees_persisted_state() {
        let today = day(2024, 6, 15);
        let (mut store, storage, clock, _) = harness(today);

        store.record_breakfast_with_note(true, at(today, 8), Some("oats".to_string()));
        drop(store);

        let reopened = BreakfastRecordStore::with_parts(
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(NoopRefresher),
        );
        assert_eq!(reopened.has_eaten_breakfast(at(today, 9)), Some(true));
        assert_eq!(
            reopened.record_for(at(today, 9)).unwrap().note.as_deref(),
            Some("oats")
        );
    }

    #[test]
    fn test_corrupt_records_value_loads_as_empty_history() {
        let today = day(2024, 6, 15);
        let storage = Arc::new(MemoryStorage::new());
        storage.set(RECORDS_KEY, Value::from("garbage"));

        let store = BreakfastRecordStore::with_parts(
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(FixedClock::on_day(today)),
            Arc::new(NoopRefresher),
        );
        assert_eq!(store.streak_count(), 0);
        assert!(store.can_record_today());
    }

    #[test]
    fn test_stats_reflect_store_state() {
        let today = day(2024, 6, 15);
        let (mut store, _, _, _) = harness(today);

        store.record_breakfast(true, at(today - chrono::Duration::days(1), 8));
        store.record_breakfast(false, at(today - chrono::Duration::days(2), 8));
        store.record_today(true);

        let stats = store.compute_stats();
        assert_eq!(stats.total_days, 3);
        assert_eq!(stats.days_eaten, 2);
        assert_eq!(stats.days_skipped, 1);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);
    }

    #[test]
    fn test_reminder_defaults_and_round_trip() {
        let today = day(2024, 6, 15);
        let (store, _, _, _) = harness(today);

        let reminder = store.reminder();
        assert!(!reminder.enabled);
        assert_eq!((reminder.hour, reminder.minute), (8, 0));

        store.set_reminder_time(7, 45).unwrap();
        store.set_reminder_enabled(true);
        let reminder = store.reminder();
        assert!(reminder.enabled);
        assert_eq!((reminder.hour, reminder.minute), (7, 45));

        assert!(store.set_reminder_time(24, 0).is_err());
        assert!(store.set_reminder_time(8, 60).is_err());
        // Invalid input leaves the stored value alone.
        assert_eq!(store.reminder().hour, 7);
    }

    #[test]
    fn test_reload_rebuilds_from_storage() {
        let today = day(2024, 6, 15);
        let (mut store, storage, _, _) = harness(today);

        store.record_today(true);
        // Another writer replaces the record list out from under us.
        storage.set(RECORDS_KEY, Value::Array(vec![]));
        assert_eq!(store.streak_count(), 1);

        store.reload();
        assert_eq!(store.streak_count(), 0);
        assert!(store.can_record_today());
        assert!(store.take_newly_unlocked().is_empty());
    }
}

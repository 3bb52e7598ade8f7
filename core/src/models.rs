use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeZone, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys inside the shared namespace. Both the app process and the widget
/// process address exactly these.
pub const RECORDS_KEY: &str = "breakfastRecords";
pub const LONGEST_STREAK_KEY: &str = "longestStreak";
pub const REMINDER_ENABLED_KEY: &str = "reminderEnabled";
pub const REMINDER_TIME_KEY: &str = "reminderTime";
pub const ACHIEVEMENT_UNLOCKS_KEY: &str = "achievementUnlocks";

/// One day's outcome. `day` is the normalized local calendar day and the
/// unique key; writing the same day again overwrites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakfastRecord {
    pub day: NaiveDate,
    pub eaten: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// The record collection, keyed by normalized day.
pub type RecordMap = BTreeMap<NaiveDate, BreakfastRecord>;

/// Wire form of one record as persisted under [`RECORDS_KEY`]: a unix
/// timestamp (seconds, local midnight of the day), the outcome, and an
/// optional note carried for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub timestamp: f64,
    pub eaten: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

/// Local midnight of `day` as a `DateTime`. Falls back to interpreting the
/// naive midnight as UTC when a DST transition removes local midnight.
#[must_use]
pub fn day_start_local(day: NaiveDate) -> DateTime<Local> {
    let midnight = day.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt,
        None => midnight.and_utc().with_timezone(&Local),
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn day_to_timestamp(day: NaiveDate) -> f64 {
    day_start_local(day).timestamp() as f64
}

#[must_use]
pub fn timestamp_to_day(ts: f64) -> Option<NaiveDate> {
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.floor() as i64;
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.date_naive())
}

pub fn encode_records(records: &RecordMap) -> serde_json::Result<Value> {
    let stored: Vec<StoredRecord> = records
        .values()
        .map(|r| StoredRecord {
            timestamp: day_to_timestamp(r.day),
            eaten: r.eaten,
            note: r.note.clone(),
        })
        .collect();
    serde_json::to_value(stored)
}

/// Decode the persisted record list. A missing or undecodable value means
/// empty history; a later stored entry for the same day wins.
#[must_use]
pub fn decode_records(value: Option<&Value>) -> RecordMap {
    let Some(value) = value else {
        return RecordMap::new();
    };
    let stored: Vec<StoredRecord> = match serde_json::from_value(value.clone()) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("undecodable record list, starting from empty history: {e}");
            return RecordMap::new();
        }
    };
    let mut records = RecordMap::new();
    for s in stored {
        if let Some(day) = timestamp_to_day(s.timestamp) {
            records.insert(
                day,
                BreakfastRecord {
                    day,
                    eaten: s.eaten,
                    note: s.note,
                },
            );
        }
    }
    records
}

#[must_use]
pub fn decode_unlocks(value: Option<&Value>) -> BTreeMap<String, f64> {
    let Some(value) = value else {
        return BTreeMap::new();
    };
    match serde_json::from_value(value.clone()) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("undecodable achievement unlocks, treating as none: {e}");
            BTreeMap::new()
        }
    }
}

/// Consecutive `eaten == true` days walking backward from `today`. Today
/// counts only if explicitly recorded true; an unrecorded today is skipped
/// without breaking the walk. For every earlier day, absence stops the walk
/// just like an explicit false.
#[must_use]
pub fn compute_streak(records: &RecordMap, today: NaiveDate) -> u32 {
    let mut streak = 0;
    match records.get(&today) {
        Some(r) if r.eaten => streak += 1,
        Some(_) => return 0,
        None => {}
    }
    let mut day = today - chrono::Duration::days(1);
    while records.get(&day).is_some_and(|r| r.eaten) {
        streak += 1;
        day -= chrono::Duration::days(1);
    }
    streak
}

/// Aggregate statistics over the record collection.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_days: u32,
    pub days_eaten: u32,
    pub days_skipped: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// `0.7 * rate(last 30 days) + 0.3 * all-time rate`; falls back to the
    /// all-time rate alone when the recent window has no tracked days.
    pub completion_rate: f64,
    /// Per-weekday rates over the last 90 days.
    pub weekday_rates: Vec<WeekdayRate>,
    pub best_weekday: Option<String>,
    pub worst_weekday: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayRate {
    pub weekday: String,
    pub tracked: u32,
    pub eaten: u32,
    pub rate: f64,
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[must_use]
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn rate(eaten: u32, tracked: u32) -> f64 {
    if tracked == 0 {
        0.0
    } else {
        f64::from(eaten) / f64::from(tracked)
    }
}

fn window_counts(records: &RecordMap, from: NaiveDate, to: NaiveDate) -> (u32, u32) {
    let mut tracked = 0;
    let mut eaten = 0;
    for r in records.range(from..=to).map(|(_, r)| r) {
        tracked += 1;
        if r.eaten {
            eaten += 1;
        }
    }
    (tracked, eaten)
}

#[must_use]
pub fn compute_stats(records: &RecordMap, today: NaiveDate, longest_streak: u32) -> Stats {
    let total_days = records.len() as u32;
    let days_eaten = records.values().filter(|r| r.eaten).count() as u32;
    let days_skipped = total_days - days_eaten;
    let current_streak = compute_streak(records, today);

    let all_time_rate = rate(days_eaten, total_days);
    let (recent_tracked, recent_eaten) =
        window_counts(records, today - chrono::Duration::days(29), today);
    let completion_rate = if total_days == 0 {
        0.0
    } else if recent_tracked == 0 {
        all_time_rate
    } else {
        0.7 * rate(recent_eaten, recent_tracked) + 0.3 * all_time_rate
    };

    // Per-weekday rates over the last 90 days. Ties on best/worst go to the
    // first weekday in Monday..Sunday order.
    let window_start = today - chrono::Duration::days(89);
    let mut weekday_rates = Vec::with_capacity(7);
    let mut best: Option<(f64, Weekday)> = None;
    let mut worst: Option<(f64, Weekday)> = None;
    for weekday in WEEKDAYS {
        let mut tracked = 0;
        let mut eaten = 0;
        for r in records.range(window_start..=today).map(|(_, r)| r) {
            if r.day.weekday() == weekday {
                tracked += 1;
                if r.eaten {
                    eaten += 1;
                }
            }
        }
        let day_rate = rate(eaten, tracked);
        if tracked > 0 {
            if best.is_none_or(|(r, _)| day_rate > r) {
                best = Some((day_rate, weekday));
            }
            if worst.is_none_or(|(r, _)| day_rate < r) {
                worst = Some((day_rate, weekday));
            }
        }
        weekday_rates.push(WeekdayRate {
            weekday: weekday_name(weekday).to_string(),
            tracked,
            eaten,
            rate: day_rate,
        });
    }

    Stats {
        total_days,
        days_eaten,
        days_skipped,
        current_streak,
        longest_streak: longest_streak.max(current_streak),
        completion_rate,
        weekday_rates,
        best_weekday: best.map(|(_, w)| weekday_name(w).to_string()),
        worst_weekday: worst.map(|(_, w)| weekday_name(w).to_string()),
    }
}

// --- Achievements ---

/// A streak milestone. `unlocked` is monotonic: once true, a later streak
/// reset never reverts it.
#[derive(Debug, Clone, Serialize)]
pub struct Achievement {
    pub name: String,
    pub title: String,
    pub required_streak: u32,
    pub unlocked: bool,
    /// Unix timestamp of the first time the threshold was crossed, set once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<f64>,
}

pub struct AchievementDef {
    pub name: &'static str,
    pub title: &'static str,
    pub required_streak: u32,
}

/// Milestones in ascending threshold order.
pub const ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        name: "first_breakfast",
        title: "First Breakfast",
        required_streak: 1,
    },
    AchievementDef {
        name: "one_week",
        title: "One Week Strong",
        required_streak: 7,
    },
    AchievementDef {
        name: "two_weeks",
        title: "Two Week Run",
        required_streak: 14,
    },
    AchievementDef {
        name: "three_weeks",
        title: "Habit Formed",
        required_streak: 21,
    },
    AchievementDef {
        name: "one_month",
        title: "Full Month",
        required_streak: 30,
    },
];

// --- Reminder ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
}

pub const DEFAULT_REMINDER_HOUR: u32 = 8;
pub const DEFAULT_REMINDER_MINUTE: u32 = 0;

pub fn validate_reminder_time(hour: u32, minute: u32) -> Result<()> {
    if hour > 23 {
        bail!("Reminder hour must be between 0 and 23 (got {hour})");
    }
    if minute > 59 {
        bail!("Reminder minute must be between 0 and 59 (got {minute})");
    }
    Ok(())
}

/// The persisted `reminderTime` value: a timestamp carrying only the time of
/// day, encoded as seconds since midnight.
#[must_use]
pub fn reminder_seconds(hour: u32, minute: u32) -> f64 {
    f64::from(hour * 3600 + minute * 60)
}

#[must_use]
pub fn reminder_from_seconds(ts: f64) -> (u32, u32) {
    if !ts.is_finite() {
        return (DEFAULT_REMINDER_HOUR, DEFAULT_REMINDER_MINUTE);
    }
    let secs = (ts.floor() as i64).rem_euclid(86_400) as u32;
    (secs / 3600, (secs % 3600) / 60)
}

// --- Widget read model ---

/// Compact glance data for the home-screen widget: everything it renders,
/// derived from one read of the shared namespace.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetGlance {
    pub date: String,
    pub eaten: Option<bool>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub can_record: bool,
}

use anyhow::Result;
use serde::Serialize;
use std::process;

use brekkie_core::models::{Achievement, day_start_local};
use brekkie_core::store::BreakfastRecordStore;

use super::helpers::{outcome_label, parse_date};

#[derive(Serialize)]
struct LogOutput {
    date: String,
    eaten: bool,
    current_streak: u32,
    longest_streak: u32,
    newly_unlocked: Vec<Achievement>,
}

pub(crate) fn cmd_log(
    store: &mut BreakfastRecordStore,
    eaten: bool,
    date: Option<String>,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    store.record_breakfast_with_note(eaten, day_start_local(date), note);

    let newly_unlocked = store.take_newly_unlocked();
    let output = LogOutput {
        date: date.format("%Y-%m-%d").to_string(),
        eaten,
        current_streak: store.streak_count(),
        longest_streak: store.longest_streak(),
        newly_unlocked,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let label = outcome_label(Some(eaten));
    let streak = output.current_streak;
    println!("Logged: breakfast {label} for {} — streak: {streak}", output.date);
    for a in &output.newly_unlocked {
        let title = &a.title;
        let required = a.required_streak;
        println!("Unlocked: {title} ({required}-day streak)");
    }

    Ok(())
}

#[derive(Serialize)]
struct StatusOutput {
    date: String,
    eaten: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    can_record_today: bool,
    current_streak: u32,
    longest_streak: u32,
}

pub(crate) fn cmd_status(
    store: &BreakfastRecordStore,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let record = store.record_for(day_start_local(date));
    let output = StatusOutput {
        date: date.format("%Y-%m-%d").to_string(),
        eaten: record.map(|r| r.eaten),
        note: record.and_then(|r| r.note.clone()),
        can_record_today: store.can_record_today(),
        current_streak: store.streak_count(),
        longest_streak: store.longest_streak(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let label = outcome_label(output.eaten);
    let streak = output.current_streak;
    let longest = output.longest_streak;
    println!("{}: {label}", output.date);
    if let Some(note) = &output.note {
        println!("  note: {note}");
    }
    println!("  streak: {streak} (best: {longest})");

    if output.eaten.is_none() {
        process::exit(2);
    }
    Ok(())
}

pub(crate) fn cmd_clear_today(store: &mut BreakfastRecordStore, json: bool) -> Result<()> {
    store.clear_today_record();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "cleared": true,
                "current_streak": store.streak_count(),
            })
        );
        return Ok(());
    }

    let streak = store.streak_count();
    println!("Cleared today's record — streak: {streak}");
    Ok(())
}

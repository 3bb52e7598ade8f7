use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use brekkie_core::store::BreakfastRecordStore;

pub(crate) fn cmd_stats(store: &BreakfastRecordStore, json: bool) -> Result<()> {
    let stats = store.compute_stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    if stats.total_days == 0 {
        eprintln!("No records yet");
        process::exit(2);
    }

    let total = stats.total_days;
    let eaten = stats.days_eaten;
    let skipped = stats.days_skipped;
    let streak = stats.current_streak;
    let longest = stats.longest_streak;
    let rate = stats.completion_rate * 100.0;
    println!("  Tracked: {total} days ({eaten} eaten, {skipped} skipped)");
    println!("  Streak: {streak} (best: {longest})");
    println!("  Completion rate: {rate:.0}%");
    if let (Some(best), Some(worst)) = (&stats.best_weekday, &stats.worst_weekday) {
        println!("  Best weekday: {best} | worst: {worst}");
    }
    println!();

    #[derive(Tabled)]
    struct WeekdayRow {
        #[tabled(rename = "Weekday")]
        weekday: String,
        #[tabled(rename = "Tracked")]
        tracked: u32,
        #[tabled(rename = "Eaten")]
        eaten: u32,
        #[tabled(rename = "Rate")]
        rate: String,
    }

    let rows: Vec<WeekdayRow> = stats
        .weekday_rates
        .iter()
        .map(|w| WeekdayRow {
            weekday: w.weekday.clone(),
            tracked: w.tracked,
            eaten: w.eaten,
            rate: if w.tracked == 0 {
                "-".to_string()
            } else {
                format!("{:.0}%", w.rate * 100.0)
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

use anyhow::Result;

use brekkie_core::store::BreakfastRecordStore;

use super::helpers::parse_time;

pub(crate) fn cmd_reminder_set_time(
    store: &BreakfastRecordStore,
    time: &str,
    json: bool,
) -> Result<()> {
    let (hour, minute) = parse_time(time)?;
    store.set_reminder_time(hour, minute)?;
    print_reminder(store, json)
}

pub(crate) fn cmd_reminder_set_enabled(
    store: &BreakfastRecordStore,
    enabled: bool,
    json: bool,
) -> Result<()> {
    store.set_reminder_enabled(enabled);
    print_reminder(store, json)
}

pub(crate) fn cmd_reminder_show(store: &BreakfastRecordStore, json: bool) -> Result<()> {
    print_reminder(store, json)
}

fn print_reminder(store: &BreakfastRecordStore, json: bool) -> Result<()> {
    let reminder = store.reminder();

    if json {
        println!("{}", serde_json::to_string_pretty(&reminder)?);
        return Ok(());
    }

    let state = if reminder.enabled { "on" } else { "off" };
    println!(
        "Reminder: {state} at {:02}:{:02}",
        reminder.hour, reminder.minute
    );

    Ok(())
}

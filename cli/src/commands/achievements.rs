use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use brekkie_core::store::BreakfastRecordStore;

use super::helpers::format_unlock_date;

pub(crate) fn cmd_achievements(store: &BreakfastRecordStore, json: bool) -> Result<()> {
    let achievements = store.achievements();

    if json {
        println!("{}", serde_json::to_string_pretty(&achievements)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct AchievementRow {
        #[tabled(rename = "Milestone")]
        title: String,
        #[tabled(rename = "Streak")]
        required: u32,
        #[tabled(rename = "Unlocked")]
        unlocked: &'static str,
        #[tabled(rename = "Date")]
        date: String,
    }

    let rows: Vec<AchievementRow> = achievements
        .iter()
        .map(|a| AchievementRow {
            title: a.title.clone(),
            required: a.required_streak,
            unlocked: if a.unlocked { "yes" } else { "no" },
            date: format_unlock_date(a.unlocked_at),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

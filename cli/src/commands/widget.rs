use anyhow::Result;

use brekkie_core::widget::WidgetClient;

use super::helpers::outcome_label;

pub(crate) fn cmd_widget_glance(widget: &WidgetClient, json: bool) -> Result<()> {
    print_glance(widget, json)
}

pub(crate) fn cmd_widget_mark(widget: &WidgetClient, eaten: bool, json: bool) -> Result<()> {
    if eaten {
        widget.mark_eaten();
    } else {
        widget.mark_skipped();
    }
    print_glance(widget, json)
}

fn print_glance(widget: &WidgetClient, json: bool) -> Result<()> {
    let glance = widget.glance();

    if json {
        println!("{}", serde_json::to_string_pretty(&glance)?);
        return Ok(());
    }

    println!(
        "{}: {} — streak: {} (best: {})",
        glance.date,
        outcome_label(glance.eaten),
        glance.current_streak,
        glance.longest_streak
    );

    Ok(())
}

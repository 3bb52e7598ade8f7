mod achievements;
mod helpers;
mod log;
mod reminder;
mod stats;
mod widget;

pub(crate) use achievements::cmd_achievements;
pub(crate) use log::{cmd_clear_today, cmd_log, cmd_status};
pub(crate) use reminder::{cmd_reminder_set_enabled, cmd_reminder_set_time, cmd_reminder_show};
pub(crate) use stats::cmd_stats;
pub(crate) use widget::{cmd_widget_glance, cmd_widget_mark};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, TimeZone};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday")),
        },
    }
}

/// Parse "HH:MM" into (hour, minute). Range checks live in the core.
pub(crate) fn parse_time(s: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = s.splitn(2, ':').collect();
    if parts.len() != 2 {
        bail!("Invalid time '{s}'. Use HH:MM (e.g. 07:30)");
    }
    let hour: u32 = parts[0]
        .parse()
        .with_context(|| format!("Invalid hour in '{s}'"))?;
    let minute: u32 = parts[1]
        .parse()
        .with_context(|| format!("Invalid minute in '{s}'"))?;
    Ok((hour, minute))
}

pub(crate) fn outcome_label(eaten: Option<bool>) -> &'static str {
    match eaten {
        Some(true) => "eaten",
        Some(false) => "skipped",
        None => "unrecorded",
    }
}

/// Render a unix unlock timestamp as a local YYYY-MM-DD, or "-" when the
/// unlock predates timestamp tracking.
pub(crate) fn format_unlock_date(ts: Option<f64>) -> String {
    ts.and_then(|ts| {
        if !ts.is_finite() {
            return None;
        }
        Local
            .timestamp_opt(ts.floor() as i64, 0)
            .single()
            .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
    })
    .unwrap_or_else(|| "-".to_string())
}

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::process;
use std::sync::Arc;

use brekkie_core::storage::SharedDefaults;
use brekkie_core::store::BreakfastRecordStore;
use brekkie_core::widget::WidgetClient;

use crate::commands::{
    cmd_achievements, cmd_clear_today, cmd_log, cmd_reminder_set_enabled, cmd_reminder_set_time,
    cmd_reminder_show, cmd_stats, cmd_status, cmd_widget_glance, cmd_widget_mark,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "brekkie",
    version,
    about = "A simple breakfast habit tracker CLI",
    long_about = "\n
  ┌─────────────────────────────┐
  │  brekkie                    │
  │  did you eat breakfast?     │
  └─────────────────────────────┘
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Outcome {
    Eaten,
    Skipped,
}

impl Outcome {
    fn eaten(self) -> bool {
        matches!(self, Outcome::Eaten)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Record breakfast for today (or an explicit date)
    Log {
        /// Outcome to record
        outcome: Outcome,
        /// Date to record for (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Optional note stored with the record
        #[arg(long)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the recorded outcome and current streak (defaults to today)
    Status {
        /// Date to show (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show aggregate statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show streak milestones
    Achievements {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the daily reminder
    Reminder {
        #[command(subcommand)]
        command: ReminderCommands,
    },
    /// Widget entry points (glance rendering and tap actions)
    Widget {
        #[command(subcommand)]
        command: WidgetCommands,
    },
    /// Remove today's record (admin)
    ClearToday {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ReminderCommands {
    /// Set the reminder time
    Set {
        /// Time of day as HH:MM
        time: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enable the reminder
    On {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Disable the reminder
    Off {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the reminder configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WidgetCommands {
    /// Show the widget glance snapshot
    Glance {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark today as eaten (widget tap action)
    Eaten {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark today as skipped (widget tap action)
    Skipped {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brekkie=warn,brekkie_core=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let storage = Arc::new(SharedDefaults::open(&config.namespace_path));

    // The widget subcommand is its own process role: it never goes through
    // the record store, only through the widget client's read/write path.
    if let Commands::Widget { command } = &cli.command {
        let widget = WidgetClient::new(storage);
        return match command {
            WidgetCommands::Glance { json } => cmd_widget_glance(&widget, *json),
            WidgetCommands::Eaten { json } => cmd_widget_mark(&widget, true, *json),
            WidgetCommands::Skipped { json } => cmd_widget_mark(&widget, false, *json),
        };
    }

    let mut store = BreakfastRecordStore::new(storage);

    match cli.command {
        Commands::Log {
            outcome,
            date,
            note,
            json,
        } => cmd_log(&mut store, outcome.eaten(), date, note, json),
        Commands::Status { date, json } => cmd_status(&store, date, json),
        Commands::Stats { json } => cmd_stats(&store, json),
        Commands::Achievements { json } => cmd_achievements(&store, json),
        Commands::Reminder { command } => match command {
            ReminderCommands::Set { time, json } => cmd_reminder_set_time(&store, &time, json),
            ReminderCommands::On { json } => cmd_reminder_set_enabled(&store, true, json),
            ReminderCommands::Off { json } => cmd_reminder_set_enabled(&store, false, json),
            ReminderCommands::Show { json } => cmd_reminder_show(&store, json),
        },
        Commands::ClearToday { json } => cmd_clear_today(&mut store, json),
        Commands::Widget { .. } => unreachable!("handled above"),
    }
}

use std::path::PathBuf;

use chrono::{NaiveDate, Weekday};
use structopt::StructOpt;

use crate::validate;

#[derive(Debug, StructOpt)]
pub enum UserCommand {
    /// Register a new user.
    Add {
        /// Display name.
        #[structopt()]
        name: String,

        /// E-mail, used to pick the user with --user.
        #[structopt()]
        email: String,
    },
    /// List registered users.
    List,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Manage users.
    User {
        #[structopt(subcommand)]
        action: UserCommand,
    },
    /// Add a task to the calendar.
    Add {
        /// The task title.
        #[structopt()]
        title: String,

        /// Start date (YYYY-MM-DD).
        #[structopt()]
        start_date: String,

        /// Start time (HH:MM, 24h).
        #[structopt(long)]
        at: Option<String>,

        /// End time (HH:MM, 24h).
        #[structopt(long)]
        until: Option<String>,

        /// End date (YYYY-MM-DD), defaults to the start date.
        #[structopt(long)]
        end_date: Option<String>,

        /// Longer description.
        #[structopt(short, long)]
        description: Option<String>,

        /// An http(s) URL of an image for the task.
        #[structopt(long)]
        image_url: Option<String>,

        /// The task takes the whole day.
        #[structopt(long)]
        all_day: bool,
    },
    /// Change some fields of a task.
    Edit {
        #[structopt()]
        id: u32,

        #[structopt(long)]
        title: Option<String>,

        /// New description, an empty string removes it.
        #[structopt(short, long)]
        description: Option<String>,

        /// New image URL, an empty string removes it.
        #[structopt(long)]
        image_url: Option<String>,

        #[structopt(long)]
        start_date: Option<String>,

        #[structopt(long)]
        at: Option<String>,

        #[structopt(long)]
        end_date: Option<String>,

        #[structopt(long)]
        until: Option<String>,

        /// true or false.
        #[structopt(long)]
        all_day: Option<bool>,
    },
    /// Remove a task.
    Rm {
        #[structopt()]
        id: u32,
    },
    /// Show every field of a task.
    Show {
        #[structopt()]
        id: u32,
    },
    /// List all tasks.
    List,
    /// Print the week grid.
    Week {
        /// Any date of the week to show, defaults to today.
        #[structopt(long, parse(try_from_str = parse_date))]
        date: Option<NaiveDate>,

        /// Move this many weeks forward.
        #[structopt(long, default_value = "0")]
        next: u32,

        /// Move this many weeks back.
        #[structopt(long, default_value = "0")]
        prev: u32,

        /// Hide hours where no task starts.
        #[structopt(short, long)]
        compact: bool,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(name = "syncro", about = "A weekly task calendar.")]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Command,

    /// Use a different calendar file.
    #[structopt(parse(from_os_str), short = "f", long, env = "SYNCRO_CALENDAR")]
    pub calendar_file: Option<PathBuf>,

    /// E-mail of the user whose calendar is used.
    #[structopt(short, long, env = "SYNCRO_USER")]
    pub user: Option<String>,

    /// First day of the week (sun, mon, ...).
    #[structopt(long, default_value = "sun", env = "SYNCRO_WEEK_START", parse(try_from_str = parse_weekday))]
    pub week_start: Weekday,
}

fn parse_date(value: &str) -> Result<NaiveDate, validate::ValidationError> {
    validate::parse_date("date", value)
}

fn parse_weekday(value: &str) -> Result<Weekday, String> {
    value
        .parse::<Weekday>()
        .map_err(|_| format!("'{}' is not a day of the week", value))
}

#[macro_use]
extern crate prettytable;

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use chrono::Local;
use directories::ProjectDirs;
use rusqlite::Connection;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod calendar;
mod cli;
mod interface;
mod model;
mod validate;
mod view;

use crate::model::init_calendar;
use crate::validate::{TaskDraft, TaskPatch};
use cli::{Command::*, CommandLineArgs, UserCommand};

fn find_default_calendar_file() -> Option<PathBuf> {
    let base_dirs = ProjectDirs::from("com", "gozque", "syncro")?;
    let mut path = PathBuf::from(base_dirs.data_dir());
    path.push("calendar.sqlite");
    Some(path)
}

/// Get a connection to the calendar database, creating it if it does
/// not exist.
pub fn get_calendar_db(calendar_path: PathBuf) -> anyhow::Result<Connection> {
    if let Some(dir) = calendar_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}.", dir.display()))?;
        }
    }

    let calendar_exists = calendar_path.exists();
    let db = Connection::open(&calendar_path)
        .with_context(|| format!("Failed to open calendar file {}.", calendar_path.display()))?;
    if !calendar_exists {
        init_calendar(&db)?;
        info!(path = %calendar_path.display(), "created calendar database");
    }
    Ok(db)
}

/// `RUST_LOG` directives when they parse, warnings only otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    // Get the command-line arguments.
    let CommandLineArgs {
        action,
        calendar_file,
        user,
        week_start,
    } = CommandLineArgs::from_args();

    // Unpack the calendar file.
    let calendar_file = calendar_file
        .or_else(find_default_calendar_file)
        .ok_or(anyhow!("Failed to find calendar file."))?;

    let database = get_calendar_db(calendar_file)?;

    // Perform the action.
    match action {
        User { action } => match action {
            UserCommand::Add { name, email } => interface::add_user(&database, &name, &email),
            UserCommand::List => interface::list_users(&database),
        },
        Add {
            title,
            start_date,
            at,
            until,
            end_date,
            description,
            image_url,
            all_day,
        } => {
            let user = interface::current_user(&database, user)?;
            let draft = TaskDraft {
                title,
                description,
                image_url,
                start_date,
                start_time: at,
                end_date,
                end_time: until,
                all_day,
            };
            interface::add_task(&database, &user, draft)
        }
        Edit {
            id,
            title,
            description,
            image_url,
            start_date,
            at,
            end_date,
            until,
            all_day,
        } => {
            let user = interface::current_user(&database, user)?;
            let patch = TaskPatch {
                title,
                description,
                image_url,
                start_date,
                start_time: at,
                end_date,
                end_time: until,
                all_day,
            };
            interface::edit_task(&database, &user, id, patch)
        }
        Rm { id } => {
            let user = interface::current_user(&database, user)?;
            interface::remove_task(&database, &user, id)
        }
        Show { id } => {
            let user = interface::current_user(&database, user)?;
            interface::show_task(&database, &user, id)
        }
        List => {
            let user = interface::current_user(&database, user)?;
            interface::list(&database, &user)
        }
        Week {
            date,
            next,
            prev,
            compact,
        } => {
            let user = interface::current_user(&database, user)?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            interface::week(&database, &user, week_start, date, next, prev, compact)
        }
    }?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_calendar_file_gets_a_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("calendar.sqlite");

        let db = get_calendar_db(path.clone()).unwrap();
        model::add_user(&db, "Ada", "ada@example.com").unwrap();
        drop(db);

        let db = get_calendar_db(path).unwrap();
        assert_eq!(model::users(&db).unwrap().len(), 1);
    }

    #[test]
    fn rust_log_sets_the_level() {
        assert!(log_filter(Some("debug")).to_string().contains("debug"));
        assert!(log_filter(Some("syncro=trace")).to_string().contains("syncro=trace"));
        assert_eq!(log_filter(None).to_string(), "warn");
    }
}

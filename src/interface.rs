use std::time::Duration as STDDuration;

use anyhow::{anyhow, bail, Result};
use chrono::{Duration, NaiveDate, Weekday};
use humantime::format_duration;
use prettytable::{Cell, Row, Table};
use rusqlite::Connection;

use crate::calendar::{Lane, Placement, WeekGrid, DAYS_PER_WEEK, HOURS_PER_DAY};
use crate::model::{self, Task, User};
use crate::validate::{TaskDraft, TaskPatch};
use crate::view::{CalendarView, ViewState};

/// Width, in characters, titles are wrapped to inside a grid cell.
const CELL_WIDTH: usize = 14;

pub fn add_user(db: &Connection, name: &str, email: &str) -> Result<()> {
    let id = model::add_user(db, name, email)?;
    println!("{}. {} <{}>", id, name.trim(), email.trim().to_lowercase());
    Ok(())
}

pub fn list_users(db: &Connection) -> Result<()> {
    let mut table = Table::new();
    table.add_row(row!["id", "name", "email", "registered"]);
    for user in model::users(db)? {
        table.add_row(row![
            user.id,
            user.name,
            user.email,
            user.created_at.format("%F %R")
        ]);
    }
    table.printstd();
    Ok(())
}

/// Find the acting user from the e-mail given on the command line.
pub fn current_user(db: &Connection, email: Option<String>) -> Result<User> {
    let email = email.ok_or(anyhow!(
        "No user selected. Use --user or set SYNCRO_USER."
    ))?;
    model::user_by_email(db, &email)?
        .ok_or_else(|| anyhow!("No user registered with email {}.", email.trim()))
}

pub fn add_task(db: &Connection, user: &User, draft: TaskDraft) -> Result<()> {
    let task = draft.validate()?;
    let id = model::add_task(db, user.id, &task)?;
    println!("{}. {}", id, task.title);
    Ok(())
}

pub fn edit_task(db: &Connection, user: &User, id: u32, patch: TaskPatch) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to change.");
    }
    let task = find_task(db, user, id)?;
    let updated = patch.apply(&task).validate()?;
    if !model::update_task(db, user.id, id, &updated)? {
        bail!("Task {} not found.", id);
    }
    println!("{}. {} updated.", id, updated.title);
    Ok(())
}

pub fn remove_task(db: &Connection, user: &User, id: u32) -> Result<()> {
    if !model::remove_task(db, user.id, id)? {
        bail!("Task {} not found.", id);
    }
    println!("Task {} removed.", id);
    Ok(())
}

pub fn show_task(db: &Connection, user: &User, id: u32) -> Result<()> {
    let task = find_task(db, user, id)?;
    task_table(&task).printstd();
    Ok(())
}

pub fn list(db: &Connection, user: &User) -> Result<()> {
    let mut table = Table::new();
    table.add_row(row!["id", "task", "when", "duration"]);
    for task in model::tasks_for_user(db, user.id)? {
        table.add_row(row![
            task.id,
            task.title,
            fmt_span(&task),
            fmt_duration(&task)
        ]);
    }
    table.printstd();
    Ok(())
}

/// Print the week containing `date`, moved `next` weeks forward and
/// `prev` weeks back.
pub fn week(
    db: &Connection,
    user: &User,
    first_day: Weekday,
    date: NaiveDate,
    next: u32,
    prev: u32,
    compact: bool,
) -> Result<()> {
    let (title, table) = week_view(db, user, first_day, date, next, prev, compact)?;
    println!("{}", title);
    table.printstd();
    Ok(())
}

fn week_view(
    db: &Connection,
    user: &User,
    first_day: Weekday,
    date: NaiveDate,
    next: u32,
    prev: u32,
    compact: bool,
) -> Result<(String, Table)> {
    let mut view = CalendarView::new(date, first_day)?;
    view.set_user(db, user.id);
    if let ViewState::Error { message } = view.state() {
        bail!("{}", message);
    }
    view.navigate(i64::from(next) - i64::from(prev))?;

    let (week, grid) = match (view.week(), view.grid()) {
        (Some(week), Some(grid)) => (week, grid),
        _ => bail!("Tasks are not loaded."),
    };

    let title = week.reference().format("%B %Y").to_string();
    Ok((title, render_week(&grid, compact)))
}

/// Paint a week grid: one column per day, the all-day lane first and
/// then one row per hour.
pub fn render_week(grid: &WeekGrid, compact: bool) -> Table {
    let mut table = Table::new();

    let mut header = vec![Cell::new("")];
    header.extend(
        grid.days()
            .iter()
            .map(|day| Cell::new(&day.format("%a %m/%d").to_string())),
    );
    table.set_titles(Row::new(header));

    if !compact || grid.has_all_day() {
        let mut lane = vec![Cell::new("all day")];
        lane.extend((0..DAYS_PER_WEEK).map(|day| Cell::new(&cell_text(grid.all_day(day)))));
        table.add_row(Row::new(lane));
    }

    for hour in 0..HOURS_PER_DAY {
        if compact && grid.is_hour_empty(hour) {
            continue;
        }
        let mut cells = vec![Cell::new(&hour_label(hour))];
        cells.extend((0..DAYS_PER_WEEK).map(|day| Cell::new(&cell_text(grid.cell(day, hour)))));
        table.add_row(Row::new(cells));
    }

    table
}

/// 12 hour clock label of an hour row, e.g. `12:00 AM`, `3:00 PM`.
pub fn hour_label(hour: u32) -> String {
    let clock = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    format!("{}:00 {}", clock, meridiem)
}

fn cell_text(placements: &[Placement]) -> String {
    placements
        .iter()
        .map(|p| match p.lane {
            Lane::AllDay => textwrap::fill(&p.task.title, CELL_WIDTH),
            Lane::Hour(_) => format!(
                "{}\n+{:.0}% {:.0}%",
                textwrap::fill(&p.task.title, CELL_WIDTH),
                p.top,
                p.height
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn find_task(db: &Connection, user: &User, id: u32) -> Result<Task> {
    model::task_by_id(db, user.id, id)?.ok_or_else(|| anyhow!("Task {} not found.", id))
}

fn task_table(task: &Task) -> Table {
    let mut table = Table::new();
    table.add_row(row!["id", task.id]);
    table.add_row(row!["title", task.title]);
    table.add_row(row![
        "description",
        textwrap::fill(task.description.as_deref().unwrap_or("-"), 60)
    ]);
    table.add_row(row!["image", task.image_url.as_deref().unwrap_or("-")]);
    table.add_row(row!["when", fmt_span(task)]);
    table.add_row(row!["duration", fmt_duration(task)]);
    table.add_row(row!["created", task.created_at.format("%F %R")]);
    table
}

fn fmt_span(task: &Task) -> String {
    if task.all_day {
        if task.end_date == task.start_date {
            format!("{} all day", task.start_date)
        } else {
            format!("{} - {} all day", task.start_date, task.end_date)
        }
    } else if task.end_date == task.start_date {
        format!(
            "{} {} - {}",
            task.start_date,
            task.start_time.format("%H:%M"),
            task.end_time.format("%H:%M")
        )
    } else {
        format!(
            "{} {} - {} {}",
            task.start_date,
            task.start_time.format("%H:%M"),
            task.end_date,
            task.end_time.format("%H:%M")
        )
    }
}

fn fmt_duration(task: &Task) -> String {
    if task.all_day {
        return "all day".to_string();
    }
    let duration = std::cmp::max(Duration::zero(), task.duration());
    format_duration(duration.to_std().unwrap_or(STDDuration::from_secs(0))).to_string()
}

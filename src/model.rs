use std::convert::TryFrom;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::validate::{self, NewTask, ValidationError};
use crate::view::TaskSource;

/// A registered user, saved as an entry in the user table.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Local>,
}

/// A single task, saved as an entry in the task table. Dates and
/// times are kept apart and free of any timezone offset: they are
/// wall clock values in the user's local calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: u32,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
    pub all_day: bool,
    pub user_id: u32,
    pub created_at: DateTime<Local>,
}

impl Task {
    pub fn start(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end_date.and_time(self.end_time)
    }

    pub fn duration(&self) -> Duration {
        self.end() - self.start()
    }
}

/// A task row exactly as stored, before its dates and times are
/// parsed.
struct StoredTask {
    id: u32,
    title: String,
    description: Option<String>,
    image_url: Option<String>,
    start_date: String,
    start_time: String,
    end_date: String,
    end_time: String,
    all_day: bool,
    user_id: u32,
    created_at: DateTime<Local>,
}

impl StoredTask {
    fn normalize(self) -> std::result::Result<Task, ValidationError> {
        Ok(Task {
            start_date: validate::parse_date("start date", &self.start_date)?,
            start_time: validate::parse_time("start time", &self.start_time)?,
            end_date: validate::parse_date("end date", &self.end_date)?,
            end_time: validate::parse_time("end time", &self.end_time)?,
            id: self.id,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            all_day: self.all_day,
            user_id: self.user_id,
            created_at: self.created_at,
        })
    }
}

const TASK_COLUMNS: &str = "id, title, description, image_url, start_date, start_time, end_date, end_time, all_day, user_id, created_at";

/// Initialize the calendar database.
pub fn init_calendar(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE if not exists user (
                  id              INTEGER PRIMARY KEY AUTOINCREMENT,
                  name            TEXT NOT NULL,
                  email           TEXT NOT NULL,
                  created_at      TEXT NOT NULL
                  )",
        [],
    )
    .context("Failed to create user table.")?;

    db.execute("CREATE UNIQUE INDEX if not exists user_email ON user (email)", [])
        .context("Failed to create unique index on user table.")?;

    db.execute(
        "CREATE TABLE if not exists task (
                  id              INTEGER PRIMARY KEY AUTOINCREMENT,
                  title           TEXT NOT NULL,
                  description     TEXT,
                  image_url       TEXT,
                  start_date      TEXT NOT NULL,
                  start_time      TEXT NOT NULL,
                  end_date        TEXT NOT NULL,
                  end_time        TEXT NOT NULL,
                  all_day         INTEGER NOT NULL DEFAULT 0,
                  user_id         INTEGER NOT NULL REFERENCES user (id),
                  created_at      TEXT NOT NULL
                  )",
        [],
    )
    .context("Failed to create task table.")?;

    db.execute("CREATE INDEX if not exists task_user ON task (user_id)", [])
        .context("Failed to create index on task table.")?;

    Ok(())
}

/// Register a new user and return its id. E-mails are unique.
pub fn add_user(db: &Connection, name: &str, email: &str) -> Result<u32> {
    let (name, email) = validate::user_fields(name, email)?;

    // The unique index on e-mail is the only duplicate check.
    match db.execute(
        "INSERT INTO user (name, email, created_at) VALUES(?1, ?2, CURRENT_TIMESTAMP)",
        params![name, email],
    ) {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            bail!("User with this email already exists.")
        }
        Err(e) => return Err(e).context("Failed to insert user to database."),
    }

    let id = u32::try_from(db.last_insert_rowid())?;
    info!(user_id = id, "user registered");
    Ok(id)
}

/// Find a user by e-mail. The lookup ignores case and surrounding
/// whitespace, the same way e-mails are stored.
pub fn user_by_email(db: &Connection, email: &str) -> Result<Option<User>> {
    let user = db
        .query_row(
            "SELECT id, name, email, created_at FROM user WHERE email = ?1",
            params![email.trim().to_lowercase()],
            |row| user_from_row(row),
        )
        .optional()
        .context("Failed to obtain user from database.")?;
    Ok(user)
}

/// Return all registered users, oldest first.
pub fn users(db: &Connection) -> Result<Vec<User>> {
    let mut stmt = db
        .prepare("SELECT id, name, email, created_at FROM user ORDER BY id")
        .context("Failed to fetch users from database.")?;
    let mapped_rows = stmt
        .query_map([], |row| user_from_row(row))
        .context("Failed to fetch users from database.")?;

    let mut users = Vec::new();
    for user in mapped_rows {
        users.push(user?);
    }
    Ok(users)
}

/// Insert a validated task for the given user and return its id.
pub fn add_task(db: &Connection, user_id: u32, task: &NewTask) -> Result<u32> {
    db.execute(
        "INSERT INTO task (title, description, image_url, start_date, start_time, end_date, end_time, all_day, user_id, created_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, CURRENT_TIMESTAMP)",
        params![
            task.title,
            task.description,
            task.image_url,
            task.start_date,
            task.start_time.format("%H:%M").to_string(),
            task.end_date,
            task.end_time.format("%H:%M").to_string(),
            task.all_day,
            user_id
        ],
    )
    .context("Failed to insert task to database.")?;

    let id = u32::try_from(db.last_insert_rowid())?;
    info!(task_id = id, user_id, "task created");
    Ok(id)
}

/// Replace every editable field of a task in place. Returns whether
/// the user owns a task with that id.
pub fn update_task(db: &Connection, user_id: u32, id: u32, task: &NewTask) -> Result<bool> {
    let changed = db
        .execute(
            "UPDATE task SET title = ?1, description = ?2, image_url = ?3, start_date = ?4, start_time = ?5,
                             end_date = ?6, end_time = ?7, all_day = ?8
             WHERE id = ?9 AND user_id = ?10",
            params![
                task.title,
                task.description,
                task.image_url,
                task.start_date,
                task.start_time.format("%H:%M").to_string(),
                task.end_date,
                task.end_time.format("%H:%M").to_string(),
                task.all_day,
                id,
                user_id
            ],
        )
        .context("Failed to update task in database.")?;

    if changed > 0 {
        info!(task_id = id, user_id, "task updated");
    }
    Ok(changed > 0)
}

/// Remove a task. Returns whether the user owned a task with that id.
pub fn remove_task(db: &Connection, user_id: u32, id: u32) -> Result<bool> {
    let removed = db
        .execute(
            "DELETE FROM task WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )
        .context("Failed to remove task from database.")?;

    if removed > 0 {
        info!(task_id = id, user_id, "task removed");
    }
    Ok(removed > 0)
}

/// Get one of the user's tasks by id.
pub fn task_by_id(db: &Connection, user_id: u32, id: u32) -> Result<Option<Task>> {
    let stored = db
        .query_row(
            &format!("SELECT {} FROM task WHERE id = ?1 AND user_id = ?2", TASK_COLUMNS),
            params![id, user_id],
            |row| task_from_row(row),
        )
        .optional()
        .with_context(|| format!("Failed to get task {} from database.", id))?;

    match stored {
        Some(stored) => {
            let task = stored
                .normalize()
                .map_err(|e| anyhow!("Task {} has malformed stored data: {}", id, e))?;
            Ok(Some(task))
        }
        None => Ok(None),
    }
}

/// Get all the tasks of a user, in creation order. Rows whose stored
/// dates or times cannot be read are left out rather than failing
/// the whole list.
pub fn tasks_for_user(db: &Connection, user_id: u32) -> Result<Vec<Task>> {
    let mut stmt = db
        .prepare(&format!(
            "SELECT {} FROM task WHERE user_id = ?1 ORDER BY id",
            TASK_COLUMNS
        ))
        .context("Failed to fetch tasks from database.")?;
    let mapped_rows = stmt
        .query_map(params![user_id], |row| task_from_row(row))
        .context("Failed to fetch tasks from database.")?;

    let mut tasks = Vec::new();
    for stored in mapped_rows {
        let stored = stored.context("Failed to read task row.")?;
        let id = stored.id;
        match stored.normalize() {
            Ok(task) => tasks.push(task),
            Err(e) => warn!(task_id = id, error = %e, "skipping task with malformed stored data"),
        }
    }

    debug!(user_id, count = tasks.len(), "tasks fetched");
    Ok(tasks)
}

impl TaskSource for Connection {
    fn tasks_for_user(&self, user_id: u32) -> Result<Vec<Task>> {
        tasks_for_user(self, user_id)
    }
}

/// Return a user from a row in this order: [id, name, email, created_at]
fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let user = User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get::<_, DateTime<Local>>(3)?,
    };
    Ok(user)
}

/// Return a stored task from a row in the order of `TASK_COLUMNS`.
fn task_from_row(row: &Row) -> rusqlite::Result<StoredTask> {
    let task = StoredTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        start_date: row.get(4)?,
        start_time: row.get(5)?,
        end_date: row.get(6)?,
        end_time: row.get(7)?,
        all_day: row.get(8)?,
        user_id: row.get(9)?,
        created_at: row.get::<_, DateTime<Local>>(10)?,
    };
    Ok(task)
}

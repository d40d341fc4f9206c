use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::model::Task;

/// Why a task or user was refused at entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}.")]
    MissingField(&'static str),

    #[error("Invalid {field} '{value}', expected HH:MM.")]
    MalformedTime { field: &'static str, value: String },

    #[error("Invalid {field} '{value}', expected YYYY-MM-DD.")]
    MalformedDate { field: &'static str, value: String },

    #[error("Invalid image URL format.")]
    InvalidImageUrl,

    #[error("End time must be after start time.")]
    EndNotAfterStart,
}

const ALL_DAY_START: &str = "00:00";
const ALL_DAY_END: &str = "23:59";

/// Raw task input, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub start_date: String,
    pub start_time: Option<String>,
    /// Defaults to the start date.
    pub end_date: Option<String>,
    pub end_time: Option<String>,
    pub all_day: bool,
}

/// A task that passed validation and can be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
    pub all_day: bool,
}

/// A partial edit of a stored task. Absent fields keep their stored
/// value. An empty description or image URL clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
    pub all_day: Option<bool>,
}

impl TaskDraft {
    pub fn validate(self) -> Result<NewTask, ValidationError> {
        let title = required("title", &self.title)?;

        let start_date = required("start date", &self.start_date)?;
        let start_date = parse_date("start date", start_date)?;
        let end_date = match non_blank(self.end_date.as_deref()) {
            Some(end_date) => parse_date("end date", end_date)?,
            None => start_date,
        };

        let start_time = self.time_or_default("start time", &self.start_time, ALL_DAY_START)?;
        let end_time = self.time_or_default("end time", &self.end_time, ALL_DAY_END)?;

        if end_date.and_time(end_time) <= start_date.and_time(start_time) {
            return Err(ValidationError::EndNotAfterStart);
        }

        let image_url = non_blank(self.image_url.as_deref()).map(str::to_string);
        if let Some(url) = &image_url {
            if !is_http_url(url) {
                return Err(ValidationError::InvalidImageUrl);
            }
        }

        Ok(NewTask {
            title: title.to_string(),
            description: non_blank(self.description.as_deref()).map(str::to_string),
            image_url,
            start_date,
            start_time,
            end_date,
            end_time,
            all_day: self.all_day,
        })
    }

    /// All-day tasks may leave their times out.
    fn time_or_default(
        &self,
        field: &'static str,
        value: &Option<String>,
        all_day_default: &str,
    ) -> Result<NaiveTime, ValidationError> {
        match non_blank(value.as_deref()) {
            Some(value) => parse_time(field, value),
            None if self.all_day => parse_time(field, all_day_default),
            None => Err(ValidationError::MissingField(field)),
        }
    }
}

impl TaskPatch {
    /// Merge the patch over a stored task, giving a draft that goes
    /// through the same checks as a new task.
    pub fn apply(self, task: &Task) -> TaskDraft {
        let time = |t: NaiveTime| t.format("%H:%M").to_string();
        let date = |d: NaiveDate| d.format("%Y-%m-%d").to_string();

        TaskDraft {
            title: self.title.unwrap_or_else(|| task.title.clone()),
            description: self.description.or_else(|| task.description.clone()),
            image_url: self.image_url.or_else(|| task.image_url.clone()),
            start_date: self.start_date.unwrap_or_else(|| date(task.start_date)),
            start_time: self.start_time.or_else(|| Some(time(task.start_time))),
            end_date: self.end_date.or_else(|| Some(date(task.end_date))),
            end_time: self.end_time.or_else(|| Some(time(task.end_time))),
            all_day: self.all_day.unwrap_or(task.all_day),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image_url.is_none()
            && self.start_date.is_none()
            && self.start_time.is_none()
            && self.end_date.is_none()
            && self.end_time.is_none()
            && self.all_day.is_none()
    }
}

/// Check the fields of a new user, returning the trimmed name and the
/// trimmed, lower-cased e-mail.
pub fn user_fields(name: &str, email: &str) -> Result<(String, String), ValidationError> {
    let name = required("name", name)?;
    let email = required("email", email)?;
    Ok((name.to_string(), email.to_lowercase()))
}

/// Parse a 24h `HH:MM` time. Exactly two digits on each side.
pub fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ValidationError> {
    let malformed = || ValidationError::MalformedTime {
        field,
        value: value.to_string(),
    };

    // chrono's %H also accepts a single digit hour, so the shape is
    // checked by hand.
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(malformed());
    }
    let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }

    let hour = u32::from((digits[0] - b'0') * 10 + (digits[1] - b'0'));
    let minute = u32::from((digits[2] - b'0') * 10 + (digits[3] - b'0'));
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(malformed)
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::MalformedDate {
            field,
            value: value.to_string(),
        }
    })
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    non_blank(Some(value)).ok_or(ValidationError::MissingField(field))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_http_url(url: &str) -> bool {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .map_or(false, |rest| !rest.is_empty())
}

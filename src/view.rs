use anyhow::Result;
use chrono::{NaiveDate, Weekday};
use tracing::{debug, error};

use crate::calendar::{OutOfRange, Week, WeekGrid};
use crate::model::Task;

pub const LOAD_FAILED: &str = "Failed to load tasks.";

/// Where a view gets the tasks of a user from. The user is always
/// passed in explicitly.
pub trait TaskSource {
    fn tasks_for_user(&self, user_id: u32) -> Result<Vec<Task>>;
}

#[derive(Debug)]
pub enum ViewState {
    Loading,
    Ready { tasks: Vec<Task> },
    Error { message: String },
}

/// The week view of one user's calendar. Tasks are fetched once per
/// user; moving between weeks only changes the visible week, which
/// is kept across reloads.
#[derive(Debug)]
pub struct CalendarView {
    state: ViewState,
    user_id: Option<u32>,
    week: Week,
}

impl CalendarView {
    pub fn new(reference: NaiveDate, first_day: Weekday) -> Result<CalendarView, OutOfRange> {
        Ok(CalendarView {
            state: ViewState::Loading,
            user_id: None,
            week: Week::containing(reference, first_day)?,
        })
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Switch to another user, reloading only if the user changed.
    pub fn set_user<S: TaskSource + ?Sized>(&mut self, source: &S, user_id: u32) {
        if self.user_id != Some(user_id) {
            self.mount(source, user_id);
        }
    }

    /// Load the tasks of `user_id`. A failed load stays failed until
    /// the next mount.
    pub fn mount<S: TaskSource + ?Sized>(&mut self, source: &S, user_id: u32) {
        self.user_id = Some(user_id);
        self.state = ViewState::Loading;
        debug!(user_id, "loading tasks");

        self.state = match source.tasks_for_user(user_id) {
            Ok(tasks) => {
                debug!(user_id, count = tasks.len(), "view ready");
                ViewState::Ready { tasks }
            }
            Err(e) => {
                error!(user_id, error = %format!("{:#}", e), "failed to load tasks");
                ViewState::Error {
                    message: LOAD_FAILED.to_string(),
                }
            }
        };
    }

    pub fn next_week(&mut self) -> Result<(), OutOfRange> {
        self.step(Week::next)
    }

    pub fn previous_week(&mut self) -> Result<(), OutOfRange> {
        self.step(Week::previous)
    }

    /// Move `weeks` weeks forward, or back when negative.
    pub fn navigate(&mut self, weeks: i64) -> Result<(), OutOfRange> {
        self.step(|week| week.shifted(weeks))
    }

    // Only a ready view moves. A week past the calendar's range leaves
    // it where it was.
    fn step<F>(&mut self, step: F) -> Result<(), OutOfRange>
    where
        F: FnOnce(&Week) -> Result<Week, OutOfRange>,
    {
        if let ViewState::Ready { .. } = self.state {
            self.week = step(&self.week)?;
            debug!(week_start = %self.week.start(), "week changed");
        }
        Ok(())
    }

    /// The visible week, once tasks are loaded.
    pub fn week(&self) -> Option<Week> {
        match &self.state {
            ViewState::Ready { .. } => Some(self.week),
            _ => None,
        }
    }

    /// Placements for the visible week, recomputed on every call.
    pub fn grid(&self) -> Option<WeekGrid<'_>> {
        match &self.state {
            ViewState::Ready { tasks } => Some(WeekGrid::build(self.week, tasks)),
            _ => None,
        }
    }
}

//! Placement of tasks on a weekly grid of hourly cells.
//!
//! The grid has one column per day of the visible week, 24 hour rows
//! and a separate all-day lane on top. A timed task is drawn once, in
//! the cell of its starting hour, with a vertical offset taken from
//! its start minute and a height proportional to its duration. The
//! height is not clipped to the cell: a two hour task is 200% tall and
//! overflows into the cells below it. All-day tasks are drawn once in
//! the all-day lane of their start date.

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use thiserror::Error;

use crate::model::Task;

pub const DAYS_PER_WEEK: usize = 7;
pub const HOURS_PER_DAY: u32 = 24;

/// A week that would start or end outside the dates chrono can
/// represent.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Date out of range.")]
pub struct OutOfRange;

/// The most recent `first_day` at or before `reference`.
pub fn week_start(reference: NaiveDate, first_day: Weekday) -> Option<NaiveDate> {
    let back = (7 + reference.weekday().num_days_from_monday() - first_day.num_days_from_monday()) % 7;
    reference.checked_sub_days(Days::new(u64::from(back)))
}

/// The seven days containing a reference date. Every day of a `Week`
/// is a representable date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Week {
    reference: NaiveDate,
    first_day: Weekday,
    start: NaiveDate,
}

impl Week {
    pub fn containing(reference: NaiveDate, first_day: Weekday) -> Result<Week, OutOfRange> {
        let start = week_start(reference, first_day).ok_or(OutOfRange)?;
        start
            .checked_add_days(Days::new(DAYS_PER_WEEK as u64 - 1))
            .ok_or(OutOfRange)?;
        Ok(Week {
            reference,
            first_day,
            start,
        })
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn days(&self) -> [NaiveDate; DAYS_PER_WEEK] {
        let mut days = [self.start; DAYS_PER_WEEK];
        for (day, date) in days.iter_mut().zip(self.start.iter_days()) {
            *day = date;
        }
        days
    }

    /// The week `weeks` weeks later, or earlier when negative.
    pub fn shifted(&self, weeks: i64) -> Result<Week, OutOfRange> {
        let days = Days::new(weeks.unsigned_abs().checked_mul(7).ok_or(OutOfRange)?);
        let reference = if weeks >= 0 {
            self.reference.checked_add_days(days)
        } else {
            self.reference.checked_sub_days(days)
        };
        Week::containing(reference.ok_or(OutOfRange)?, self.first_day)
    }

    pub fn next(&self) -> Result<Week, OutOfRange> {
        self.shifted(1)
    }

    pub fn previous(&self) -> Result<Week, OutOfRange> {
        self.shifted(-1)
    }
}

/// One hour of one day: `[day hour:00, day hour+1:00)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub day: NaiveDate,
    pub hour: u32,
}

impl Slot {
    pub fn new(day: NaiveDate, hour: u32) -> Slot {
        debug_assert!(hour < HOURS_PER_DAY);
        Slot { day, hour }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.day.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.hour))
    }

    /// `None` for the last hour of the last representable day.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.start().checked_add_signed(Duration::hours(1))
    }
}

/// Where in a day column a placement is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    AllDay,
    Hour(u32),
}

/// A task box positioned inside a cell. `top` and `height` are
/// percentages of one cell's height.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement<'a> {
    pub task: &'a Task,
    pub lane: Lane,
    pub top: f64,
    pub height: f64,
}

/// Whether a task is visible during a slot. All-day tasks occupy every
/// hour of their start date.
pub fn occupies(task: &Task, slot: Slot) -> bool {
    if task.all_day {
        return task.start_date == slot.day;
    }
    slot.end().map_or(true, |end| task.start() < end) && task.end() > slot.start()
}

/// The box a timed task draws in a slot. Only the slot holding the
/// task's start draws it; the other hours it covers get nothing.
pub fn place(task: &Task, slot: Slot) -> Option<Placement<'_>> {
    if task.all_day || !occupies(task, slot) {
        return None;
    }
    if task.start_date != slot.day || task.start_time.hour() != slot.hour {
        return None;
    }

    Some(Placement {
        task,
        lane: Lane::Hour(slot.hour),
        top: percent_of_hour(i64::from(task.start_time.minute())),
        height: percent_of_hour(task.duration().num_minutes()),
    })
}

/// The full-cell marker an all-day task draws in its day's lane.
pub fn place_all_day(task: &Task, day: NaiveDate) -> Option<Placement<'_>> {
    if !task.all_day || task.start_date != day {
        return None;
    }

    Some(Placement {
        task,
        lane: Lane::AllDay,
        top: 0.0,
        height: 100.0,
    })
}

/// Every box drawn in a slot, in task list order.
pub fn placements_in(tasks: &[Task], slot: Slot) -> Vec<Placement<'_>> {
    tasks.iter().filter_map(|task| place(task, slot)).collect()
}

/// Every all-day marker of a day, in task list order.
pub fn all_day_placements(tasks: &[Task], day: NaiveDate) -> Vec<Placement<'_>> {
    tasks.iter().filter_map(|task| place_all_day(task, day)).collect()
}

fn percent_of_hour(minutes: i64) -> f64 {
    minutes as f64 * 100.0 / 60.0
}

/// All placements of a week, ready to be painted.
#[derive(Debug)]
pub struct WeekGrid<'a> {
    days: [NaiveDate; DAYS_PER_WEEK],
    all_day: Vec<Vec<Placement<'a>>>,
    cells: Vec<Vec<Vec<Placement<'a>>>>,
}

impl<'a> WeekGrid<'a> {
    pub fn build(week: Week, tasks: &'a [Task]) -> WeekGrid<'a> {
        let days = week.days();
        let all_day = days
            .iter()
            .map(|day| all_day_placements(tasks, *day))
            .collect();
        let cells = days
            .iter()
            .map(|day| {
                (0..HOURS_PER_DAY)
                    .map(|hour| placements_in(tasks, Slot::new(*day, hour)))
                    .collect()
            })
            .collect();

        WeekGrid {
            days,
            all_day,
            cells,
        }
    }

    pub fn days(&self) -> &[NaiveDate; DAYS_PER_WEEK] {
        &self.days
    }

    pub fn all_day(&self, day: usize) -> &[Placement<'a>] {
        &self.all_day[day]
    }

    pub fn cell(&self, day: usize, hour: u32) -> &[Placement<'a>] {
        &self.cells[day][hour as usize]
    }

    pub fn has_all_day(&self) -> bool {
        self.all_day.iter().any(|lane| !lane.is_empty())
    }

    /// Whether no box starts at this hour on any day.
    pub fn is_hour_empty(&self, hour: u32) -> bool {
        self.cells.iter().all(|day| day[hour as usize].is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn timed(id: u32, day: NaiveDate, from: NaiveTime, until: NaiveTime) -> Task {
        Task {
            id,
            title: format!("task {}", id),
            description: None,
            image_url: None,
            start_date: day,
            start_time: from,
            end_date: day,
            end_time: until,
            all_day: false,
            user_id: 1,
            created_at: Local.timestamp_opt(0, 0).unwrap(),
        }
    }

    fn all_day(id: u32, day: NaiveDate) -> Task {
        Task {
            all_day: true,
            ..timed(id, day, time(0, 0), time(23, 59))
        }
    }

    #[test]
    fn week_is_seven_consecutive_days_from_first_day() {
        for first_day in [Weekday::Sun, Weekday::Mon, Weekday::Sat].iter() {
            let mut reference = date(2023, 12, 20);
            while reference < date(2024, 3, 10) {
                let days = Week::containing(reference, *first_day).unwrap().days();
                assert_eq!(days[0].weekday(), *first_day);
                assert!(days.contains(&reference));
                for pair in days.windows(2) {
                    assert_eq!(pair[1] - pair[0], Duration::days(1));
                }
                reference = reference.succ_opt().unwrap();
            }
        }
    }

    #[test]
    fn week_start_is_stable() {
        let reference = date(2024, 6, 3);
        let first = week_start(reference, Weekday::Sun).unwrap();
        assert_eq!(first, date(2024, 6, 2));
        assert_eq!(week_start(first, Weekday::Sun), Some(first));
        let week = Week::containing(reference, Weekday::Sun).unwrap();
        assert_eq!(week.days(), Week::containing(reference, Weekday::Sun).unwrap().days());
    }

    #[test]
    fn navigation_shifts_by_seven_days() {
        let week = Week::containing(date(2024, 6, 5), Weekday::Sun).unwrap();
        assert_eq!(week.next().unwrap().start(), date(2024, 6, 9));
        assert_eq!(week.previous().unwrap().start(), date(2024, 5, 26));
        assert_eq!(week.next().unwrap().previous().unwrap(), week);
        assert_eq!(week.shifted(-3).unwrap().start(), date(2024, 5, 12));
    }

    #[test]
    fn one_hour_task_fills_its_starting_cell() {
        let day = date(2024, 6, 3);
        let task = timed(1, day, time(9, 0), time(10, 0));

        let placement = place(&task, Slot::new(day, 9)).unwrap();
        assert_eq!(placement.lane, Lane::Hour(9));
        assert_eq!(placement.top, 0.0);
        assert_eq!(placement.height, 100.0);

        for hour in (0..HOURS_PER_DAY).filter(|h| *h != 9) {
            assert!(place(&task, Slot::new(day, hour)).is_none());
        }
    }

    #[test]
    fn half_past_task_is_offset_and_stretched() {
        let day = date(2024, 6, 3);
        let task = timed(1, day, time(14, 30), time(16, 0));

        assert!(occupies(&task, Slot::new(day, 14)));
        assert!(occupies(&task, Slot::new(day, 15)));
        assert!(!occupies(&task, Slot::new(day, 16)));

        let placement = place(&task, Slot::new(day, 14)).unwrap();
        assert_eq!(placement.top, 50.0);
        assert_eq!(placement.height, 150.0);
        assert!(place(&task, Slot::new(day, 15)).is_none());
    }

    #[test]
    fn slot_bounds_are_half_open() {
        let day = date(2024, 6, 3);
        let task = timed(1, day, time(10, 0), time(11, 0));
        assert!(!occupies(&task, Slot::new(day, 9)));
        assert!(occupies(&task, Slot::new(day, 10)));
        assert!(!occupies(&task, Slot::new(day, 11)));
    }

    #[test]
    fn overnight_task_uses_its_own_end_date() {
        let task = Task {
            end_date: date(2024, 6, 4),
            ..timed(1, date(2024, 6, 3), time(23, 0), time(1, 0))
        };
        assert!(occupies(&task, Slot::new(date(2024, 6, 4), 0)));
        assert!(!occupies(&task, Slot::new(date(2024, 6, 4), 1)));

        let placement = place(&task, Slot::new(date(2024, 6, 3), 23)).unwrap();
        assert_eq!(placement.height, 200.0);
        assert!(place(&task, Slot::new(date(2024, 6, 4), 0)).is_none());
    }

    #[test]
    fn all_day_task_is_placed_once_in_its_lane() {
        let day = date(2024, 6, 5);
        let task = all_day(1, day);

        for hour in 0..HOURS_PER_DAY {
            assert!(occupies(&task, Slot::new(day, hour)));
            assert!(!occupies(&task, Slot::new(date(2024, 6, 4), hour)));
            assert!(!occupies(&task, Slot::new(date(2024, 6, 6), hour)));
            assert!(place(&task, Slot::new(day, hour)).is_none());
        }

        let tasks = vec![task];
        let grid = WeekGrid::build(Week::containing(day, Weekday::Sun).unwrap(), &tasks);
        let markers: usize = (0..DAYS_PER_WEEK).map(|d| grid.all_day(d).len()).sum();
        let boxes: usize = (0..DAYS_PER_WEEK)
            .flat_map(|d| (0..HOURS_PER_DAY).map(move |h| (d, h)))
            .map(|(d, h)| grid.cell(d, h).len())
            .sum();
        assert_eq!(markers, 1);
        assert_eq!(boxes, 0);

        let marker = &grid.all_day(3)[0];
        assert_eq!(marker.lane, Lane::AllDay);
        assert_eq!((marker.top, marker.height), (0.0, 100.0));
    }

    #[test]
    fn monday_morning_scenario() {
        let monday = date(2024, 6, 3);
        let tasks = vec![timed(1, monday, time(9, 0), time(10, 30))];
        let grid = WeekGrid::build(Week::containing(monday, Weekday::Sun).unwrap(), &tasks);

        assert_eq!(grid.days()[1], monday);
        let cell = grid.cell(1, 9);
        assert_eq!(cell.len(), 1);
        assert_eq!(cell[0].top, 0.0);
        assert_eq!(cell[0].height, 150.0);
        assert!(grid.cell(1, 10).is_empty());
        assert!(grid.is_hour_empty(10));
        assert!(!grid.is_hour_empty(9));
        assert!(!grid.has_all_day());
    }

    #[test]
    fn concurrent_tasks_keep_list_order() {
        let day = date(2024, 6, 3);
        let tasks = vec![
            timed(7, day, time(9, 45), time(10, 0)),
            timed(3, day, time(9, 0), time(11, 0)),
            timed(5, day, time(9, 15), time(9, 30)),
        ];
        let ids: Vec<u32> = placements_in(&tasks, Slot::new(day, 9))
            .iter()
            .map(|p| p.task.id)
            .collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn tasks_outside_the_week_are_not_drawn() {
        let tasks = vec![
            timed(1, date(2024, 6, 1), time(9, 0), time(10, 0)),
            all_day(2, date(2024, 6, 9)),
        ];
        let grid = WeekGrid::build(Week::containing(date(2024, 6, 3), Weekday::Sun).unwrap(), &tasks);
        assert!(!grid.has_all_day());
        assert!((0..HOURS_PER_DAY).all(|h| grid.is_hour_empty(h)));
    }

    #[test]
    fn weeks_at_the_edge_of_the_calendar_are_refused() {
        let starts_on_last_day = NaiveDate::MAX.weekday();
        assert_eq!(Week::containing(NaiveDate::MAX, starts_on_last_day), Err(OutOfRange));
        let starts_after_first_day = NaiveDate::MIN.weekday().succ();
        assert_eq!(week_start(NaiveDate::MIN, starts_after_first_day), None);
        assert_eq!(Week::containing(NaiveDate::MIN, starts_after_first_day), Err(OutOfRange));

        let week = Week::containing(date(2024, 6, 3), Weekday::Sun).unwrap();
        assert_eq!(week.shifted(14_000_000), Err(OutOfRange));
        assert_eq!(week.shifted(-14_000_000), Err(OutOfRange));
        assert_eq!(week.shifted(i64::MIN), Err(OutOfRange));
    }

    #[test]
    fn last_hour_of_the_calendar_has_no_end() {
        let slot = Slot::new(NaiveDate::MAX, 23);
        assert_eq!(slot.end(), None);

        let task = timed(1, NaiveDate::MAX, time(23, 0), time(23, 30));
        assert!(occupies(&task, slot));
        assert_eq!(place(&task, slot).unwrap().height, 50.0);
    }
}

//! Upcoming page: a navigable month/week/day calendar.
//!
//! # Invariants
//! - Month grids are whole weeks: the first cell is the configured week
//!   start and every row has seven days.
//! - Navigation moves by one unit of the active mode; month steps clamp the
//!   day of month (Jan 31 + 1 month = Feb 28/29).

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::model::task::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CalendarMode {
    #[default]
    Month,
    Week,
    Day,
}

/// Cursor date, active mode and week start of the Upcoming page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingCursor {
    date: NaiveDate,
    mode: CalendarMode,
    week_start: Weekday,
}

impl UpcomingCursor {
    /// Month mode centered on `today`.
    pub fn new(today: NaiveDate, week_start: Weekday) -> Self {
        Self {
            date: today,
            mode: CalendarMode::Month,
            week_start,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn mode(&self) -> CalendarMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CalendarMode) {
        self.mode = mode;
    }

    pub fn next(&mut self) {
        let moved = match self.mode {
            CalendarMode::Month => self.date.checked_add_months(Months::new(1)),
            CalendarMode::Week => self.date.checked_add_days(Days::new(7)),
            CalendarMode::Day => self.date.checked_add_days(Days::new(1)),
        };
        if let Some(date) = moved {
            self.date = date;
        }
    }

    pub fn prev(&mut self) {
        let moved = match self.mode {
            CalendarMode::Month => self.date.checked_sub_months(Months::new(1)),
            CalendarMode::Week => self.date.checked_sub_days(Days::new(7)),
            CalendarMode::Day => self.date.checked_sub_days(Days::new(1)),
        };
        if let Some(date) = moved {
            self.date = date;
        }
    }

    /// Resets the date, keeping the mode.
    pub fn jump_to_today(&mut self, today: NaiveDate) {
        self.date = today;
    }

    /// A click on a day cell: focus that day in day mode.
    pub fn select_day(&mut self, day: NaiveDate) {
        self.date = day;
        self.mode = CalendarMode::Day;
    }

    /// `MMMM yyyy` for month and day, `MMM d - MMM d, yyyy` for week.
    pub fn title(&self) -> String {
        match self.mode {
            CalendarMode::Month | CalendarMode::Day => self.date.format("%B %Y").to_string(),
            CalendarMode::Week => {
                let week = week_of(self.date, self.week_start);
                format!(
                    "{} - {}",
                    week[0].format("%b %-d"),
                    week[6].format("%b %-d, %Y")
                )
            }
        }
    }

    /// Rows of seven days for month and week mode; day mode has no grid.
    pub fn weeks(&self) -> Vec<[NaiveDate; 7]> {
        match self.mode {
            CalendarMode::Month => month_grid(self.date, self.week_start),
            CalendarMode::Week => vec![week_of(self.date, self.week_start)],
            CalendarMode::Day => Vec::new(),
        }
    }

    /// Every day the active mode shows, in order.
    pub fn visible_days(&self) -> Vec<NaiveDate> {
        match self.mode {
            CalendarMode::Day => vec![self.date],
            _ => self.weeks().into_iter().flatten().collect(),
        }
    }
}

/// First day of the week holding `date`.
pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_sunday() - week_start.num_days_from_sunday()) % 7;
    date - Days::new(u64::from(offset))
}

pub fn week_of(date: NaiveDate, week_start: Weekday) -> [NaiveDate; 7] {
    let start = start_of_week(date, week_start);
    std::array::from_fn(|offset| start + Days::new(offset as u64))
}

/// Whole weeks covering the month of `date`, padded from adjacent months.
pub fn month_grid(date: NaiveDate, week_start: Weekday) -> Vec<[NaiveDate; 7]> {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first);

    let mut weeks = Vec::with_capacity(6);
    let mut cursor = start_of_week(first, week_start);
    while cursor <= last {
        let week = week_of(cursor, week_start);
        weeks.push(week);
        match week[6].succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    weeks
}

/// Open tasks shown on `day`: dated that day, or labelled "today" when
/// `day` is `today`. Subtasks are included.
pub fn tasks_on_day<'a>(tasks: &'a [Task], day: NaiveDate, today: NaiveDate) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| !task.is_completed)
        .filter(|task| task.is_due_on(day) || (day == today && task.due_string_says_today()))
        .collect()
}

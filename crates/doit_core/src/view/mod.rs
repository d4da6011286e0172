//! Read-only projections over the board's collections.
//!
//! # Responsibility
//! - Derive what each page shows from the full task list.
//!
//! # Invariants
//! - Every function here is pure; "today" is always an explicit argument.
//! - `due_string` and `due_date` are both honored, as a union, by Today and
//!   Upcoming. No other projection reads them.

pub mod calendar;
pub mod filters;
pub mod lists;

pub use calendar::{tasks_on_day, CalendarMode, UpcomingCursor};
pub use filters::{filters, FiltersView, PriorityCount};
pub use lists::{
    by_label, by_priority, inbox, project, search, today, InboxView, SectionGroup, TaskList,
};

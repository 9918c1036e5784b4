//! Workshop records held by the catalog.
//!
//! A [`WorkshopRecord`] is created either by the feed ingestor at startup or by
//! a `WorkshopAdded` domain event later on. Records are never mutated in place
//! and never removed.

use crate::environment::Clock;
use crate::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, immutable workshop identifier (the feed slug).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkshopId(String);

impl WorkshopId {
    /// Create an identifier from a slug.
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// The slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkshopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkshopId {
    fn from(slug: &str) -> Self {
        Self::new(slug)
    }
}

/// Start and end of a scheduled workshop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// When the workshop starts.
    pub start: DateTime<Utc>,
    /// When the workshop ends.
    pub end: DateTime<Utc>,
}

impl Schedule {
    /// Create a schedule.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Whether a workshop occupies a slot in the conference program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkshopKind {
    /// A regular workshop with a program slot.
    Normal,
    /// Listed without a slot (e.g. not yet placed in the program).
    Unscheduled,
}

/// Status derived from a workshop's schedule at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkshopStatus {
    /// No schedule is known.
    Unscheduled,
    /// The workshop has not started yet.
    Upcoming,
    /// The workshop is in progress.
    Running,
    /// The workshop is over.
    Finished,
}

/// A workshop in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopRecord {
    /// Unique identifier.
    pub id: WorkshopId,
    /// Display title.
    pub title: String,
    /// Short description; equals `title` when the source had none.
    pub summary: String,
    /// Program slot, if the workshop has one.
    pub schedule: Option<Schedule>,
    /// Normal or unscheduled.
    pub kind: WorkshopKind,
}

impl WorkshopRecord {
    /// An unscheduled workshop. A missing `summary` falls back to `title`.
    #[must_use]
    pub fn unscheduled(id: WorkshopId, title: impl Into<String>, summary: Option<String>) -> Self {
        let title = title.into();
        let summary = summary.unwrap_or_else(|| title.clone());
        Self {
            id,
            title,
            summary,
            schedule: None,
            kind: WorkshopKind::Unscheduled,
        }
    }

    /// A workshop with a program slot. A missing `summary` falls back to `title`.
    #[must_use]
    pub fn scheduled(
        id: WorkshopId,
        title: impl Into<String>,
        summary: Option<String>,
        schedule: Schedule,
    ) -> Self {
        Self {
            schedule: Some(schedule),
            kind: WorkshopKind::Normal,
            ..Self::unscheduled(id, title, summary)
        }
    }

    /// Derive the status at `now`.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> WorkshopStatus {
        match self.schedule {
            None => WorkshopStatus::Unscheduled,
            Some(Schedule { start, .. }) if now < start => WorkshopStatus::Upcoming,
            Some(Schedule { end, .. }) if now < end => WorkshopStatus::Running,
            Some(_) => WorkshopStatus::Finished,
        }
    }

    /// Derive the status at the clock's current time.
    #[must_use]
    pub fn current_status(&self, clock: &dyn Clock) -> WorkshopStatus {
        self.status(clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, hour, 0, 0).single().unwrap_or_default()
    }

    #[test]
    fn summary_defaults_to_title() {
        let record = WorkshopRecord::unscheduled(WorkshopId::new("java-intro"), "Intro to Java", None);
        assert_eq!(record.summary, "Intro to Java");
        assert_eq!(record.kind, WorkshopKind::Unscheduled);
        assert_eq!(record.schedule, None);
    }

    #[test]
    fn scheduled_record_is_normal_kind() {
        let record = WorkshopRecord::scheduled(
            WorkshopId::new("rust-101"),
            "Rust 101",
            Some("Ownership and borrowing".to_string()),
            Schedule::new(at(9), at(12)),
        );
        assert_eq!(record.kind, WorkshopKind::Normal);
        assert_eq!(record.summary, "Ownership and borrowing");
    }

    #[test]
    fn status_follows_schedule() {
        let record = WorkshopRecord::scheduled(
            WorkshopId::new("rust-101"),
            "Rust 101",
            None,
            Schedule::new(at(9), at(12)),
        );
        assert_eq!(record.status(at(8)), WorkshopStatus::Upcoming);
        assert_eq!(record.status(at(9)), WorkshopStatus::Running);
        assert_eq!(record.status(at(11)), WorkshopStatus::Running);
        assert_eq!(record.status(at(12)), WorkshopStatus::Finished);

        let unscheduled = WorkshopRecord::unscheduled(WorkshopId::new("tbd"), "TBD", None);
        assert_eq!(unscheduled.status(at(10)), WorkshopStatus::Unscheduled);
    }

    mod properties {
        use super::*;
        use chrono::Duration;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn status_partitions_the_timeline(length in 1_i64..10_000, offset in -20_000_i64..20_000) {
                let start = at(9);
                let end = start + Duration::minutes(length);
                let now = start + Duration::minutes(offset);
                let record = WorkshopRecord::scheduled(WorkshopId::new("ws"), "WS", None, Schedule::new(start, end));

                let expected = if now < start {
                    WorkshopStatus::Upcoming
                } else if now < end {
                    WorkshopStatus::Running
                } else {
                    WorkshopStatus::Finished
                };
                prop_assert_eq!(record.status(now), expected);
            }
        }
    }
}

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::data::{Snapshot, TaskKind, TaskList};
use super::projector::day_view;

const TREND_WEEKS: i64 = 4;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Progress {
        let percentage = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u32
        };

        Progress {
            completed,
            total,
            percentage,
        }
    }

    fn of<'a>(tasks: impl IntoIterator<Item = &'a TaskKind>) -> Progress {
        let (completed, total) = tasks.into_iter().fold((0, 0), |(completed, total), task| {
            (completed + task.is_completed() as usize, total + 1)
        });

        Progress::new(completed, total)
    }

    fn add(self, other: Progress) -> Progress {
        Progress::new(self.completed + other.completed, self.total + other.total)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DayStats {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub progress: Progress,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WeekStats {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub progress: Progress,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListCounts {
    pub today: usize,
    pub backlog: usize,
    pub ideas: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Analytics {
    pub week: Vec<DayStats>,
    pub trend: Vec<WeekStats>,
    pub lists: ListCounts,
    pub overall: Progress,
}

/// Completed/total for everything shown on `date`, recurring tasks included.
pub fn day_progress(snapshot: &Snapshot, date: NaiveDate) -> Progress {
    Progress::of(&day_view(snapshot, date))
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Monday..Sunday of the week containing `date`.
pub fn week_summary(snapshot: &Snapshot, date: NaiveDate) -> Vec<DayStats> {
    let start = week_start(date);

    (0..7)
        .map(|offset| {
            let day = start + Duration::days(offset);
            DayStats {
                date: day,
                progress: day_progress(snapshot, day),
            }
        })
        .collect()
}

/// The last four weeks up to and including the week of `date`, oldest first.
pub fn weekly_trend(snapshot: &Snapshot, date: NaiveDate) -> Vec<WeekStats> {
    let current = week_start(date);

    (0..TREND_WEEKS)
        .rev()
        .map(|weeks_back| {
            let start = current - Duration::weeks(weeks_back);
            let progress = week_summary(snapshot, start)
                .into_iter()
                .fold(Progress::default(), |sum, day| sum.add(day.progress));

            WeekStats {
                start,
                end: start + Duration::days(6),
                progress,
            }
        })
        .collect()
}

pub fn list_counts(snapshot: &Snapshot) -> ListCounts {
    ListCounts {
        today: snapshot.tasks_by_date.values().map(Vec::len).sum(),
        backlog: snapshot.bucket(TaskList::Backlog).len(),
        ideas: snapshot.bucket(TaskList::Ideas).len(),
    }
}

/// Completion over every manually entered task, dated or not.
pub fn overall_progress(snapshot: &Snapshot) -> Progress {
    let tasks = snapshot
        .tasks_by_date
        .values()
        .flatten()
        .chain(snapshot.no_deadline_tasks.iter())
        .chain(snapshot.ideas.iter());

    let (completed, total) = tasks.fold((0, 0), |(completed, total), task| {
        (completed + task.completed as usize, total + 1)
    });

    Progress::new(completed, total)
}

pub fn analytics(snapshot: &Snapshot, date: NaiveDate) -> Analytics {
    Analytics {
        week: week_summary(snapshot, date),
        trend: weekly_trend(snapshot, date),
        lists: list_counts(snapshot),
        overall: overall_progress(snapshot),
    }
}

use chrono::{Datelike, NaiveDate};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rocket::request::FromParam;
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::internal_error::InternalError;

pub type TaskId = i64;

pub type CompletionRecord = BTreeMap<NaiveDate, BTreeSet<TaskId>>;
pub type OrderOverride = BTreeMap<NaiveDate, Vec<TaskId>>;

const GENERATED_TOKEN_LEN: usize = 8;
const MAX_TOKEN_LEN: usize = 64;

/// Opaque, client-held identifier of one planner document. It is not a
/// credential: anyone holding the token can read and write the document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct UserToken(String);

impl UserToken {
    pub fn generate() -> UserToken {
        let token = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_TOKEN_LEN)
            .map(char::from)
            .collect();

        UserToken(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserToken {
    type Error = InternalError;

    fn try_from(token: String) -> Result<UserToken, InternalError> {
        let valid_chars = token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if token.is_empty() || token.len() > MAX_TOKEN_LEN || !valid_chars {
            return Err(InternalError::Invalid(format!("'{}' is not a valid user token", token)));
        }

        Ok(UserToken(token))
    }
}

impl From<UserToken> for String {
    fn from(token: UserToken) -> String {
        token.0
    }
}

impl fmt::Display for UserToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'a> FromParam<'a> for UserToken {
    type Error = InternalError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        UserToken::try_from(param.to_string())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
}

/// Days of the week a weekly task recurs on, 0 = Sunday .. 6 = Saturday.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Weekdays(BTreeSet<u8>);

impl Weekdays {
    pub fn contains(&self, day: u8) -> bool {
        self.0.contains(&day)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<u8>> for Weekdays {
    type Error = InternalError;

    fn try_from(days: Vec<u8>) -> Result<Weekdays, InternalError> {
        if let Some(day) = days.iter().find(|day| **day > 6) {
            return Err(InternalError::Invalid(format!(
                "day of week {} is outside 0..=6",
                day
            )));
        }

        Ok(Weekdays(days.into_iter().collect()))
    }
}

impl From<Weekdays> for Vec<u8> {
    fn from(days: Weekdays) -> Vec<u8> {
        days.0.into_iter().collect()
    }
}

/// 0 = Sunday .. 6 = Saturday, the same numbering `Weekdays` uses.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTaskDefinition {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub emoji: String,
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Weekdays::is_empty")]
    pub days_of_week: Weekdays,
}

impl RecurringTaskDefinition {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self.frequency {
            Frequency::Daily => true,
            Frequency::Weekly => self.days_of_week.contains(day_of_week(date)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManualTask {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub completed: bool,
}

/// A recurring definition materialized for one date. Never stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringInstance {
    pub id: TaskId,
    pub title: String,
    pub emoji: String,
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Weekdays::is_empty")]
    pub days_of_week: Weekdays,
    pub completed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    Manual(ManualTask),
    RecurringInstance(RecurringInstance),
    Idea(ManualTask),
}

impl TaskKind {
    pub fn id(&self) -> TaskId {
        match self {
            TaskKind::Manual(task) | TaskKind::Idea(task) => task.id,
            TaskKind::RecurringInstance(instance) => instance.id,
        }
    }

    pub fn is_completed(&self) -> bool {
        match self {
            TaskKind::Manual(task) | TaskKind::Idea(task) => task.completed,
            TaskKind::RecurringInstance(instance) => instance.completed,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, TaskKind::RecurringInstance(_))
    }
}

/// Which manual bucket a task lives in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskList {
    Today(NaiveDate),
    Backlog,
    Ideas,
}

impl<'a> FromParam<'a> for TaskList {
    type Error = InternalError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        match param {
            "backlog" => Ok(TaskList::Backlog),
            "ideas" => Ok(TaskList::Ideas),
            _ => Err(InternalError::Invalid(format!("unknown task list '{}'", param))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Recurring,
    Manual,
}

/// The whole persisted state of one user, stored as a single JSON document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub tasks_by_date: BTreeMap<NaiveDate, Vec<ManualTask>>,
    pub no_deadline_tasks: Vec<ManualTask>,
    pub ideas: Vec<ManualTask>,
    #[serde(rename = "dailyTasks")]
    pub recurring_definitions: Vec<RecurringTaskDefinition>,
    #[serde(rename = "completedRegularTasks")]
    pub completion_record: CompletionRecord,
    #[serde(rename = "regularTasksOrder")]
    pub order_override: OrderOverride,
}

impl Snapshot {
    pub fn bucket(&self, list: TaskList) -> &[ManualTask] {
        match list {
            TaskList::Today(date) => self
                .tasks_by_date
                .get(&date)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            TaskList::Backlog => &self.no_deadline_tasks,
            TaskList::Ideas => &self.ideas,
        }
    }

    pub fn bucket_mut(&mut self, list: TaskList) -> &mut Vec<ManualTask> {
        match list {
            TaskList::Today(date) => self.tasks_by_date.entry(date).or_default(),
            TaskList::Backlog => &mut self.no_deadline_tasks,
            TaskList::Ideas => &mut self.ideas,
        }
    }

    pub fn recurring_definition(&self, id: TaskId) -> Option<&RecurringTaskDefinition> {
        self.recurring_definitions.iter().find(|d| d.id == id)
    }

    pub fn max_task_id(&self) -> Option<TaskId> {
        let manual = self
            .tasks_by_date
            .values()
            .flatten()
            .chain(self.no_deadline_tasks.iter())
            .chain(self.ideas.iter())
            .map(|task| task.id);
        let recurring = self.recurring_definitions.iter().map(|d| d.id);

        manual.chain(recurring).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_of_week_counts_from_sunday() {
        // 2024-01-07 was a Sunday.
        assert_eq!(day_of_week(date(2024, 1, 7)), 0);
        assert_eq!(day_of_week(date(2024, 1, 8)), 1);
        assert_eq!(day_of_week(date(2024, 1, 13)), 6);
    }

    #[test]
    fn weekdays_reject_out_of_range_days() {
        assert!(Weekdays::try_from(vec![0, 6]).is_ok());
        assert!(Weekdays::try_from(vec![1, 7]).is_err());
        assert!(serde_json::from_str::<Weekdays>("[3, 9]").is_err());
    }

    #[test]
    fn tokens_are_validated() {
        assert!(UserToken::try_from("aB3_x-9".to_string()).is_ok());
        assert!(UserToken::try_from(String::new()).is_err());
        assert!(UserToken::try_from("has space".to_string()).is_err());
        assert!(UserToken::try_from("x".repeat(65)).is_err());

        let generated = UserToken::generate();
        assert_eq!(generated.as_str().len(), 8);
        assert!(UserToken::try_from(generated.to_string()).is_ok());
    }

    #[test]
    fn snapshot_uses_document_field_names() {
        let json = r#"{
            "tasksByDate": {"2024-01-01": [{"id": 5, "title": "Buy milk", "emoji": "🥛", "completed": true}]},
            "noDeadlineTasks": [{"id": 6, "title": "Taxes"}],
            "ideas": [],
            "dailyTasks": [
                {"id": 1, "title": "Stretch", "emoji": "🧘", "frequency": "daily"},
                {"id": 2, "title": "Gym", "frequency": "weekly", "daysOfWeek": [1, 3]}
            ],
            "completedRegularTasks": {"2024-01-01": [1]},
            "regularTasksOrder": {"2024-01-01": [2, 1]}
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let day = date(2024, 1, 1);

        assert_eq!(snapshot.bucket(TaskList::Today(day))[0].title, "Buy milk");
        assert!(!snapshot.no_deadline_tasks[0].completed);
        assert_eq!(snapshot.recurring_definitions[1].frequency, Frequency::Weekly);
        assert!(snapshot.recurring_definitions[1].days_of_week.contains(3));
        assert!(snapshot.completion_record[&day].contains(&1));
        assert_eq!(snapshot.order_override[&day], vec![2, 1]);
        assert_eq!(snapshot.max_task_id(), Some(6));

        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("dailyTasks").is_some());
        assert!(value["dailyTasks"][0].get("daysOfWeek").is_none());
    }

    #[test]
    fn empty_document_is_accepted() {
        let snapshot: Snapshot = serde_json::from_str("{}").unwrap();

        assert_eq!(snapshot, Snapshot::default());
        assert_eq!(snapshot.max_task_id(), None);
    }

    #[test]
    fn task_kind_is_tagged() {
        let idea = TaskKind::Idea(ManualTask {
            id: 3,
            title: "Learn the cello".to_string(),
            emoji: String::new(),
            completed: false,
        });

        let value = serde_json::to_value(&idea).unwrap();
        assert_eq!(value["kind"], "idea");
        assert_eq!(value["title"], "Learn the cello");
        assert!(!idea.is_recurring());
    }
}

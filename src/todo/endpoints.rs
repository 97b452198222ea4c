use chrono::NaiveDate;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::{Deserialize, Serialize};

use crate::data::parse_iso_date;
use crate::internal_error::InternalResult;

use super::analytics::{self, Analytics, Progress};
use super::data::*;
use super::planner::Planner;
use super::projector::{day_view, list_view};
use super::util;

#[derive(Serialize, Debug)]
pub struct NewTokenResponse {
    pub token: UserToken,
}

#[derive(Serialize, Debug)]
pub struct DayResponse {
    pub date: NaiveDate,
    pub tasks: Vec<TaskKind>,
    pub progress: Progress,
}

#[derive(Deserialize, Debug)]
pub struct AddTaskRequest {
    pub list: TaskList,
    pub title: String,
    pub emoji: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ToggleTaskRequest {
    pub list: TaskList,
    pub task_id: TaskId,
    #[serde(default)]
    pub recurring: bool,
}

#[derive(Deserialize, Debug)]
pub struct RenameTaskRequest {
    pub list: TaskList,
    pub task_id: TaskId,
    pub title: String,
}

#[derive(Deserialize, Debug)]
pub struct DeleteTaskRequest {
    pub list: TaskList,
    pub task_id: TaskId,
}

/// A drag-and-drop move. `target_group` is where the drop landed; for the
/// undated lists there is only one group and both fields are ignored.
#[derive(Deserialize, Debug)]
pub struct ReorderTasksRequest {
    pub list: TaskList,
    #[serde(default = "manual_group")]
    pub source_group: GroupKind,
    #[serde(default = "manual_group")]
    pub target_group: GroupKind,
    pub from_index: usize,
    pub to_index: usize,
}

fn manual_group() -> GroupKind {
    GroupKind::Manual
}

#[derive(Deserialize, Debug)]
pub struct AddRecurringRequest {
    pub title: String,
    pub emoji: Option<String>,
    pub frequency: Frequency,
    #[serde(default)]
    pub days_of_week: Weekdays,
}

#[derive(Deserialize, Debug)]
pub struct DeleteRecurringRequest {
    pub task_id: TaskId,
}

#[post("/new_token")]
pub fn new_token() -> Json<NewTokenResponse> {
    let token = UserToken::generate();
    tracing::info!(%token, "issued new user token");

    Json(NewTokenResponse { token })
}

#[get("/<token>/get_document")]
pub fn get_document(token: UserToken, planner: &State<Planner>) -> InternalResult<Json<Snapshot>> {
    planner.document(&token).map(Json)
}

#[post("/<token>/set_document", format = "json", data = "<snapshot>")]
pub async fn set_document(
    token: UserToken,
    snapshot: Json<Snapshot>,
    planner: &State<Planner>,
) -> InternalResult<()> {
    planner.replace_document(&token, snapshot.into_inner()).await
}

#[get("/<token>/get_day/<date>")]
pub fn get_day(
    token: UserToken,
    date: &str,
    planner: &State<Planner>,
) -> InternalResult<Json<DayResponse>> {
    let date = parse_iso_date(date)?;

    planner.read(&token, |snapshot| {
        let tasks = day_view(snapshot, date);
        let progress = analytics::day_progress(snapshot, date);

        Json(DayResponse {
            date,
            tasks,
            progress,
        })
    })
}

#[get("/<token>/get_list/<list>")]
pub fn get_list(
    token: UserToken,
    list: TaskList,
    planner: &State<Planner>,
) -> InternalResult<Json<Vec<TaskKind>>> {
    planner.read(&token, |snapshot| Json(list_view(snapshot, list)))
}

#[post("/<token>/add_task", format = "json", data = "<request>")]
pub fn add_task(
    token: UserToken,
    request: Json<AddTaskRequest>,
    planner: &State<Planner>,
) -> InternalResult<Json<ManualTask>> {
    let request = request.into_inner();

    planner
        .mutate(&token, |snapshot| {
            util::add_manual_task(snapshot, request.list, &request.title, request.emoji)
        })
        .map(Json)
}

#[post("/<token>/toggle_task", format = "json", data = "<request>")]
pub fn toggle_task(
    token: UserToken,
    request: Json<ToggleTaskRequest>,
    planner: &State<Planner>,
) -> InternalResult<()> {
    planner.mutate(&token, |snapshot| {
        match request.list {
            TaskList::Today(date) => {
                util::toggle_completion(snapshot, date, request.task_id, request.recurring)
            }
            list => util::toggle_manual_task(snapshot, list, request.task_id),
        }
        Ok(())
    })
}

#[post("/<token>/rename_task", format = "json", data = "<request>")]
pub fn rename_task(
    token: UserToken,
    request: Json<RenameTaskRequest>,
    planner: &State<Planner>,
) -> InternalResult<()> {
    planner.mutate(&token, |snapshot| {
        util::rename_manual_task(snapshot, request.list, request.task_id, &request.title)
    })
}

#[post("/<token>/delete_task", format = "json", data = "<request>")]
pub fn delete_task(
    token: UserToken,
    request: Json<DeleteTaskRequest>,
    planner: &State<Planner>,
) -> InternalResult<()> {
    planner.mutate(&token, |snapshot| {
        util::delete_manual_task(snapshot, request.list, request.task_id)
    })
}

#[post("/<token>/reorder_tasks", format = "json", data = "<request>")]
pub fn reorder_tasks(
    token: UserToken,
    request: Json<ReorderTasksRequest>,
    planner: &State<Planner>,
) -> InternalResult<()> {
    planner.mutate(&token, |snapshot| {
        match request.list {
            TaskList::Today(date) => util::reorder(
                snapshot,
                date,
                request.source_group,
                request.target_group,
                request.from_index,
                request.to_index,
            ),
            list => util::reorder_list(snapshot, list, request.from_index, request.to_index),
        }
        Ok(())
    })
}

#[get("/<token>/get_recurring")]
pub fn get_recurring(
    token: UserToken,
    planner: &State<Planner>,
) -> InternalResult<Json<Vec<RecurringTaskDefinition>>> {
    planner.read(&token, |snapshot| Json(snapshot.recurring_definitions.clone()))
}

#[post("/<token>/add_recurring", format = "json", data = "<request>")]
pub fn add_recurring(
    token: UserToken,
    request: Json<AddRecurringRequest>,
    planner: &State<Planner>,
) -> InternalResult<Json<RecurringTaskDefinition>> {
    let request = request.into_inner();

    planner
        .mutate(&token, |snapshot| {
            util::add_recurring_task(
                snapshot,
                &request.title,
                request.emoji,
                request.frequency,
                request.days_of_week,
            )
        })
        .map(Json)
}

#[post("/<token>/delete_recurring", format = "json", data = "<request>")]
pub fn delete_recurring(
    token: UserToken,
    request: Json<DeleteRecurringRequest>,
    planner: &State<Planner>,
) -> InternalResult<()> {
    planner.mutate(&token, |snapshot| {
        util::delete_recurring_task(snapshot, request.task_id);
        Ok(())
    })
}

#[get("/<token>/get_analytics/<date>")]
pub fn get_analytics(
    token: UserToken,
    date: &str,
    planner: &State<Planner>,
) -> InternalResult<Json<Analytics>> {
    let date = parse_iso_date(date)?;

    planner.read(&token, |snapshot| Json(analytics::analytics(snapshot, date)))
}

use chrono::{NaiveDate, Utc};

use crate::internal_error::{InternalError, InternalResult};

use super::data::*;
use super::projector::{applicable_ids, project_for_date};

/// Time-based id, bumped past every id already in the document so ids stay
/// unique even when the clock goes backwards or two tasks land in one tick.
pub fn next_task_id(snapshot: &Snapshot) -> InternalResult<TaskId> {
    let now = Utc::now().timestamp_millis();

    match snapshot.max_task_id() {
        Some(max) if max >= now => max
            .checked_add(1)
            .ok_or_else(|| InternalError::from("no task ids left in this document")),
        _ => Ok(now),
    }
}

fn clean_title(title: &str) -> InternalResult<String> {
    let title = title.trim();

    if title.is_empty() {
        return Err(InternalError::from("task title must not be empty"));
    }

    Ok(title.to_string())
}

fn move_element<T>(items: &mut Vec<T>, from_index: usize, to_index: usize) -> bool {
    if from_index == to_index || from_index >= items.len() || to_index >= items.len() {
        return false;
    }

    let item = items.remove(from_index);
    items.insert(to_index, item);
    true
}

pub fn add_manual_task(
    snapshot: &mut Snapshot,
    list: TaskList,
    title: &str,
    emoji: Option<String>,
) -> InternalResult<ManualTask> {
    let task = ManualTask {
        id: next_task_id(snapshot)?,
        title: clean_title(title)?,
        emoji: emoji.unwrap_or_default(),
        completed: false,
    };

    snapshot.bucket_mut(list).push(task.clone());

    Ok(task)
}

pub fn rename_manual_task(
    snapshot: &mut Snapshot,
    list: TaskList,
    task_id: TaskId,
    title: &str,
) -> InternalResult<()> {
    let title = clean_title(title)?;

    if snapshot.bucket(list).iter().all(|task| task.id != task_id) {
        tracing::debug!(?list, task_id, "rename of missing task ignored");
        return Ok(());
    }

    if let Some(task) = snapshot
        .bucket_mut(list)
        .iter_mut()
        .find(|task| task.id == task_id)
    {
        task.title = title;
    }

    Ok(())
}

/// Removes a manual task from its bucket. Recurring instances can only be
/// removed by deleting their definition.
pub fn delete_manual_task(
    snapshot: &mut Snapshot,
    list: TaskList,
    task_id: TaskId,
) -> InternalResult<()> {
    if snapshot.bucket(list).iter().any(|task| task.id == task_id) {
        snapshot.bucket_mut(list).retain(|task| task.id != task_id);
        if let TaskList::Today(date) = list {
            if snapshot.bucket(list).is_empty() {
                snapshot.tasks_by_date.remove(&date);
            }
        }
        return Ok(());
    }

    if snapshot.recurring_definition(task_id).is_some() {
        return Err(InternalError::recurring_delete_rejected());
    }

    tracing::debug!(?list, task_id, "delete of missing task ignored");
    Ok(())
}

/// Flips completion of a task shown on `date`. Ids that do not resolve to a
/// task for that date are ignored.
pub fn toggle_completion(
    snapshot: &mut Snapshot,
    date: NaiveDate,
    task_id: TaskId,
    is_recurring: bool,
) {
    if !is_recurring {
        toggle_manual_task(snapshot, TaskList::Today(date), task_id);
        return;
    }

    if !applicable_ids(snapshot, date).contains(&task_id) {
        tracing::debug!(%date, task_id, "completion toggle for unscheduled recurring task ignored");
        return;
    }

    let completed = snapshot.completion_record.entry(date).or_default();
    if !completed.remove(&task_id) {
        completed.insert(task_id);
    }
    if completed.is_empty() {
        snapshot.completion_record.remove(&date);
    }
}

pub fn toggle_manual_task(snapshot: &mut Snapshot, list: TaskList, task_id: TaskId) {
    if snapshot.bucket(list).iter().all(|task| task.id != task_id) {
        tracing::debug!(?list, task_id, "completion toggle for missing task ignored");
        return;
    }

    if let Some(task) = snapshot
        .bucket_mut(list)
        .iter_mut()
        .find(|task| task.id == task_id)
    {
        task.completed = !task.completed;
    }
}

/// Moves one task within a group of `date`'s list. A drop into a different
/// group than the drag started in is ignored, as are out-of-range indices.
pub fn reorder(
    snapshot: &mut Snapshot,
    date: NaiveDate,
    source_group: GroupKind,
    target_group: GroupKind,
    from_index: usize,
    to_index: usize,
) {
    if source_group != target_group {
        tracing::debug!(%date, ?source_group, ?target_group, "cross-group move ignored");
        return;
    }

    match source_group {
        GroupKind::Recurring => {
            let mut order: Vec<TaskId> = project_for_date(
                date,
                &snapshot.recurring_definitions,
                &snapshot.completion_record,
                &snapshot.order_override,
            )
            .iter()
            .map(|instance| instance.id)
            .collect();

            if move_element(&mut order, from_index, to_index) {
                snapshot.order_override.insert(date, order);
            }
        }
        GroupKind::Manual => reorder_list(snapshot, TaskList::Today(date), from_index, to_index),
    }
}

pub fn reorder_list(snapshot: &mut Snapshot, list: TaskList, from_index: usize, to_index: usize) {
    let len = snapshot.bucket(list).len();
    if from_index == to_index || from_index >= len || to_index >= len {
        tracing::debug!(?list, from_index, to_index, len, "reorder ignored");
        return;
    }

    move_element(snapshot.bucket_mut(list), from_index, to_index);
}

pub fn add_recurring_task(
    snapshot: &mut Snapshot,
    title: &str,
    emoji: Option<String>,
    frequency: Frequency,
    days_of_week: Weekdays,
) -> InternalResult<RecurringTaskDefinition> {
    let title = clean_title(title)?;

    let days_of_week = match frequency {
        Frequency::Daily => Weekdays::default(),
        Frequency::Weekly if days_of_week.is_empty() => {
            return Err(InternalError::from("weekly tasks need at least one day of the week"));
        }
        Frequency::Weekly => days_of_week,
    };

    let definition = RecurringTaskDefinition {
        id: next_task_id(snapshot)?,
        title,
        emoji: emoji.unwrap_or_default(),
        frequency,
        days_of_week,
    };

    snapshot.recurring_definitions.push(definition.clone());

    Ok(definition)
}

/// Deleting a definition removes it from every date's projection. Its ids in
/// the completion record and order overrides are left behind and ignored.
pub fn delete_recurring_task(snapshot: &mut Snapshot, task_id: TaskId) {
    let before = snapshot.recurring_definitions.len();
    snapshot
        .recurring_definitions
        .retain(|definition| definition.id != task_id);

    if snapshot.recurring_definitions.len() == before {
        tracing::debug!(task_id, "delete of missing recurring task ignored");
    }
}

//! Materializes recurring task definitions into a given day's task list.
//!
//! Everything here is a pure function over a borrowed snapshot: nothing is
//! mutated and malformed-but-typed input (stray ids in an order override,
//! completions for deleted definitions) is tolerated rather than rejected.

use chrono::NaiveDate;

use std::collections::{BTreeSet, HashSet};

use super::data::*;

/// Recurring instances that apply to `date`, in that date's display order.
///
/// Ids named by `order_override[date]` come first, in override order; ids
/// that are not applicable on `date` are skipped. Remaining applicable
/// instances follow in definition order.
pub fn project_for_date(
    date: NaiveDate,
    definitions: &[RecurringTaskDefinition],
    completion_record: &CompletionRecord,
    order_override: &OrderOverride,
) -> Vec<RecurringInstance> {
    let empty = BTreeSet::new();
    let completed = completion_record.get(&date).unwrap_or(&empty);

    let mut applicable: Vec<Option<RecurringInstance>> = definitions
        .iter()
        .filter(|definition| definition.applies_on(date))
        .map(|definition| {
            Some(RecurringInstance {
                id: definition.id,
                title: definition.title.clone(),
                emoji: definition.emoji.clone(),
                frequency: definition.frequency,
                days_of_week: definition.days_of_week.clone(),
                completed: completed.contains(&definition.id),
            })
        })
        .collect();

    let mut ordered = Vec::with_capacity(applicable.len());

    if let Some(saved_order) = order_override.get(&date) {
        for id in saved_order {
            let slot = applicable
                .iter_mut()
                .find(|slot| matches!(slot, Some(instance) if instance.id == *id));

            match slot {
                Some(slot) => ordered.extend(slot.take()),
                None => tracing::trace!(%date, id, "dropping stray id from order override"),
            }
        }
    }

    ordered.extend(applicable.into_iter().flatten());
    ordered
}

/// Recurring instances first, then the date's manual tasks in stored order.
pub fn merge_with_manual(
    recurring_instances: Vec<RecurringInstance>,
    manual_tasks: &[ManualTask],
) -> Vec<TaskKind> {
    recurring_instances
        .into_iter()
        .map(TaskKind::RecurringInstance)
        .chain(manual_tasks.iter().cloned().map(TaskKind::Manual))
        .collect()
}

/// The full, ordered list shown for `date`.
pub fn day_view(snapshot: &Snapshot, date: NaiveDate) -> Vec<TaskKind> {
    let recurring = project_for_date(
        date,
        &snapshot.recurring_definitions,
        &snapshot.completion_record,
        &snapshot.order_override,
    );

    merge_with_manual(recurring, snapshot.bucket(TaskList::Today(date)))
}

/// An undated list (backlog or ideas) as tagged task entries.
pub fn list_view(snapshot: &Snapshot, list: TaskList) -> Vec<TaskKind> {
    match list {
        TaskList::Today(date) => day_view(snapshot, date),
        TaskList::Backlog => snapshot
            .bucket(list)
            .iter()
            .cloned()
            .map(TaskKind::Manual)
            .collect(),
        TaskList::Ideas => snapshot
            .bucket(list)
            .iter()
            .cloned()
            .map(TaskKind::Idea)
            .collect(),
    }
}

/// Ids of recurring tasks applicable on `date`, without building instances.
pub fn applicable_ids(snapshot: &Snapshot, date: NaiveDate) -> HashSet<TaskId> {
    snapshot
        .recurring_definitions
        .iter()
        .filter(|definition| definition.applies_on(date))
        .map(|definition| definition.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily(id: TaskId, title: &str) -> RecurringTaskDefinition {
        RecurringTaskDefinition {
            id,
            title: title.to_string(),
            emoji: String::new(),
            frequency: Frequency::Daily,
            days_of_week: Weekdays::default(),
        }
    }

    fn weekly(id: TaskId, title: &str, days: Vec<u8>) -> RecurringTaskDefinition {
        RecurringTaskDefinition {
            id,
            title: title.to_string(),
            emoji: String::new(),
            frequency: Frequency::Weekly,
            days_of_week: Weekdays::try_from(days).unwrap(),
        }
    }

    fn manual(id: TaskId, title: &str) -> ManualTask {
        ManualTask {
            id,
            title: title.to_string(),
            emoji: String::new(),
            completed: false,
        }
    }

    fn ids(instances: &[RecurringInstance]) -> Vec<TaskId> {
        instances.iter().map(|instance| instance.id).collect()
    }

    #[test]
    fn daily_tasks_appear_every_day() {
        let definitions = vec![daily(1, "Stretch")];
        let start = date(2024, 1, 1);

        for offset in 0..14 {
            let day = start + chrono::Duration::days(offset);
            let projected =
                project_for_date(day, &definitions, &CompletionRecord::new(), &OrderOverride::new());

            assert_eq!(ids(&projected), vec![1], "missing on {}", day);
        }
    }

    #[test]
    fn weekly_tasks_appear_only_on_their_days() {
        let definitions = vec![weekly(1, "Gym", vec![1, 3])];
        // 2024-01-07 is a Sunday.
        let sunday = date(2024, 1, 7);

        for offset in 0..7 {
            let day = sunday + chrono::Duration::days(offset);
            let projected =
                project_for_date(day, &definitions, &CompletionRecord::new(), &OrderOverride::new());

            assert_eq!(projected.len() == 1, offset == 1 || offset == 3, "on {}", day);
        }
    }

    #[test]
    fn completion_is_read_from_the_projected_date_only() {
        let definitions = vec![daily(7, "Read")];
        let mut completion_record = CompletionRecord::new();
        completion_record.insert(date(2024, 1, 1), [7].into_iter().collect());

        let first =
            project_for_date(date(2024, 1, 1), &definitions, &completion_record, &OrderOverride::new());
        let second =
            project_for_date(date(2024, 1, 2), &definitions, &completion_record, &OrderOverride::new());

        assert!(first[0].completed);
        assert!(!second[0].completed);
    }

    #[test]
    fn override_ids_lead_then_definition_order() {
        let day = date(2024, 1, 1);
        let definitions = vec![daily(1, "A"), daily(2, "B"), daily(3, "C")];
        let mut order_override = OrderOverride::new();
        order_override.insert(day, vec![3, 1]);

        let projected =
            project_for_date(day, &definitions, &CompletionRecord::new(), &order_override);

        assert_eq!(ids(&projected), vec![3, 1, 2]);
    }

    #[test]
    fn stray_override_ids_are_dropped() {
        let day = date(2024, 1, 1);
        let definitions = vec![daily(1, "A"), daily(2, "B"), daily(3, "C")];
        let mut order_override = OrderOverride::new();
        order_override.insert(day, vec![99, 1]);

        let projected =
            project_for_date(day, &definitions, &CompletionRecord::new(), &order_override);

        assert_eq!(ids(&projected), vec![1, 2, 3]);
    }

    #[test]
    fn override_ids_not_scheduled_that_day_are_dropped() {
        // Monday: the weekly task only runs on Saturdays.
        let day = date(2024, 1, 8);
        let definitions = vec![daily(1, "A"), weekly(2, "B", vec![6])];
        let mut order_override = OrderOverride::new();
        order_override.insert(day, vec![2, 1, 1]);

        let projected =
            project_for_date(day, &definitions, &CompletionRecord::new(), &order_override);

        assert_eq!(ids(&projected), vec![1]);
    }

    #[test]
    fn projection_leaves_inputs_untouched() {
        let day = date(2024, 1, 1);
        let definitions = vec![daily(1, "A"), daily(2, "B")];
        let mut completion_record = CompletionRecord::new();
        completion_record.insert(day, [2, 42].into_iter().collect());
        let mut order_override = OrderOverride::new();
        order_override.insert(day, vec![2, 99]);

        let before = (definitions.clone(), completion_record.clone(), order_override.clone());
        let first = project_for_date(day, &definitions, &completion_record, &order_override);
        let second = project_for_date(day, &definitions, &completion_record, &order_override);

        assert_eq!(first, second);
        assert_eq!((definitions, completion_record, order_override), before);
    }

    #[test]
    fn recurring_instances_precede_manual_tasks() {
        let day = date(2024, 1, 1);
        let recurring =
            project_for_date(day, &[daily(1, "X")], &CompletionRecord::new(), &OrderOverride::new());

        let merged = merge_with_manual(recurring, &[manual(2, "Y")]);

        assert_eq!(merged.iter().map(TaskKind::id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(merged[0].is_recurring());
        assert!(!merged[1].is_recurring());
    }

    #[test]
    fn ideas_are_tagged_as_ideas() {
        let mut snapshot = Snapshot::default();
        snapshot.ideas.push(manual(4, "Write a novel"));
        snapshot.no_deadline_tasks.push(manual(5, "Renew passport"));

        assert!(matches!(list_view(&snapshot, TaskList::Ideas)[0], TaskKind::Idea(_)));
        assert!(matches!(list_view(&snapshot, TaskList::Backlog)[0], TaskKind::Manual(_)));
    }
}

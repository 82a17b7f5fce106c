use focusflow_lib::db::models::{TaskDraft, TaskStatus, TaskUpdate};
use focusflow_lib::db::Database;
use focusflow_lib::error::FocusError;
use focusflow_lib::tasks::TaskStore;

fn store() -> TaskStore {
    TaskStore::new(Database::open_in_memory().unwrap())
}

#[tokio::test]
async fn starting_a_task_demotes_the_previous_one() {
    let store = store();
    let first = store.create("Write parser", "", 25).await.unwrap();
    let second = store.create("Write lexer", "", 25).await.unwrap();

    store.start(first.id).await.unwrap();
    let started = store.start(second.id).await.unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);

    let tasks = store.list().await.unwrap();
    let in_progress: Vec<_> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .map(|t| t.id)
        .collect();
    assert_eq!(in_progress, vec![second.id]);
    assert_eq!(store.get(first.id).await.unwrap().status, TaskStatus::Todo);
    assert_eq!(store.get_active().await.unwrap().unwrap().id, second.id);
}

#[tokio::test]
async fn concurrent_starts_leave_one_active_task() {
    let store = store();
    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(store.create(&format!("Task {i}"), "", 15).await.unwrap().id);
    }

    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let store = store.clone();
            tokio::spawn(async move { store.start(id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let active = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn completing_twice_is_idempotent() {
    let store = store();
    let task = store.create("Ship it", "", 30).await.unwrap();
    store.start(task.id).await.unwrap();

    let done = store.complete(task.id).await.unwrap();
    let again = store.complete(task.id).await.unwrap();
    assert_eq!(done.status, TaskStatus::Done);
    assert_eq!(again.status, TaskStatus::Done);
    assert!(store.get_active().await.unwrap().is_none());
}

#[tokio::test]
async fn done_tasks_cannot_be_restarted() {
    let store = store();
    let task = store.create("Ship it", "", 30).await.unwrap();
    store.complete(task.id).await.unwrap();

    let err = store.start(task.id).await.unwrap_err();
    assert!(matches!(
        err,
        FocusError::InvalidTransition {
            from: TaskStatus::Done,
            to: TaskStatus::InProgress,
            ..
        }
    ));
    assert_eq!(err.code(), "invalid_transition");
}

#[tokio::test]
async fn deleting_the_active_task_clears_it() {
    let store = store();
    let task = store.create("Refactor", "", 20).await.unwrap();
    store.start(task.id).await.unwrap();

    store.delete(task.id).await.unwrap();
    assert!(store.get_active().await.unwrap().is_none());

    let err = store.delete(task.id).await.unwrap_err();
    assert!(matches!(err, FocusError::NotFound { .. }));
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let store = store();
    let err = store.start(99).await.unwrap_err();
    assert!(matches!(err, FocusError::NotFound { id: 99 }));
    assert_eq!(err.to_string(), "task 99 not found");

    let err = store
        .update(
            99,
            TaskUpdate {
                title: Some("x".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FocusError::NotFound { id: 99 }));
}

#[tokio::test]
async fn updates_touch_only_given_fields() {
    let store = store();
    let task = store.create("Draft", "first pass", 20).await.unwrap();

    let updated = store
        .update(
            task.id,
            TaskUpdate {
                estimated_duration: Some(45),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Draft");
    assert_eq!(updated.description, "first pass");
    assert_eq!(updated.estimated_duration, 45);

    let err = store.update(task.id, TaskUpdate::default()).await.unwrap_err();
    assert_eq!(err.code(), "validation_error");
}

#[tokio::test]
async fn replace_all_swaps_the_list() {
    let store = store();
    store.create("Old", "", 20).await.unwrap();

    let (cleared, tasks) = store
        .replace_all(vec![TaskDraft::new("New A", "", 15), TaskDraft::new("New B", "", 15)])
        .await
        .unwrap();
    assert_eq!(cleared, 1);
    let titles: Vec<_> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["New A", "New B"]);
    assert_eq!(tasks.len(), 2);
}

#[tokio::test]
async fn tasks_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("focusflow.db");

    let id = {
        let store = TaskStore::new(Database::new(path.clone()).unwrap());
        let task = store.create("Persist me", "", 20).await.unwrap();
        store.start(task.id).await.unwrap();
        task.id
    };

    let store = TaskStore::new(Database::new(path).unwrap());
    let active = store.get_active().await.unwrap().unwrap();
    assert_eq!(active.id, id);
    assert_eq!(active.title, "Persist me");
}

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stratus Store Contract
//!
//! Behaviour every [`Store`] driver must show, written once against
//! `Arc<dyn Store>`. A driver runs the whole list from its own `tests/`:
//!
//! ```rust,ignore
//! async fn fresh_store() -> (Arc<dyn Store>, ()) {
//!     (Arc::new(MemoryStore::new()), ())
//! }
//!
//! stratus_store_contract::store_contract!(fresh_store());
//! ```
//!
//! The second tuple element is held until the test ends, for drivers whose
//! backing files must outlive the store.

use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;
use stratus_core::{ExecutionId, FunctionId, Pagination, VersionId};
use stratus_execution::{ExecutionStatus, ExecutionUpdate, NewExecution, Trigger};
use stratus_function::{CronStatus, Function, FunctionPatch, NewFunction};
use stratus_ports::{Store, StoreError};

/// Expand every check into a `#[tokio::test]` that builds its store from
/// `$make`, an expression yielding a future of `(Arc<dyn Store>, guard)`.
#[macro_export]
macro_rules! store_contract {
    ($make:expr) => {
        $crate::store_contract!(@checks $make;
            get_missing_function_fails,
            create_function_rejects_blank_name,
            list_functions_is_newest_first_with_total,
            update_only_touches_supplied_fields,
            versions_number_from_one_and_only_latest_is_active,
            create_version_for_missing_function_fails,
            activate_switches_the_active_version,
            activate_unknown_version_fails,
            no_active_version_before_first_version,
            deleting_active_version_is_rejected_and_changes_nothing,
            deleting_version_with_history_is_rejected,
            deleted_version_numbers_are_not_reused,
            delete_function_cascades,
            execution_needs_existing_function_and_version,
            execution_is_finalised_exactly_once,
            executions_list_newest_first,
            retention_purges_only_old_rows,
            active_cron_listing_skips_paused_and_unscheduled,
            ping_succeeds,
            concurrent_create_version_yields_unique_numbers_and_one_active,
            concurrent_activation_leaves_exactly_one_active,
        );
    };
    (@checks $make:expr; $($check:ident),+ $(,)?) => {
        $(
            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn $check() {
                let (store, _guard) = $make.await;
                $crate::$check(store).await;
            }
        )+
    };
}

async fn with_function(store: &Arc<dyn Store>) -> Function {
    store
        .create_function(NewFunction::named("hello"))
        .await
        .unwrap()
}

fn new_execution(f: FunctionId, v: VersionId) -> NewExecution {
    NewExecution {
        id: ExecutionId::v4(),
        function_id: f,
        version_id: v,
        trigger: Trigger::Http,
        event_json: None,
    }
}

fn finished(status: ExecutionStatus) -> ExecutionUpdate {
    ExecutionUpdate {
        status,
        duration_ms: Some(12),
        error_message: None,
        response_json: None,
    }
}

/// Unknown ids fail with `FunctionNotFound`.
pub async fn get_missing_function_fails(store: Arc<dyn Store>) {
    let id = FunctionId::v4();
    let err = store.get_function(id).await.unwrap_err();
    assert!(matches!(err, StoreError::FunctionNotFound(got) if got == id));
}

/// Validation runs before anything is written.
pub async fn create_function_rejects_blank_name(store: Arc<dyn Store>) {
    let err = store
        .create_function(NewFunction::named("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidFunction(_)));
    assert_eq!(store.list_functions(Pagination::default()).await.unwrap().total, 0);
}

/// Pages are newest first and carry the unpaged total.
pub async fn list_functions_is_newest_first_with_total(store: Arc<dyn Store>) {
    for name in ["a", "b", "c"] {
        store.create_function(NewFunction::named(name)).await.unwrap();
    }
    let page = store
        .list_functions(Pagination::new(Some(2), None))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let names: Vec<_> = page.items.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["c", "b"]);

    let rest = store
        .list_functions(Pagination::new(Some(2), Some(2)))
        .await
        .unwrap();
    let names: Vec<_> = rest.items.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["a"]);
}

/// A patch changes only what it names and the result is what a re-read sees.
pub async fn update_only_touches_supplied_fields(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let patch = FunctionPatch {
        disabled: Some(true),
        ..FunctionPatch::default()
    };
    let updated = store.update_function(f.id, patch).await.unwrap();
    assert!(updated.disabled);
    assert_eq!(updated.name, "hello");
    assert_eq!(updated.created_at, f.created_at);
    assert_eq!(store.get_function(f.id).await.unwrap(), updated);
}

/// Numbering starts at 1 and the newest version becomes the active one.
pub async fn versions_number_from_one_and_only_latest_is_active(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    for _ in 0..3 {
        store.create_version(f.id, "{}".into(), None).await.unwrap();
    }
    let page = store.list_versions(f.id, Pagination::default()).await.unwrap();
    let numbers: Vec<_> = page.items.iter().map(|v| v.version).collect();
    assert_eq!(numbers, [3, 2, 1]);
    let active: Vec<_> = page.items.iter().filter(|v| v.is_active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].version, 3);
}

/// Versions need an owner.
pub async fn create_version_for_missing_function_fails(store: Arc<dyn Store>) {
    let err = store
        .create_version(FunctionId::v4(), "{}".into(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FunctionNotFound(_)));
    assert!(matches!(
        store
            .list_versions(FunctionId::v4(), Pagination::default())
            .await
            .unwrap_err(),
        StoreError::FunctionNotFound(_)
    ));
}

/// Activation moves the flag; every read agrees afterwards.
pub async fn activate_switches_the_active_version(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let v1 = store.create_version(f.id, "1".into(), None).await.unwrap();
    store.create_version(f.id, "2".into(), None).await.unwrap();

    let activated = store.activate_version(v1.id).await.unwrap();
    assert!(activated.is_active);
    assert_eq!(activated.code, "1");
    assert_eq!(store.get_active_version(f.id).await.unwrap().id, v1.id);
    assert!(!store.get_version(f.id, 2).await.unwrap().is_active);
    assert!(store.get_version_by_id(v1.id).await.unwrap().is_active);
}

/// Unknown versions cannot be activated.
pub async fn activate_unknown_version_fails(store: Arc<dyn Store>) {
    let err = store.activate_version(VersionId::v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::VersionNotFound(_)));
}

/// A fresh function has nothing to run.
pub async fn no_active_version_before_first_version(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let err = store.get_active_version(f.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NoActiveVersion(id) if id == f.id));
}

/// The active version is protected.
pub async fn deleting_active_version_is_rejected_and_changes_nothing(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let v1 = store.create_version(f.id, "1".into(), None).await.unwrap();
    let err = store.delete_version(v1.id).await.unwrap_err();
    assert!(matches!(err, StoreError::CannotDeleteActiveVersion(id) if id == v1.id));
    assert_eq!(store.get_active_version(f.id).await.unwrap(), v1);
}

/// Versions referenced by executions stay.
pub async fn deleting_version_with_history_is_rejected(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let v1 = store.create_version(f.id, "1".into(), None).await.unwrap();
    store.create_execution(new_execution(f.id, v1.id)).await.unwrap();
    store.create_version(f.id, "2".into(), None).await.unwrap();

    let err = store.delete_version(v1.id).await.unwrap_err();
    assert!(matches!(err, StoreError::VersionInUse { executions: 1, .. }));
}

/// Deleting the highest version does not free its number.
pub async fn deleted_version_numbers_are_not_reused(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let v1 = store.create_version(f.id, "1".into(), None).await.unwrap();
    let v2 = store.create_version(f.id, "2".into(), None).await.unwrap();
    store.activate_version(v1.id).await.unwrap();
    store.delete_version(v2.id).await.unwrap();

    let v3 = store.create_version(f.id, "3".into(), None).await.unwrap();
    assert_eq!(v3.version, 3);
    assert!(matches!(
        store.get_version(f.id, 2).await.unwrap_err(),
        StoreError::VersionNumberNotFound { version: 2, .. }
    ));
}

/// Deleting a function takes its versions and executions with it.
pub async fn delete_function_cascades(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let v1 = store.create_version(f.id, "1".into(), None).await.unwrap();
    let exec = store.create_execution(new_execution(f.id, v1.id)).await.unwrap();

    store.delete_function(f.id).await.unwrap();
    assert!(matches!(
        store.get_version_by_id(v1.id).await.unwrap_err(),
        StoreError::VersionNotFound(_)
    ));
    assert!(matches!(
        store.get_execution(exec.id).await.unwrap_err(),
        StoreError::ExecutionNotFound(_)
    ));
    assert!(matches!(
        store.delete_function(f.id).await.unwrap_err(),
        StoreError::FunctionNotFound(_)
    ));
}

/// Records point at rows that exist.
pub async fn execution_needs_existing_function_and_version(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let err = store
        .create_execution(new_execution(FunctionId::v4(), VersionId::v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FunctionNotFound(_)));

    let err = store
        .create_execution(new_execution(f.id, VersionId::v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::VersionNotFound(_)));
}

/// Pending records finalise once; a second write is a transition error.
pub async fn execution_is_finalised_exactly_once(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let v1 = store.create_version(f.id, "1".into(), None).await.unwrap();
    let exec = store.create_execution(new_execution(f.id, v1.id)).await.unwrap();
    assert_eq!(exec.status, ExecutionStatus::Pending);

    let done = finished(ExecutionStatus::Success);
    let updated = store.update_execution(exec.id, done.clone()).await.unwrap();
    assert_eq!(updated.status, ExecutionStatus::Success);
    assert_eq!(updated.duration_ms, Some(12));
    assert_eq!(store.get_execution(exec.id).await.unwrap(), updated);

    let err = store.update_execution(exec.id, done).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidTransition {
            from: ExecutionStatus::Success,
            to: ExecutionStatus::Success,
            ..
        }
    ));
    assert!(matches!(
        store
            .update_execution(ExecutionId::v4(), finished(ExecutionStatus::Error))
            .await
            .unwrap_err(),
        StoreError::ExecutionNotFound(_)
    ));
}

/// Execution history pages newest first, scoped to one function.
pub async fn executions_list_newest_first(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let other = store.create_function(NewFunction::named("other")).await.unwrap();
    let v = store.create_version(f.id, "1".into(), None).await.unwrap();
    let w = store.create_version(other.id, "1".into(), None).await.unwrap();

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(store.create_execution(new_execution(f.id, v.id)).await.unwrap().id);
    }
    store.create_execution(new_execution(other.id, w.id)).await.unwrap();

    let page = store
        .list_executions(f.id, Pagination::new(Some(2), None))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let listed: Vec<_> = page.items.iter().map(|e| e.id).collect();
    assert_eq!(listed, [ids[2], ids[1]]);
}

/// Retention removes rows older than the cutoff and nothing else.
pub async fn retention_purges_only_old_rows(store: Arc<dyn Store>) {
    let f = with_function(&store).await;
    let other = store.create_function(NewFunction::named("other")).await.unwrap();
    let v = store.create_version(f.id, "1".into(), None).await.unwrap();
    let w = store.create_version(other.id, "1".into(), None).await.unwrap();
    store.create_execution(new_execution(f.id, v.id)).await.unwrap();
    store.create_execution(new_execution(other.id, w.id)).await.unwrap();

    let past = Utc::now() - chrono::Duration::days(1);
    assert_eq!(store.delete_old_executions(past).await.unwrap(), 0);

    let future = Utc::now() + chrono::Duration::seconds(1);
    assert_eq!(
        store.delete_function_executions_before(f.id, future).await.unwrap(),
        1
    );
    let remaining = store.list_executions(other.id, Pagination::default()).await.unwrap();
    assert_eq!(remaining.total, 1);
    assert_eq!(store.delete_old_executions(future).await.unwrap(), 1);
}

/// Only active, non-empty schedules are handed to the scheduler.
pub async fn active_cron_listing_skips_paused_and_unscheduled(store: Arc<dyn Store>) {
    let scheduled = store
        .create_function(NewFunction::named("tick").with_cron("*/5 * * * *"))
        .await
        .unwrap();
    let paused = store
        .create_function(NewFunction::named("paused").with_cron("0 * * * *"))
        .await
        .unwrap();
    store.create_function(NewFunction::named("plain")).await.unwrap();
    store
        .update_function(
            paused.id,
            FunctionPatch {
                cron_status: Some(CronStatus::Paused),
                ..FunctionPatch::default()
            },
        )
        .await
        .unwrap();

    let ids: Vec<_> = store
        .list_functions_with_active_cron()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(ids, [scheduled.id]);
}

/// A healthy store answers the liveness check.
pub async fn ping_succeeds(store: Arc<dyn Store>) {
    store.ping().await.unwrap();
}

/// Racing creators never share a number or leave two versions active.
pub async fn concurrent_create_version_yields_unique_numbers_and_one_active(store: Arc<dyn Store>) {
    let f = store.create_function(NewFunction::named("busy")).await.unwrap();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create_version(f.id, format!("{i}"), None).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let page = store
        .list_versions(f.id, Pagination::new(Some(100), None))
        .await
        .unwrap();
    let mut numbers: Vec<u32> = page.items.iter().map(|v| v.version).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=32).collect::<Vec<_>>());
    assert_eq!(page.items.iter().filter(|v| v.is_active).count(), 1);
}

/// Racing activations settle on exactly one active version.
pub async fn concurrent_activation_leaves_exactly_one_active(store: Arc<dyn Store>) {
    let f = store.create_function(NewFunction::named("flip")).await.unwrap();
    let mut ids = Vec::new();
    for i in 0..8 {
        ids.push(store.create_version(f.id, format!("{i}"), None).await.unwrap().id);
    }

    let handles: Vec<_> = ids
        .iter()
        .copied()
        .map(|id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.activate_version(id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let page = store.list_versions(f.id, Pagination::default()).await.unwrap();
    assert_eq!(page.items.iter().filter(|v| v.is_active).count(), 1);
}

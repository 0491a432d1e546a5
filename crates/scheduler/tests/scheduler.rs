//! Scheduler behaviour against the in-memory store and a mock entry point.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use stratus_core::{ExecutionId, FunctionId, Page, Pagination, VersionId};
use stratus_execution::{Execution, ExecutionUpdate, NewExecution, Trigger};
use stratus_function::{
    CronStatus, Function, FunctionPatch, FunctionVersion, NewFunction, RetentionDays,
};
use stratus_ports::{ExecutionRepo, FunctionRepo, Store, StoreError, VersionRepo};
use stratus_scheduler::{CronScheduler, RetentionSweeper, SelfTrigger, headers};
use stratus_store_memory::MemoryStore;
use stratus_telemetry::{MetricsRegistry, names};
use wiremock::matchers::{header, header_exists, method, path};
use tokio::sync::Notify;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scheduler(store: Arc<dyn Store>, base_url: &str, metrics: MetricsRegistry) -> CronScheduler {
    let trigger = SelfTrigger::new(base_url, Duration::from_secs(5)).unwrap();
    CronScheduler::new(store, trigger, metrics)
}

async fn wait_for_requests(server: &MockServer, at_least: usize) -> Vec<wiremock::Request> {
    for _ in 0..50 {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= at_least {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    server.received_requests().await.unwrap_or_default()
}

#[tokio::test]
async fn start_registers_only_active_schedules() {
    let store = Arc::new(MemoryStore::new());
    let scheduled = store
        .create_function(NewFunction::named("nightly").with_cron("0 3 * * *"))
        .await
        .unwrap();
    let plain = store.create_function(NewFunction::named("plain")).await.unwrap();
    let mut paused = NewFunction::named("paused").with_cron("*/5 * * * *");
    paused.cron_status = Some(CronStatus::Paused);
    let paused = store.create_function(paused).await.unwrap();

    let sched = scheduler(store, "http://127.0.0.1:9", MetricsRegistry::new());
    assert_eq!(sched.start().await.unwrap(), 1);

    assert!(sched.is_registered(scheduled.id).await);
    assert!(!sched.is_registered(plain.id).await);
    assert!(!sched.is_registered(paused.id).await);
    assert!(sched.next_run(scheduled.id).await.unwrap() > Utc::now());

    sched.stop().await;
    assert!(sched.jobs().await.is_empty());
}

#[tokio::test]
async fn pause_and_resume_through_refresh() {
    let store = Arc::new(MemoryStore::new());
    let function = store
        .create_function(NewFunction::named("every-five").with_cron("*/5 * * * *"))
        .await
        .unwrap();
    let sched = scheduler(store.clone(), "http://127.0.0.1:9", MetricsRegistry::new());
    sched.start().await.unwrap();
    assert!(sched.next_run(function.id).await.is_some());

    store
        .update_function(
            function.id,
            FunctionPatch {
                cron_status: Some(CronStatus::Paused),
                ..FunctionPatch::default()
            },
        )
        .await
        .unwrap();
    assert!(!sched.refresh_function(function.id).await.unwrap());
    assert_eq!(sched.next_run(function.id).await, None);

    store
        .update_function(
            function.id,
            FunctionPatch {
                cron_status: Some(CronStatus::Active),
                ..FunctionPatch::default()
            },
        )
        .await
        .unwrap();
    assert!(sched.refresh_function(function.id).await.unwrap());
    assert!(sched.next_run(function.id).await.is_some());
    assert_eq!(sched.jobs().await.len(), 1);

    sched.stop().await;
}

#[tokio::test]
async fn refresh_picks_up_new_schedule_and_deletion() {
    let store = Arc::new(MemoryStore::new());
    let function = store
        .create_function(NewFunction::named("hourly").with_cron("0 * * * *"))
        .await
        .unwrap();
    let sched = scheduler(store.clone(), "http://127.0.0.1:9", MetricsRegistry::new());
    sched.start().await.unwrap();

    store
        .update_function(
            function.id,
            FunctionPatch {
                cron_schedule: Some(Some("*/5 * * * *".into())),
                ..FunctionPatch::default()
            },
        )
        .await
        .unwrap();
    sched.refresh_function(function.id).await.unwrap();
    let jobs = sched.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].schedule, "*/5 * * * *");

    store.delete_function(function.id).await.unwrap();
    assert!(!sched.refresh_function(function.id).await.unwrap());
    assert!(sched.jobs().await.is_empty());

    sched.stop().await;
}

#[tokio::test]
async fn fire_posts_to_own_entry_point_with_cron_headers() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let function = store
        .create_function(NewFunction::named("ticker").with_cron("* * * * * *"))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/fn/{}", function.id)))
        .and(header(headers::TRIGGER, "cron"))
        .and(header(headers::CRON_SCHEDULE, "* * * * * *"))
        .and(header(headers::CRON_FUNCTION_ID, function.id.to_string().as_str()))
        .and(header(headers::CRON_FUNCTION_NAME, "ticker"))
        .and(header_exists(headers::CRON_SCHEDULED_TIME))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let metrics = MetricsRegistry::new();
    let sched = scheduler(store, &server.uri(), metrics.clone());
    sched.start().await.unwrap();

    let received = wait_for_requests(&server, 1).await;
    sched.stop().await;

    assert!(!received.is_empty(), "timer never fired");
    let scheduled: i64 = received[0]
        .headers
        .get(headers::CRON_SCHEDULED_TIME)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap();
    assert!((scheduled - Utc::now().timestamp()).abs() < 10);
    assert!(metrics.counter(names::CRON_TRIGGERS_TOTAL).get() >= 1);
    assert_eq!(metrics.counter(names::CRON_TRIGGER_FAILURES_TOTAL).get(), 0);
}

#[tokio::test]
async fn rejected_trigger_is_counted_and_timer_survives() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let function = store
        .create_function(NewFunction::named("flaky").with_cron("* * * * * *"))
        .await
        .unwrap();
    let metrics = MetricsRegistry::new();
    let sched = scheduler(store, &server.uri(), metrics.clone());
    sched.start().await.unwrap();

    wait_for_requests(&server, 1).await;
    for _ in 0..20 {
        if metrics.counter(names::CRON_TRIGGER_FAILURES_TOTAL).get() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(metrics.counter(names::CRON_TRIGGER_FAILURES_TOTAL).get() >= 1);
    assert!(sched.is_registered(function.id).await);
    sched.stop().await;
}

#[tokio::test]
async fn refresh_after_stop_installs_nothing() {
    let store = Arc::new(MemoryStore::new());
    let function = store
        .create_function(NewFunction::named("late").with_cron("*/5 * * * *"))
        .await
        .unwrap();
    let sched = scheduler(store, "http://127.0.0.1:9", MetricsRegistry::new());
    sched.stop().await;

    assert!(!sched.refresh_function(function.id).await.unwrap());
}

#[tokio::test]
async fn sweep_deletes_only_past_retention() {
    let store = Arc::new(MemoryStore::new());
    let mut short = NewFunction::named("short");
    short.retention_days = Some(RetentionDays::new(7).unwrap());
    let short = store.create_function(short).await.unwrap();
    let mut long = NewFunction::named("long");
    long.retention_days = Some(RetentionDays::new(30).unwrap());
    let long = store.create_function(long).await.unwrap();
    let unbounded = store.create_function(NewFunction::named("unbounded")).await.unwrap();

    for function in [&short, &long, &unbounded] {
        let version = store
            .create_version(function.id, "null".into(), None)
            .await
            .unwrap();
        for _ in 0..2 {
            store
                .create_execution(NewExecution {
                    id: ExecutionId::v4(),
                    function_id: function.id,
                    version_id: version.id,
                    trigger: Trigger::Http,
                    event_json: None,
                })
                .await
                .unwrap();
        }
    }

    let metrics = MetricsRegistry::new();
    let sweeper = RetentionSweeper::new(store.clone(), metrics.clone(), None, Duration::from_secs(60));
    let deleted = sweeper
        .sweep_once(Utc::now() + chrono::Duration::days(8))
        .await
        .unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(metrics.counter(names::RETENTION_DELETED_TOTAL).get(), 2);
    let remaining = |id| store.list_executions(id, Pagination::default());
    assert_eq!(remaining(short.id).await.unwrap().total, 0);
    assert_eq!(remaining(long.id).await.unwrap().total, 2);
    assert_eq!(remaining(unbounded.id).await.unwrap().total, 2);
}

#[tokio::test]
async fn default_retention_applies_to_unset_functions() {
    let store = Arc::new(MemoryStore::new());
    let function = store.create_function(NewFunction::named("f")).await.unwrap();
    let version = store
        .create_version(function.id, "null".into(), None)
        .await
        .unwrap();
    store
        .create_execution(NewExecution {
            id: ExecutionId::v4(),
            function_id: function.id,
            version_id: version.id,
            trigger: Trigger::Cron,
            event_json: None,
        })
        .await
        .unwrap();

    let sweeper = RetentionSweeper::new(
        store.clone(),
        MetricsRegistry::new(),
        Some(RetentionDays::new(15).unwrap()),
        Duration::from_secs(60),
    );
    assert_eq!(sweeper.sweep_once(Utc::now() + chrono::Duration::days(14)).await.unwrap(), 0);
    assert_eq!(sweeper.sweep_once(Utc::now() + chrono::Duration::days(16)).await.unwrap(), 1);
}

#[tokio::test]
async fn spawned_sweeper_stops_on_cancel() {
    let store = Arc::new(MemoryStore::new());
    let cancel = tokio_util::sync::CancellationToken::new();
    let handle = RetentionSweeper::new(store, MetricsRegistry::new(), None, Duration::from_millis(10))
        .spawn(cancel.clone());
    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}

/// Store whose next `get_function`, once armed, reads the row and then
/// parks until released, so the caller holds a snapshot that goes stale.
#[derive(Default)]
struct GatedStore {
    inner: MemoryStore,
    armed: AtomicBool,
    parked: Notify,
    release: Notify,
}

#[async_trait]
impl FunctionRepo for GatedStore {
    async fn create_function(&self, new: NewFunction) -> Result<Function, StoreError> {
        self.inner.create_function(new).await
    }
    async fn get_function(&self, id: FunctionId) -> Result<Function, StoreError> {
        let read = self.inner.get_function(id).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.parked.notify_one();
            self.release.notified().await;
        }
        read
    }
    async fn list_functions(&self, page: Pagination) -> Result<Page<Function>, StoreError> {
        self.inner.list_functions(page).await
    }
    async fn update_function(
        &self,
        id: FunctionId,
        patch: FunctionPatch,
    ) -> Result<Function, StoreError> {
        self.inner.update_function(id, patch).await
    }
    async fn delete_function(&self, id: FunctionId) -> Result<(), StoreError> {
        self.inner.delete_function(id).await
    }
    async fn list_functions_with_active_cron(&self) -> Result<Vec<Function>, StoreError> {
        self.inner.list_functions_with_active_cron().await
    }
}

#[async_trait]
impl VersionRepo for GatedStore {
    async fn create_version(
        &self,
        function_id: FunctionId,
        code: String,
        created_by: Option<String>,
    ) -> Result<FunctionVersion, StoreError> {
        self.inner.create_version(function_id, code, created_by).await
    }
    async fn get_version(
        &self,
        function_id: FunctionId,
        version: u32,
    ) -> Result<FunctionVersion, StoreError> {
        self.inner.get_version(function_id, version).await
    }
    async fn get_version_by_id(&self, id: VersionId) -> Result<FunctionVersion, StoreError> {
        self.inner.get_version_by_id(id).await
    }
    async fn list_versions(
        &self,
        function_id: FunctionId,
        page: Pagination,
    ) -> Result<Page<FunctionVersion>, StoreError> {
        self.inner.list_versions(function_id, page).await
    }
    async fn get_active_version(
        &self,
        function_id: FunctionId,
    ) -> Result<FunctionVersion, StoreError> {
        self.inner.get_active_version(function_id).await
    }
    async fn activate_version(&self, id: VersionId) -> Result<FunctionVersion, StoreError> {
        self.inner.activate_version(id).await
    }
    async fn delete_version(&self, id: VersionId) -> Result<(), StoreError> {
        self.inner.delete_version(id).await
    }
}

#[async_trait]
impl ExecutionRepo for GatedStore {
    async fn create_execution(&self, new: NewExecution) -> Result<Execution, StoreError> {
        self.inner.create_execution(new).await
    }
    async fn get_execution(&self, id: ExecutionId) -> Result<Execution, StoreError> {
        self.inner.get_execution(id).await
    }
    async fn update_execution(
        &self,
        id: ExecutionId,
        update: ExecutionUpdate,
    ) -> Result<Execution, StoreError> {
        self.inner.update_execution(id, update).await
    }
    async fn list_executions(
        &self,
        function_id: FunctionId,
        page: Pagination,
    ) -> Result<Page<Execution>, StoreError> {
        self.inner.list_executions(function_id, page).await
    }
    async fn delete_old_executions(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.delete_old_executions(before).await
    }
    async fn delete_function_executions_before(
        &self,
        function_id: FunctionId,
        before: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.inner
            .delete_function_executions_before(function_id, before)
            .await
    }
}

#[async_trait]
impl Store for GatedStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn overlapping_refreshes_settle_on_the_latest_state() {
    let store = Arc::new(GatedStore::default());
    let function = store
        .create_function(NewFunction::named("every-five").with_cron("*/5 * * * *"))
        .await
        .unwrap();
    let sched = Arc::new(scheduler(
        store.clone(),
        "http://127.0.0.1:9",
        MetricsRegistry::new(),
    ));
    assert!(sched.refresh_function(function.id).await.unwrap());

    // First refresh reads the still-active row and parks.
    store.armed.store(true, Ordering::SeqCst);
    let first = tokio::spawn({
        let sched = Arc::clone(&sched);
        async move { sched.refresh_function(function.id).await }
    });
    store.parked.notified().await;

    // The schedule is paused and a second refresh starts meanwhile.
    store
        .update_function(
            function.id,
            FunctionPatch {
                cron_status: Some(CronStatus::Paused),
                ..FunctionPatch::default()
            },
        )
        .await
        .unwrap();
    let second = tokio::spawn({
        let sched = Arc::clone(&sched);
        async move { sched.refresh_function(function.id).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    store.release.notify_one();
    first.await.unwrap().unwrap();
    assert!(!second.await.unwrap().unwrap());

    assert!(!sched.is_registered(function.id).await);
    sched.stop().await;
}

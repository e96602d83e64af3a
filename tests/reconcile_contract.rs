//! End-to-end contract tests for the reconciliation engine, driven through
//! the public API with a scripted remote control plane and an in-memory
//! credential store. No cluster required: the engine returns the status to
//! persist instead of writing it itself.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use nimbus_cloud_operator::crd::{
    ConditionType, Database, DatabaseSpec, ResourceStatus, Stream, StreamSpec,
};
use nimbus_cloud_operator::engine::{
    status, CreateStrategy, PollPolicy, ReconciliationEngine, ResourceAdapter,
};
use nimbus_cloud_operator::error::Error;
use nimbus_cloud_operator::remote::{
    InstanceSummary, LifecycleState, RemoteApi, RemoteError, RemoteInstance,
};
use nimbus_cloud_operator::secrets::{CredentialData, CredentialStore};

// ---- scripted remote control plane ----

#[derive(Debug, Clone)]
struct MockInstance {
    id: String,
    state: LifecycleState,
    node_count: Option<i32>,
    has_credentials: bool,
}

impl MockInstance {
    fn new(id: &str, state: LifecycleState) -> Self {
        Self {
            id: id.to_string(),
            state,
            node_count: Some(2),
            has_credentials: false,
        }
    }

    fn with_node_count(mut self, count: i32) -> Self {
        self.node_count = Some(count);
        self
    }

    fn with_credentials(mut self) -> Self {
        self.has_credentials = true;
        self
    }
}

impl RemoteInstance for MockInstance {
    fn id(&self) -> &str {
        &self.id
    }
    fn lifecycle_state(&self) -> LifecycleState {
        self.state
    }
}

/// One scripted response.
enum Script<T> {
    Give(T),
    NotFound,
    Reject(&'static str, &'static str),
    Fail,
}

impl<T> Script<T> {
    fn into_result(self) -> Result<T, RemoteError> {
        match self {
            Script::Give(value) => Ok(value),
            Script::NotFound => Err(RemoteError::NotFound("scripted".into())),
            Script::Reject(code, message) => Err(RemoteError::BadRequest {
                code: code.into(),
                message: message.into(),
            }),
            Script::Fail => Err(RemoteError::Transport(anyhow::anyhow!("connection reset"))),
        }
    }
}

#[derive(Default)]
struct Calls {
    create: AtomicU32,
    get: AtomicU32,
    list: AtomicU32,
    update: AtomicU32,
    delete: AtomicU32,
}

#[derive(Default)]
struct Inner {
    calls: Calls,
    gets: Mutex<VecDeque<Script<MockInstance>>>,
    lists: Mutex<VecDeque<Script<Vec<InstanceSummary>>>>,
    creates: Mutex<VecDeque<Script<MockInstance>>>,
    updates: Mutex<VecDeque<Script<()>>>,
    deletes: Mutex<VecDeque<Script<()>>>,
}

#[derive(Clone, Default)]
struct MockApi {
    inner: Arc<Inner>,
}

impl MockApi {
    fn on_get(&self, script: Script<MockInstance>) -> &Self {
        self.inner.gets.lock().unwrap().push_back(script);
        self
    }
    fn on_list(&self, script: Script<Vec<InstanceSummary>>) -> &Self {
        self.inner.lists.lock().unwrap().push_back(script);
        self
    }
    fn on_create(&self, script: Script<MockInstance>) -> &Self {
        self.inner.creates.lock().unwrap().push_back(script);
        self
    }
    fn on_update(&self, script: Script<()>) -> &Self {
        self.inner.updates.lock().unwrap().push_back(script);
        self
    }
    fn on_delete(&self, script: Script<()>) -> &Self {
        self.inner.deletes.lock().unwrap().push_back(script);
        self
    }

    fn calls(&self) -> &Calls {
        &self.inner.calls
    }
}

fn next<T>(queue: &Mutex<VecDeque<Script<T>>>, op: &str) -> Result<T, RemoteError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| panic!("unexpected remote {op} call"))
        .into_result()
}

#[async_trait]
impl RemoteApi for MockApi {
    type CreateRequest = ();
    type UpdatePatch = i32;
    type Instance = MockInstance;

    async fn create(&self, _request: &()) -> Result<MockInstance, RemoteError> {
        self.inner.calls.create.fetch_add(1, Ordering::SeqCst);
        next(&self.inner.creates, "create")
    }

    async fn get(&self, _id: &str) -> Result<MockInstance, RemoteError> {
        self.inner.calls.get.fetch_add(1, Ordering::SeqCst);
        next(&self.inner.gets, "get")
    }

    async fn list(
        &self,
        _scope: &str,
        _display_name: &str,
        _limit: u32,
    ) -> Result<Vec<InstanceSummary>, RemoteError> {
        self.inner.calls.list.fetch_add(1, Ordering::SeqCst);
        next(&self.inner.lists, "list")
    }

    async fn update(&self, _id: &str, _patch: &i32) -> Result<(), RemoteError> {
        self.inner.calls.update.fetch_add(1, Ordering::SeqCst);
        next(&self.inner.updates, "update")
    }

    async fn delete(&self, _id: &str) -> Result<(), RemoteError> {
        self.inner.calls.delete.fetch_add(1, Ordering::SeqCst);
        next(&self.inner.deletes, "delete")
    }
}

// ---- in-memory credential store ----

#[derive(Default)]
struct MemoryStore {
    published: Mutex<Vec<(String, String)>>,
    removed: Mutex<Vec<(String, String)>>,
    fail_remove: bool,
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn publish(
        &self,
        name: &str,
        namespace: &str,
        _data: &CredentialData,
    ) -> Result<(), Error> {
        self.published
            .lock()
            .unwrap()
            .push((name.to_string(), namespace.to_string()));
        Ok(())
    }

    async fn remove(&self, name: &str, namespace: &str) -> Result<(), Error> {
        if self.fail_remove {
            return Err(Error::UnexpectedKind { expected: "Secret" });
        }
        self.removed
            .lock()
            .unwrap()
            .push((name.to_string(), namespace.to_string()));
        Ok(())
    }
}

// ---- adapters under test ----

/// Requeue-after-create kind, publishes credentials once Active.
struct TestAdapter;

impl ResourceAdapter for TestAdapter {
    type Resource = Database;
    type Api = MockApi;

    const KIND: &'static str = "Database";

    fn bound_id(&self, obj: &Database) -> Option<String> {
        obj.spec.bound_id.clone()
    }
    fn scope<'a>(&self, obj: &'a Database) -> &'a str {
        &obj.spec.scope
    }
    fn display_name<'a>(&self, obj: &'a Database) -> &'a str {
        &obj.spec.display_name
    }
    fn status<'a>(&self, obj: &'a Database) -> Option<&'a ResourceStatus> {
        obj.status.as_ref()
    }
    fn build_create_request(&self, _obj: &Database) {}

    fn plan_update(&self, current: &MockInstance, desired: &Database) -> Option<i32> {
        let want = desired.spec.node_count?;
        (current.node_count != Some(want)).then_some(want)
    }

    fn connection_credentials(&self, instance: &MockInstance) -> Option<CredentialData> {
        if !instance.has_credentials {
            return None;
        }
        let mut data = CredentialData::new();
        data.push("password", "s3cr3t");
        Some(data)
    }
}

/// Poll-in-pass kind with confirmed deletion.
struct PollingAdapter;

impl ResourceAdapter for PollingAdapter {
    type Resource = Stream;
    type Api = MockApi;

    const KIND: &'static str = "Stream";

    fn bound_id(&self, obj: &Stream) -> Option<String> {
        obj.spec.bound_id.clone()
    }
    fn scope<'a>(&self, obj: &'a Stream) -> &'a str {
        &obj.spec.scope
    }
    fn display_name<'a>(&self, obj: &'a Stream) -> &'a str {
        &obj.spec.display_name
    }
    fn status<'a>(&self, obj: &'a Stream) -> Option<&'a ResourceStatus> {
        obj.status.as_ref()
    }
    fn build_create_request(&self, _obj: &Stream) {}

    fn plan_update(&self, _current: &MockInstance, _desired: &Stream) -> Option<i32> {
        None
    }

    fn create_strategy(&self) -> CreateStrategy {
        CreateStrategy::AwaitStable(PollPolicy::fixed(Duration::from_secs(1), 10))
    }

    fn confirm_delete(&self) -> bool {
        true
    }
}

// ---- fixtures ----

fn database(bound_id: Option<&str>) -> Database {
    Database::new(
        "orders-db",
        DatabaseSpec {
            bound_id: bound_id.map(str::to_string),
            scope: "scope.prod.eu".into(),
            display_name: "orders-db".into(),
            node_count: Some(2),
            memory_gbs: None,
            software_version: None,
            availability_domain: None,
            freeform_tags: None,
        },
    )
}

fn stream() -> Stream {
    Stream::new(
        "clickstream",
        StreamSpec {
            bound_id: None,
            scope: "scope.prod.eu".into(),
            display_name: "clickstream".into(),
            partitions: None,
            retention_hours: None,
            freeform_tags: None,
        },
    )
}

fn engine(api: &MockApi) -> ReconciliationEngine<TestAdapter> {
    ReconciliationEngine::new(TestAdapter, api.clone(), Arc::new(MemoryStore::default()))
}

fn polling_engine(api: &MockApi) -> ReconciliationEngine<PollingAdapter> {
    ReconciliationEngine::new(PollingAdapter, api.clone(), Arc::new(MemoryStore::default()))
}

fn last_condition(status: &ResourceStatus) -> ConditionType {
    status.latest_condition().expect("no conditions").r#type
}

// ---- create/update path ----

#[tokio::test]
async fn bound_id_binds_directly_without_discovery() {
    let api = MockApi::default();
    api.on_get(Script::Give(MockInstance::new("db-9", LifecycleState::Active)));

    let result = engine(&api)
        .create_or_update(&database(Some("db-9")))
        .await
        .unwrap();

    assert_eq!(api.calls().list.load(Ordering::SeqCst), 0);
    assert!(result.outcome.successful);
    assert_eq!(result.status.remote_id.as_deref(), Some("db-9"));
    assert!(result.status.created_at.is_some());
    assert_eq!(last_condition(&result.status), ConditionType::Active);
}

#[tokio::test]
async fn recorded_remote_id_takes_precedence_over_discovery() {
    let api = MockApi::default();
    api.on_get(Script::Give(MockInstance::new("db-1", LifecycleState::Active)));

    let mut obj = database(None);
    obj.status = Some(ResourceStatus {
        remote_id: Some("db-1".into()),
        created_at: Some("2026-08-01T00:00:00+00:00".into()),
        conditions: vec![],
    });

    let result = engine(&api).create_or_update(&obj).await.unwrap();

    assert_eq!(api.calls().list.load(Ordering::SeqCst), 0);
    assert_eq!(api.calls().create.load(Ordering::SeqCst), 0);
    assert_eq!(result.status.remote_id.as_deref(), Some("db-1"));
    // createdAt is set once and kept
    assert_eq!(
        result.status.created_at.as_deref(),
        Some("2026-08-01T00:00:00+00:00")
    );
}

#[tokio::test]
async fn converged_resource_reconciles_to_an_identical_status() {
    let api = MockApi::default();
    api.on_get(Script::Give(MockInstance::new("db-1", LifecycleState::Active)));

    // Status as a previous pass would have left it.
    let mut before = ResourceStatus {
        remote_id: Some("db-1".into()),
        created_at: Some("2026-08-01T00:00:00+00:00".into()),
        conditions: vec![],
    };
    status::project_lifecycle(&mut before, LifecycleState::Active);

    let mut obj = database(None);
    obj.status = Some(before.clone());

    let result = engine(&api).create_or_update(&obj).await.unwrap();

    assert_eq!(api.calls().update.load(Ordering::SeqCst), 0);
    assert!(result.outcome.successful);
    // Identical status means the controller skips the patch entirely.
    assert_eq!(result.status, before);
}

#[tokio::test]
async fn discovery_finds_an_existing_instance_by_name() {
    let api = MockApi::default();
    api.on_list(Script::Give(vec![InstanceSummary {
        id: "db-7".into(),
        lifecycle_state: LifecycleState::Active,
    }]));
    api.on_get(Script::Give(MockInstance::new("db-7", LifecycleState::Active)));

    let result = engine(&api).create_or_update(&database(None)).await.unwrap();

    assert_eq!(api.calls().create.load(Ordering::SeqCst), 0);
    assert_eq!(result.status.remote_id.as_deref(), Some("db-7"));
    assert!(result.outcome.successful);
}

#[tokio::test]
async fn create_then_requeue_records_the_id_and_projects_provisioning() {
    let api = MockApi::default();
    api.on_list(Script::Give(vec![]));
    api.on_create(Script::Give(MockInstance::new("db-new", LifecycleState::Creating)));

    let result = engine(&api).create_or_update(&database(None)).await.unwrap();

    // Requeue strategy: no in-pass polling
    assert_eq!(api.calls().get.load(Ordering::SeqCst), 0);
    assert!(!result.outcome.successful);
    assert_eq!(result.status.remote_id.as_deref(), Some("db-new"));
    assert!(result.status.created_at.is_some());
    assert_eq!(last_condition(&result.status), ConditionType::Provisioning);
}

#[tokio::test(start_paused = true)]
async fn await_stable_create_polls_until_active() {
    let api = MockApi::default();
    api.on_list(Script::Give(vec![]));
    api.on_create(Script::Give(MockInstance::new("st-1", LifecycleState::Creating)));
    api.on_get(Script::Give(MockInstance::new("st-1", LifecycleState::Creating)));
    api.on_get(Script::Give(MockInstance::new("st-1", LifecycleState::Active)));

    let result = polling_engine(&api).create_or_update(&stream()).await.unwrap();

    assert_eq!(api.calls().get.load(Ordering::SeqCst), 2);
    assert!(result.outcome.successful);
    assert_eq!(last_condition(&result.status), ConditionType::Active);
}

#[tokio::test]
async fn drift_triggers_one_update_and_a_refresh() {
    let api = MockApi::default();
    api.on_get(Script::Give(
        MockInstance::new("db-1", LifecycleState::Active).with_node_count(1),
    ));
    api.on_update(Script::Give(()));
    api.on_get(Script::Give(
        MockInstance::new("db-1", LifecycleState::Active).with_node_count(2),
    ));

    let result = engine(&api)
        .create_or_update(&database(Some("db-1")))
        .await
        .unwrap();

    assert_eq!(api.calls().update.load(Ordering::SeqCst), 1);
    assert_eq!(api.calls().get.load(Ordering::SeqCst), 2);
    assert!(result.outcome.successful);
}

#[tokio::test]
async fn transient_instance_is_observed_without_update() {
    let api = MockApi::default();
    api.on_get(Script::Give(
        MockInstance::new("db-1", LifecycleState::Creating).with_node_count(1),
    ));

    let result = engine(&api)
        .create_or_update(&database(Some("db-1")))
        .await
        .unwrap();

    // No drift planning against a non-Active instance
    assert_eq!(api.calls().update.load(Ordering::SeqCst), 0);
    assert!(!result.outcome.successful);
    assert_eq!(last_condition(&result.status), ConditionType::Provisioning);
}

// ---- error taxonomy ----

#[tokio::test]
async fn rejected_create_projects_failed_without_an_error() {
    let api = MockApi::default();
    api.on_list(Script::Give(vec![]));
    api.on_create(Script::Reject("InvalidParameter", "nodeCount out of range"));

    let result = engine(&api).create_or_update(&database(None)).await.unwrap();

    assert!(!result.outcome.successful);
    assert!(result.status.remote_id.is_none());
    let last = result.status.latest_condition().unwrap();
    assert_eq!(last.r#type, ConditionType::Failed);
    assert_eq!(last.reason.as_deref(), Some("InvalidParameter"));
}

#[tokio::test]
async fn transport_failure_on_create_propagates_as_an_error() {
    let api = MockApi::default();
    api.on_list(Script::Give(vec![]));
    api.on_create(Script::Fail);

    let err = engine(&api)
        .create_or_update(&database(None))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Remote(RemoteError::Transport(_))));
}

#[tokio::test]
async fn failed_lifecycle_is_terminal_not_an_error() {
    let api = MockApi::default();
    api.on_get(Script::Give(MockInstance::new("db-1", LifecycleState::Failed)));

    let result = engine(&api)
        .create_or_update(&database(Some("db-1")))
        .await
        .unwrap();

    assert!(!result.outcome.successful);
    assert_eq!(last_condition(&result.status), ConditionType::Failed);
}

#[tokio::test]
async fn wrong_kind_is_rejected_before_any_remote_call() {
    let api = MockApi::default();

    let err = engine(&api).reconcile_any(&stream()).await.unwrap_err();

    assert!(matches!(err, Error::UnexpectedKind { expected: "Database" }));
    assert_eq!(api.calls().get.load(Ordering::SeqCst), 0);
    assert_eq!(api.calls().list.load(Ordering::SeqCst), 0);
}

// ---- credentials ----

#[tokio::test]
async fn credentials_are_published_once_active() {
    let api = MockApi::default();
    api.on_get(Script::Give(
        MockInstance::new("db-1", LifecycleState::Active).with_credentials(),
    ));

    let store = Arc::new(MemoryStore::default());
    let engine = ReconciliationEngine::new(TestAdapter, api.clone(), store.clone());
    engine
        .create_or_update(&database(Some("db-1")))
        .await
        .unwrap();

    let published = store.published.lock().unwrap();
    assert_eq!(
        published.as_slice(),
        &[("orders-db-credentials".to_string(), "default".to_string())]
    );
}

// ---- deletion sequencer ----

#[tokio::test]
async fn deletion_without_a_recorded_id_is_a_noop() {
    let api = MockApi::default();

    let done = engine(&api).delete(&database(None)).await.unwrap();

    assert!(done);
    assert_eq!(api.calls().delete.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn deletion_treats_not_found_as_done_and_cleans_credentials() {
    let api = MockApi::default();
    api.on_delete(Script::NotFound);

    let mut obj = database(None);
    obj.status = Some(ResourceStatus {
        remote_id: Some("db-1".into()),
        created_at: None,
        conditions: vec![],
    });

    let store = Arc::new(MemoryStore::default());
    let engine = ReconciliationEngine::new(TestAdapter, api.clone(), store.clone());
    let done = engine.delete(&obj).await.unwrap();

    assert!(done);
    let removed = store.removed.lock().unwrap();
    assert_eq!(
        removed.as_slice(),
        &[("orders-db-credentials".to_string(), "default".to_string())]
    );
}

#[tokio::test]
async fn deletion_error_propagates_for_retry() {
    let api = MockApi::default();
    api.on_delete(Script::Fail);

    let mut obj = database(None);
    obj.status = Some(ResourceStatus {
        remote_id: Some("db-1".into()),
        created_at: None,
        conditions: vec![],
    });

    let err = engine(&api).delete(&obj).await.unwrap_err();
    assert!(matches!(err, Error::Remote(RemoteError::Transport(_))));
}

#[tokio::test]
async fn credential_cleanup_failure_never_blocks_deletion() {
    let api = MockApi::default();
    api.on_delete(Script::Give(()));

    let mut obj = database(None);
    obj.status = Some(ResourceStatus {
        remote_id: Some("db-1".into()),
        created_at: None,
        conditions: vec![],
    });

    let store = Arc::new(MemoryStore {
        fail_remove: true,
        ..Default::default()
    });
    let engine = ReconciliationEngine::new(TestAdapter, api.clone(), store);
    let done = engine.delete(&obj).await.unwrap();

    assert!(done);
}

#[tokio::test(start_paused = true)]
async fn confirmed_deletion_polls_until_the_instance_reports_deleting() {
    let api = MockApi::default();
    api.on_delete(Script::Give(()));
    api.on_get(Script::Give(MockInstance::new("st-1", LifecycleState::Active)));
    api.on_get(Script::Give(MockInstance::new("st-1", LifecycleState::Deleting)));

    let mut obj = stream();
    obj.status = Some(ResourceStatus {
        remote_id: Some("st-1".into()),
        created_at: None,
        conditions: vec![],
    });

    let done = polling_engine(&api).delete(&obj).await.unwrap();

    assert!(done);
    assert_eq!(api.calls().get.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn confirmed_deletion_accepts_a_404_as_gone() {
    let api = MockApi::default();
    api.on_delete(Script::Give(()));
    api.on_get(Script::NotFound);

    let mut obj = stream();
    obj.status = Some(ResourceStatus {
        remote_id: Some("st-1".into()),
        created_at: None,
        conditions: vec![],
    });

    let done = polling_engine(&api).delete(&obj).await.unwrap();
    assert!(done);
}

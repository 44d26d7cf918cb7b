//! Apply Executor
//!
//! Walks the change-set as a dependency-frontier scheduler: an entry
//! is dispatched once every scheduling predecessor has completed, and
//! independent branches run concurrently on tokio tasks bounded by a
//! semaphore. Each successful provider operation is committed to the
//! state store immediately, while the artifact lock is held, so a
//! mid-apply failure leaves the store reflecting exactly the subset of
//! changes that succeeded.
//!
//! A provider failure halts that entry's dependents (reported
//! `Skipped`, never attempted) but leaves independent branches
//! running. Cancellation is observed between node completions only:
//! in-flight provider calls finish, no new node is dispatched.
//!
//! The lock is renewed at half-ttl intervals for the duration of the
//! run; a failed renewal aborts the cycle before any further write.

use crate::change::{ApplyReport, ChangeEntry, ChangeKind, ChangeSet, NodeOutcome, NodeResult};
use crate::error::{EngineError, Result};
use crate::provider::{CreatedResource, ProviderRegistry, ResourceProvider};
use groundflow_core::{Address, AttrValue};
use groundflow_state::{LockManager, StateDocument, StateError, StateRecord, StateStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Cooperative cancellation flag for an apply run
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Maximum number of provider operations in flight
    pub parallelism: usize,

    /// Lock ttl; renewal happens at half this interval
    pub lock_ttl: Duration,

    /// Holder identity recorded in the lock
    pub holder: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            parallelism: 4,
            lock_ttl: Duration::from_secs(120),
            holder: default_holder(),
        }
    }
}

fn default_holder() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[derive(Clone)]
enum NodeStatus {
    Pending,
    Running,
    Done(NodeOutcome, Option<String>),
}

/// Successful provider operation output
enum OpOutput {
    Created(CreatedResource),
    Updated(BTreeMap<String, serde_json::Value>),
    Destroyed,
}

/// Change-set executor
pub struct Executor {
    registry: ProviderRegistry,
    store: Arc<dyn StateStore>,
    locks: Arc<dyn LockManager>,
    options: ExecutorOptions,
}

impl Executor {
    pub fn new(
        registry: ProviderRegistry,
        store: Arc<dyn StateStore>,
        locks: Arc<dyn LockManager>,
    ) -> Self {
        Self {
            registry,
            store,
            locks,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute the change-set against `artifact`
    ///
    /// Acquires the artifact lock for the whole run and releases it on
    /// completion or failure — except when the lock was lost, in which
    /// case it must not be touched.
    pub async fn apply(
        &self,
        artifact: &str,
        changeset: &ChangeSet,
        cancel: &CancelToken,
    ) -> Result<ApplyReport> {
        let started = Instant::now();

        let lock = self
            .locks
            .acquire(artifact, &self.options.holder, self.options.lock_ttl)
            .await?;
        tracing::info!(artifact, holder = %lock.holder, entries = changeset.entries.len(), "Apply started");

        let lock = Arc::new(tokio::sync::Mutex::new(lock));
        let lost = Arc::new(AtomicBool::new(false));

        // 半ttl間隔でロックを更新し続ける
        let renewer = {
            let locks = self.locks.clone();
            let lock = lock.clone();
            let lost = lost.clone();
            let ttl = self.options.lock_ttl;
            let artifact = artifact.to_string();
            tokio::spawn(async move {
                let period = (ttl / 2).max(Duration::from_millis(100));
                let mut interval = tokio::time::interval(period);
                interval.tick().await; // 最初のtickは即時
                loop {
                    interval.tick().await;
                    let mut guard = lock.lock().await;
                    if let Err(e) = locks.renew(&mut guard, ttl).await {
                        tracing::error!(artifact, error = %e, "Lock renewal failed, treating lock as lost");
                        lost.store(true, Ordering::SeqCst);
                        return;
                    }
                    tracing::debug!(artifact, "Lock renewed");
                }
            })
        };

        let run = self.run(artifact, changeset, cancel, &lost).await;

        renewer.abort();
        let _ = renewer.await;
        if !lost.load(Ordering::SeqCst)
            && let Ok(mutex) = Arc::try_unwrap(lock)
        {
            self.locks.release(mutex.into_inner()).await?;
        }

        let results = run?;
        let report = ApplyReport::new(results, started.elapsed().as_millis() as u64);
        tracing::info!(
            artifact,
            applied = report.count(NodeOutcome::Applied),
            failed = report.count(NodeOutcome::Failed),
            skipped = report.count(NodeOutcome::Skipped),
            duration_ms = report.duration_ms,
            "Apply finished"
        );
        Ok(report)
    }

    async fn run(
        &self,
        artifact: &str,
        changeset: &ChangeSet,
        cancel: &CancelToken,
        lost: &AtomicBool,
    ) -> Result<Vec<NodeResult>> {
        let entries = &changeset.entries;
        let n = entries.len();

        let index: HashMap<Address, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.address.clone(), i))
            .collect();

        let mut predecessors_remaining = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, entry) in entries.iter().enumerate() {
            for pred in &entry.sequence_after {
                if let Some(&p) = index.get(pred) {
                    successors[p].push(i);
                    predecessors_remaining[i] += 1;
                }
            }
        }

        let mut doc = self.store.read(artifact).await?;
        if doc.serial != changeset.state_serial {
            return Err(EngineError::StalePlan {
                planned: changeset.state_serial,
                actual: doc.serial,
            });
        }
        let mut serial = doc.serial;

        let semaphore = Arc::new(Semaphore::new(self.options.parallelism.max(1)));
        let mut tasks: JoinSet<(usize, std::result::Result<OpOutput, String>)> = JoinSet::new();
        let mut status: Vec<NodeStatus> = vec![NodeStatus::Pending; n];

        loop {
            if lost.load(Ordering::SeqCst) {
                return Err(StateError::LockLost(artifact.to_string()).into());
            }

            // Dispatch every ready entry
            for i in 0..n {
                if !matches!(status[i], NodeStatus::Pending) || predecessors_remaining[i] != 0 {
                    continue;
                }
                let entry = &entries[i];

                if cancel.is_cancelled() {
                    status[i] =
                        NodeStatus::Done(NodeOutcome::Skipped, Some("cancelled".to_string()));
                    for &s in &successors[i] {
                        predecessors_remaining[s] -= 1;
                    }
                    continue;
                }

                if entry.kind == ChangeKind::NoOp {
                    status[i] = NodeStatus::Done(NodeOutcome::NoOp, None);
                    for &s in &successors[i] {
                        predecessors_remaining[s] -= 1;
                    }
                    continue;
                }

                let provider = match self.registry.get(&entry.provider) {
                    Ok(provider) => provider.clone(),
                    Err(e) => {
                        status[i] = NodeStatus::Done(NodeOutcome::Failed, Some(e.to_string()));
                        skip_dependents(i, entries, &successors, &mut status);
                        continue;
                    }
                };

                // References resolve against committed state; every
                // predecessor of this entry has already been applied.
                let resolved = match &entry.desired {
                    Some(desired) => match resolve_attributes(&entry.address, desired, &doc) {
                        Ok(attrs) => Some(attrs),
                        Err(message) => {
                            status[i] = NodeStatus::Done(NodeOutcome::Failed, Some(message));
                            skip_dependents(i, entries, &successors, &mut status);
                            continue;
                        }
                    },
                    None => None,
                };

                tracing::debug!(address = %entry.address, kind = %entry.kind, "Dispatching");
                status[i] = NodeStatus::Running;
                let semaphore = semaphore.clone();
                let kind = entry.kind;
                let address = entry.address.clone();
                let provider_id = entry.provider_id.clone();
                tasks.spawn(async move {
                    let result =
                        execute_entry(provider, semaphore, kind, address, provider_id, resolved)
                            .await;
                    (i, result)
                });
            }

            if status
                .iter()
                .all(|s| matches!(s, NodeStatus::Done(_, _)))
            {
                break;
            }

            let Some(joined) = tasks.join_next().await else {
                // 失敗の連鎖で前進できないノードが残った場合
                for s in status.iter_mut() {
                    if !matches!(s, NodeStatus::Done(_, _)) {
                        *s = NodeStatus::Done(
                            NodeOutcome::Skipped,
                            Some("blocked by failed dependency".to_string()),
                        );
                    }
                }
                break;
            };

            let (i, result) =
                joined.map_err(|e| EngineError::Provider(format!("worker task failed: {e}")))?;

            // ロック喪失後は一切書き込まない
            if lost.load(Ordering::SeqCst) {
                return Err(StateError::LockLost(artifact.to_string()).into());
            }

            match result {
                Ok(op) => {
                    apply_to_document(&mut doc, &entries[i], op);
                    serial = self.store.write(artifact, &doc, serial).await?;
                    doc.serial = serial;
                    status[i] = NodeStatus::Done(NodeOutcome::Applied, None);
                    for &s in &successors[i] {
                        predecessors_remaining[s] -= 1;
                    }
                    tracing::info!(address = %entries[i].address, kind = %entries[i].kind, "Applied");
                }
                Err(message) => {
                    tracing::warn!(address = %entries[i].address, error = %message, "Provider operation failed");
                    status[i] = NodeStatus::Done(NodeOutcome::Failed, Some(message));
                    skip_dependents(i, entries, &successors, &mut status);
                }
            }
        }

        Ok(entries
            .iter()
            .zip(status)
            .map(|(entry, s)| {
                let (outcome, message) = match s {
                    NodeStatus::Done(outcome, message) => (outcome, message),
                    _ => (NodeOutcome::Skipped, Some("not dispatched".to_string())),
                };
                NodeResult {
                    address: entry.address.clone(),
                    kind: entry.kind,
                    outcome,
                    message,
                }
            })
            .collect())
    }
}

/// Mark every transitive dependent of a failed entry as skipped
fn skip_dependents(
    failed: usize,
    entries: &[ChangeEntry],
    successors: &[Vec<usize>],
    status: &mut [NodeStatus],
) {
    let mut stack = vec![failed];
    while let Some(i) = stack.pop() {
        for &s in &successors[i] {
            if matches!(status[s], NodeStatus::Pending) {
                status[s] = NodeStatus::Done(
                    NodeOutcome::Skipped,
                    Some(format!("dependency {} failed", entries[i].address)),
                );
                stack.push(s);
            }
        }
    }
}

/// Resolve symbolic references against the committed state
fn resolve_attributes(
    address: &Address,
    desired: &BTreeMap<String, AttrValue>,
    doc: &StateDocument,
) -> std::result::Result<BTreeMap<String, serde_json::Value>, String> {
    let mut resolved = BTreeMap::new();
    for (name, value) in desired {
        let resolved_value = match value {
            AttrValue::Literal(v) => v.clone(),
            AttrValue::Reference { target, attr } => {
                let record = doc.get_record(&target.to_string()).ok_or_else(|| {
                    format!("reference {target}.{attr} of {address}: no state record for target")
                })?;
                record.get_attribute(attr).cloned().ok_or_else(|| {
                    format!("reference {target}.{attr} of {address}: attribute not present")
                })?
            }
        };
        resolved.insert(name.clone(), resolved_value);
    }
    Ok(resolved)
}

async fn execute_entry(
    provider: Arc<dyn ResourceProvider>,
    semaphore: Arc<Semaphore>,
    kind: ChangeKind,
    address: Address,
    provider_id: Option<String>,
    resolved: Option<BTreeMap<String, serde_json::Value>>,
) -> std::result::Result<OpOutput, String> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| e.to_string())?;

    match kind {
        ChangeKind::Create => {
            let attrs = resolved.ok_or_else(|| "missing desired attributes".to_string())?;
            let created = provider
                .create(&address, &attrs)
                .await
                .map_err(|e| e.to_string())?;
            Ok(OpOutput::Created(created))
        }
        ChangeKind::Update => {
            let attrs = resolved.ok_or_else(|| "missing desired attributes".to_string())?;
            let id = provider_id.ok_or_else(|| "no provider id in state".to_string())?;
            let updated = provider
                .update(&address, &id, &attrs)
                .await
                .map_err(|e| e.to_string())?;
            Ok(OpOutput::Updated(updated))
        }
        ChangeKind::Replace => {
            let attrs = resolved.ok_or_else(|| "missing desired attributes".to_string())?;
            // Destroy the old resource, then create its successor
            if let Some(id) = provider_id {
                provider
                    .destroy(&address, &id)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            let created = provider
                .create(&address, &attrs)
                .await
                .map_err(|e| e.to_string())?;
            Ok(OpOutput::Created(created))
        }
        ChangeKind::Destroy => {
            if let Some(id) = provider_id {
                provider
                    .destroy(&address, &id)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            Ok(OpOutput::Destroyed)
        }
        ChangeKind::NoOp => Err("no-op entry dispatched to a worker".to_string()),
    }
}

/// Commit a successful operation into the in-memory document
fn apply_to_document(doc: &mut StateDocument, entry: &ChangeEntry, op: OpOutput) {
    let address = entry.address.to_string();
    match op {
        OpOutput::Created(created) => {
            let mut record = StateRecord::new(&address)
                .with_provider(&entry.provider)
                .with_provider_id(&created.provider_id);
            record.attributes = created.attributes;
            record.dependencies = entry.depends_on.iter().map(|a| a.to_string()).collect();
            // Replaceの場合は最初の作成時刻を引き継ぐ
            if let Some(previous) = doc.get_record(&address) {
                record.created_at = previous.created_at;
            }
            doc.set_record(address, record);
        }
        OpOutput::Updated(attributes) => {
            let mut record = doc
                .get_record(&address)
                .cloned()
                .unwrap_or_else(|| StateRecord::new(&address));
            record.provider = entry.provider.clone();
            record.attributes = attributes;
            record.dependencies = entry.depends_on.iter().map(|a| a.to_string()).collect();
            record.updated_at = chrono::Utc::now();
            doc.set_record(address, record);
        }
        OpOutput::Destroyed => {
            doc.remove_record(&address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;
    use crate::planner::{plan, plan_destroy};
    use crate::testing::{MockProvider, manifest_and_graph, mock_provider};
    use groundflow_state::{MemoryLockManager, MemoryStateStore};

    const BASE: &str = r#"
provider "cmd" name="mock" {
    resource "vpc" {
        mutable "tags"
    }
}

resource "vpc" "main" {
    cidr_block "10.0.0.0/16"
    tags "base"
}

resource "subnet" "a" {
    vpc_id ref="vpc:main" attr="id"
    cidr_block "10.0.1.0/24"
}
"#;

    struct Harness {
        mock: Arc<MockProvider>,
        registry: ProviderRegistry,
        store: Arc<MemoryStateStore>,
        locks: Arc<MemoryLockManager>,
    }

    fn harness(manifest: &groundflow_core::Manifest) -> Harness {
        let mock = mock_provider(manifest, "mock");
        let mut registry = ProviderRegistry::new();
        registry.register(mock.clone());
        Harness {
            mock,
            registry,
            store: Arc::new(MemoryStateStore::new()),
            locks: Arc::new(MemoryLockManager::new()),
        }
    }

    fn executor(h: &Harness) -> Executor {
        Executor::new(h.registry.clone(), h.store.clone(), h.locks.clone())
    }

    #[tokio::test]
    async fn test_apply_creates_then_noop() {
        let (manifest, graph) = manifest_and_graph(BASE);
        let h = harness(&manifest);

        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();
        assert_eq!(
            changeset
                .entries
                .iter()
                .map(|e| e.kind)
                .collect::<Vec<_>>(),
            vec![ChangeKind::Create, ChangeKind::Create]
        );

        let report = executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();
        assert!(report.is_success());

        // 参照が解決されて保存されている
        let state = h.store.read("default").await.unwrap();
        let vpc_id = state
            .get_record("vpc:main")
            .unwrap()
            .get_attribute("id")
            .unwrap()
            .clone();
        assert_eq!(
            state
                .get_record("subnet:a")
                .unwrap()
                .get_attribute("vpc_id"),
            Some(&vpc_id)
        );

        // 同じ宣言での再プランは全てNoOp
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();
        assert!(!changeset.has_changes());
        let report = executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.count(NodeOutcome::NoOp), 2);
    }

    #[tokio::test]
    async fn test_failure_skips_dependents_and_writes_nothing() {
        let (manifest, graph) = manifest_and_graph(BASE);
        let h = harness(&manifest);
        h.mock.fail_on("vpc:main");

        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();
        let report = executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();

        use groundflow_core::Address;
        assert_eq!(
            report.outcome_of(&Address::new("vpc", "main")),
            Some(NodeOutcome::Failed)
        );
        assert_eq!(
            report.outcome_of(&Address::new("subnet", "a")),
            Some(NodeOutcome::Skipped)
        );

        // どちらのレコードも保存されていない
        let state = h.store.read("default").await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_independent_branch_continues_after_failure() {
        let kdl = r#"
provider "cmd" name="mock" { }

resource "vpc" "main" {
    cidr_block "10.0.0.0/16"
}

resource "subnet" "a" {
    vpc_id ref="vpc:main" attr="id"
}

resource "bucket" "logs" {
    name "my-logs"
}
"#;
        let (manifest, graph) = manifest_and_graph(kdl);
        let h = harness(&manifest);
        h.mock.fail_on("vpc:main");

        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();
        let report = executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();

        use groundflow_core::Address;
        assert_eq!(
            report.outcome_of(&Address::new("bucket", "logs")),
            Some(NodeOutcome::Applied)
        );

        let state = h.store.read("default").await.unwrap();
        assert!(state.get_record("bucket:logs").is_some());
        assert!(state.get_record("vpc:main").is_none());
    }

    #[tokio::test]
    async fn test_cancelled_run_dispatches_nothing() {
        let (manifest, graph) = manifest_and_graph(BASE);
        let h = harness(&manifest);

        let cancel = CancelToken::new();
        cancel.cancel();

        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();
        let report = executor(&h)
            .apply("default", &changeset, &cancel)
            .await
            .unwrap();

        assert_eq!(report.count(NodeOutcome::Skipped), 2);
        assert!(h.mock.calls().is_empty());
        assert!(h.store.read("default").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_rejected_while_locked() {
        let (manifest, graph) = manifest_and_graph(BASE);
        let h = harness(&manifest);

        let _held = h
            .locks
            .acquire("default", "someone-else", Duration::from_secs(60))
            .await
            .unwrap();

        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();
        let result = executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await;

        assert!(matches!(
            result,
            Err(EngineError::State(StateError::AlreadyLocked { .. }))
        ));
        assert!(h.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stale_plan_is_rejected() {
        let (manifest, graph) = manifest_and_graph(BASE);
        let h = harness(&manifest);

        let mut state = h.store.read("default").await.unwrap();
        state.serial = 5;
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();

        let result = executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await;
        assert!(matches!(result, Err(EngineError::StalePlan { .. })));
    }

    #[tokio::test]
    async fn test_update_only_touches_changed_resource() {
        let (manifest, graph) = manifest_and_graph(BASE);
        let h = harness(&manifest);

        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();
        executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();

        // tags は mutable なので update になる
        let changed = BASE.replace("tags \"base\"", "tags \"edge\"");
        let (manifest2, graph2) = manifest_and_graph(&changed);
        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest2, &graph2, &state, &h.registry).unwrap();
        assert_eq!(changeset.summary().update, 1);

        let report = executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();
        assert!(report.is_success());

        let calls = h.mock.calls();
        assert!(calls.contains(&"update vpc:main".to_string()));
        // subnet への呼び出しは最初の create のみ
        assert_eq!(
            calls.iter().filter(|c| c.contains("subnet:a")).count(),
            1
        );

        let state = h.store.read("default").await.unwrap();
        assert_eq!(
            state.get_record("vpc:main").unwrap().get_attribute("tags"),
            Some(&serde_json::json!("edge"))
        );
    }

    #[tokio::test]
    async fn test_replace_destroys_old_before_creating_new() {
        let (manifest, graph) = manifest_and_graph(BASE);
        let h = harness(&manifest);

        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();
        executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();

        let calls_before = h.mock.calls().len();

        let changed = BASE.replace("10.0.0.0/16", "172.16.0.0/16");
        let (manifest2, graph2) = manifest_and_graph(&changed);
        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest2, &graph2, &state, &h.registry).unwrap();
        assert_eq!(changeset.summary().replace, 2);

        let report = executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();
        assert!(report.is_success());

        // 2回目の apply の呼び出し列のみを見る
        let calls: Vec<String> = h.mock.calls().split_off(calls_before);
        let pos = |needle: &str| calls.iter().position(|c| c == needle).unwrap();
        // 旧リソースの破棄 → 新リソースの作成、vpc が subnet より先
        assert!(pos("destroy vpc:main") < pos("create vpc:main"));
        assert!(pos("create vpc:main") < pos("create subnet:a"));

        // subnet は新しい vpc の id を参照している
        let state = h.store.read("default").await.unwrap();
        let vpc_id = state
            .get_record("vpc:main")
            .unwrap()
            .get_attribute("id")
            .unwrap()
            .clone();
        assert_eq!(
            state
                .get_record("subnet:a")
                .unwrap()
                .get_attribute("vpc_id"),
            Some(&vpc_id)
        );
    }

    #[tokio::test]
    async fn test_destroy_plan_empties_state() {
        let (manifest, graph) = manifest_and_graph(BASE);
        let h = harness(&manifest);

        let state = h.store.read("default").await.unwrap();
        let changeset = plan(&manifest, &graph, &state, &h.registry).unwrap();
        executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();

        let state = h.store.read("default").await.unwrap();
        let changeset = plan_destroy(&state, &h.registry).unwrap();
        let report = executor(&h)
            .apply("default", &changeset, &CancelToken::new())
            .await
            .unwrap();
        assert!(report.is_success());

        let state = h.store.read("default").await.unwrap();
        assert!(state.is_empty());

        // 依存元の subnet が先に破棄される
        let calls = h.mock.calls();
        let destroy_subnet = calls
            .iter()
            .position(|c| c == "destroy subnet:a")
            .unwrap();
        let destroy_vpc = calls.iter().position(|c| c == "destroy vpc:main").unwrap();
        assert!(destroy_subnet < destroy_vpc);
    }
}

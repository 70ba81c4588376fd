//! Pipeline - セッション全体のコンテキスト
//!
//! `Pipeline` owns everything one session needs: the three task stores, the
//! wallet module registry and the stage scheduler, all behind a single
//! async mutex. Every entry point (submit / execute / toggle / discard) and
//! every scheduled transition goes through that lock, so the per-record
//! ordering holds no matter how many callers or drivers share the handle.
//!
//! Synthesizers run outside the lock. Prediction results are attached
//! before the record exists. Intent and wallet transaction synthesis runs
//! in a spawned task after the entry point has returned; its result rides
//! on the scheduled transition and is applied when that fires.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, broadcast, watch};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::domain::{
    Id, Intent, IntentId, IntentInput, IntentState, Kind, Lifecycle, ModuleId, ModuleRegistry,
    PipelineError, Prediction, PredictionId, PredictionInput, PredictionState, RoutePreview,
    StoreError, TaskEvent, TaskKind, TaskRecord, TaskRef, TransactionId, TransactionInput,
    TransactionKind, TransactionState, WalletModule, WalletTransaction,
};
use crate::impls::InMemoryTaskStore;
use crate::ports::{Clock, IdGenerator, ResultSynthesizer, RoutePlanner, Synthesis, TaskStore, next_id};

use super::scheduler::{StageScheduler, Transition};

/// One store per kind.
#[derive(Default)]
pub struct TaskStores {
    pub intents: InMemoryTaskStore<Intent>,
    pub predictions: InMemoryTaskStore<Prediction>,
    pub transactions: InMemoryTaskStore<WalletTransaction>,
}

/// Picks the store that holds records of kind `Self`.
pub trait StoredKind: TaskKind {
    fn store(stores: &TaskStores) -> &InMemoryTaskStore<Self>;
    fn store_mut(stores: &mut TaskStores) -> &mut InMemoryTaskStore<Self>;
}

impl StoredKind for Intent {
    fn store(stores: &TaskStores) -> &InMemoryTaskStore<Self> {
        &stores.intents
    }
    fn store_mut(stores: &mut TaskStores) -> &mut InMemoryTaskStore<Self> {
        &mut stores.intents
    }
}

impl StoredKind for Prediction {
    fn store(stores: &TaskStores) -> &InMemoryTaskStore<Self> {
        &stores.predictions
    }
    fn store_mut(stores: &mut TaskStores) -> &mut InMemoryTaskStore<Self> {
        &mut stores.predictions
    }
}

impl StoredKind for WalletTransaction {
    fn store(stores: &TaskStores) -> &InMemoryTaskStore<Self> {
        &stores.transactions
    }
    fn store_mut(stores: &mut TaskStores) -> &mut InMemoryTaskStore<Self> {
        &mut stores.transactions
    }
}

/// Result producers, one per kind, plus the intent route planner.
#[derive(Clone)]
pub struct Synthesizers {
    pub intent: Arc<dyn ResultSynthesizer<Intent>>,
    pub prediction: Arc<dyn ResultSynthesizer<Prediction>>,
    pub transaction: Arc<dyn ResultSynthesizer<WalletTransaction>>,
    pub route_planner: Arc<dyn RoutePlanner>,
}

/// Everything guarded by the pipeline lock.
#[derive(Default)]
struct PipelineState {
    stores: TaskStores,
    modules: ModuleRegistry,
    scheduler: StageScheduler,
}

impl PipelineState {
    fn apply(&mut self, transition: Transition, at: DateTime<Utc>) -> Result<Option<TaskEvent>, PipelineError> {
        match transition {
            Transition::FinishIntent { id, outcome } => {
                settle::<Intent>(&mut self.stores, id, outcome, IntentState::Completed, at).map(Some)
            }
            Transition::VerifyPrediction { id } => {
                advance::<Prediction>(&mut self.stores, id, PredictionState::Verified, at).map(Some)
            }
            Transition::SettleTransaction { id, outcome } => settle::<WalletTransaction>(
                &mut self.stores,
                id,
                outcome,
                TransactionState::Completed,
                at,
            )
            .map(Some),
            Transition::Expire { task } => match task {
                TaskRef::Intent(id) => expire::<Intent>(&mut self.stores, id, at),
                TaskRef::Prediction(id) => expire::<Prediction>(&mut self.stores, id, at),
                TaskRef::WalletTransaction(id) => {
                    expire::<WalletTransaction>(&mut self.stores, id, at)
                }
            },
        }
    }

    /// Terminal or gone: nothing left to schedule for it.
    fn is_settled(&self, task: TaskRef) -> bool {
        match task {
            TaskRef::Intent(id) => settled::<Intent>(&self.stores, id),
            TaskRef::Prediction(id) => settled::<Prediction>(&self.stores, id),
            TaskRef::WalletTransaction(id) => settled::<WalletTransaction>(&self.stores, id),
        }
    }

    fn remove(&mut self, task: TaskRef) -> bool {
        match task {
            TaskRef::Intent(id) => self.stores.intents.remove(id).is_some(),
            TaskRef::Prediction(id) => self.stores.predictions.remove(id).is_some(),
            TaskRef::WalletTransaction(id) => self.stores.transactions.remove(id).is_some(),
        }
    }
}

fn settled<K: StoredKind>(stores: &TaskStores, id: Id<K>) -> bool {
    K::store(stores).get(id).is_none_or(TaskRecord::is_terminal)
}

/// Attach the synthesized result and move to `success`, or fail with the
/// synthesizer's reason.
fn settle<K: StoredKind>(
    stores: &mut TaskStores,
    id: Id<K>,
    outcome: Synthesis<K::Output>,
    success: K::State,
    at: DateTime<Utc>,
) -> Result<TaskEvent, PipelineError> {
    let (from, to) = K::store_mut(stores).update(id, |record| -> Result<_, PipelineError> {
        let from = match outcome {
            Synthesis::Ready(output) => {
                record.attach_result(output)?;
                record.advance(success, at)?
            }
            Synthesis::Failed(reason) => record.fail(reason, at)?,
        };
        Ok((from, record.state()))
    })?;
    Ok(TaskEvent::transitioned(K::task_ref(id), from, to, at))
}

fn advance<K: StoredKind>(
    stores: &mut TaskStores,
    id: Id<K>,
    next: K::State,
    at: DateTime<Utc>,
) -> Result<TaskEvent, PipelineError> {
    let from = K::store_mut(stores).update(id, |record| -> Result<_, PipelineError> {
        Ok(record.advance(next, at)?)
    })?;
    Ok(TaskEvent::transitioned(K::task_ref(id), from, next, at))
}

fn expire<K: StoredKind>(
    stores: &mut TaskStores,
    id: Id<K>,
    at: DateTime<Utc>,
) -> Result<Option<TaskEvent>, PipelineError> {
    let store = K::store_mut(stores);
    let record = store.get(id).ok_or_else(|| StoreError::NotFound {
        kind: K::KIND,
        id: id.to_string(),
    })?;
    if record.is_terminal() {
        return Ok(None);
    }
    let from = store.update(id, |record| -> Result<_, PipelineError> {
        Ok(record.fail("timed out", at)?)
    })?;
    Ok(Some(TaskEvent::transitioned(
        K::task_ref(id),
        from,
        K::State::failed(),
        at,
    )))
}

/// Counts one background synthesis until dropped.
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn enter(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

fn after(at: DateTime<Utc>, delay: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| at.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Session context and the only way in for the presentation layer.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct Pipeline {
    state: Arc<Mutex<PipelineState>>,
    notify: Arc<Notify>,
    events: broadcast::Sender<TaskEvent>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    synthesizers: Synthesizers,
    config: Arc<PipelineConfig>,
    in_flight: Arc<watch::Sender<usize>>,
}

impl Pipeline {
    pub(crate) fn new(
        config: PipelineConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        synthesizers: Synthesizers,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        let (in_flight, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(PipelineState::default())),
            notify: Arc::new(Notify::new()),
            events,
            clock,
            ids,
            synthesizers,
            config: Arc::new(config),
            in_flight: Arc::new(in_flight),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Store change notifications. Events sent while nobody listens are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    pub(crate) fn wakeup(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    fn emit(&self, event: TaskEvent) {
        // 受信者がいなくてもエラーにしない
        let _ = self.events.send(event);
    }

    /// Store a new intent in `Pending`. Nothing is scheduled until
    /// `execute_intent`.
    pub async fn submit_intent(
        &self,
        description: &str,
        amount: &str,
        risk_level: Option<&str>,
    ) -> Result<IntentId, PipelineError> {
        let input = IntentInput::parse(description, amount, risk_level)?;
        let (id, initial, now) = {
            let mut state = self.state.lock().await;
            // id と時刻はロック内で採番する（挿入順 = 新しい順）
            let id: IntentId = next_id(self.ids.as_ref());
            let now = self.clock.now();
            let record = TaskRecord::new(id, input, now);
            let initial = record.state();
            state.stores.intents.insert(record)?;
            (id, initial, now)
        };

        info!(task_id = %id, kind = %Kind::Intent, "intent submitted");
        self.emit(TaskEvent::created(id, initial, now));
        Ok(id)
    }

    /// Route preview for a would-be intent. Creates no record.
    pub async fn simulate_intent(
        &self,
        description: &str,
        amount: &str,
    ) -> Result<RoutePreview, PipelineError> {
        let input = IntentInput::parse(description, amount, None)?;
        let preview = self.synthesizers.route_planner.plan(&input).await;
        debug!(route = %preview.route_summary(), apy = %preview.estimated_apy, "intent simulated");
        Ok(preview)
    }

    /// `Pending -> Executing` now, with the deadline armed. Returns without
    /// waiting for the synthesizer; completion (or failure) is scheduled
    /// once it answers.
    pub async fn execute_intent(&self, id: IntentId) -> Result<(), PipelineError> {
        let (started, from, input) = {
            let mut state = self.state.lock().await;
            let started = self.clock.now();
            let (from, input) = state.stores.intents.update(id, |record| -> Result<_, PipelineError> {
                let from = record.advance(IntentState::Executing, started)?;
                Ok((from, record.input.clone()))
            })?;
            state.scheduler.schedule(
                after(started, self.config.max_wait()),
                Transition::Expire { task: id.into() },
            );
            (started, from, input)
        };
        self.notify.notify_one();

        info!(task_id = %id, from = %from, to = %IntentState::Executing, "intent executing");
        self.emit(TaskEvent::transitioned(id, from, IntentState::Executing, started));

        let synthesizer = Arc::clone(&self.synthesizers.intent);
        self.spawn_synthesis(
            id.into(),
            async move { synthesizer.synthesize(&input).await },
            after(started, self.config.intent_execution_delay()),
            move |outcome| Transition::FinishIntent { id, outcome },
        );
        Ok(())
    }

    /// Synthesize first; only a successful synthesis produces a record, which
    /// starts out `Unverified` with its result and proof attached.
    pub async fn submit_prediction(
        &self,
        model: &str,
        fields: BTreeMap<String, String>,
    ) -> Result<PredictionId, PipelineError> {
        let input = PredictionInput::parse(model, fields)?;
        let model = input.model;

        let synthesis = self.synthesizers.prediction.synthesize(&input);
        let synthesis = tokio::time::timeout(self.config.max_wait(), synthesis)
            .await
            .unwrap_or_else(|_| Synthesis::Failed("timed out".to_string()));
        let outcome = match synthesis {
            Synthesis::Ready(outcome) => outcome,
            Synthesis::Failed(reason) => {
                warn!(%model, %reason, "prediction synthesis rejected");
                return Err(PipelineError::SynthesisFailed {
                    kind: Kind::Prediction,
                    reason,
                });
            }
        };

        let (id, now) = {
            let mut state = self.state.lock().await;
            let id: PredictionId = next_id(self.ids.as_ref());
            let now = self.clock.now();
            let mut record = TaskRecord::new(id, input, now);
            record.attach_result(outcome)?;
            record.advance(PredictionState::Unverified, now)?;

            state.stores.predictions.insert(record)?;
            state.scheduler.schedule(
                after(now, self.config.prediction_verification_delay()),
                Transition::VerifyPrediction { id },
            );
            state.scheduler.schedule(
                after(now, self.config.max_wait()),
                Transition::Expire { task: id.into() },
            );
            (id, now)
        };
        self.notify.notify_one();

        info!(task_id = %id, kind = %Kind::Prediction, %model, "prediction submitted");
        self.emit(TaskEvent::created(id, PredictionState::Unverified, now));
        Ok(id)
    }

    /// Returns the new enabled state.
    pub async fn toggle_wallet_module(&self, module: &str) -> Result<bool, PipelineError> {
        let module: ModuleId = module.parse()?;
        let enabled = self.state.lock().await.modules.toggle(module);
        info!(%module, enabled, "wallet module toggled");
        Ok(enabled)
    }

    pub async fn wallet_modules(&self) -> Vec<WalletModule> {
        self.state.lock().await.modules.list()
    }

    /// Gasless transactions require the gasless module; the check and the
    /// insert happen under the same lock. Returns as soon as the `Pending`
    /// record is stored.
    pub async fn submit_wallet_transaction(
        &self,
        kind: &str,
        amount: &str,
    ) -> Result<TransactionId, PipelineError> {
        let kind: TransactionKind = kind.parse()?;
        let input = TransactionInput::parse(kind, amount)?;

        let (id, initial, now) = {
            let mut state = self.state.lock().await;
            if let Some(module) = kind.required_module()
                && !state.modules.is_enabled(module)
            {
                return Err(PipelineError::FeatureDisabled { module });
            }
            let id: TransactionId = next_id(self.ids.as_ref());
            let now = self.clock.now();
            let record = TaskRecord::new(id, input.clone(), now);
            let initial = record.state();
            state.stores.transactions.insert(record)?;
            state.scheduler.schedule(
                after(now, self.config.max_wait()),
                Transition::Expire { task: id.into() },
            );
            (id, initial, now)
        };
        self.notify.notify_one();

        info!(task_id = %id, kind = %Kind::WalletTransaction, tx_kind = %kind, "wallet transaction submitted");
        self.emit(TaskEvent::created(id, initial, now));

        let synthesizer = Arc::clone(&self.synthesizers.transaction);
        self.spawn_synthesis(
            id.into(),
            async move { synthesizer.synthesize(&input).await },
            after(now, self.config.transaction_settlement_delay()),
            move |outcome| Transition::SettleTransaction { id, outcome },
        );
        Ok(id)
    }

    /// Run a synthesizer in the background. Its answer becomes
    /// `settle(outcome)`, scheduled at `fire_at` while the record is still
    /// in flight.
    fn spawn_synthesis<T, F, S>(&self, task: TaskRef, synthesis: F, fire_at: DateTime<Utc>, settle: S)
    where
        T: Send + 'static,
        F: Future<Output = Synthesis<T>> + Send + 'static,
        S: FnOnce(Synthesis<T>) -> Transition + Send + 'static,
    {
        let pipeline = self.clone();
        let guard = InFlight::enter(&self.in_flight);
        tokio::spawn(async move {
            let _guard = guard;
            if let Some(outcome) = pipeline.within_deadline(task, synthesis).await {
                pipeline.schedule_in_flight(fire_at, settle(outcome)).await;
            }
        });
    }

    /// Resolves once no background synthesis is running, i.e. every answer
    /// that arrived has had its transition scheduled.
    pub async fn wait_for_synthesis(&self) {
        let mut in_flight = self.in_flight.subscribe();
        // the sender lives in `self`, so this never sees a closed channel
        let _ = in_flight.wait_for(|n| *n == 0).await;
    }

    /// Wait for a synthesizer, but no longer than `max_wait`. A stalled
    /// synthesis is abandoned; the record's deadline takes it from there.
    async fn within_deadline<T>(
        &self,
        task: TaskRef,
        synthesis: impl Future<Output = Synthesis<T>>,
    ) -> Option<Synthesis<T>> {
        match tokio::time::timeout(self.config.max_wait(), synthesis).await {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                warn!(task_id = %task, "synthesis stalled; leaving the record to its deadline");
                None
            }
        }
    }

    /// Schedule `transition` unless its record already settled (or is gone).
    async fn schedule_in_flight(&self, fire_at: DateTime<Utc>, transition: Transition) {
        let task = transition.task();
        {
            let mut state = self.state.lock().await;
            if state.is_settled(task) {
                debug!(task_id = %task, transition = transition.name(), "record settled; not scheduling");
                return;
            }
            state.scheduler.schedule(fire_at, transition);
        }
        self.notify.notify_one();
    }

    /// Records of one kind, newest first.
    pub async fn list<K: StoredKind>(&self) -> Vec<TaskRecord<K>> {
        K::store(&self.state.lock().await.stores).list()
    }

    pub async fn get<K: StoredKind>(&self, id: Id<K>) -> Option<TaskRecord<K>> {
        K::store(&self.state.lock().await.stores).get(id).cloned()
    }

    /// Kind-erased listing for consumers that only want JSON.
    pub async fn snapshot(&self, kind: Kind) -> Result<serde_json::Value, PipelineError> {
        let value = match kind {
            Kind::Intent => serde_json::to_value(self.list::<Intent>().await)?,
            Kind::Prediction => serde_json::to_value(self.list::<Prediction>().await)?,
            Kind::WalletTransaction => {
                serde_json::to_value(self.list::<WalletTransaction>().await)?
            }
        };
        Ok(value)
    }

    /// Remove a record and cancel everything still scheduled for it.
    pub async fn discard(&self, task: TaskRef) -> Result<(), PipelineError> {
        let cancelled = {
            let mut state = self.state.lock().await;
            if !state.remove(task) {
                return Err(StoreError::NotFound {
                    kind: task.kind(),
                    id: task.to_string(),
                }
                .into());
            }
            state.scheduler.cancel(task)
        };
        let now = self.clock.now();
        info!(task_id = %task, kind = %task.kind(), cancelled, "task discarded");
        self.emit(TaskEvent::discarded(task, now));
        Ok(())
    }

    /// Apply every transition due at the current clock time. Returns how
    /// many changed a record.
    ///
    /// A transition that fails (record gone, invalid move) is logged and
    /// skipped; it never stops the rest of the batch.
    pub async fn run_due(&self) -> usize {
        let now = self.clock.now();
        let mut events = Vec::new();
        {
            let mut state = self.state.lock().await;
            while let Some(entry) = state.scheduler.pop_due(now) {
                let task = entry.transition.task();
                let name = entry.transition.name();
                match state.apply(entry.transition, entry.fire_at) {
                    Ok(Some(event)) => {
                        debug!(task_id = %task, transition = name, "transition applied");
                        events.push(event);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(task_id = %task, transition = name, error = %err, "transition skipped");
                    }
                }
                if state.is_settled(task) {
                    state.scheduler.cancel(task);
                }
            }
        }

        let applied = events.len();
        for event in events {
            if let TaskEvent::Transitioned { task, from, to, .. } = &event {
                info!(task_id = %task, %from, %to, "task transitioned");
            }
            self.emit(event);
        }
        applied
    }

    pub async fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.scheduler.next_fire_at()
    }

    pub async fn pending_transitions(&self) -> usize {
        self.state.lock().await.scheduler.pending()
    }
}

//! The one logical collection holding every ad, and its lifecycle.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ads_core::AdsConfig;
use ads_vectordb::{CollectionSchema, DataType, DistanceMetric, FieldSchema, IndexParams, VectorDbError};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{Result, RetrievalError};
use crate::retry::{timed, RetryPolicy};
use crate::store::VectorStore;

pub const ID_FIELD: &str = "id";
pub const PROJECT_FIELD: &str = "project";
pub const EMBEDDING_FIELD: &str = "embedding";
pub const PROJECT_MAX_LENGTH: usize = 256;

/// The index is retrained once the flushed row count reaches this multiple
/// of the rows it was last trained on, until it has `nlist` lists.
const RETRAIN_GROWTH: usize = 2;

/// `{id: int64 pk, project: varchar(256), embedding: float_vector(dim)}`.
pub fn ads_schema(name: &str, dimension: usize) -> CollectionSchema {
    CollectionSchema::new(name)
        .with_description("ads tagged by project, with text embeddings")
        .with_field(FieldSchema::new(ID_FIELD, DataType::Int64).primary_key())
        .with_field(FieldSchema::new(PROJECT_FIELD, DataType::VarChar { max_length: PROJECT_MAX_LENGTH }))
        .with_field(FieldSchema::new(EMBEDDING_FIELD, DataType::FloatVector { dim: dimension }))
}

/// Lifecycle of the collection as the service sees it. Search is valid only
/// in `Loaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Uninitialized,
    Created,
    Indexed,
    Loading,
    Loaded,
}

#[derive(Debug, Clone)]
pub struct CollectionSettings {
    pub name: String,
    pub dimension: usize,
    pub nlist: usize,
    pub nprobe: usize,
    pub store_timeout: Duration,
    pub index_timeout: Duration,
}

impl CollectionSettings {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        let defaults = AdsConfig::default();
        Self {
            name: name.into(),
            dimension,
            nlist: defaults.vectordb.nlist,
            nprobe: defaults.vectordb.nprobe,
            store_timeout: defaults.timeouts.store(),
            index_timeout: defaults.timeouts.index(),
        }
    }

    pub fn from_config(config: &AdsConfig) -> Self {
        Self {
            name: config.vectordb.collection.clone(),
            dimension: config.vectordb.dimension,
            nlist: config.vectordb.nlist,
            nprobe: config.vectordb.nprobe,
            store_timeout: config.timeouts.store(),
            index_timeout: config.timeouts.index(),
        }
    }

    pub fn with_ivf(mut self, nlist: usize, nprobe: usize) -> Self {
        self.nlist = nlist;
        self.nprobe = nprobe;
        self
    }
}

/// Owns the schema and the create → index → load lifecycle.
///
/// Lifecycle transitions serialize on `transition`; inserts never take it,
/// so writers keep going while an index builds.
pub struct VectorCollection {
    store: Arc<dyn VectorStore>,
    settings: CollectionSettings,
    retry: RetryPolicy,
    state: RwLock<CollectionState>,
    transition: Mutex<()>,
    /// Flushed rows as counted by this process's writes and deletes.
    flushed_rows: AtomicUsize,
    /// `flushed_rows` when the index was last (re)trained.
    trained_rows: AtomicUsize,
}

impl VectorCollection {
    pub fn new(store: Arc<dyn VectorStore>, settings: CollectionSettings, retry: RetryPolicy) -> Self {
        Self {
            store,
            settings,
            retry,
            state: RwLock::new(CollectionState::Uninitialized),
            transition: Mutex::new(()),
            flushed_rows: AtomicUsize::new(0),
            trained_rows: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    pub fn state(&self) -> CollectionState {
        *self.state.read()
    }

    pub fn schema(&self) -> CollectionSchema {
        ads_schema(&self.settings.name, self.settings.dimension)
    }

    pub(crate) fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    fn set_state(&self, next: CollectionState) {
        *self.state.write() = next;
    }

    pub(crate) fn record_flushed(&self, rows: usize) {
        self.flushed_rows.fetch_add(rows, Ordering::Relaxed);
    }

    pub(crate) fn record_removed(&self, rows: usize) {
        let _ = self
            .flushed_rows
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(rows)));
    }

    /// The last training saw fewer rows than `nlist`, and the collection has
    /// grown enough since that the index would get more lists now.
    pub fn index_outgrown(&self) -> bool {
        let trained = self.trained_rows.load(Ordering::Relaxed);
        let flushed = self.flushed_rows.load(Ordering::Relaxed);
        trained < self.settings.nlist && flushed >= trained.saturating_mul(RETRAIN_GROWTH).max(trained + 1)
    }

    /// Store call with the store timeout and the retry policy.
    pub(crate) async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, VectorDbError>>,
    {
        self.call_with(operation, self.settings.store_timeout, &self.retry, f).await
    }

    /// Store call with the store timeout and a single attempt.
    pub(crate) async fn call_once<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, VectorDbError>>,
    {
        self.call_with(operation, self.settings.store_timeout, &RetryPolicy::none(), f).await
    }

    async fn call_with<T, F, Fut>(
        &self,
        operation: &'static str,
        limit: Duration,
        retry: &RetryPolicy,
        f: F,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, VectorDbError>>,
    {
        retry.run(operation, || timed(operation, limit, f())).await
    }

    pub(crate) fn require_created(&self) -> Result<()> {
        match self.state() {
            CollectionState::Uninitialized => {
                Err(RetrievalError::NotReady(format!("collection `{}` has not been created", self.name())))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn require_loaded(&self) -> Result<()> {
        match self.state() {
            CollectionState::Loaded => Ok(()),
            state => Err(RetrievalError::NotReady(format!(
                "collection `{}` is not loaded ({state:?})",
                self.name()
            ))),
        }
    }

    /// Declare the collection, or verify an existing one has the same schema.
    pub async fn create(&self) -> Result<()> {
        let _guard = self.transition.lock().await;
        let schema = self.schema();
        let name = self.name();

        if self.call("has_collection", || self.store.has_collection(name)).await? {
            let existing = self.call("describe_collection", || self.store.describe_collection(name)).await?;
            if !existing.is_compatible(&schema) {
                return Err(RetrievalError::SchemaConflict(format!(
                    "collection `{name}` exists with a different schema"
                )));
            }
            info!(collection = name, "collection exists");
        } else {
            self.call_once("create_collection", || self.store.create_collection(schema.clone())).await?;
            info!(collection = name, dimension = self.settings.dimension, "collection created");
        }

        if self.state() == CollectionState::Uninitialized {
            self.set_state(CollectionState::Created);
        }
        Ok(())
    }

    /// Build (or rebuild) the IVF/L2 index over flushed rows. A loaded
    /// collection stays loaded across a rebuild.
    pub async fn build_index(&self) -> Result<()> {
        let _guard = self.transition.lock().await;
        self.build_index_locked().await
    }

    async fn build_index_locked(&self) -> Result<()> {
        self.require_created()?;
        let name = self.name();
        let params = IndexParams::ivf_flat(DistanceMetric::L2, self.settings.nlist);
        let started = Instant::now();
        let rows = self.flushed_rows.load(Ordering::Relaxed);
        // Single attempt: a timed-out build keeps training on its blocking
        // thread, and a second one would race it to swap the index in.
        self.call_with("create_index", self.settings.index_timeout, &RetryPolicy::none(), || {
            self.store.create_index(name, EMBEDDING_FIELD, params)
        })
        .await?;
        self.trained_rows.store(rows, Ordering::Relaxed);
        if self.state() == CollectionState::Created {
            self.set_state(CollectionState::Indexed);
        }
        info!(
            collection = name,
            nlist = self.settings.nlist,
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built"
        );
        Ok(())
    }

    /// Bring the collection into queryable state. Requires an index.
    pub async fn load(&self) -> Result<()> {
        let _guard = self.transition.lock().await;
        self.load_locked().await
    }

    async fn load_locked(&self) -> Result<()> {
        let name = self.name();
        match self.state() {
            CollectionState::Loaded => Ok(()),
            CollectionState::Uninitialized => {
                Err(RetrievalError::NotReady(format!("collection `{name}` has not been created")))
            }
            CollectionState::Created => {
                Err(RetrievalError::NotReady(format!("collection `{name}` has no index")))
            }
            CollectionState::Indexed | CollectionState::Loading => {
                self.set_state(CollectionState::Loading);
                match self.call("load", || self.store.load(name)).await {
                    Ok(()) => {
                        self.set_state(CollectionState::Loaded);
                        info!(collection = name, "collection loaded");
                        Ok(())
                    }
                    Err(e) => {
                        self.set_state(CollectionState::Indexed);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Drive the collection to `Loaded`, building the index first if none
    /// exists. Fails with `NotReady` when another transition is in flight or
    /// there is nothing to index yet.
    ///
    /// A loaded collection whose index was trained on too few rows is
    /// retrained here first, unless another transition holds the lock.
    pub async fn ensure_loaded(&self) -> Result<()> {
        if self.state() == CollectionState::Loaded {
            if self.index_outgrown() {
                self.retrain().await;
            }
            return Ok(());
        }
        let Ok(_guard) = self.transition.try_lock() else {
            return Err(RetrievalError::NotReady(format!("collection `{}` is loading", self.name())));
        };
        if self.state() == CollectionState::Created {
            match self.build_index_locked().await {
                Ok(()) => {}
                Err(RetrievalError::IndexBuild(reason)) => {
                    return Err(RetrievalError::NotReady(format!(
                        "collection `{}` has nothing to search yet: {reason}",
                        self.name()
                    )));
                }
                Err(e) => return Err(e),
            }
        }
        self.load_locked().await
    }

    async fn retrain(&self) {
        let Ok(_guard) = self.transition.try_lock() else {
            return;
        };
        if self.state() != CollectionState::Loaded || !self.index_outgrown() {
            return;
        }
        let trained = self.trained_rows.load(Ordering::Relaxed);
        info!(collection = self.name(), trained_rows = trained, "retraining outgrown index");
        if let Err(e) = self.build_index_locked().await {
            // Back off until the collection grows again.
            self.trained_rows.store(self.flushed_rows.load(Ordering::Relaxed), Ordering::Relaxed);
            warn!(collection = self.name(), error = %e, "index retrain failed");
        }
    }

    pub async fn release(&self) -> Result<()> {
        let _guard = self.transition.lock().await;
        let name = self.name();
        self.call("release", || self.store.release(name)).await?;
        if matches!(self.state(), CollectionState::Loaded | CollectionState::Loading) {
            self.set_state(CollectionState::Indexed);
        }
        info!(collection = name, "collection released");
        Ok(())
    }

    /// Irreversibly delete every row and the schema.
    pub async fn drop_collection(&self) -> Result<()> {
        let _guard = self.transition.lock().await;
        let name = self.name();
        self.call_once("drop_collection", || self.store.drop_collection(name)).await?;
        self.set_state(CollectionState::Uninitialized);
        self.flushed_rows.store(0, Ordering::Relaxed);
        self.trained_rows.store(0, Ordering::Relaxed);
        info!(collection = name, "collection dropped");
        Ok(())
    }

    /// Startup: create or verify the collection; if it already holds rows,
    /// index and load it so the first search does not pay for it.
    pub async fn bootstrap(&self) -> Result<()> {
        self.create().await?;
        let name = self.name();
        let rows = self.call("num_entities", || self.store.num_entities(name)).await?;
        self.flushed_rows.store(rows, Ordering::Relaxed);
        if rows > 0 {
            self.build_index().await?;
            self.load().await?;
        }
        info!(collection = name, rows, state = ?self.state(), "collection ready");
        Ok(())
    }
}

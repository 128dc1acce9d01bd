//! Lazily loaded, single-flight secret cache.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::observability::metrics;
use crate::secrets::backend::SecretBackend;
use crate::secrets::SecretError;

type SecretMap = Arc<HashMap<String, String>>;
type LoadFuture = Shared<BoxFuture<'static, Result<SecretMap, SecretError>>>;

enum CacheState {
    Unloaded,
    Loading { generation: u64, load: LoadFuture },
    Loaded(SecretMap),
    Failed(SecretError),
}

/// Observable cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

struct Inner {
    state: CacheState,
    generation: u64,
}

/// Secret cache populated by one backend load.
///
/// All callers arriving while a load is in flight await that same load. A
/// successful load is kept for the life of the cache. A failed load is
/// recorded and retried by the next caller.
pub struct SecretCache {
    backend: Arc<dyn SecretBackend>,
    inner: Mutex<Inner>,
}

impl SecretCache {
    pub fn new(backend: impl SecretBackend + 'static) -> Self {
        Self::from_backend(Arc::new(backend))
    }

    pub fn from_backend(backend: Arc<dyn SecretBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner {
                state: CacheState::Unloaded,
                generation: 0,
            }),
        }
    }

    /// Look up one secret. `Ok(None)` means the set loaded but has no such
    /// key.
    pub async fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        let secrets = self.secrets().await?;
        Ok(secrets.get(key).cloned())
    }

    /// The whole secret set, loading it if needed.
    pub async fn secrets(&self) -> Result<SecretMap, SecretError> {
        let (generation, load) = {
            let mut inner = self.lock();
            let in_flight = match &inner.state {
                CacheState::Loaded(secrets) => return Ok(Arc::clone(secrets)),
                CacheState::Loading { generation, load } => Some((*generation, load.clone())),
                CacheState::Unloaded | CacheState::Failed(_) => None,
            };

            match in_flight {
                Some(in_flight) => in_flight,
                None => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    let load = self.start_load(generation);
                    inner.state = CacheState::Loading {
                        generation,
                        load: load.clone(),
                    };
                    (generation, load)
                }
            }
        };

        let result = load.await;
        self.settle(generation, &result);
        result
    }

    pub fn status(&self) -> CacheStatus {
        match self.lock().state {
            CacheState::Unloaded => CacheStatus::Unloaded,
            CacheState::Loading { .. } => CacheStatus::Loading,
            CacheState::Loaded(_) => CacheStatus::Loaded,
            CacheState::Failed(_) => CacheStatus::Failed,
        }
    }

    /// Error recorded by the last failed load, if the cache is in that state.
    pub fn last_error(&self) -> Option<SecretError> {
        match &self.lock().state {
            CacheState::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    fn start_load(&self, generation: u64) -> LoadFuture {
        let backend = Arc::clone(&self.backend);
        async move {
            tracing::debug!(generation, "Loading secrets");
            match backend.load_all().await {
                Ok(secrets) => {
                    metrics::record_secret_load("success");
                    tracing::info!(generation, count = secrets.len(), "Secrets loaded");
                    Ok(Arc::new(secrets))
                }
                Err(err) => {
                    metrics::record_secret_load("failure");
                    tracing::error!(generation, error = %err, "Failed to load secrets");
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    fn settle(&self, generation: u64, result: &Result<SecretMap, SecretError>) {
        let mut inner = self.lock();
        let current = matches!(
            &inner.state,
            CacheState::Loading { generation: g, .. } if *g == generation
        );
        if current {
            inner.state = match result {
                Ok(secrets) => CacheState::Loaded(Arc::clone(secrets)),
                Err(err) => CacheState::Failed(err.clone()),
            };
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

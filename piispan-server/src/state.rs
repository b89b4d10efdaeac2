//! Application state management

use std::sync::Arc;

use piispan::runtime::PiiModel;
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult, not_ready};

/// Outcome of loading the model at startup; fixed for the process lifetime
#[derive(Debug)]
pub enum Readiness {
    Ready(Arc<PiiModel>),
    NotReady { init_error: Option<String> },
}

/// Application state shared across all handlers
#[derive(Debug)]
pub struct AppState {
    /// Model handle or the reason it is missing
    pub readiness: Readiness,

    /// Server configuration
    pub config: ServerConfig,

    /// Bounds concurrent blocking inference calls
    inference_permits: Arc<Semaphore>,
}

impl AppState {
    /// Create new application state
    pub fn new(readiness: Readiness, config: ServerConfig) -> Self {
        let permits = config.inference_concurrency.max(1);
        Self {
            readiness,
            config,
            inference_permits: Arc::new(Semaphore::new(permits)),
        }
    }

    /// State with a loaded model
    pub fn ready(model: PiiModel, config: ServerConfig) -> Self {
        Self::new(Readiness::Ready(Arc::new(model)), config)
    }

    /// State for a model that failed to load
    pub fn not_ready(init_error: impl Into<String>, config: ServerConfig) -> Self {
        Self::new(
            Readiness::NotReady {
                init_error: Some(init_error.into()),
            },
            config,
        )
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.readiness, Readiness::Ready(_))
    }

    /// The loaded model, or the not-ready error every gated endpoint returns
    pub fn model(&self) -> ServerResult<Arc<PiiModel>> {
        match &self.readiness {
            Readiness::Ready(model) => Ok(model.clone()),
            Readiness::NotReady { init_error } => Err(not_ready(init_error.as_deref())),
        }
    }

    pub fn init_error(&self) -> Option<&str> {
        match &self.readiness {
            Readiness::Ready(_) => None,
            Readiness::NotReady { init_error } => init_error.as_deref(),
        }
    }

    /// Tolerated configuration problems plus any warmup failure
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = self.config.warnings.clone();
        if let Readiness::Ready(model) = &self.readiness
            && let Some(error) = model.warmup_error()
        {
            warnings.push(format!("Warmup inference failed: {}", error));
        }
        warnings
    }

    /// Run `job` against the model on a blocking thread, holding an inference permit
    pub async fn run_inference<F, T>(&self, job: F) -> ServerResult<T>
    where
        F: FnOnce(&PiiModel) -> T + Send + 'static,
        T: Send + 'static,
    {
        let model = self.model()?;
        let permit = self
            .inference_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ServerError::Internal(format!("Inference pool closed: {}", e)))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job(&model)
        })
        .await
        .map_err(|e| ServerError::Internal(format!("Inference task failed: {}", e)))
    }
}

//! Request boundary of the generation endpoint.
//!
//! `GenerationService` accepts a [`GenerateRequest`], enforces the owner's
//! token allowance before the sequencer runs, executes the run, records
//! usage, persists the finished run and returns the [`GenerateResponse`].

pub mod ledger;
pub mod repository;

pub use ledger::{InMemoryLedger, LedgerError, UsageLedger};
pub use repository::{JsonRunRepository, RepositoryError, RunRepository, StoredRun};

use crate::engine::{EngineError, GenerationEngine};
use crate::generation::GenerationError;
use crate::state::store::{InMemoryRunStore, RunStore};
use ac_protocol::{GenerateRequest, GenerateResponse};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    AllowanceExceeded(#[from] LedgerError),

    #[error("{0}")]
    NotConfigured(GenerationError),

    #[error("generation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::AllowanceExceeded(_) => 402,
            Self::NotConfigured(_) => 503,
            Self::Cancelled => 499,
            Self::Internal(_) => 500,
        }
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(reason) => Self::Validation(reason),
            EngineError::Configuration(e) => Self::NotConfigured(e),
            EngineError::Cancelled { .. } => Self::Cancelled,
            EngineError::Transition(e) => Self::Internal(e.to_string()),
        }
    }
}

pub struct GenerationService {
    engine: Arc<GenerationEngine>,
    ledger: Arc<dyn UsageLedger>,
    repository: Option<Arc<dyn RunRepository>>,
}

impl GenerationService {
    pub fn new(engine: Arc<GenerationEngine>, ledger: Arc<dyn UsageLedger>) -> Self {
        Self {
            engine,
            ledger,
            repository: None,
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn RunRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn engine(&self) -> &Arc<GenerationEngine> {
        &self.engine
    }

    /// Run a request against a fresh store.
    pub async fn handle(
        &self,
        owner: &str,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, ServiceError> {
        let store = InMemoryRunStore::default();
        self.handle_with_store(owner, request, &store, cancel).await
    }

    /// Run a request, writing progress into `store` for observers.
    pub async fn handle_with_store(
        &self,
        owner: &str,
        request: &GenerateRequest,
        store: &dyn RunStore,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, ServiceError> {
        let run = self
            .engine
            .prepare(&request.project_name, &request.project_description)?;

        let reserved = run.estimated_tokens;
        self.ledger.reserve(owner, reserved).await?;

        let run_id = run.id;
        let run = match self.engine.execute(run, store, cancel).await {
            Ok(run) => run,
            Err(EngineError::Cancelled { tokens_used }) => {
                self.ledger.settle(owner, reserved, tokens_used).await;
                info!(run_id = %run_id, owner, tokens_used, "request cancelled");
                return Err(ServiceError::Cancelled);
            }
            Err(e) => {
                self.ledger.settle(owner, reserved, 0).await;
                return Err(e.into());
            }
        };
        self.ledger.settle(owner, reserved, run.total_tokens_used).await;

        if let Some(repository) = &self.repository {
            if let Err(e) = repository.save(owner, &run) {
                warn!(run_id = %run.id, error = %e, "failed to persist run");
            }
        }

        info!(
            run_id = %run.id,
            owner,
            total_tokens = run.total_tokens_used,
            "request served"
        );
        Ok(GenerateResponse::from(&run))
    }

    /// JSON in, `(status, JSON body)` out. Errors become `{"error": ...}`.
    pub async fn handle_json(
        &self,
        owner: &str,
        body: &str,
        cancel: &CancellationToken,
    ) -> (u16, String) {
        let request: GenerateRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(e) => {
                return error_body(&ServiceError::Validation(format!("malformed JSON: {e}")))
            }
        };

        match self.handle(owner, &request, cancel).await {
            Ok(response) => match serde_json::to_string(&response) {
                Ok(json) => (200, json),
                Err(e) => error_body(&ServiceError::Internal(e.to_string())),
            },
            Err(e) => error_body(&e),
        }
    }
}

fn error_body(err: &ServiceError) -> (u16, String) {
    let body = serde_json::json!({ "error": err.to_string() });
    (err.status_code(), body.to_string())
}

use std::any::Any;
use std::env;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use futures::FutureExt;
use plano_core::{
    classify, degraded_envelope, synthesize, Classification, EntityCatalog, EntityList,
    PipelineError, Query, QueryRequest, ResponseEnvelope,
};
use plano_observability::AppMetrics;
use plano_retrieval::{plan_for, StrategyExecutor};
use plano_storage::{EntityDirectory, RegulationRepository};
use tracing::{error, info, instrument};
use uuid::Uuid;

pub const DEFAULT_PIPELINE: &str = "agentic-v1-simplified";
pub const DEFAULT_MODEL: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub pipeline: String,
    pub default_model: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            pipeline: DEFAULT_PIPELINE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            pipeline: env::var("PLANO_PIPELINE")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.pipeline),
            default_model: env::var("PLANO_DEFAULT_MODEL")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.default_model),
        }
    }
}

pub struct RegulationAgent<S>
where
    S: RegulationRepository + EntityDirectory,
{
    executor: StrategyExecutor<S>,
    store: Arc<S>,
    entities: Arc<EntityCatalog>,
    metrics: Arc<AppMetrics>,
    config: AgentConfig,
}

impl<S> Clone for RegulationAgent<S>
where
    S: RegulationRepository + EntityDirectory,
{
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            store: self.store.clone(),
            entities: self.entities.clone(),
            metrics: self.metrics.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S> RegulationAgent<S>
where
    S: RegulationRepository + EntityDirectory,
{
    pub fn new(
        store: Arc<S>,
        entities: Arc<EntityCatalog>,
        metrics: Arc<AppMetrics>,
        config: AgentConfig,
    ) -> Self {
        Self {
            executor: StrategyExecutor::new(store.clone()),
            store,
            entities,
            metrics,
            config,
        }
    }

    /// Builds an agent and loads the entity snapshot from the store.
    pub async fn bootstrap(store: Arc<S>, metrics: Arc<AppMetrics>, config: AgentConfig) -> Result<Self> {
        let agent = Self::new(
            store,
            Arc::new(EntityCatalog::default()),
            metrics,
            config,
        );
        agent.refresh_entities().await?;
        Ok(agent)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    pub fn entities(&self) -> Arc<EntityList> {
        self.entities.snapshot()
    }

    /// Reloads the entity snapshot; requests already in flight keep the old one.
    pub async fn refresh_entities(&self) -> Result<usize> {
        let names = self.store.list_entities().await?;
        let count = self.entities.replace(EntityList::new(names));
        info!(entities = count, "entity snapshot refreshed");
        Ok(count)
    }

    pub fn classify(&self, text: &str) -> Classification {
        classify(text, &self.entities.snapshot())
    }

    /// Answers a request. Never fails: errors and panics become the degraded envelope.
    #[instrument(skip(self, request), fields(session_id = ?request.session_id))]
    pub async fn answer(&self, request: QueryRequest) -> ResponseEnvelope {
        let started = Instant::now();
        self.metrics.inc_request();

        let outcome = AssertUnwindSafe(self.try_answer(&request, started))
            .catch_unwind()
            .await;

        let envelope = match outcome {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(failure)) => self.degraded(&request, &failure.to_string()),
            Err(panic) => self.degraded(&request, &panic_message(panic.as_ref())),
        };

        self.metrics.observe_latency(started.elapsed());
        envelope
    }

    async fn try_answer(
        &self,
        request: &QueryRequest,
        started: Instant,
    ) -> Result<ResponseEnvelope, PipelineError> {
        let query = Query::from_request(
            request,
            || format!("session_{}", Uuid::new_v4()),
            &self.config.default_model,
        )?;

        let entities = self.entities.snapshot();
        let classification = classify(&query.text, &entities);
        let plan = plan_for(&classification, &entities);
        let execution = self.executor.execute(&plan).await;

        self.metrics.add_strategy_attempts(execution.attempted);
        self.metrics.add_strategy_failures(execution.failed);
        if execution.is_miss() {
            self.metrics.inc_miss();
        }

        let mut envelope = synthesize(&classification, execution.committed.as_ref());
        envelope.execution_time_ms = started.elapsed().as_millis() as u64;
        envelope.metadata.pipeline = self.config.pipeline.clone();
        envelope.metadata.timestamp = Utc::now().to_rfc3339();
        envelope.metadata.session_id = query.session_id.clone();
        envelope.metadata.model = query.model.clone();
        envelope.metadata.total_queries = execution.attempted;
        envelope.metadata.is_hardcoded = false;

        info!(
            session_id = %query.session_id,
            intent = classification.intent.as_str(),
            strategy = envelope.metadata.strategy_used.as_deref().unwrap_or("none"),
            attempted = execution.attempted,
            failed = execution.failed,
            confidence = envelope.confidence,
            "query answered"
        );

        Ok(envelope)
    }

    fn degraded(&self, request: &QueryRequest, message: &str) -> ResponseEnvelope {
        self.metrics.inc_degraded();
        error!(error = %message, "pipeline failed, returning degraded response");

        let mut envelope = degraded_envelope(message);
        envelope.metadata.pipeline = self.config.pipeline.clone();
        envelope.metadata.timestamp = Utc::now().to_rfc3339();
        envelope.metadata.session_id = request.session_id.clone().unwrap_or_default();
        envelope.metadata.model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());
        envelope
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "pipeline panicked".to_string())
}

use std::sync::Arc;

use plano_core::StrategyResult;
use plano_storage::RegulationRepository;
use tracing::{debug, warn};

use crate::plan::Strategy;

#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub committed: Option<StrategyResult>,
    pub attempted: usize,
    pub failed: usize,
}

impl Execution {
    pub fn is_miss(&self) -> bool {
        self.committed.is_none()
    }
}

pub struct StrategyExecutor<S> {
    source: Arc<S>,
}

impl<S> Clone for StrategyExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<S> StrategyExecutor<S>
where
    S: RegulationRepository,
{
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Runs strategies in order and commits the first one yielding rows.
    /// Later strategies are never issued; a failing source counts as empty.
    pub async fn execute(&self, plan: &[Strategy]) -> Execution {
        let mut execution = Execution::default();

        for strategy in plan {
            execution.attempted += 1;
            debug!(
                strategy = %strategy.label,
                table = strategy.source().table(),
                purpose = %strategy.purpose,
                "trying strategy"
            );

            let rows = match self.source.fetch(&strategy.request).await {
                Ok(rows) => rows,
                Err(error) => {
                    execution.failed += 1;
                    warn!(strategy = %strategy.label, error = %format!("{error:#}"), "strategy source failed");
                    continue;
                }
            };

            if rows.is_empty() {
                continue;
            }

            debug!(strategy = %strategy.label, rows = rows.len(), "strategy committed");
            execution.committed = Some(StrategyResult {
                source_label: strategy.source().table().to_string(),
                source: strategy.source(),
                purpose: strategy.purpose.clone(),
                rows,
                strategy_label: strategy.label.clone(),
            });
            break;
        }

        execution
    }
}

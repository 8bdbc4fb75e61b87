use std::collections::HashMap;
use std::time::Instant;
use tokio::time::timeout;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::implementations;
use crate::observer::traits::{Observer, ObserverRing};

/// Observers registered per ring, run in ring order before a write is persisted
pub struct ObserverPipeline {
    observers: HashMap<ObserverRing, Vec<Box<dyn Observer>>>,
}

impl ObserverPipeline {
    /// Create new observer pipeline with empty observer registry
    pub fn new() -> Self {
        Self { observers: HashMap::new() }
    }

    /// Pipeline with every built-in observer registered
    pub fn with_default_observers() -> Self {
        let mut pipeline = Self::new();
        implementations::register_all(&mut pipeline);
        pipeline
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer>) {
        let ring = observer.ring();
        let name = observer.name();
        let ring_observers = self.observers.entry(ring).or_default();
        ring_observers.push(observer);
        ring_observers.sort_by_key(|o| o.priority());

        tracing::debug!("Registered observer '{}' for ring {:?}", name, ring);
    }

    /// Run every applicable ring; the first collected error aborts the write
    pub async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        tracing::debug!(
            "Observer pipeline starting: operation={:?}, resource={}",
            ctx.operation,
            ctx.def.table
        );

        for ring in ObserverRing::ALL {
            ctx.current_ring = Some(ring);
            if !self.execute_ring(ring, ctx).await {
                tracing::debug!("Observer pipeline stopped at ring {:?} due to errors", ring);
                break;
            }
        }

        tracing::debug!("Observer pipeline finished in {:?}", ctx.execution_time());

        match ctx.errors.drain(..).next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn execute_ring(&self, ring: ObserverRing, ctx: &mut ObserverContext) -> bool {
        let Some(observers) = self.observers.get(&ring) else {
            tracing::trace!("No observers registered for ring {:?}", ring);
            return true;
        };

        for observer in observers {
            if !observer.applies_to_operation(ctx.operation) {
                tracing::trace!("Observer {} skipped - doesn't apply to operation {:?}", observer.name(), ctx.operation);
                continue;
            }
            if !observer.applies_to_resource(ctx.def) {
                continue;
            }

            let observer_start = Instant::now();
            let result = timeout(observer.timeout(), observer.execute(ctx)).await;
            let execution_time = observer_start.elapsed();

            match result {
                Ok(Ok(())) => {
                    tracing::trace!("Observer: {} completed in {:?}", observer.name(), execution_time);
                }
                Ok(Err(error)) => {
                    tracing::debug!("Observer: {} failed in {:?}: {}", observer.name(), execution_time, error);
                    ctx.errors.push(error);
                }
                Err(_elapsed) => {
                    tracing::error!("Observer: {} timed out after {:?}", observer.name(), observer.timeout());
                    ctx.errors.push(ObserverError::TimeoutError(format!(
                        "Observer {} timed out after {:?}",
                        observer.name(),
                        observer.timeout()
                    )));
                }
            }
        }

        if !ctx.field_errors.is_empty() {
            let field_errors = std::mem::take(&mut ctx.field_errors);
            ctx.errors.insert(
                0,
                ObserverError::ValidationError { message: "Validation failed".to_string(), field_errors },
            );
        }

        ctx.errors.is_empty()
    }
}

impl Default for ObserverPipeline {
    fn default() -> Self {
        Self::new()
    }
}

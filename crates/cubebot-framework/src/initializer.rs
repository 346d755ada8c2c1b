//! Startup initializers.
//!
//! Modules register [`Initializer`]s alongside their handlers. The runtime
//! runs them sequentially, in registration order, before the gateway
//! connects; the first failure aborts startup.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{HandlerResult, InitError};
use crate::handler::BoxFuture;

/// Environment handed to initializers.
#[derive(Debug, Clone)]
pub struct InitContext {
    config_dir: PathBuf,
}

impl InitContext {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Directory holding per-module configuration files.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

type InitFn = Arc<dyn Fn(Arc<InitContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A named async startup task.
#[derive(Clone)]
pub struct Initializer {
    name: String,
    run: InitFn,
}

impl Initializer {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<InitContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(&self, ctx: Arc<InitContext>) -> HandlerResult {
        (self.run)(ctx).await
    }
}

impl std::fmt::Debug for Initializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initializer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered list of initializers.
#[derive(Debug, Clone, Default)]
pub struct InitializerChain {
    initializers: Vec<Initializer>,
}

impl InitializerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, initializer: Initializer) {
        self.initializers.push(initializer);
    }

    pub fn len(&self) -> usize {
        self.initializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initializers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.initializers.iter().map(Initializer::name)
    }

    /// Runs every initializer in order, stopping at the first failure.
    pub async fn run_all(&self, ctx: Arc<InitContext>) -> Result<(), InitError> {
        for initializer in &self.initializers {
            debug!(initializer = %initializer.name(), "Running initializer");
            initializer
                .run(Arc::clone(&ctx))
                .await
                .map_err(|source| InitError {
                    name: initializer.name().to_string(),
                    source,
                })?;
        }
        info!(count = self.initializers.len(), "Initialization complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UserError;
    use parking_lot::Mutex;

    fn recording(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>, fail: bool) -> Initializer {
        Initializer::new(name, move |_ctx| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(name);
                if fail {
                    return Err(UserError::new("broken").into());
                }
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = InitializerChain::new();
        chain.push(recording("a", log.clone(), false));
        chain.push(recording("b", log.clone(), false));

        chain
            .run_all(Arc::new(InitContext::new("./config")))
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = InitializerChain::new();
        chain.push(recording("a", log.clone(), true));
        chain.push(recording("b", log.clone(), false));

        let err = chain
            .run_all(Arc::new(InitContext::new("./config")))
            .await
            .unwrap_err();
        assert_eq!(err.name, "a");
        assert_eq!(*log.lock(), vec!["a"]);
    }
}

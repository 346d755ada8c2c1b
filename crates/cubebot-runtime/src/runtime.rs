//! Process-level orchestration.
//!
//! [`CubeRuntime`] owns the startup sequence:
//!
//! 1. Include every module and freeze the [`HandlerRegistry`].
//! 2. Run the initializer chain. Any failure aborts before connecting.
//! 3. Optionally deploy command descriptors to the platform.
//! 4. Connect the gateway and dispatch each inbound interaction on its own task.
//! 5. Stop on Ctrl+C, SIGTERM, or when the gateway's event stream ends.
//!
//! ```rust,ignore
//! let runtime = CubeRuntime::builder()
//!     .config(config)
//!     .module(&FEATURES)
//!     .gateway(StdioGateway::new())
//!     .build()?;
//! runtime.run(StartMode::Connect).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use cubebot_core::{BoxedGateway, Gateway, Interaction};
use cubebot_framework::{
    Dispatcher, HandlerKind, HandlerRegistry, InitContext, ModuleDescriptor, RegistryBuilder,
    Session,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tower::ServiceExt;
use tracing::{debug, error, info, trace, warn};

use crate::config::{CubeConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};

/// What to do before listening for interactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartMode {
    /// Connect with whatever commands the platform already has.
    #[default]
    Connect,
    /// Replace the platform's command set first.
    DeployThenConnect,
}

/// The Cubebot runtime.
pub struct CubeRuntime {
    config: CubeConfig,
    modules: Vec<&'static ModuleDescriptor>,
    gateway: BoxedGateway,
}

impl CubeRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &CubeConfig {
        &self.config
    }

    pub fn gateway(&self) -> &BoxedGateway {
        &self.gateway
    }

    /// Builds the registry and runs initializers.
    ///
    /// Returns the dispatcher that will serve interactions.
    pub async fn prepare(&self) -> RuntimeResult<Dispatcher> {
        let mut builder = RegistryBuilder::new();
        for module in &self.modules {
            builder.include(module)?;
        }
        let (registry, initializers) = builder.build().inspect_err(|e| {
            error!(error = %e, "Invalid handler registry");
        })?;

        info!(
            modules = registry.modules().len(),
            commands = registry.len_of(HandlerKind::Command),
            context_menus = registry.len_of(HandlerKind::ContextMenu),
            buttons = registry.len_of(HandlerKind::Button),
            modals = registry.len_of(HandlerKind::Modal),
            "Handler registry ready"
        );

        let init_ctx = Arc::new(InitContext::new(self.config.storage.config_dir.clone()));
        initializers.run_all(init_ctx).await.inspect_err(|e| {
            error!(error = %e, "Startup aborted");
        })?;

        let session = Session::new(Arc::clone(&self.gateway))
            .with_modal_timeout(self.config.interactions.modal_timeout());
        Ok(Dispatcher::new(Arc::new(registry), session))
    }

    /// Replaces the platform's command set with the registry's.
    ///
    /// Failures are logged; the bot keeps serving whatever is deployed.
    pub async fn deploy(&self, registry: &HandlerRegistry) {
        let commands = registry.command_data();
        let guild_id = self.config.bot.guild_id.as_deref();
        info!(count = commands.len(), guild = ?guild_id, "Deploying commands");

        match self.gateway.register_commands(commands, guild_id).await {
            Ok(count) => info!(
                count,
                names = ?registry.command_names(),
                "Successfully registered application commands"
            ),
            Err(e) => error!(error = %e, "Failed to register application commands"),
        }
    }

    /// Runs until Ctrl+C, SIGTERM, or the gateway disconnects.
    pub async fn run(&self, mode: StartMode) -> RuntimeResult<()> {
        self.run_until(mode, wait_for_shutdown()).await
    }

    /// Runs until `shutdown` resolves or the gateway disconnects.
    pub async fn run_until<F>(&self, mode: StartMode, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        if mode == StartMode::DeployThenConnect {
            validate_config(&self.config, true)?;
        }

        let dispatcher = self.prepare().await?;
        if mode == StartMode::DeployThenConnect {
            self.deploy(dispatcher.registry()).await;
        }

        let (tx, mut rx) = mpsc::channel::<Interaction>(self.config.interactions.event_buffer);
        let gateway = Arc::clone(&self.gateway);
        let connection = tokio::spawn(async move { gateway.connect(tx).await });
        info!(gateway = self.gateway.name(), "Cubebot is now running");

        let tracker = TaskTracker::new();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = rx.recv() => match event {
                    Some(interaction) => {
                        trace!(interaction = %interaction.id, "Received interaction");
                        tracker.spawn(serve(dispatcher.clone(), interaction));
                    }
                    None => {
                        info!("Event stream closed");
                        break;
                    }
                },
            }
        }

        connection.abort();
        let connection_result = match connection.await {
            Ok(result) => result.map_err(RuntimeError::from),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => {
                error!(error = %e, "Gateway task panicked");
                Ok(())
            }
        };

        tracker.close();
        let grace = self.config.interactions.shutdown_grace();
        if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
            warn!(
                pending = tracker.len(),
                "Handlers still running after shutdown grace period"
            );
        }

        if let Err(e) = &connection_result {
            error!(error = %e, "Gateway connection failed");
        }
        info!("Cubebot stopped");
        connection_result
    }
}

async fn serve(dispatcher: Dispatcher, interaction: Interaction) {
    match dispatcher.oneshot(interaction).await {
        Ok(outcome) => debug!(?outcome, "Interaction served"),
        Err(never) => match never {},
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
///
/// If a signal handler cannot be installed the error is logged and that
/// signal is ignored.
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`CubeRuntime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    config: CubeConfig,
    modules: Vec<&'static ModuleDescriptor>,
    gateway: Option<BoxedGateway>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: CubeConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a root module. Nested modules are included by their parents.
    pub fn module(mut self, module: &'static ModuleDescriptor) -> Self {
        self.modules.push(module);
        self
    }

    pub fn gateway<G: Gateway>(self, gateway: G) -> Self {
        self.shared_gateway(Arc::new(gateway))
    }

    /// Uses a gateway the caller keeps a handle to.
    pub fn shared_gateway(mut self, gateway: BoxedGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn build(self) -> RuntimeResult<CubeRuntime> {
        validate_config(&self.config, false)?;
        let gateway = self.gateway.ok_or(RuntimeError::MissingGateway)?;
        Ok(CubeRuntime {
            config: self.config,
            modules: self.modules,
            gateway,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubebot_core::testing::{GatewayCall, RecordingGateway, fixtures};
    use cubebot_core::{ButtonSpec, CommandSpec};
    use cubebot_framework::{
        BoxError, HandlerResult, Initializer, InteractionContext, RegistryError, UserError,
        button, command,
    };

    async fn pong(ctx: Arc<InteractionContext>) -> HandlerResult {
        ctx.reply("Pong!").await?;
        Ok(())
    }

    async fn noop(_ctx: Arc<InteractionContext>) -> HandlerResult {
        Ok(())
    }

    static PING: ModuleDescriptor = ModuleDescriptor::new("ping", |builder| {
        builder
            .handler(command(CommandSpec::new("ping", "Ping the bot")).run(pong))
            .handler(button(ButtonSpec::new("ping-again", "Again")).run(noop));
        Ok(())
    });

    static BROKEN_INIT: ModuleDescriptor = ModuleDescriptor::new("broken", |builder| {
        builder.initializer(Initializer::new("broken", |_ctx| async {
            let err: BoxError = UserError::new("no config").into();
            Err(err)
        }));
        Ok(())
    });

    static CLASHING: ModuleDescriptor = ModuleDescriptor::new("clashing", |builder| {
        builder.handler(command(CommandSpec::new("ping", "Another ping")).run(noop));
        Ok(())
    });

    fn runtime(
        gateway: &Arc<RecordingGateway>,
        modules: &[&'static ModuleDescriptor],
    ) -> CubeRuntime {
        let mut config = CubeConfig::default();
        config.bot.token = "token".into();
        config.bot.application_id = "123".into();
        config.storage.config_dir = std::env::temp_dir();

        let mut builder = CubeRuntime::builder()
            .config(config)
            .shared_gateway(gateway.clone());
        for module in modules {
            builder = builder.module(module);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_build_without_gateway() {
        let result = CubeRuntime::builder().module(&PING).build();
        assert!(matches!(result, Err(RuntimeError::MissingGateway)));
    }

    #[tokio::test]
    async fn test_serves_until_stream_closes() {
        let gateway = Arc::new(RecordingGateway::new());
        gateway.inject(fixtures::command("1", "ping", vec![])).await;
        gateway.inject(fixtures::button("2", "missing")).await;
        gateway.close();

        runtime(&gateway, &[&PING])
            .run_until(StartMode::Connect, std::future::pending())
            .await
            .unwrap();

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().any(|c| c.content() == Some("Pong!")));
        assert!(
            calls
                .iter()
                .any(|c| c.content() == Some(cubebot_framework::REMOVED_MESSAGE))
        );
    }

    #[tokio::test]
    async fn test_deploy_registers_commands_only() {
        let gateway = Arc::new(RecordingGateway::new());
        gateway.close();

        runtime(&gateway, &[&PING])
            .run_until(StartMode::DeployThenConnect, std::future::pending())
            .await
            .unwrap();

        match &gateway.calls()[0] {
            GatewayCall::RegisterCommands { commands, guild_id } => {
                assert_eq!(commands.len(), 1);
                assert_eq!(commands[0]["name"], "ping");
                assert!(guild_id.is_none());
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deploy_failure_is_not_fatal() {
        let gateway = Arc::new(RecordingGateway::new());
        let runtime = runtime(&gateway, &[&PING]);
        let dispatcher = runtime.prepare().await.unwrap();

        gateway.fail_calls(true);
        runtime.deploy(dispatcher.registry()).await;
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_initializer_failure_aborts_before_connect() {
        let gateway = Arc::new(RecordingGateway::new());
        gateway.inject(fixtures::command("1", "ping", vec![])).await;

        let err = runtime(&gateway, &[&PING, &BROKEN_INIT])
            .run_until(StartMode::Connect, std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, RuntimeError::Init(ref e) if e.name == "broken"));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_keys_abort_startup() {
        let gateway = Arc::new(RecordingGateway::new());
        let err = runtime(&gateway, &[&PING, &CLASHING])
            .run_until(StartMode::Connect, std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Registry(RegistryError::DuplicateKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_runtime() {
        let gateway = Arc::new(RecordingGateway::new());
        runtime(&gateway, &[&PING])
            .run_until(StartMode::Connect, async {})
            .await
            .unwrap();
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deploy_requires_credentials() {
        let gateway = Arc::new(RecordingGateway::new());
        let runtime = CubeRuntime::builder()
            .module(&PING)
            .shared_gateway(gateway.clone())
            .build()
            .unwrap();
        let err = runtime
            .run_until(StartMode::DeployThenConnect, async {})
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }
}

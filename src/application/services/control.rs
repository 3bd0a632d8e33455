//! Command dispatcher
//!
//! Turns an authorized control request into a host instruction, applies the
//! expected outcome to the state cache, then notifies the operators' channel.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::application::cache::SharedStateCache;
use crate::domain::{
    CacheEffect, ControlCommand, DomainError, DomainResult, HypervisorExecutor, NotificationSink,
    Server, User,
};

/// Record command dispatch latency and outcome to Prometheus.
fn record_command(command: ControlCommand, start: Instant, ok: bool) {
    let action = command.as_str();
    metrics::histogram!("wvmc_command_latency_seconds", "command" => action)
        .record(start.elapsed().as_secs_f64());
    metrics::counter!("wvmc_commands_total", "command" => action).increment(1);
    if !ok {
        metrics::counter!("wvmc_command_failures_total", "command" => action).increment(1);
    }
}

pub struct ControlService {
    executor: Arc<dyn HypervisorExecutor>,
    cache: SharedStateCache,
    notifier: Arc<dyn NotificationSink>,
    switch_name: String,
}

impl ControlService {
    pub fn new(
        executor: Arc<dyn HypervisorExecutor>,
        cache: SharedStateCache,
        notifier: Arc<dyn NotificationSink>,
        switch_name: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            cache,
            notifier,
            switch_name: switch_name.into(),
        }
    }

    /// Run `command` against `server` on behalf of `actor`.
    ///
    /// Unknown commands fail with `Validation` before anything is executed.
    /// Executor failures are returned as-is and leave the cache alone.
    /// The host call and its cache update finish even if the caller is
    /// dropped. The notification is sent in the background and its outcome
    /// never reaches the caller.
    pub async fn execute(
        &self,
        actor: &User,
        server: &Server,
        command: &str,
    ) -> DomainResult<ControlCommand> {
        let command: ControlCommand = command.parse()?;
        let instruction = command.instruction(server, &self.switch_name);

        info!(
            user_id = %actor.id,
            server = %server.key(),
            %command,
            "Dispatching control command"
        );

        let dispatch = tokio::spawn(dispatch(
            Arc::clone(&self.executor),
            Arc::clone(&self.cache),
            server.clone(),
            command,
            instruction,
            self.switch_name.clone(),
        ));
        let result = dispatch
            .await
            .map_err(|e| DomainError::Upstream(format!("control task aborted: {}", e)))?;
        if let Err(e) = result {
            warn!(server = %server.key(), %command, error = %e, "Control command failed");
            return Err(e);
        }

        let notifier = Arc::clone(&self.notifier);
        let text = notice(actor, server, command);
        let key = server.key();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&text).await {
                warn!(server = %key, %command, error = %e, "Failed to send notification");
            }
        });

        Ok(command)
    }
}

async fn dispatch(
    executor: Arc<dyn HypervisorExecutor>,
    cache: SharedStateCache,
    server: Server,
    command: ControlCommand,
    instruction: String,
    switch_name: String,
) -> DomainResult<()> {
    let start = Instant::now();
    let result = executor.run(&instruction).await;
    record_command(command, start, result.is_ok());
    result?;

    let key = server.key();
    let updated = match command.effect(&switch_name) {
        CacheEffect::Power(state) => cache.update_state(&key, &state),
        CacheEffect::Network(network) => cache.update_network(&key, &network),
    };
    if !updated {
        info!(server = %key, "Server not cached; next refresh will pick up the change");
    }
    Ok(())
}

fn notice(actor: &User, server: &Server, command: ControlCommand) -> String {
    format!(
        "User: {} {} {}\nServer: {}\nHV: {}\nAction: {}",
        actor.email, actor.name, actor.company, server.name, server.hv, command
    )
}

//! PowerShell-backed hypervisor executor
//!
//! Runs each instruction as `<program> <args...> <instruction>` and returns
//! stdout. Hosts are addressed inside the instruction (`-ComputerName`), so
//! one executor serves every host.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::HypervisorConfig;
use crate::domain::{DomainError, DomainResult, HypervisorExecutor};

#[derive(Debug, Clone)]
pub struct PowerShellExecutor {
    program: String,
    args: Vec<String>,
}

impl PowerShellExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl From<&HypervisorConfig> for PowerShellExecutor {
    fn from(config: &HypervisorConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

#[async_trait]
impl HypervisorExecutor for PowerShellExecutor {
    async fn run(&self, instruction: &str) -> DomainResult<Vec<u8>> {
        debug!(program = %self.program, instruction, "Running host instruction");

        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(instruction).stdin(Stdio::null());

        // The child is owned by its own task and runs to completion even
        // when the caller stops waiting.
        let output = tokio::spawn(async move { command.output().await })
            .await
            .map_err(|e| DomainError::Upstream(format!("instruction task aborted: {}", e)))?
            .map_err(|e| {
                DomainError::Upstream(format!("failed to start {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            warn!(status = %output.status, stderr, "Host instruction failed");
            return Err(DomainError::Upstream(if stderr.is_empty() {
                format!("instruction exited with {}", output.status)
            } else {
                stderr.to_string()
            }));
        }

        Ok(output.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh() -> PowerShellExecutor {
        PowerShellExecutor::new("sh", vec!["-c".into()])
    }

    #[tokio::test]
    async fn test_returns_stdout() {
        let out = sh().run("printf '[]'").await.unwrap();
        assert_eq!(out, b"[]");
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let err = sh().run("echo 'access denied' >&2; exit 3").await.unwrap_err();
        assert_eq!(err, DomainError::Upstream("access denied".into()));
    }

    #[tokio::test]
    async fn test_instruction_outlives_dropped_caller() {
        let marker = std::env::temp_dir().join(format!("wvmc-{}", uuid::Uuid::new_v4()));
        let instruction = format!("sleep 0.3; touch '{}'", marker.display());

        let cut_short =
            tokio::time::timeout(std::time::Duration::from_millis(50), sh().run(&instruction))
                .await;
        assert!(cut_short.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert!(marker.exists());
        let _ = std::fs::remove_file(&marker);
    }

    #[tokio::test]
    async fn test_missing_program_is_upstream() {
        let exec = PowerShellExecutor::new("wvmc-no-such-shell", Vec::new());
        assert_eq!(exec.run("Get-VM").await.unwrap_err().kind(), "upstream");
    }
}

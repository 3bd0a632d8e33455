//! Test doubles for the outbound ports

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{DomainError, DomainResult, HypervisorExecutor, NotificationSink};

type Responder = Box<dyn Fn(&str) -> DomainResult<Vec<u8>> + Send + Sync>;

/// Executor that records every instruction and answers from a closure.
pub struct FakeExecutor {
    calls: Mutex<Vec<String>>,
    respond: Responder,
    delay: Option<Duration>,
}

impl FakeExecutor {
    pub fn new(respond: impl Fn(&str) -> DomainResult<Vec<u8>> + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
            delay: None,
        }
    }

    /// Answer only after `delay`, as a slow host would.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn ok(output: &str) -> Self {
        let output = output.as_bytes().to_vec();
        Self::new(move |_| Ok(output.clone()))
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| Err(DomainError::Upstream(message.clone())))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HypervisorExecutor for FakeExecutor {
    async fn run(&self, instruction: &str) -> DomainResult<Vec<u8>> {
        self.calls.lock().unwrap().push(instruction.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(instruction)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Messages once at least `count` have arrived, or whatever arrived within a second.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        for _ in 0..100 {
            let messages = self.messages();
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.messages()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, text: &str) -> DomainResult<()> {
        self.messages.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(DomainError::Upstream("bot unreachable".into()));
        }
        Ok(())
    }
}

/// Sink whose delivery never completes.
pub struct PendingNotifier;

#[async_trait]
impl NotificationSink for PendingNotifier {
    async fn notify(&self, _text: &str) -> DomainResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

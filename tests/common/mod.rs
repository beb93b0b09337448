//! Scripted provider stubs shared by the integration tests.

#![allow(dead_code)]

use ai_reply_rust::config::RouterConfig;
use ai_reply_rust::{GenerationPrompt, GenerationProvider, ProviderError, ProviderKind};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Reply = Result<String, ProviderError>;

/// Provider that plays back a fixed script, then repeats its last entry.
pub struct ScriptedProvider {
    kind: ProviderKind,
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    delay: Option<Duration>,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind, script: Vec<Reply>) -> Arc<Self> {
        Self::build(kind, script, None)
    }

    pub fn always(kind: ProviderKind, reply: Reply) -> Arc<Self> {
        Self::build(kind, vec![reply], None)
    }

    pub fn slow(kind: ProviderKind, reply: Reply, delay: Duration) -> Arc<Self> {
        Self::build(kind, vec![reply], Some(delay))
    }

    fn build(kind: ProviderKind, script: Vec<Reply>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            delay,
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    fn next_reply(&self) -> Reply {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        match script.pop_front() {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or_else(|| Ok("default reply".to_string())),
        }
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn name(&self) -> String {
        format!("scripted-{}", self.kind)
    }

    async fn generate(&self, prompt: &GenerationPrompt) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.text.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_reply()
    }
}

/// Default configuration with millisecond backoff so retry tests stay fast.
pub fn fast_config() -> RouterConfig {
    let mut cfg = RouterConfig::default();
    cfg.retry.base_delay_ms = 1;
    cfg.retry.max_delay_ms = 10;
    cfg
}

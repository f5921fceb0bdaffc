//! Shared fixtures for engine tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::agent::AgentUnit;
use crate::directive::RoutingDirective;
use crate::state::WorkflowState;

/// Small record with three optional integer fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TestState {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub z: Option<i64>,
}

impl WorkflowState for TestState {
    type Patch = TestState;

    fn apply(&mut self, patch: TestState) {
        if patch.x.is_some() {
            self.x = patch.x;
        }
        if patch.y.is_some() {
            self.y = patch.y;
        }
        if patch.z.is_some() {
            self.z = patch.z;
        }
    }

    fn written_fields(patch: &TestState) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if patch.x.is_some() {
            fields.push("x");
        }
        if patch.y.is_some() {
            fields.push("y");
        }
        if patch.z.is_some() {
            fields.push("z");
        }
        fields
    }
}

/// Empty patch
pub(crate) fn patch() -> TestState {
    TestState::default()
}

type Script = Box<dyn Fn(&TestState) -> RoutingDirective<TestState> + Send + Sync>;

/// Unit that sleeps, counts its invocations, then runs a closure
pub(crate) struct Scripted {
    delay: Duration,
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&TestState) -> RoutingDirective<TestState> + Send + Sync + 'static,
    {
        Self {
            delay: Duration::ZERO,
            script: Box::new(script),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn delayed<F>(millis: u64, script: F) -> Self
    where
        F: Fn(&TestState) -> RoutingDirective<TestState> + Send + Sync + 'static,
    {
        Self {
            delay: Duration::from_millis(millis),
            ..Self::new(script)
        }
    }

    pub fn counted(mut self, calls: &Arc<AtomicUsize>) -> Self {
        self.calls = Arc::clone(calls);
        self
    }
}

#[async_trait]
impl AgentUnit<TestState> for Scripted {
    async fn run(&self, state: &TestState) -> RoutingDirective<TestState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.script)(state)
    }
}

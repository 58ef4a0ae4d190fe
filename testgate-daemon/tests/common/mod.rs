//! Shared test helpers: in-memory collaborators and inbound notifications.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use testgate_core::event::{CloudEvent, EVENT_TYPE_DEPLOYMENT_FINISHED};
use testgate_core::types::TestParameters;
use testgate_integrations::{
    ConfigLookup, EventBus, IntegrationError, ReadinessProber, SourceFetcher, TestExecutor,
};
use testgate_orchestrator::{TestOrchestrator, TestOrchestratorBuilder};

pub struct ReadyProber;

impl ReadinessProber for ReadyProber {
    async fn wait_until_ready(&self, _: &str, _: &str) -> Result<(), IntegrationError> {
        Ok(())
    }
}

pub struct FixedLookup;

impl ConfigLookup for FixedLookup {
    async fn lookup(&self, _: &str, _: &str, _: &str) -> Result<String, IntegrationError> {
        Ok("10.0.0.1.xip.io".to_owned())
    }
}

pub struct LocalSource;

impl SourceFetcher for LocalSource {
    async fn fetch(
        &self,
        _org: &str,
        service: &str,
        dest_root: &Path,
    ) -> Result<PathBuf, IntegrationError> {
        Ok(dest_root.join(service))
    }
}

/// Executor returning a fixed verdict, optionally after a delay.
pub struct FixedExecutor {
    pub verdict: bool,
    pub delay: Option<Duration>,
}

impl TestExecutor for FixedExecutor {
    async fn execute(&self, _params: &TestParameters) -> Result<bool, IntegrationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.verdict)
    }
}

#[derive(Default)]
pub struct RecordingBus {
    pub events: Mutex<Vec<CloudEvent>>,
}

impl RecordingBus {
    pub fn events(&self) -> Vec<CloudEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventBus for RecordingBus {
    async fn publish(&self, event: &CloudEvent) -> Result<(), IntegrationError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub type TestDaemonOrchestrator =
    TestOrchestrator<ReadyProber, FixedLookup, LocalSource, FixedExecutor, RecordingBus>;

pub fn orchestrator(
    work_dir: &Path,
    executor: FixedExecutor,
    bus: Arc<RecordingBus>,
) -> Arc<TestDaemonOrchestrator> {
    Arc::new(
        TestOrchestratorBuilder::new()
            .work_dir(work_dir)
            .prober(Arc::new(ReadyProber))
            .config_lookup(Arc::new(FixedLookup))
            .source_fetcher(Arc::new(LocalSource))
            .executor(Arc::new(executor))
            .event_bus(bus)
            .build()
            .unwrap(),
    )
}

pub fn passing() -> FixedExecutor {
    FixedExecutor {
        verdict: true,
        delay: None,
    }
}

pub fn deployment_data() -> Value {
    json!({
        "githuborg": "keptn-sockshop",
        "project": "sockshop",
        "teststrategy": "functional",
        "deploymentstrategy": "direct",
        "stage": "dev",
        "service": "carts",
        "image": "docker.io/keptnexamples/carts",
        "tag": "0.8.1"
    })
}

/// Structured-mode envelope body.
pub fn structured_envelope(event_type: &str, context: &str, data: Value) -> Vec<u8> {
    json!({
        "specversion": "0.2",
        "id": "6de83495-4f83-481c-8dbe-fcceb2e0243b",
        "type": event_type,
        "source": "helm-service",
        "contenttype": "application/json",
        "shkeptncontext": context,
        "data": data
    })
    .to_string()
    .into_bytes()
}

pub fn deployment_finished(context: &str) -> Vec<u8> {
    structured_envelope(EVENT_TYPE_DEPLOYMENT_FINISHED, context, deployment_data())
}

/// Poll until `done` holds or two seconds pass.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

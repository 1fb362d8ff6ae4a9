//! A scripted `ConnectorClient` fixture: canned responses plus injectable
//! failures, no HTTP server involved.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use comradarr_core::{
    CommandStatus, Command, ConnectorClient, HealthEntry, SearchOutcome, SystemStatus,
    UpstreamError,
};
use comradarr_types::ConnectorKind;

/// What the mock client does on its next `send_search` call.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Success,
    NoResults,
    Fail(UpstreamError),
}

/// A `ConnectorClient` driven entirely by a pre-loaded queue of responses.
///
/// Each call to `send_search` pops the front of the queue; an exhausted
/// queue makes every subsequent call return `Success` so long-running tests
/// don't need to script every pass.
pub struct MockConnectorClient {
    kind: ConnectorKind,
    script: Mutex<VecDeque<ScriptedResponse>>,
    calls: Mutex<Vec<Command>>,
}

impl MockConnectorClient {
    #[must_use]
    pub fn new(kind: ConnectorKind) -> Self {
        Self {
            kind,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_script(kind: ConnectorKind, script: Vec<ScriptedResponse>) -> Self {
        Self {
            kind,
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `Command` this client has been asked to send, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Command> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConnectorClient for MockConnectorClient {
    async fn ping(&self) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn system_status(&self) -> Result<SystemStatus, UpstreamError> {
        let app_name = match self.kind {
            ConnectorKind::KindA => "Sonarr",
            ConnectorKind::KindB => "Radarr",
            ConnectorKind::KindC => "Lidarr",
        };
        Ok(SystemStatus {
            app_name: app_name.to_string(),
            version: "1.0.0".to_string(),
        })
    }

    async fn health(&self) -> Result<Vec<HealthEntry>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn send_search(&self, command: &Command) -> Result<SearchOutcome, UpstreamError> {
        self.calls.lock().unwrap().push(command.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            None | Some(ScriptedResponse::Success) => Ok(SearchOutcome::Success),
            Some(ScriptedResponse::NoResults) => Ok(SearchOutcome::NoResults),
            Some(ScriptedResponse::Fail(err)) => Err(err),
        }
    }

    async fn get_command(&self, id: i64) -> Result<CommandStatus, UpstreamError> {
        Ok(CommandStatus { id, status: "completed".to_string() })
    }

    fn kind(&self) -> ConnectorKind {
        self.kind
    }
}

//! Background page loads
//!
//! A load is launch → navigate → extract → close against a [`BrowserBackend`].
//! [`AutomationWorker::spawn`] runs one load on its own tokio task and hands
//! the result back to the shell as a [`ShellEvent::LoadFinished`]; the worker
//! never touches the model or the code buffer.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::errors::LoadFailure;
use crate::paths::{build_records, RawDomNode};
use crate::shell::ShellEvent;
use crate::types::ElementRecord;

/// Default bound on a single navigation
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Walks the document and reports tag, attributes, effective value and children
pub const EXTRACTION_SCRIPT: &str = r#"
function walk(el) {
    var value = (typeof el.value === 'string' && el.value !== '') ? el.value : (el.textContent || '');
    return {
        tag: el.tagName.toLowerCase(),
        id: el.id || '',
        name: el.getAttribute('name') || '',
        type: el.getAttribute('type') || '',
        value: value.slice(0, 2000),
        children: Array.prototype.map.call(el.children, walk)
    };
}
if (!document.documentElement) {
    return null;
}
return walk(document.documentElement);
"#;

/// Starts browser sessions
pub trait BrowserBackend: Send + Sync + 'static {
    type Session: BrowserSession;

    fn launch(&self) -> impl Future<Output = anyhow::Result<Self::Session>> + Send;
}

/// One live browser session, used for a single load
pub trait BrowserSession: Send + Sized + 'static {
    fn navigate(&mut self, url: &Url) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Run `script` as a function body and return its JSON result
    fn evaluate(&mut self, script: &str) -> impl Future<Output = anyhow::Result<Value>> + Send;

    fn close(self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub navigation_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }
}

/// Identifies one requested load so late results can be told apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(Uuid);

impl LoadTicket {
    pub fn new() -> Self {
        LoadTicket(Uuid::new_v4())
    }
}

impl Default for LoadTicket {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct AutomationWorker<B> {
    backend: Arc<B>,
    config: WorkerConfig,
}

impl<B> Clone for AutomationWorker<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
        }
    }
}

impl<B: BrowserBackend> AutomationWorker<B> {
    pub fn new(backend: B, config: WorkerConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Load `url` and return the document's element tree
    ///
    /// The session is always closed once launched; a close failure is logged
    /// and never replaces the load outcome.
    pub async fn run(&self, url: &Url) -> Result<ElementRecord, LoadFailure> {
        info!("Loading {}", url);

        let mut session = self
            .backend
            .launch()
            .await
            .map_err(|e| LoadFailure::Launch(format!("{:#}", e)))?;

        let outcome = self.extract(&mut session, url).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {:#}", e);
        }

        match &outcome {
            Ok(root) => info!("Extracted {} elements from {}", root.count(), url),
            Err(e) => warn!("Load of {} failed: {}", url, e),
        }
        outcome
    }

    async fn extract(
        &self,
        session: &mut B::Session,
        url: &Url,
    ) -> Result<ElementRecord, LoadFailure> {
        let limit = self.config.navigation_timeout;
        match tokio::time::timeout(limit, session.navigate(url)).await {
            Err(_) => {
                return Err(LoadFailure::Timeout {
                    url: url.to_string(),
                    timeout: limit,
                });
            }
            Ok(Err(e)) => {
                return Err(LoadFailure::Navigate {
                    url: url.to_string(),
                    message: format!("{:#}", e),
                });
            }
            Ok(Ok(())) => debug!("Navigation to {} finished", url),
        }

        let raw = session
            .evaluate(EXTRACTION_SCRIPT)
            .await
            .map_err(|e| LoadFailure::Extract(format!("{:#}", e)))?;

        parse_extraction(raw)
    }

    /// Run a load on its own task and post the result to `events`
    pub fn spawn(
        &self,
        ticket: LoadTicket,
        url: Url,
        events: UnboundedSender<ShellEvent>,
    ) -> JoinHandle<()> {
        let worker = self.clone();
        tokio::spawn(async move {
            let result = worker.run(&url).await;
            if events
                .send(ShellEvent::LoadFinished { ticket, result })
                .is_err()
            {
                debug!("Shell went away before load {} finished", ticket);
            }
        })
    }
}

/// Turn the extraction script's result into an element tree
///
/// Accepts the object itself or a JSON string holding it.
pub fn parse_extraction(raw: Value) -> Result<ElementRecord, LoadFailure> {
    let raw = match raw {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| LoadFailure::Extract(format!("Script returned invalid JSON: {}", e)))?,
        other => other,
    };

    match raw {
        Value::Object(_) => {}
        Value::Null => {
            return Err(LoadFailure::Extract("Page has no document element".into()));
        }
        other => {
            return Err(LoadFailure::Extract(format!(
                "Expected an element object, got {}",
                json_kind(&other)
            )));
        }
    }

    let root: RawDomNode = serde_json::from_value(raw)
        .map_err(|e| LoadFailure::Extract(format!("Unexpected element shape: {}", e)))?;
    Ok(build_records(&root))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod worker_test;

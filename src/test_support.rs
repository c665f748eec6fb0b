//! In-memory browser backend shared by unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};
use url::Url;

use crate::worker::{BrowserBackend, BrowserSession};

/// Scripted pages: URL → extraction result, or the evaluation error to raise
type Pages = HashMap<String, std::result::Result<Value, String>>;

#[derive(Default)]
pub struct FakeBackend {
    pages: Arc<Pages>,
    launch_error: Option<String>,
    navigate_delay: Duration,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, result: Value) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), Ok(result));
        self
    }

    pub fn with_broken_script(mut self, url: &str, message: &str) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn failing_launch(mut self, message: &str) -> Self {
        self.launch_error = Some(message.to_string());
        self
    }

    pub fn with_navigate_delay(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }

    pub fn launch_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.launches)
    }

    pub fn close_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

pub struct FakeSession {
    pages: Arc<Pages>,
    navigate_delay: Duration,
    current: Option<String>,
    closes: Arc<AtomicUsize>,
}

impl BrowserBackend for FakeBackend {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.launch_error {
            bail!("{}", message);
        }
        Ok(FakeSession {
            pages: Arc::clone(&self.pages),
            navigate_delay: self.navigate_delay,
            current: None,
            closes: Arc::clone(&self.closes),
        })
    }
}

impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        if !self.navigate_delay.is_zero() {
            tokio::time::sleep(self.navigate_delay).await;
        }
        if !self.pages.contains_key(url.as_str()) {
            bail!("net::ERR_NAME_NOT_RESOLVED at {}", url);
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn evaluate(&mut self, _script: &str) -> Result<Value> {
        let current = self.current.as_ref().ok_or_else(|| anyhow!("No page loaded"))?;
        match self.pages.get(current) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(anyhow!("{}", message)),
            None => Err(anyhow!("No page loaded")),
        }
    }

    async fn close(self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Raw extraction result for a small login page
///
/// Row paths: `0` html, `0.0` head, `0.1` body, `0.1.0` form#login,
/// `0.1.0.0` input[name=user], `0.1.0.1` input#pw, `0.1.0.2` checkbox,
/// `0.1.0.3` select[name=country], `0.1.0.4` button, `0.1.1` and `0.1.2` divs.
pub fn login_page() -> Value {
    json!({
        "tag": "html", "id": "", "name": "", "type": "", "value": "",
        "children": [
            {
                "tag": "head", "id": "", "name": "", "type": "", "value": "Login",
                "children": [
                    { "tag": "title", "id": "", "name": "", "type": "", "value": "Login", "children": [] }
                ]
            },
            {
                "tag": "body", "id": "", "name": "", "type": "", "value": "Sign in",
                "children": [
                    {
                        "tag": "form", "id": "login", "name": "", "type": "", "value": "",
                        "children": [
                            { "tag": "input", "id": "", "name": "user", "type": "text", "value": "", "children": [] },
                            { "tag": "input", "id": "pw", "name": "password", "type": "password", "value": "", "children": [] },
                            { "tag": "input", "id": "", "name": "", "type": "checkbox", "value": "on", "children": [] },
                            { "tag": "select", "id": "", "name": "country", "type": "", "value": "", "children": [] },
                            { "tag": "button", "id": "", "name": "", "type": "submit", "value": "Sign in", "children": [] }
                        ]
                    },
                    { "tag": "div", "id": "", "name": "", "type": "", "value": "first", "children": [] },
                    { "tag": "div", "id": "", "name": "", "type": "", "value": "second", "children": [] }
                ]
            }
        ]
    })
}

/// Raw extraction result for a page with a single heading
pub fn heading_page(text: &str) -> Value {
    json!({
        "tag": "html",
        "children": [
            { "tag": "head", "children": [] },
            {
                "tag": "body",
                "value": text,
                "children": [ { "tag": "h1", "id": "title", "value": text, "children": [] } ]
            }
        ]
    })
}

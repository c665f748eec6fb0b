// Common test utilities and fixtures

#![allow(dead_code)]

pub mod server;

use std::collections::HashMap;
use std::process::{Command, Output};

use anyhow::{Result, bail};
use serde_json::Value;
use url::Url;
use webscribe::worker::{BrowserBackend, BrowserSession};

/// Browser backend that serves canned extraction results by URL
#[derive(Default)]
pub struct CannedBackend {
    pages: HashMap<String, Value>,
}

impl CannedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, raw: Value) -> Self {
        self.pages.insert(url.to_string(), raw);
        self
    }
}

pub struct CannedSession {
    pages: HashMap<String, Value>,
    current: Option<Value>,
}

impl BrowserBackend for CannedBackend {
    type Session = CannedSession;

    async fn launch(&self) -> Result<CannedSession> {
        Ok(CannedSession {
            pages: self.pages.clone(),
            current: None,
        })
    }
}

impl BrowserSession for CannedSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        match self.pages.get(url.as_str()) {
            Some(page) => {
                self.current = Some(page.clone());
                Ok(())
            }
            None => bail!("Reached error page: about:neterror for {}", url),
        }
    }

    async fn evaluate(&mut self, _script: &str) -> Result<Value> {
        Ok(self.current.clone().unwrap_or(Value::Null))
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}

/// Extraction results as the in-page script would report them
pub mod fixtures {
    use serde_json::{Value, json};

    pub fn search_page() -> Value {
        json!({
            "tag": "html",
            "children": [
                { "tag": "head", "children": [ { "tag": "title", "value": "Search" } ] },
                {
                    "tag": "body",
                    "children": [
                        { "tag": "input", "name": "q", "type": "search", "value": "" },
                        { "tag": "button", "id": "go", "value": "Search" },
                        { "tag": "p", "value": "  Results   appear\n here " },
                        { "tag": "p", "value": null }
                    ]
                }
            ]
        })
    }
}

/// Helper to run webscribe CLI commands
pub fn run_webscribe(args: &[&str]) -> Output {
    let binary_path = env!("CARGO_BIN_EXE_webscribe");
    Command::new(binary_path)
        .args(args)
        .output()
        .expect("Failed to execute webscribe command")
}

//! # webscribe
#![allow(clippy::uninlined_format_args)]
//!
//! Interactive shell that loads a page in a WebDriver browser, snapshots its
//! DOM into a tree of element records and turns selected elements into
//! Playwright (Python, sync API) test steps.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Start the shell, optionally loading a page right away
//! webscribe shell example.com
//!
//! # Print the element tree with row paths
//! webscribe snapshot "https://example.com" --format simple
//!
//! # Full snapshot as JSON
//! webscribe snapshot "https://example.com" --format json | jq '.elements[0].children | length'
//!
//! # Generate a script with steps for two elements
//! webscribe generate "https://example.com/login" --select 0.1.0.0 --select 0.1.0.4 > test_login.py
//! ```
//!
//! ### Shell session
//!
//! ```text
//! webscribe> load example.com/login
//! webscribe> tree
//! webscribe> select 0.1.0.0
//! webscribe> assert 0.1.0.4
//! webscribe> save test_login.py
//! ```
//!
//! ### Browser options
//!
//! ```bash
//! # Chrome instead of Firefox (default), visible window, custom viewport
//! webscribe --browser chrome --no-headless --viewport 1280x800 shell
//!
//! # Reuse a WebDriver server that is already running
//! webscribe --webdriver-url http://localhost:4444 snapshot example.com
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use webscribe::codegen::{selector_for, snippet_for};
//! use webscribe::webdriver::{BrowserConfig, WebDriverBackend};
//! use webscribe::worker::{AutomationWorker, WorkerConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let worker = AutomationWorker::new(
//!     WebDriverBackend::new(BrowserConfig::default()),
//!     WorkerConfig::default(),
//! );
//! let url = url::Url::parse("https://example.com/")?;
//! let html = worker.run(&url).await?;
//!
//! if let Some(selector) = selector_for(&html.children[1]) {
//!     println!("{}", snippet_for(&html.children[1], &selector));
//! }
//! # Ok(())
//! # }
//! ```

/// Playwright code generation
pub mod codegen;

/// Error types and exit codes
pub mod errors;

/// XPath/CSS derivation for extracted elements
pub mod paths;

/// Shell controller, commands and the view trait
pub mod shell;

/// Tree model of the current snapshot
pub mod snapshot;

/// Terminal front end
pub mod terminal;

/// Type definitions for element records
pub mod types;

/// WebDriver browser control
pub mod webdriver;

/// Automatic WebDriver process management
pub mod webdriver_manager;

/// Background page loads
pub mod worker;

#[cfg(test)]
mod test_support;

pub use codegen::{AssertionList, CodeBuffer, SelectorChoice};
pub use errors::{LoadFailure, ScribeError};
pub use shell::{ShellCommand, ShellController, ShellEvent, ShellView};
pub use snapshot::{ModelIndex, NodeId, SnapshotModel};
pub use types::{ElementRecord, OutputFormat, ViewportSize};
pub use webdriver::{Browser, BrowserConfig, BrowserType, WebDriverBackend};
pub use worker::{AutomationWorker, BrowserBackend, BrowserSession, LoadTicket, WorkerConfig};

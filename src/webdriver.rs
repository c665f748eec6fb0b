use anyhow::{Context, Result};
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, info};
use url::Url;

use crate::types::ViewportSize;
use crate::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;
use crate::worker::{BrowserBackend, BrowserSession};

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    /// Name of the WebDriver executable for this browser
    pub fn driver_name(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }

    /// Port the driver listens on when started by hand
    pub fn default_port(&self) -> u16 {
        match self {
            BrowserType::Firefox => 4444,
            BrowserType::Chrome => 9515,
        }
    }
}

/// How browser sessions are launched
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub browser_type: BrowserType,
    pub headless: bool,
    pub viewport: Option<ViewportSize>,
    /// Use this WebDriver server instead of a managed one
    pub webdriver_url: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser_type: BrowserType::Firefox,
            headless: true,
            viewport: None,
            webdriver_url: None,
        }
    }
}

impl BrowserConfig {
    /// WebDriver capabilities for this configuration
    ///
    /// Chrome sessions point `--user-data-dir` at `chrome_profile` when given.
    pub fn capabilities(
        &self,
        chrome_profile: Option<&Path>,
    ) -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();

        match self.browser_type {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if self.headless {
                    args.push("--headless".to_string());
                }
                if let Some(vp) = &self.viewport {
                    args.push(format!("--width={}", vp.width));
                    args.push(format!("--height={}", vp.height));
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if self.headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                if let Some(vp) = &self.viewport {
                    args.push(format!("--window-size={},{}", vp.width, vp.height));
                }
                if let Some(dir) = chrome_profile {
                    args.push(format!("--user-data-dir={}", dir.display()));
                }

                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }

        caps
    }

    /// Fresh profile directory for one session, removed when dropped
    ///
    /// Chrome refuses to share a profile directory between sessions.
    pub fn session_profile_dir(&self) -> Result<Option<TempDir>> {
        match self.browser_type {
            BrowserType::Chrome => {
                let dir = tempfile::Builder::new()
                    .prefix("webscribe-chrome-")
                    .tempdir()
                    .context("Failed to create Chrome profile directory")?;
                Ok(Some(dir))
            }
            BrowserType::Firefox => Ok(None),
        }
    }
}

/// One WebDriver browser session
pub struct Browser {
    client: Client,
    browser_type: BrowserType,
    profile_dir: Option<TempDir>,
}

impl Browser {
    /// Connect a new session according to `config`
    pub async fn new(config: &BrowserConfig) -> Result<Self> {
        info!("Connecting to {:?} WebDriver", config.browser_type);

        let webdriver_url = match &config.webdriver_url {
            Some(url) => url.clone(),
            None => {
                GLOBAL_WEBDRIVER_MANAGER
                    .ensure_driver(&config.browser_type)
                    .await?
            }
        };

        debug!("Connecting to WebDriver at {}", webdriver_url);

        let profile_dir = config.session_profile_dir()?;
        let capabilities = config.capabilities(profile_dir.as_ref().map(TempDir::path));

        let client = ClientBuilder::rustls()
            .capabilities(capabilities)
            .connect(&webdriver_url)
            .await
            .with_context(|| format!("Failed to connect to WebDriver at {}", webdriver_url))?;

        if let Some(vp) = &config.viewport {
            debug!("Setting viewport to {}x{}", vp.width, vp.height);
            if let Err(e) = client.set_window_size(vp.width, vp.height).await {
                // Best-effort: some drivers reject resizing headless windows
                debug!("Note: Could not set window size: {}", e);
            }
        }

        Ok(Browser {
            client,
            browser_type: config.browser_type,
            profile_dir,
        })
    }

    pub fn browser_type(&self) -> BrowserType {
        self.browser_type
    }

    /// Navigate and wait (up to two seconds) for `document.readyState` to settle
    pub async fn goto(&self, url: &str) -> Result<()> {
        info!("Navigating to {}", url);

        self.client.goto(url).await?;

        let wait_script = "return document.readyState === 'complete';";
        for _ in 0..20 {
            match self.client.execute(wait_script, vec![]).await {
                Ok(val) if val.as_bool().unwrap_or(false) => break,
                _ => tokio::time::sleep(tokio::time::Duration::from_millis(100)).await,
            }
        }

        Ok(())
    }

    /// Run `script` as a function body in the page and return its result
    pub async fn execute_javascript(&self, script: &str) -> Result<serde_json::Value> {
        self.client
            .execute(script, vec![])
            .await
            .context("Script evaluation failed")
    }

    /// End the WebDriver session and remove its profile directory
    pub async fn quit(self) -> Result<()> {
        let closed = self
            .client
            .close()
            .await
            .context("Failed to close WebDriver session");

        if let Some(dir) = self.profile_dir {
            debug!("Removing browser profile {}", dir.path().display());
            if let Err(e) = dir.close() {
                debug!("Could not remove browser profile: {}", e);
            }
        }

        closed
    }
}

impl BrowserSession for Browser {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.goto(url.as_str()).await
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        self.execute_javascript(script).await
    }

    async fn close(self) -> Result<()> {
        self.quit().await
    }
}

/// Launches fantoccini sessions for the automation worker
#[derive(Debug, Clone)]
pub struct WebDriverBackend {
    config: BrowserConfig,
}

impl WebDriverBackend {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

impl BrowserBackend for WebDriverBackend {
    type Session = Browser;

    async fn launch(&self) -> Result<Browser> {
        Browser::new(&self.config).await
    }
}

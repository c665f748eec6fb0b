use anyhow::{Context, Result};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::webdriver::BrowserType;

/// How long a freshly spawned driver gets to answer `/status`
const STARTUP_ATTEMPTS: u32 = 30;
const STARTUP_POLL: Duration = Duration::from_millis(100);

/// Starts WebDriver servers on demand and stops them at exit
#[derive(Default)]
pub struct WebDriverManager {
    drivers: Mutex<Vec<ManagedDriver>>,
}

struct ManagedDriver {
    browser_type: BrowserType,
    child: Child,
    port: u16,
    url: String,
}

impl WebDriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the URL of a ready driver for `browser_type`, starting one if needed
    pub async fn ensure_driver(&self, browser_type: &BrowserType) -> Result<String> {
        let managed: Vec<String> = self
            .lock_drivers()
            .iter()
            .filter(|d| d.browser_type == *browser_type)
            .map(|d| d.url.clone())
            .collect();

        for url in managed {
            if Self::verify_driver_working(&url).await {
                debug!("Using existing managed WebDriver at {}", url);
                return Ok(url);
            }
        }

        let external = format!("http://localhost:{}", browser_type.default_port());
        if Self::verify_driver_working(&external).await {
            debug!("Found external WebDriver at {}", external);
            return Ok(external);
        }

        info!("WebDriver not detected, attempting to start automatically...");
        self.start_driver(browser_type).await
    }

    async fn start_driver(&self, browser_type: &BrowserType) -> Result<String> {
        let command = browser_type.driver_name();
        let port = Self::find_free_port_for_browser(browser_type)?;
        let args = match browser_type {
            BrowserType::Firefox => vec!["--port".to_string(), port.to_string()],
            BrowserType::Chrome => vec![format!("--port={}", port)],
        };

        if !Self::command_exists(command) {
            anyhow::bail!(
                "{} not found in PATH. Please install it:\n\
                  macOS: brew install {}\n\
                  Linux: Download from official releases\n\
                  Or pass --webdriver-url to use a running WebDriver server",
                command,
                command
            );
        }

        info!("Starting {} on port {}", command, port);

        let mut cmd = Command::new(command);
        cmd.args(&args).stdout(Stdio::null()).stderr(Stdio::null());

        // Own process group so stopping the driver also stops its browsers
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to start {}", command))?;

        let url = format!("http://localhost:{}", port);
        self.lock_drivers().push(ManagedDriver {
            browser_type: *browser_type,
            child,
            port,
            url: url.clone(),
        });

        for attempt in 1..=STARTUP_ATTEMPTS {
            if Self::is_driver_running(&url).await {
                info!("WebDriver started successfully on port {}", port);
                return Ok(url);
            }
            if attempt < STARTUP_ATTEMPTS {
                sleep(STARTUP_POLL).await;
            }
        }

        self.stop_port(port);
        anyhow::bail!("WebDriver failed to start within timeout")
    }

    fn lock_drivers(&self) -> std::sync::MutexGuard<'_, Vec<ManagedDriver>> {
        // A poisoned list is still a valid list of children to clean up
        self.drivers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check if a command exists in PATH
    pub fn command_exists(command: &str) -> bool {
        let finder = if cfg!(windows) { "where" } else { "which" };
        Command::new(finder)
            .arg(command)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Find a free port, preferring the driver's conventional ones
    pub fn find_free_port_for_browser(browser_type: &BrowserType) -> Result<u16> {
        let base = browser_type.default_port();
        for port in base..base + 3 {
            if !Self::is_port_in_use(port) {
                debug!("Found free port {} for {:?}", port, browser_type);
                return Ok(port);
            }
            debug!("Port {} is in use for {:?}", port, browser_type);
        }

        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);
        Ok(port)
    }

    /// Check if a port is in use
    pub fn is_port_in_use(port: u16) -> bool {
        std::net::TcpListener::bind(("127.0.0.1", port)).is_err()
    }

    /// Check if a WebDriver answers on `url`
    pub async fn is_driver_running(url: &str) -> bool {
        Self::status(url).await.is_some()
    }

    /// Check that the driver reports `ready: true`
    async fn verify_driver_working(url: &str) -> bool {
        Self::status(url)
            .await
            .and_then(|body| body.get("value")?.get("ready")?.as_bool())
            .unwrap_or(false)
    }

    async fn status(url: &str) -> Option<serde_json::Value> {
        let response = reqwest::Client::new()
            .get(format!("{}/status", url))
            .timeout(Duration::from_secs(1))
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json::<serde_json::Value>().await.ok()
    }

    fn stop_port(&self, port: u16) {
        let mut drivers = self.lock_drivers();
        if let Some(index) = drivers.iter().position(|d| d.port == port) {
            let mut driver = drivers.remove(index);
            Self::terminate(&mut driver);
        }
    }

    fn terminate(driver: &mut ManagedDriver) {
        debug!("Stopping WebDriver on port {}", driver.port);

        #[cfg(unix)]
        Self::kill_process_group(driver.child.id() as i32);

        if let Err(e) = driver.child.kill() {
            debug!("Driver on port {} already gone: {}", driver.port, e);
        }
        let _ = driver.child.wait();
    }

    #[cfg(unix)]
    fn kill_process_group(pgid: i32) {
        for signal in ["-TERM", "-KILL"] {
            if let Err(e) = Command::new("kill")
                .args([signal, &format!("-{}", pgid)])
                .output()
            {
                warn!("Failed to signal process group {}: {}", pgid, e);
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    /// Number of drivers this manager started and still tracks
    pub fn managed_count(&self) -> usize {
        self.lock_drivers().len()
    }

    /// Stop all managed WebDriver processes
    pub fn stop_all(&self) {
        let mut drivers = self.lock_drivers();
        for driver in drivers.iter_mut() {
            Self::terminate(driver);
        }
        drivers.clear();
    }
}

impl Drop for WebDriverManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

// Global WebDriver manager instance
lazy_static::lazy_static! {
    pub static ref GLOBAL_WEBDRIVER_MANAGER: WebDriverManager = WebDriverManager::new();
}

#[cfg(test)]
#[path = "webdriver_manager_test.rs"]
mod webdriver_manager_test;

use super::config::BrowserConfig;
use super::manager::{BrowserError, BrowserManager};
use crate::credentials::StoredCookie;
use crate::stealth::{fingerprint_script, FingerprintConfig};
use headless_chrome::protocol::cdp::{Network, Page};
use headless_chrome::types::Bounds;
use headless_chrome::Tab;
use serde_json::{json, Value};
use std::sync::Arc;

/// Everything the capture pipeline needs from a browser.
///
/// One navigation is in flight at a time; implementations are driven
/// from a single thread.
pub trait PageDriver {
    /// Navigate and wait for the navigation to commit
    fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    fn current_url(&self) -> String;

    /// Serialized DOM of the current page
    fn content(&self) -> Result<String, BrowserError>;

    /// Whether an element matching the CSS selector is present right now
    fn has_element(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Run a script in page context and return its value (`Null` if none)
    fn evaluate(&self, script: &str) -> Result<Value, BrowserError>;

    fn set_window_size(&self, width: u32, height: u32) -> Result<(), BrowserError>;

    /// PNG of the current viewport
    fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    fn cookies(&self) -> Result<Vec<StoredCookie>, BrowserError>;

    fn add_cookie(&self, cookie: &StoredCookie) -> Result<(), BrowserError>;

    fn type_into(&self, selector: &str, text: &str) -> Result<(), BrowserError>;

    fn click(&self, selector: &str) -> Result<(), BrowserError>;
}

/// Starts browsers. Split from the driver so the session state machine
/// can relaunch in a different mode.
pub trait Launcher {
    type Driver: PageDriver;

    fn launch(&self, config: &BrowserConfig) -> Result<Self::Driver, BrowserError>;
}

/// Launches real Chrome instances
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    pub fingerprint: FingerprintConfig,
}

impl Launcher for ChromeLauncher {
    type Driver = ChromeDriver;

    fn launch(&self, config: &BrowserConfig) -> Result<ChromeDriver, BrowserError> {
        ChromeDriver::launch(config.clone(), &self.fingerprint)
    }
}

/// `PageDriver` backed by a headless_chrome tab
pub struct ChromeDriver {
    // Keeps the Chrome process alive as long as the tab is used
    _manager: BrowserManager,
    tab: Arc<Tab>,
    stealth_script: Option<String>,
}

impl ChromeDriver {
    pub fn launch(
        config: BrowserConfig,
        fingerprint: &FingerprintConfig,
    ) -> Result<Self, BrowserError> {
        let stealth_script = config.stealth.then(|| fingerprint_script(fingerprint));
        let (width, height) = config.window_size;
        let manager = BrowserManager::new(config)?;
        let tab = manager.new_tab()?;

        let driver = Self {
            _manager: manager,
            tab,
            stealth_script,
        };
        driver.set_window_size(width, height)?;
        Ok(driver)
    }

    fn inject_stealth(&self) {
        if let Some(script) = &self.stealth_script {
            if let Err(e) = self.tab.evaluate(script, false) {
                log::warn!("Fingerprint masking failed (continuing): {}", e);
            }
        }
    }

    /// Get a reference to the underlying tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }
}

impl PageDriver for ChromeDriver {
    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.tab
            .navigate_to(url)
            .map_err(|e| BrowserError::NavigationError(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationError(format!("Navigation timeout for {}: {}", url, e)))?;

        self.inject_stealth();
        Ok(())
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn content(&self) -> Result<String, BrowserError> {
        self.tab
            .get_content()
            .map_err(|e| BrowserError::HtmlExtractionError(e.to_string()))
    }

    fn has_element(&self, selector: &str) -> Result<bool, BrowserError> {
        let script = format!(
            "document.querySelector({}) !== null",
            Value::String(selector.to_string())
        );
        Ok(self.evaluate(&script)?.as_bool() == Some(true))
    }

    fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        Ok(result.value.unwrap_or(Value::Null))
    }

    fn set_window_size(&self, width: u32, height: u32) -> Result<(), BrowserError> {
        self.tab
            .set_bounds(Bounds::Normal {
                left: Some(0),
                top: Some(0),
                width: Some(width as f64),
                height: Some(height as f64),
            })
            .map_err(|e| BrowserError::JavaScriptError(format!("Resize to {}x{} failed: {}", width, height, e)))?;
        Ok(())
    }

    fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| BrowserError::ScreenshotError(e.to_string()))
    }

    fn cookies(&self) -> Result<Vec<StoredCookie>, BrowserError> {
        let cookies = self
            .tab
            .get_cookies()
            .map_err(|e| BrowserError::CookieError(format!("Failed to get cookies: {}", e)))?;

        Ok(cookies
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expiry: Some(c.expires).filter(|e| *e > 0.0),
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect())
    }

    fn add_cookie(&self, cookie: &StoredCookie) -> Result<(), BrowserError> {
        // Fields not listed here deserialize to None
        let mut raw = json!({
            "name": cookie.name,
            "value": cookie.value,
            "domain": cookie.domain,
            "path": cookie.path,
            "secure": cookie.secure,
            "httpOnly": cookie.http_only,
        });
        if let Some(expiry) = cookie.normalized_expiry() {
            raw["expires"] = json!(expiry as f64);
        }
        let param: Network::CookieParam = serde_json::from_value(raw)
            .map_err(|e| BrowserError::CookieError(format!("Cookie {} is invalid: {}", cookie.name, e)))?;

        self.tab
            .set_cookies(vec![param])
            .map_err(|e| BrowserError::CookieError(format!("Cookie {} rejected: {}", cookie.name, e)))
    }

    fn type_into(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        self.tab
            .wait_for_element(selector)
            .and_then(|element| element.type_into(text).map(|_| ()))
            .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", selector, e)))
    }

    fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.tab
            .wait_for_element(selector)
            .and_then(|element| element.click().map(|_| ()))
            .map_err(|e| BrowserError::ElementNotFound(format!("{}: {}", selector, e)))
    }
}

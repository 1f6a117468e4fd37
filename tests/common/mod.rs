//! In-memory browser used by the integration tests
#![allow(dead_code)]

use regex::Regex;
use rust_manga_capture::browser::{BrowserConfig, BrowserError, Launcher, PageDriver};
use rust_manga_capture::credentials::StoredCookie;
use rust_manga_capture::readiness::{Pacer, ReadinessConfig};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

pub const LANDING_MARKER: &str = r#"link[type="image/x-icon"]"#;
pub const READER_MARKER: &str = r#"div[data-name="PageView"]"#;

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub html: String,
    pub markers: Vec<String>,
    pub layers: u32,
    /// `None` makes the bounds script come back empty
    pub canvas: Option<(u32, u32)>,
    /// Make the bounds script throw
    pub bounds_error: bool,
}

impl FakePage {
    pub fn landing(html: &str) -> Self {
        Self {
            html: html.to_string(),
            markers: vec![LANDING_MARKER.to_string()],
            ..Self::default()
        }
    }

    pub fn reader(layers: u32, canvas: (u32, u32)) -> Self {
        Self {
            html: "<html><body><div data-name=\"PageView\"></div></body></html>".to_string(),
            markers: vec![READER_MARKER.to_string()],
            layers,
            canvas: Some(canvas),
            bounds_error: false,
        }
    }

    /// Renders nothing recognisable
    pub fn blank() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub current: Option<String>,
    pub navigations: Vec<String>,
    pub window_sizes: Vec<(u32, u32)>,
    pub removed_layers: Vec<u32>,
    pub screenshots: Vec<String>,
    pub cookie_jar: Vec<StoredCookie>,
    pub typed: Vec<(String, String)>,
    pub clicks: Vec<String>,
}

/// Serves canned pages by URL and records every interaction
#[derive(Clone, Default)]
pub struct FakeBrowser {
    pages: Rc<RefCell<HashMap<String, FakePage>>>,
    /// Cookies a login leaves behind
    pub session_cookies: Rc<Vec<StoredCookie>>,
    /// Cookie names the browser refuses
    pub rejected_cookies: Rc<HashSet<String>>,
    pub state: Rc<RefCell<FakeState>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, page: FakePage) -> Self {
        self.pages.borrow_mut().insert(url.to_string(), page);
        self
    }

    /// Same site, fresh interaction record
    pub fn fresh_window(&self) -> Self {
        Self {
            pages: self.pages.clone(),
            session_cookies: self.session_cookies.clone(),
            rejected_cookies: self.rejected_cookies.clone(),
            state: Rc::new(RefCell::new(FakeState::default())),
        }
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.borrow().navigations.clone()
    }

    pub fn screenshots(&self) -> Vec<String> {
        self.state.borrow().screenshots.clone()
    }

    pub fn removed_layers(&self) -> Vec<u32> {
        self.state.borrow().removed_layers.clone()
    }

    pub fn window_sizes(&self) -> Vec<(u32, u32)> {
        self.state.borrow().window_sizes.clone()
    }

    fn current_page(&self) -> Option<FakePage> {
        let current = self.state.borrow().current.clone()?;
        self.pages.borrow().get(&current).cloned()
    }
}

impl PageDriver for FakeBrowser {
    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        state.current = Some(url.to_string());
        state.navigations.push(url.to_string());
        Ok(())
    }

    fn current_url(&self) -> String {
        self.state.borrow().current.clone().unwrap_or_else(|| "about:blank".to_string())
    }

    fn content(&self) -> Result<String, BrowserError> {
        Ok(self.current_page().map(|p| p.html).unwrap_or_default())
    }

    fn has_element(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self
            .current_page()
            .is_some_and(|p| p.markers.iter().any(|m| m == selector)))
    }

    fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        let page = self.current_page().unwrap_or_default();

        if script.contains(".remove()") {
            let index = Regex::new(r"\)\[(\d+)\]")
                .unwrap()
                .captures(script)
                .and_then(|c| c[1].parse::<u32>().ok())
                .ok_or_else(|| BrowserError::JavaScriptError("bad remove script".to_string()))?;
            if index >= page.layers {
                return Ok(Value::Bool(false));
            }
            self.state.borrow_mut().removed_layers.push(index);
            return Ok(Value::Bool(true));
        }
        if script.contains("getElementsByTagName('canvas')") {
            if page.bounds_error {
                return Err(BrowserError::JavaScriptError(
                    "TypeError: Cannot read properties of undefined".to_string(),
                ));
            }
            return Ok(page
                .canvas
                .map(|(w, h)| Value::String(format!("{}x{}", w, h)))
                .unwrap_or(Value::Null));
        }
        if script.contains("getElementsByClassName") && script.ends_with(".length") {
            return Ok(Value::from(page.layers));
        }
        Ok(Value::Null)
    }

    fn set_window_size(&self, width: u32, height: u32) -> Result<(), BrowserError> {
        self.state.borrow_mut().window_sizes.push((width, height));
        Ok(())
    }

    fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        let url = self.current_url();
        self.state.borrow_mut().screenshots.push(url.clone());
        Ok(format!("png:{}", url).into_bytes())
    }

    fn cookies(&self) -> Result<Vec<StoredCookie>, BrowserError> {
        let state = self.state.borrow();
        let mut cookies = self.session_cookies.as_ref().clone();
        cookies.extend(state.cookie_jar.iter().cloned());
        Ok(cookies)
    }

    fn add_cookie(&self, cookie: &StoredCookie) -> Result<(), BrowserError> {
        if self.rejected_cookies.contains(&cookie.name) {
            return Err(BrowserError::CookieError(format!("{} rejected", cookie.name)));
        }
        self.state.borrow_mut().cookie_jar.push(cookie.clone());
        Ok(())
    }

    fn type_into(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        if !self.content()?.contains(selector.trim_start_matches('#')) {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        self.state
            .borrow_mut()
            .typed
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.state.borrow_mut().clicks.push(selector.to_string());
        Ok(())
    }
}

/// Hands out fresh windows onto one fake site and remembers them
#[derive(Clone)]
pub struct FakeLauncher {
    pub site: FakeBrowser,
    pub launches: Rc<RefCell<Vec<(bool, FakeBrowser)>>>,
}

impl FakeLauncher {
    pub fn new(site: FakeBrowser) -> Self {
        Self {
            site,
            launches: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Headless flag of each launch, in order
    pub fn modes(&self) -> Vec<bool> {
        self.launches.borrow().iter().map(|(headless, _)| *headless).collect()
    }

    pub fn window(&self, index: usize) -> FakeBrowser {
        self.launches.borrow()[index].1.clone()
    }
}

impl Launcher for FakeLauncher {
    type Driver = FakeBrowser;

    fn launch(&self, config: &BrowserConfig) -> Result<FakeBrowser, BrowserError> {
        let window = self.site.fresh_window();
        self.launches
            .borrow_mut()
            .push((config.headless, window.clone()));
        Ok(window)
    }
}

/// Records pauses instead of sleeping
#[derive(Clone, Default)]
pub struct RecordingPacer(pub Rc<RefCell<Vec<Duration>>>);

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.0.borrow().clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration) {
        self.0.borrow_mut().push(duration);
    }
}

/// Readiness timings that make the arithmetic in assertions obvious
pub fn test_readiness() -> ReadinessConfig {
    ReadinessConfig {
        wait: Duration::from_secs(1),
        timeout: Duration::from_millis(500),
        poll_interval: Duration::from_millis(250),
        ..ReadinessConfig::default()
    }
}

pub fn cookie(name: &str, domain: &str) -> StoredCookie {
    StoredCookie {
        name: name.to_string(),
        value: format!("{}-value", name),
        domain: domain.to_string(),
        path: "/".to_string(),
        expiry: Some(1_900_000_000.5),
        secure: true,
        http_only: false,
    }
}

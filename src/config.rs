use crate::browser::BrowserConfig;
use crate::capture::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::readiness::ReadinessConfig;
use crate::session::SessionConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Everything a run needs, fixed at startup and handed to each component
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Newline-delimited item URLs to capture
    pub urls_file: PathBuf,

    /// Append-only list of completed item URLs
    pub done_file: PathBuf,

    /// Credential snapshot
    pub cookies_file: PathBuf,

    /// Root of the per-item output directories
    pub output_dir: PathBuf,

    pub login: Option<String>,
    pub password: Option<String>,

    /// How long to poll for a page's readiness marker, in seconds
    pub timeout_secs: f64,

    /// Pause before each page load is checked, in seconds. Raise it if the
    /// site starts blocking.
    pub wait_secs: f64,

    /// Stop after this many items per run
    pub max_items: Option<usize>,

    pub poll_interval_ms: u64,

    pub login_url: String,
    pub window_width: u32,
    pub window_height: u32,
    pub landing_marker: String,
    pub reader_marker: String,
    pub layer_class: String,
    pub collection_item_selector: String,

    /// Mask the automation fingerprint
    pub stealth: bool,
}

impl Default for Config {
    fn default() -> Self {
        let readiness = ReadinessConfig::default();
        let session = SessionConfig::default();
        let capture = CaptureConfig::default();
        Self {
            urls_file: PathBuf::from("urls.txt"),
            done_file: PathBuf::from("done.txt"),
            cookies_file: session.snapshot_path,
            output_dir: capture.output_dir,
            login: None,
            password: None,
            timeout_secs: readiness.timeout.as_secs_f64(),
            wait_secs: readiness.wait.as_secs_f64(),
            max_items: None,
            poll_interval_ms: readiness.poll_interval.as_millis() as u64,
            login_url: session.login_url,
            window_width: capture.default_window.0,
            window_height: capture.default_window.1,
            landing_marker: readiness.landing_marker,
            reader_marker: readiness.reader_marker,
            layer_class: capture.layer_class,
            collection_item_selector: r#"a[href*="/hentai/"]"#.to_string(),
            stealth: true,
        }
    }
}

/// Upper bound for the wait and timeout settings
pub const MAX_SECONDS: f64 = 24.0 * 60.0 * 60.0;

fn seconds(name: &str, value: f64) -> Result<Duration> {
    if value > MAX_SECONDS {
        return Err(CaptureError::Config(format!(
            "{} must be at most {} seconds, got {}",
            name, MAX_SECONDS, value
        )));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|_| CaptureError::Config(format!("{} must be a non-negative number of seconds, got {}", name, value)))
}

impl Config {
    /// Load `path`, or `config.toml` when present, falling back to defaults.
    /// A file that exists but doesn't parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(CaptureError::Config(format!(
                        "Config file {} does not exist",
                        path.display()
                    )));
                }
                path
            }
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(path).map_err(|e| CaptureError::io(path, e))?;
        Self::from_toml(&content)
            .map_err(|e| CaptureError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        seconds("timeout", self.timeout_secs)?;
        seconds("wait", self.wait_secs)?;
        if self.window_width == 0 || self.window_height == 0 {
            return Err(CaptureError::Config("window size must be non-zero".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(CaptureError::Config("poll_interval_ms must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn readiness_config(&self) -> Result<ReadinessConfig> {
        Ok(ReadinessConfig {
            wait: seconds("wait", self.wait_secs)?,
            timeout: seconds("timeout", self.timeout_secs)?,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            landing_marker: self.landing_marker.clone(),
            reader_marker: self.reader_marker.clone(),
            ..ReadinessConfig::default()
        })
    }

    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            window_size: (self.window_width, self.window_height),
            stealth: self.stealth,
            ..BrowserConfig::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            login_url: self.login_url.clone(),
            snapshot_path: self.cookies_file.clone(),
            login: self.login.clone(),
            password: self.password.clone(),
            ..SessionConfig::default()
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            output_dir: self.output_dir.clone(),
            default_window: (self.window_width, self.window_height),
            layer_class: self.layer_class.clone(),
        }
    }
}

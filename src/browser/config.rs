use std::time::Duration;

/// Default window size. Any reader page opened at this resolution renders
/// at full quality before the viewport is shrunk to the canvas bounds.
pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1440, 2560);

/// Configuration for browser instances
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,

    /// Initial window size, restored at the start of every work item
    pub window_size: (u32, u32),

    /// Custom user agent
    pub user_agent: Option<String>,

    /// Per-operation timeout for the underlying tab
    pub timeout_seconds: u64,

    /// How long the browser may sit idle before the connection is dropped.
    /// Must outlast the interactive login pause.
    pub idle_timeout_seconds: u64,

    /// Inject the fingerprint masking script after each navigation
    pub stealth: bool,

    /// Additional Chrome flags
    pub chrome_flags: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: DEFAULT_WINDOW_SIZE,
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            timeout_seconds: 30,
            idle_timeout_seconds: 60 * 60,
            stealth: true,
            chrome_flags: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--hide-scrollbars".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    /// Same configuration with a visible window, used for interactive login
    pub fn interactive(&self) -> Self {
        let mut config = self.clone();
        config.headless = false;
        config
    }

    /// Same configuration rendering without a window
    pub fn headless(&self) -> Self {
        let mut config = self.clone();
        config.headless = true;
        config
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    /// All launch arguments, including the user agent override
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = self.chrome_flags.clone();
        if let Some(ua) = &self.user_agent {
            args.push(format!("--user-agent={}", ua));
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.window_size, (1440, 2560));
        assert!(config.user_agent.is_some());
        assert!(config.idle_timeout() > Duration::from_secs(60));
    }

    #[test]
    fn test_interactive_and_headless_flip_only_mode() {
        let config = BrowserConfig::default();
        let visible = config.interactive();
        assert!(!visible.headless);
        assert_eq!(visible.window_size, config.window_size);
        assert!(visible.headless().headless);
    }

    #[test]
    fn test_launch_args_include_user_agent() {
        let config = BrowserConfig::default();
        let args = config.launch_args();
        assert!(args.iter().any(|a| a.contains("AutomationControlled")));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=")));
    }
}

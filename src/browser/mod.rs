//! Browser automation surface
//!
//! The capture pipeline only talks to [`PageDriver`]; [`ChromeDriver`]
//! implements it on top of headless Chrome.
//!
//! # Example
//!
//! ```no_run
//! use rust_manga_capture::browser::{BrowserConfig, ChromeLauncher, Launcher, PageDriver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = ChromeLauncher::default().launch(&BrowserConfig::default())?;
//!
//! driver.navigate("https://example.com")?;
//! let html = driver.content()?;
//!
//! println!("Extracted {} bytes of HTML", html.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod manager;

pub use config::BrowserConfig;
pub use driver::{ChromeDriver, ChromeLauncher, Launcher, PageDriver};
pub use manager::{BrowserError, BrowserManager};

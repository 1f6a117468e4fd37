// Library interface for rust_manga_capture
// The binary is a thin shell around these components; tests drive them
// through a fake browser.

pub mod browser;
pub mod capture;
pub mod cli;
pub mod collection;
pub mod config;
pub mod credentials;
pub mod enumerator;
pub mod error;
pub mod logging;
pub mod readiness;
pub mod session;
pub mod stealth;
pub mod work;

pub use error::{CaptureError, Result};

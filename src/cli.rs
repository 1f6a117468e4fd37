use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Capture canvas-rendered reader pages as screenshots
#[derive(Debug, Parser)]
#[command(name = "rust_manga_capture", version, about)]
pub struct Cli {
    /// Fill the URL list from this collection instead of capturing
    #[arg(short = 'z', long)]
    pub collection_url: Option<String>,

    /// File with the list of item URLs to capture
    #[arg(short = 'f', long)]
    pub file_urls: Option<PathBuf>,

    /// File recording finished items, used to resume
    #[arg(short = 'd', long)]
    pub done_file: Option<PathBuf>,

    /// Saved cookies for authentication
    #[arg(short = 'c', long)]
    pub cookies_file: Option<PathBuf>,

    /// Root directory for the captured pages
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Login or email, pre-filled on the login form
    #[arg(short = 'l', long)]
    pub login: Option<String>,

    /// Password, pre-filled on the login form
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Seconds to wait for a page to render. Increase if pages come out broken
    #[arg(short = 't', long)]
    pub timeout: Option<f64>,

    /// Seconds to pause between page loads. Increase if you get blocked
    #[arg(short = 'w', long)]
    pub wait: Option<f64>,

    /// Max number of items to capture in this run
    #[arg(short = 'm', long)]
    pub max: Option<usize>,

    /// TOML configuration file (defaults to ./config.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(path) = &self.file_urls {
            config.urls_file = path.clone();
        }
        if let Some(path) = &self.done_file {
            config.done_file = path.clone();
        }
        if let Some(path) = &self.cookies_file {
            config.cookies_file = path.clone();
        }
        if let Some(path) = &self.output_dir {
            config.output_dir = path.clone();
        }
        if self.login.is_some() {
            config.login = self.login.clone();
        }
        if self.password.is_some() {
            config.password = self.password.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(wait) = self.wait {
            config.wait_secs = wait;
        }
        if self.max.is_some() {
            config.max_items = self.max;
        }
        config
    }
}

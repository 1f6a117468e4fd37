//! Session manager: gets an authenticated browser for the run.
//!
//! With a credential snapshot on disk the browser starts headless and the
//! stored cookies are replayed. Without one, a visible browser is opened on
//! the login page and the run blocks until the operator confirms the login;
//! the resulting cookies are snapshotted and the session moves to headless.

use crate::browser::{BrowserConfig, Launcher, PageDriver};
use crate::credentials::{CredentialSnapshot, StoredCookie};
use crate::error::{CaptureError, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub login_url: String,
    pub snapshot_path: PathBuf,
    pub login: Option<String>,
    pub password: Option<String>,
    pub username_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_url: "https://www.fakku.net/login".to_string(),
            snapshot_path: PathBuf::from("cookies.json"),
            login: None,
            password: None,
            username_selector: "#username".to_string(),
            password_selector: "#password".to_string(),
            submit_selector: r#"button[type="submit"], .js-submit"#.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    RestoringCookies,
    SubmittingCredentials,
    AwaitingUserConfirmation,
    CapturingSession,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Interactive,
    Headless,
}

/// The external "login finished" signal
pub trait Confirmation {
    fn await_confirmation(&self, prompt: &str) -> io::Result<()>;
}

/// Waits for the operator to press Enter
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn await_confirmation(&self, prompt: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{} ", prompt)?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(())
    }
}

/// A browser carrying the session cookies
pub struct Session<D> {
    driver: D,
    mode: SessionMode,
    cookies_applied: usize,
}

impl<D: PageDriver> Session<D> {
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Number of stored cookies the browser accepted
    pub fn cookies_applied(&self) -> usize {
        self.cookies_applied
    }

    pub fn into_driver(self) -> D {
        self.driver
    }
}

/// Whether establishing a session needs the interactive login
pub fn needs_interactive_login(config: &SessionConfig) -> bool {
    !CredentialSnapshot::exists(&config.snapshot_path)
}

/// Host part of a URL, lowercased
fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_ascii_lowercase())
}

/// Replay cookies into the browser, skipping the ones it can't take.
/// Returns how many were applied.
pub fn apply_cookies<D: PageDriver>(driver: &D, cookies: &[StoredCookie]) -> usize {
    let current = driver.current_url();
    let Some(host) = host_of(&current) else {
        log::warn!("Cannot apply cookies on {:?}: no host", current);
        return 0;
    };

    let mut applied = 0;
    for cookie in cookies {
        if !cookie.applies_to_host(&host) {
            log::debug!(
                "Skipping cookie {} for {} (not valid on {})",
                cookie.name,
                cookie.domain,
                host
            );
            continue;
        }
        match driver.add_cookie(cookie) {
            Ok(()) => applied += 1,
            Err(e) => log::warn!("Skipping cookie {}: {}", cookie.name, e),
        }
    }
    applied
}

pub struct SessionManager<L> {
    launcher: L,
    browser: BrowserConfig,
    config: SessionConfig,
    state: SessionState,
}

impl<L: Launcher> SessionManager<L> {
    pub fn new(launcher: L, browser: BrowserConfig, config: SessionConfig) -> Self {
        Self {
            launcher,
            browser,
            config,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Produce a headless session ready for capturing.
    ///
    /// `interactive` selects the login path; the non-interactive path never
    /// waits on the operator.
    pub fn establish_session(
        &mut self,
        interactive: bool,
        confirmation: &dyn Confirmation,
    ) -> Result<Session<L::Driver>> {
        if interactive {
            self.login_interactively(confirmation)
        } else {
            self.restore()
        }
    }

    fn restore(&mut self) -> Result<Session<L::Driver>> {
        let path = &self.config.snapshot_path;
        if !CredentialSnapshot::exists(path) {
            return Err(CaptureError::Config(format!(
                "Credential file {} not found. Run without it once to log in",
                path.display()
            )));
        }
        log::info!("Using cookies file: {}", path.display());
        self.state = SessionState::RestoringCookies;

        let snapshot = match CredentialSnapshot::load(path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("{}; continuing without authentication", e);
                CredentialSnapshot::default()
            }
        };

        self.open_headless(&snapshot)
    }

    fn login_interactively(&mut self, confirmation: &dyn Confirmation) -> Result<Session<L::Driver>> {
        log::info!(
            "No cookies file at {}; log in through the browser window",
            self.config.snapshot_path.display()
        );
        let driver = self.launcher.launch(&self.browser.interactive())?;
        driver.navigate(&self.config.login_url)?;

        self.state = SessionState::SubmittingCredentials;
        self.submit_credentials(&driver);

        self.state = SessionState::AwaitingUserConfirmation;
        confirmation
            .await_confirmation("Press Enter once you are logged in...")
            .map_err(|e| CaptureError::io("<stdin>", e))?;

        self.state = SessionState::CapturingSession;
        let snapshot = CredentialSnapshot::new(driver.cookies()?);
        snapshot.save(&self.config.snapshot_path)?;
        log::info!(
            "Saved {} cookies to {}",
            snapshot.len(),
            self.config.snapshot_path.display()
        );

        let session = Session {
            driver,
            mode: SessionMode::Interactive,
            cookies_applied: snapshot.len(),
        };
        self.switch_to_headless(session, &snapshot)
    }

    /// Pre-fill whatever credentials were given. Each step is best effort;
    /// the operator can always finish the form by hand.
    fn submit_credentials(&self, driver: &L::Driver) {
        let fields = [
            (&self.config.username_selector, &self.config.login),
            (&self.config.password_selector, &self.config.password),
        ];

        let mut filled = false;
        for (selector, value) in fields {
            if let Some(value) = value {
                match driver.type_into(selector, value) {
                    Ok(()) => filled = true,
                    Err(e) => log::warn!("Could not pre-fill {}: {}", selector, e),
                }
            }
        }

        if filled {
            if let Err(e) = driver.click(&self.config.submit_selector) {
                log::warn!("Could not submit the login form: {}", e);
            }
        }
    }

    /// Interactive → headless. The visible browser is closed and a headless
    /// one takes over the same cookies.
    pub fn switch_to_headless(
        &mut self,
        session: Session<L::Driver>,
        snapshot: &CredentialSnapshot,
    ) -> Result<Session<L::Driver>> {
        if session.mode == SessionMode::Headless {
            return Ok(session);
        }
        drop(session);
        self.open_headless(snapshot)
    }

    fn open_headless(&mut self, snapshot: &CredentialSnapshot) -> Result<Session<L::Driver>> {
        let driver = self.launcher.launch(&self.browser.headless())?;
        driver.navigate(&self.config.login_url)?;

        let cookies_applied = apply_cookies(&driver, &snapshot.cookies);
        if cookies_applied < snapshot.len() {
            log::warn!(
                "Applied {} of {} stored cookies",
                cookies_applied,
                snapshot.len()
            );
        }

        self.state = SessionState::Ready;
        Ok(Session {
            driver,
            mode: SessionMode::Headless,
            cookies_applied,
        })
    }
}

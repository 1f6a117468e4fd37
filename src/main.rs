use clap::Parser;
use rust_manga_capture::browser::ChromeLauncher;
use rust_manga_capture::capture::CaptureSequencer;
use rust_manga_capture::cli::Cli;
use rust_manga_capture::collection::populate_input_list;
use rust_manga_capture::config::Config;
use rust_manga_capture::enumerator::ItemEnumerator;
use rust_manga_capture::logging;
use rust_manga_capture::readiness::ReadinessWaiter;
use rust_manga_capture::session::{needs_interactive_login, SessionManager, StdinConfirmation};
use rust_manga_capture::work::{read_input_list, DoneList};
use rust_manga_capture::{CaptureError, Result};
use std::fs::OpenOptions;

fn run(cli: Cli) -> Result<()> {
    let config = cli.apply(Config::load(cli.config.as_deref())?);
    config.validate()?;

    // Check inputs before a browser is ever launched
    let items = match &cli.collection_url {
        Some(_) => {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.urls_file)
                .map_err(|e| CaptureError::io(&config.urls_file, e))?;
            Vec::new()
        }
        None => read_input_list(&config.urls_file)?,
    };
    let mut done = DoneList::open(&config.done_file)?;

    let session_config = config.session_config();
    let interactive = needs_interactive_login(&session_config);
    let mut sessions = SessionManager::new(
        ChromeLauncher::default(),
        config.browser_config(),
        session_config,
    );
    let session = sessions.establish_session(interactive, &StdinConfirmation)?;
    log::info!("Session ready ({} cookies applied)", session.cookies_applied());

    let waiter = ReadinessWaiter::new(config.readiness_config()?);
    let enumerator = ItemEnumerator::default();

    if let Some(collection_url) = &cli.collection_url {
        populate_input_list(
            session.driver(),
            &waiter,
            &enumerator,
            collection_url,
            &config.collection_item_selector,
            &config.urls_file,
        )?;
        return Ok(());
    }

    let pending = done.pending(items);
    log::info!(
        "{} item(s) to capture, {} already done",
        pending.len(),
        done.len()
    );

    let sequencer = CaptureSequencer::new(
        session.driver(),
        waiter,
        enumerator,
        config.capture_config(),
    );
    let summary = sequencer.run(&pending, &mut done, config.max_items)?;

    log::info!(
        "Finished: {} item(s) completed, {} page(s) captured, {} page(s) already present",
        summary.items_completed,
        summary.pages_captured,
        summary.pages_skipped
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let logging = logging::init();
    if let Err(e) = &logging {
        eprintln!("Logging disabled: {}", e);
    }

    if let Err(e) = run(cli) {
        match logging {
            Ok(()) => log::error!("{}", e),
            Err(_) => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

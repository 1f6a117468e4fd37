use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

pub const LOG_CONFIG_FILE: &str = "log4rs.yml";

/// Initialise logging from `log4rs.yml` when present, otherwise log `info`
/// and above to the console.
pub fn init() -> Result<(), String> {
    if Path::new(LOG_CONFIG_FILE).is_file() {
        return log4rs::init_file(LOG_CONFIG_FILE, Default::default())
            .map_err(|e| format!("Failed to load {}: {}", LOG_CONFIG_FILE, e));
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l:<5})} {m}{n}")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .map_err(|e| e.to_string())?;

    log4rs::init_config(config)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

use anyhow::{anyhow, Result};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::policy::compound::{
    roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::fs;
use std::path::Path;

const LOG_FILE_SIZE_LIMIT: u64 = 5 * 1024 * 1024; // 5MB
const LOG_FILES_KEPT: u32 = 3;

pub fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| anyhow!("Unknown log level: {}", level))
}

pub fn setup_logging(log_dir: &Path, level: LevelFilter) -> Result<()> {
    let logs_dir = log_dir.join("logs");
    fs::create_dir_all(&logs_dir)?;

    // Keep stdout free for file content (`cat`)
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{h({l})} {d(%Y-%m-%d %H:%M:%S)} {M} - {m}{n}",
        )))
        .build();

    let roller_pattern = logs_dir.join("pathfs.{}.log.gz");
    let roller = FixedWindowRoller::builder().base(1).build(
        roller_pattern
            .to_str()
            .ok_or_else(|| anyhow!("Log directory is not valid UTF-8"))?,
        LOG_FILES_KEPT,
    )?;
    let trigger = SizeTrigger::new(LOG_FILE_SIZE_LIMIT);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} {l} {M}:{L} {m}{n}")))
        .build(logs_dir.join("pathfs.log"), Box::new(policy))?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(Appender::builder().build("file", Box::new(file)))
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(level),
        )?;

    log4rs::init_config(config)?;
    Ok(())
}

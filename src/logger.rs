use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber at the named level.
///
/// `RUST_LOG`, when set, takes precedence over the level name.
pub fn init(level_name: &str) -> Result<(), model::Error> {
    let level: LevelFilter = parse_level(level_name)?;

    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}

/// Accepts `warning` and `critical` alongside the tracing level names.
pub fn parse_level(level_name: &str) -> Result<LevelFilter, model::Error> {
    match level_name.to_lowercase().as_str() {
        "warning" => Ok(LevelFilter::WARN),
        "critical" | "fatal" => Ok(LevelFilter::ERROR),
        other => LevelFilter::from_str(other)
            .map_err(|_| model::Error::from(format!("unknown logging level `{level_name}`"))),
    }
}

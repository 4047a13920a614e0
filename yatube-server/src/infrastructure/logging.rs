use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

// sqlx reports every statement at info; keep it quiet unless asked for.
const QUIET_DIRECTIVES: &str = "sqlx=warn";

pub(crate) fn init_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{default_level},{QUIET_DIRECTIVES}")))
        .map_err(|e| anyhow!("invalid log filter '{default_level}': {e}"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

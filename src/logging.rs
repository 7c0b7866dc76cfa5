use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// CLI default: progress lines only.
pub const CLI_DEFAULT_FILTER: &str = "info";

/// Server default: also shows one line per HTTP request from `TraceLayer`.
pub const SERVER_DEFAULT_FILTER: &str = "info,tower_http=debug";

/// Installs the global subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), default_filter)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

/// A blank or unparsable `RUST_LOG` falls back to the default directive.
fn build_filter(from_env: Option<&str>, default_filter: &str) -> anyhow::Result<EnvFilter> {
    if let Some(directives) = from_env.map(str::trim).filter(|d| !d.is_empty())
        && let Ok(filter) = EnvFilter::try_new(directives)
    {
        return Ok(filter);
    }
    EnvFilter::try_new(default_filter)
        .with_context(|| format!("build log filter from {default_filter:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_directives_take_precedence() -> anyhow::Result<()> {
        let filter = build_filter(Some("debug"), CLI_DEFAULT_FILTER)?;
        assert_eq!(filter.to_string(), "debug");
        Ok(())
    }

    #[test]
    fn blank_env_falls_back_to_default() -> anyhow::Result<()> {
        let filter = build_filter(Some("  "), SERVER_DEFAULT_FILTER)?;
        assert!(filter.to_string().contains("tower_http=debug"));
        assert_eq!(
            build_filter(None, CLI_DEFAULT_FILTER)?.to_string(),
            "info"
        );
        Ok(())
    }
}

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DIRECTIVE: &str = "birthday_progress=info";
const VERBOSE_DIRECTIVE: &str = "birthday_progress=debug,info";

/// Picks the filter directive: `RUST_LOG` wins, then `--verbose`, then the
/// configured level, then the default.
pub fn directive(verbose: bool, configured: Option<&str>) -> String {
    if verbose {
        VERBOSE_DIRECTIVE.to_string()
    } else {
        configured.unwrap_or(DEFAULT_DIRECTIVE).to_string()
    }
}

pub fn init_cli_logger(verbose: bool, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(verbose, configured)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_overrides_configured_level() {
        assert_eq!(directive(false, None), "birthday_progress=info");
        assert_eq!(directive(false, Some("warn")), "warn");
        assert_eq!(directive(true, Some("warn")), "birthday_progress=debug,info");
    }
}

use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive, e.g. `hive=debug`.
pub const LOG_ENV: &str = "HIVE_LOG";

/// Filter used when `HIVE_LOG` is unset or unparsable.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "hive=debug" } else { "warn" }
}

pub fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install a stderr fmt subscriber. Stdout stays reserved for command output.
/// A second call is a no-op.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_crate_debug() {
        assert_eq!(default_directive(false), "warn");
        assert_eq!(default_directive(true), "hive=debug");
    }

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
    }
}

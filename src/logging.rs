//! Logging setup.
//!
//! Diagnostics go through `tracing` to stderr. `RUST_LOG` takes precedence;
//! otherwise the `-v` count picks the level for this crate.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    // Only fails if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("warn,{}={}", env!("CARGO_CRATE_NAME"), level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(0), "warn,sitepipe=info");
        assert_eq!(default_directives(1), "warn,sitepipe=debug");
        assert_eq!(default_directives(5), "warn,sitepipe=trace");
    }

    #[test]
    fn test_directives_parse() {
        for verbosity in 0..3 {
            EnvFilter::try_new(default_directives(verbosity)).unwrap();
        }
    }
}

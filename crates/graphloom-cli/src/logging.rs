use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Crates whose events follow the requested level; everything else stays at warn
const OWN_CRATES: &[&str] = &["graphloom_cli", "graphloom_core", "graphloom_config", "graphloom_surrealdb"];

/// Filter directives for the given CLI flags
///
/// `--log-level` wins over `-v`; with neither, `RUST_LOG` is honoured and
/// `info` is the fallback.
pub fn filter_for(log_level: Option<LogLevel>, verbose: bool) -> EnvFilter {
    let level = match (log_level, verbose) {
        (Some(level), _) => level,
        (None, true) => LogLevel::Debug,
        (None, false) => {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return filter;
            }
            LogLevel::Info
        }
    };

    if level == LogLevel::Off {
        return EnvFilter::new("off");
    }

    let mut directives = vec!["warn".to_string()];
    directives.extend(OWN_CRATES.iter().map(|krate| format!("{}={}", krate, level.as_str())));
    EnvFilter::new(directives.join(","))
}

/// Install the global subscriber; logs go to stderr so reports on stdout stay clean
pub fn init(log_level: Option<LogLevel>, verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(log_level, verbose))
        .with_writer(std::io::stderr)
        .init();
}

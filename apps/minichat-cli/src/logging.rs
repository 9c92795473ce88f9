//! Tracing/logging bootstrap for the terminal client.
//!
//! Logs go to stderr so they never interleave with the rendered transcript on stdout.

use std::{env, io};

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,minichat=info,minichat_http=info";

/// Initialize global tracing subscriber with severity gating from environment.
///
/// Precedence:
/// 1) `RUST_LOG`
/// 2) `MINICHAT_CLI_LOG`
/// 3) `MINICHAT_LOG`
/// 4) internal default filter
pub fn init() {
    let env_filter = filter_from_lookup(|key| env::var(key).ok());
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .try_init();
}

fn filter_from_lookup<F>(lookup: F) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    for key in [EnvFilter::DEFAULT_ENV, "MINICHAT_CLI_LOG", "MINICHAT_LOG"] {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty())
            && let Ok(filter) = EnvFilter::try_new(value)
        {
            return filter;
        }
    }

    EnvFilter::new(DEFAULT_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_for(pairs: &[(&str, &str)]) -> String {
        filter_from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_owned())
        })
        .to_string()
    }

    #[test]
    fn falls_back_to_default_filter() {
        assert_eq!(filter_for(&[]), EnvFilter::new(DEFAULT_FILTER).to_string());
    }

    #[test]
    fn rust_log_wins_over_app_variables() {
        let filter = filter_for(&[
            ("RUST_LOG", "trace"),
            ("MINICHAT_CLI_LOG", "debug"),
            ("MINICHAT_LOG", "error"),
        ]);
        assert_eq!(filter, EnvFilter::new("trace").to_string());
    }

    #[test]
    fn cli_variable_wins_over_shared_variable_and_blank_is_skipped() {
        assert_eq!(
            filter_for(&[("MINICHAT_CLI_LOG", "debug"), ("MINICHAT_LOG", "error")]),
            EnvFilter::new("debug").to_string()
        );
        assert_eq!(
            filter_for(&[("RUST_LOG", "  "), ("MINICHAT_LOG", "error")]),
            EnvFilter::new("error").to_string()
        );
    }
}

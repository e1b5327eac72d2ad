//! keel CLI entry point.

use std::collections::HashMap;
use std::process;

use tracing_subscriber::EnvFilter;

/// Log filter, e.g. `KEEL_LOG=debug` or `KEEL_LOG=keel::web=trace`.
const LOG_ENV: &str = "KEEL_LOG";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let env: HashMap<String, String> = std::env::vars().collect();

    process::exit(keel::dispatcher::parse(&args, &env));
}

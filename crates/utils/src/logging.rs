//! Process-wide tracing setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_DIRECTIVES: &str = "server=info,services=info,db=info,deployment=info,tower_http=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter
/// and `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        let _ = registry.with(fmt::layer().json()).try_init();
    } else {
        let _ = registry.with(fmt::layer().with_target(true)).try_init();
    }
}

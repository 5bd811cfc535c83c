pub mod config;
pub mod evaluation;
pub mod session;

use evalguard_core::{Config, HttpOracle};

/// Oracle for the configured portal, with an optional base URL override.
pub(crate) fn oracle(
    config: &Config,
    base_url: Option<&str>,
) -> Result<HttpOracle, Box<dyn std::error::Error>> {
    let mut server = config.server.clone();
    if let Some(url) = base_url {
        server.base_url = url.to_string();
    }
    Ok(HttpOracle::from_config(&server)?)
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Runtime::new()?)
}

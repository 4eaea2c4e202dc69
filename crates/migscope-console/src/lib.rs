//! HTTP dashboard and terminal console for migration datasets.

pub mod config;
pub mod dashboard;
pub mod html;
pub mod operator_console;

use anyhow::Context;

use migscope_core::LogRing;
use migscope_loader::{ResourceLoader, SelfTestClient, Session};

pub use config::{Config, ConfigError};
pub use dashboard::Dashboard;
pub use operator_console::run_operator_console;

/// Wire the loader, self-test client and log ring described by `config`.
pub fn build_session(config: &Config) -> anyhow::Result<Session> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!("migscope/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    let root = config.data_root()?;
    let self_test_url = config.self_test_endpoint()?;
    let log = LogRing::with_capacity(config.log_capacity);

    tracing::info!(
        data_root = %root.describe(),
        self_test = %self_test_url,
        log_capacity = log.capacity(),
        "session configured"
    );

    let loader = ResourceLoader::new(root, client.clone(), log.clone());
    let self_test = SelfTestClient::new(client, self_test_url, config.request_timeout());
    Ok(Session::new(loader, self_test, log))
}

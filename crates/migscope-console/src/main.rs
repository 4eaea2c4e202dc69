use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use migscope_console::{build_session, run_operator_console, Config, Dashboard};

const DEFAULT_FILTER: &str = "migscope=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "migscope", version, about = "Inspect migration pipeline datasets")]
struct Cli {
    /// Config file (default: ./migscope.toml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Dashboard listen address
    #[arg(long)]
    bind: Option<String>,
    /// HTTP base prefixes are resolved against
    #[arg(long)]
    data_url: Option<String>,
    /// Local directory prefixes are resolved against
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    self_test_url: Option<String>,
    /// Prefix to load at startup
    #[arg(long)]
    prefix: Option<String>,
    /// Run the terminal console instead of the HTTP dashboard
    #[arg(long, action = clap::ArgAction::SetTrue)]
    console: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(url) = &self.data_url {
            config.data_url = Some(url.clone());
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(url) = &self.self_test_url {
            config.self_test_url = url.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.initial_prefix = Some(prefix.clone());
        }
    }
}

fn init_tracing(console: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if console {
        // the TUI owns the terminal, so the process log goes to a file
        let dir = migscope_console::config::log_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("migscope.log"))
            .with_context(|| format!("opening log file in {}", dir.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.console)?;

    let cwd = std::env::current_dir()?;
    let env_map: BTreeMap<String, String> = std::env::vars().collect();
    let (mut config, config_path) = Config::load(cli.config.as_deref(), &cwd, &env_map)?;
    cli.apply(&mut config);

    match &config_path {
        Some(path) => tracing::info!(path = %path.display(), "loaded config file"),
        None => tracing::info!("no config file found, using defaults and env/cli overrides"),
    }
    tracing::info!(
        bind = %config.bind_addr,
        data_url = ?config.data_url,
        data_dir = %config.data_dir.display(),
        self_test_url = %config.self_test_url,
        timeout_secs = config.request_timeout_secs,
        console = cli.console,
        "resolved config"
    );

    let session = build_session(&config)?;

    if let Some(prefix) = config.initial_prefix.as_deref() {
        if let Err(e) = session.load_prefix(prefix).await {
            tracing::warn!(error = %e, prefix, "initial load rejected");
        }
    }

    if cli.console {
        run_operator_console(session).await
    } else {
        Dashboard::new(config.bind_addr.clone(), session, config.max_upload_bytes())
            .run()
            .await
    }
}

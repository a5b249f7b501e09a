use clap::Parser;
use relay::Relay;
use relay::config::Config;
use relay_server::api;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Waitlist submission relay server
#[derive(Parser)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long)]
    config: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] relay::config::ConfigError),
    #[error("invalid config: {0}")]
    Validation(#[from] relay::config::ValidationError),
    #[error("invalid RELAY_WEBHOOK_URL: {0}")]
    WebhookUrl(#[from] url::ParseError),
    #[error(transparent)]
    Api(#[from] api::ApiError),
}

/// Fill webhook settings from the environment when the file omits them. The
/// relay core itself never reads the environment.
fn apply_env_fallback(config: &mut Config) -> Result<(), ServerError> {
    if config.webhook.url.is_none()
        && let Ok(raw) = std::env::var("RELAY_WEBHOOK_URL")
    {
        config.webhook.url = Some(raw.parse()?);
    }
    if config.webhook.secret.is_none()
        && let Ok(secret) = std::env::var("RELAY_WEBHOOK_SECRET")
    {
        config.webhook.secret = Some(secret);
    }
    Ok(())
}

async fn run(cli: &Cli) -> Result<(), ServerError> {
    let mut config = Config::from_file(&cli.config)?;
    apply_env_fallback(&mut config)?;
    config.validate()?;

    if config.webhook.url.is_none() {
        tracing::warn!("no webhook url configured; all submissions will be refused");
    }

    let relay = Relay::new(&config.webhook);
    api::serve(config.listener, relay).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli).await {
        tracing::error!(error = %err, "server exited");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

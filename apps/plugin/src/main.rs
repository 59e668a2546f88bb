use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use plugin::config::Config;
use plugin::host::MetricRenderer;
use plugin::messages::{HostOutput, HostSession};
use plugin::reflow::WrapText;

/// Headless host: one session in on stdin, one result out on stdout.
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting text wrap host v{}", env!("CARGO_PKG_VERSION"));

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read host session from stdin")?;
    let HostSession { mut scene, message } =
        serde_json::from_str(&input).context("stdin must contain a JSON host session")?;

    let renderer = MetricRenderer::new().with_latency(config.render_latency());
    let options = message.into_options(&config.wrap_options());
    info!(
        spacing = options.spacing,
        wrap_height_percent = options.wrap_height_percent,
        "Running wrap text"
    );

    let outcome = WrapText::new(options).run(&mut scene, &renderer).await;
    let output = HostOutput {
        state: outcome.state,
        notification: outcome.notification(),
        scene,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

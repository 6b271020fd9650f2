use clap::Parser;
use ragline_cli::Cli;
use ragline_telemetry::{LoggingConfig, init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig::default().with_format(cli.log_format))
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    let mut stdout = std::io::stdout();
    ragline_cli::run(cli, &mut stdout).await
}

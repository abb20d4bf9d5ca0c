use clap::Parser;

use opsbot::config::Config;
use opsbot::{olog, Result};

/// Opsbot - single-operator remote administration bot for Telegram
#[derive(Parser, Debug)]
#[command(name = "opsbot")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    OPSBOT_DEBUG=1        Enable debug logging (alternative to --debug)\n    OPSBOT_TOKEN          Override bot_token from the config file\n    OPSBOT_OPERATOR_ID    Override operator_id from the config file")]
struct Cli {
    /// Enable debug logging (writes to ~/.opsbot/opsbot.log)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Path to an alternate config file (default: ~/.opsbot/opsbot.toml)
    #[arg(short = 'c', long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    opsbot::log::init_with_debug(cli.debug);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    olog!("Starting bot (operator id {})", config.operator_id);
    opsbot::bot::run_bot(config).await
}

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use valutrade::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for valutrade::AppCommand {
    fn from(cmd: Commands) -> valutrade::AppCommand {
        match cmd {
            Commands::UpdateRates { source } => valutrade::AppCommand::UpdateRates { source },
            Commands::Schedule {
                interval_secs,
                cycles,
            } => valutrade::AppCommand::Schedule {
                interval_secs,
                cycles,
            },
            Commands::ShowRates { currency } => valutrade::AppCommand::ShowRates { currency },
            Commands::GetRate { from, to } => valutrade::AppCommand::GetRate { from, to },
            Commands::Login { username } => valutrade::AppCommand::Login { username },
            Commands::Logout => valutrade::AppCommand::Logout,
            Commands::ShowPortfolio { base } => valutrade::AppCommand::ShowPortfolio { base },
            Commands::Buy { currency, amount } => valutrade::AppCommand::Buy { currency, amount },
            Commands::Sell { currency, amount } => valutrade::AppCommand::Sell { currency, amount },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch fresh rates from the fiat and crypto providers
    UpdateRates {
        /// Refresh from a single provider (ExchangeRate-API or CoinGecko)
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Refresh rates periodically until interrupted
    Schedule {
        /// Seconds between refreshes, defaults to the rates TTL
        #[arg(short, long)]
        interval_secs: Option<u64>,
        /// Stop after this many refreshes
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// List cached rates and their freshness
    ShowRates {
        /// Only show pairs involving this currency
        #[arg(long)]
        currency: Option<String>,
    },
    /// Show the rate between two currencies
    GetRate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Start a session for a user
    Login {
        #[arg(short, long)]
        username: String,
    },
    /// End the current session
    Logout,
    /// Display wallet balances valued in a base currency
    ShowPortfolio {
        /// Base currency for valuation, defaults to the configured base
        #[arg(short, long)]
        base: Option<String>,
    },
    /// Buy a currency
    Buy {
        #[arg(long)]
        currency: String,
        #[arg(long)]
        amount: f64,
    },
    /// Sell a currency for USD
    Sell {
        #[arg(long)]
        currency: String,
        #[arg(long)]
        amount: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => valutrade::cli::setup::setup(),
        Some(cmd) => valutrade::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

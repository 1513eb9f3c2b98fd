//! Exchange volatility alert bot
//!
//! Polls a market-data provider and pushes volatility alerts, outage
//! notices, and heartbeats to a Telegram chat.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use volwatch::{
    config::Config,
    notify::{Notifier, TelegramChannel},
    scheduler::Scheduler,
    source,
};

#[derive(Parser)]
#[command(name = "volwatch")]
#[command(about = "Exchange volatility alert bot for Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the alert bot
    Run {
        /// Dry run mode (alerts logged, nothing sent)
        #[arg(long)]
        dry_run: bool,
    },
    /// List the provider's symbol universe
    Symbols {
        /// Number of symbols to print
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },
    /// Show one symbol's move over the configured window
    Check { symbol: String },
    /// Test Telegram notification
    TestNotify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Bad or missing credentials abort here, before anything polls.
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { dry_run } => run_bot(config, dry_run).await,
        Commands::Symbols { limit } => show_symbols(config, limit).await,
        Commands::Check { symbol } => check_symbol(config, &symbol).await,
        Commands::TestNotify => test_notify(config).await,
    }
}

async fn run_bot(config: Config, dry_run: bool) -> anyhow::Result<()> {
    tracing::info!("Starting volatility alert bot");

    if dry_run {
        tracing::warn!("Running in DRY RUN mode - alerts will be logged, not sent");
    }

    let notifier = if dry_run {
        Notifier::disabled()
    } else {
        let channel = Arc::new(TelegramChannel::new(
            config.telegram.bot_token.clone(),
            config.telegram.chat_id.clone(),
        ));
        Notifier::new(channel, config.telegram.batch_alerts)
    };

    let source = source::build(&config.source)?;

    if let Err(e) = notifier
        .startup(
            source.name(),
            config.engine.lookback_minutes,
            config.engine.volatility_threshold_pct,
        )
        .await
    {
        tracing::warn!("Failed to send startup notification: {}", e);
    }

    let mut scheduler = Scheduler::new(&config.engine, source, notifier);
    scheduler.run().await?;
    Ok(())
}

async fn show_symbols(config: Config, limit: usize) -> anyhow::Result<()> {
    let source = source::build(&config.source)?;
    let symbols = source.list_symbols().await?;

    println!("\n{} symbols on {}:\n", symbols.len(), source.name());
    for symbol in symbols.iter().take(limit) {
        println!("  {}", symbol);
    }
    if symbols.len() > limit {
        println!("  ... and {} more", symbols.len() - limit);
    }

    Ok(())
}

async fn check_symbol(config: Config, symbol: &str) -> anyhow::Result<()> {
    let source = source::build(&config.source)?;
    let candle = source
        .fetch_candle(symbol, config.engine.lookback_minutes)
        .await?;

    let pct = if candle.open == 0.0 {
        0.0
    } else {
        (candle.close - candle.open) / candle.open * 100.0
    };

    println!(
        "\n{} over the last {} minutes:",
        symbol, config.engine.lookback_minutes
    );
    println!("  open:  {}", candle.open);
    println!("  close: {}", candle.close);
    println!("  move:  {:+.2}%", pct);
    println!(
        "  alert threshold: {}%",
        config.engine.volatility_threshold_pct
    );

    Ok(())
}

async fn test_notify(config: Config) -> anyhow::Result<()> {
    let channel = Arc::new(TelegramChannel::new(
        config.telegram.bot_token.clone(),
        config.telegram.chat_id.clone(),
    ));
    let notifier = Notifier::new(channel, config.telegram.batch_alerts);

    notifier
        .send("🧪 <b>Test Notification</b>\n\nIf you see this, Telegram integration is working!")
        .await?;

    println!("✅ Test notification sent!");
    Ok(())
}

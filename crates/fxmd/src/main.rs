//! fxmd - Oanda v20 market data CLI
//!
//! Loads account credentials, then fetches candles, queries account state, or
//! streams live prices until end of stream, a fatal error, or Ctrl+C.

mod config;

use clap::Parser;
use std::time::Instant;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fxmd_oanda::stream::{ConsoleSink, PersistenceSink, StreamDriver, StreamSummary, TickSink};
use fxmd_oanda::{
    create_pool, Account, AccountChanges, AccountSummary, CandleRequest, CredentialStore,
    OandaClient, PostgresTickRepository, PricingStreamRequest, StreamConfig, StreamError,
};

use crate::config::{stream_config, Args, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let environment = args.environment();

    let store = CredentialStore::load(&args.credentials)?;
    let credentials = store.get(&args.account)?.clone();
    info!(account = %args.account, ?environment, "Loaded credentials");

    let client = OandaClient::new(credentials, environment)?;

    match args.command {
        Command::Candles {
            instrument,
            granularity,
            count,
        } => {
            let mut request = CandleRequest::new(instrument, granularity);
            if let Some(count) = count {
                request = request.with_count(count);
            }
            let start = Instant::now();
            let series = client.candles(&request).await?;
            println!("Request Duration: \t{:?}", start.elapsed());
            println!("{}", series);
        }
        Command::Accounts => {
            for account in client.accounts().await? {
                println!("{}\t{}", account.id, account.tags.join(","));
            }
        }
        Command::Summary => print_summary(&client.account_summary().await?),
        Command::Account => print_account(&client.account().await?),
        Command::Changes { since } => print_changes(&client.account_changes(&since).await?),
        Command::Instruments => {
            for instrument in client.account_instruments().await? {
                println!(
                    "{}\t{}\t{}",
                    instrument.name, instrument.instrument_type, instrument.display_name
                );
            }
        }
        Command::Stream {
            instruments,
            database_url,
            idle_timeout_secs,
            best_effort,
        } => {
            let request = PricingStreamRequest::new(instruments);
            let config = stream_config(idle_timeout_secs, best_effort);

            // Setup shutdown signal
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Received shutdown signal");
                shutdown_tx.send(true).ok();
            });

            let summary = match database_url {
                Some(url) => {
                    let pool = create_pool(&url)?;
                    let sink = PersistenceSink::new(PostgresTickRepository::new(pool));
                    drive(client, sink, config, &request, shutdown_rx).await?
                }
                None => drive(client, ConsoleSink::stdout(), config, &request, shutdown_rx).await?,
            };
            info!(
                quotes = summary.quotes,
                heartbeats = summary.heartbeats,
                "Stream finished"
            );
        }
    }

    Ok(())
}

async fn drive<K: TickSink>(
    client: OandaClient,
    sink: K,
    config: StreamConfig,
    request: &PricingStreamRequest,
    shutdown: watch::Receiver<bool>,
) -> Result<StreamSummary, StreamError> {
    let mut driver = StreamDriver::new(client, sink, config);
    driver.run(request, shutdown).await
}

fn print_summary(summary: &AccountSummary) {
    println!("Account: \t\t{}", summary.id);
    if !summary.alias.is_empty() {
        println!("Alias: \t\t\t{}", summary.alias);
    }
    println!("Currency: \t\t{}", summary.currency);
    println!("Balance: \t\t{}", summary.balance);
    println!("NAV: \t\t\t{}", summary.nav);
    println!("Unrealized P/L: \t{}", summary.unrealized_pl);
    println!("Realized P/L: \t\t{}", summary.pl);
    println!("Margin Used: \t\t{}", summary.margin_used);
    println!("Margin Available: \t{}", summary.margin_available);
    println!("Open Trades: \t\t{}", summary.open_trade_count);
    println!("Open Positions: \t{}", summary.open_position_count);
    println!("Pending Orders: \t{}", summary.pending_order_count);
    println!("Last Transaction: \t{}", summary.last_transaction_id);
}

fn print_account(account: &Account) {
    println!("Account: \t\t{}", account.id);
    println!("Currency: \t\t{}", account.currency);
    println!("Balance: \t\t{}", account.balance);
    println!("NAV: \t\t\t{}", account.nav);
    println!("Unrealized P/L: \t{}", account.unrealized_pl);
    println!("Margin Rate: \t\t{}", account.margin_rate);
    println!("Margin Used: \t\t{}", account.margin_used);
    println!("Last Transaction: \t{}", account.last_transaction_id);

    for position in &account.positions {
        println!(
            "Position: \t\t{}\tlong {}\tshort {}\tP/L {}",
            position.instrument, position.long.units, position.short.units, position.pl
        );
    }
    for trade in &account.trades {
        println!(
            "Trade: \t\t\t{}\t{}\t{} @ {}",
            trade.id, trade.instrument, trade.current_units, trade.price
        );
    }
    for order in &account.orders {
        println!(
            "Order: \t\t\t{}\t{}\t{}",
            order.id,
            order.order_type,
            order.instrument.as_deref().unwrap_or("-")
        );
    }
}

fn print_changes(changes: &AccountChanges) {
    for transaction in &changes.changes.transactions {
        println!(
            "{}\t{}\t{}",
            transaction.id, transaction.time, transaction.transaction_type
        );
    }
    println!("NAV: \t\t\t{}", changes.state.nav);
    println!("Unrealized P/L: \t{}", changes.state.unrealized_pl);
    println!("Margin Available: \t{}", changes.state.margin_available);
    println!("Last Transaction: \t{}", changes.last_transaction_id);
}

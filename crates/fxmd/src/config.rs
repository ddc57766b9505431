use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use fxmd_oanda::{Environment, Granularity, PersistencePolicy, StreamConfig};

/// fxmd: Oanda v20 candles and live pricing
#[derive(Parser, Debug)]
#[command(name = "fxmd")]
#[command(about = "Fetch candles and stream live prices from Oanda v20")]
pub struct Args {
    /// Credentials file mapping account aliases to {id, token}
    #[arg(long, env = "FXMD_CREDENTIALS", default_value = "res.json", global = true)]
    pub credentials: PathBuf,

    /// Account alias within the credentials file
    #[arg(long, env = "FXMD_ACCOUNT", default_value = "primary", global = true)]
    pub account: String,

    /// Use the live (fxTrade) hosts instead of practice
    #[arg(long, env = "FXMD_LIVE", global = true)]
    pub live: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch bid/ask candles and print the most recent one
    Candles {
        instrument: String,

        #[arg(short, long, default_value = "S5")]
        granularity: Granularity,

        /// Number of candles (provider default 500)
        #[arg(short, long)]
        count: Option<u32>,
    },

    /// Stream live prices to the console, or to Postgres with --database-url
    Stream {
        /// Instruments, comma separated (e.g. USD_CAD,EUR_USD)
        #[arg(required = true, value_delimiter = ',')]
        instruments: Vec<String>,

        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,

        /// Fail the stream after this long without a record
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        idle_timeout_secs: u64,

        /// Log and skip failed inserts instead of stopping
        #[arg(long)]
        best_effort: bool,
    },

    /// List accounts the token can access
    Accounts,

    /// Show the account balance summary
    Summary,

    /// Show full account details with open positions, trades and orders
    Account,

    /// Show what changed on the account since a transaction
    Changes {
        /// Transaction ID to diff from (e.g. the last one `account` reported)
        since: String,
    },

    /// List instruments tradeable by the account
    Instruments,
}

impl Args {
    pub fn environment(&self) -> Environment {
        if self.live {
            Environment::Live
        } else {
            Environment::Practice
        }
    }
}

pub fn stream_config(idle_timeout_secs: u64, best_effort: bool) -> StreamConfig {
    StreamConfig {
        idle_timeout: Duration::from_secs(idle_timeout_secs),
        persistence: if best_effort {
            PersistencePolicy::BestEffort
        } else {
            PersistencePolicy::Required
        },
    }
}

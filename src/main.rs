//! kvstash command-line tool.
//!
//! Reads and writes entries of any registered store:
//!
//! ```bash
//! kvstash set name '"John"'
//! kvstash --store indexeddb --db app --ns users set id 7
//! kvstash --store indexeddb --db app --ns users dump
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kvstash::constants;

#[derive(Parser)]
#[command(name = "kvstash")]
#[command(version, about = "Inspect and edit kvstash stores", long_about = None)]
struct Cli {
    /// Registry key of the store to open
    #[arg(long, short, global = true, default_value = constants::LOCAL)]
    store: String,

    /// Database name (indexeddb store)
    #[arg(long, global = true, default_value = "kvstash")]
    db: String,

    /// Store name inside the database (indexeddb store)
    #[arg(long, global = true, default_value = constants::DEFAULT_NAMESPACE)]
    ns: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under a key
    Get {
        key: String,
    },
    /// Store a value; text that is not valid JSON is stored as a string
    Set {
        key: String,
        value: String,
    },
    /// Remove one or more keys
    Remove {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Remove every entry
    Clear,
    /// Print the number of entries
    Len,
    /// Print every key
    Keys,
    /// Print every entry as `index key value`
    Dump,
}

#[tokio::main]
async fn main() -> Result<()> {
    commands::init_stdout_logging();

    let cli = Cli::parse();
    let store = commands::open(&cli.store, &cli.db, &cli.ns)?;

    match cli.command {
        Commands::Get { key } => commands::item::get(&store, &key).await,
        Commands::Set { key, value } => commands::item::set(&store, &key, &value).await,
        Commands::Remove { keys } => commands::item::remove(&store, &keys).await,
        Commands::Clear => commands::item::clear(&store).await,
        Commands::Len => commands::list::len(&store).await,
        Commands::Keys => commands::list::keys(&store).await,
        Commands::Dump => commands::list::dump(&store).await,
    }
}

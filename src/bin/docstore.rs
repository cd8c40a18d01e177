//! DocStore CLI
//!
//! Command-line interface and interactive shell for DocStore.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docstore::config::WalSyncStrategy;
use docstore::protocol::{parse_command, parse_object};
use docstore::{Config, Database, Record, Request, Response};
use tracing_subscriber::{fmt, EnvFilter};

/// DocStore CLI
#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(about = "Embedded document store with WAL and snapshots")]
#[command(version)]
struct Args {
    /// WAL file; the snapshot lives next to it with a `.snap` extension
    #[arg(short, long, default_value = docstore::config::DEFAULT_LOG_PATH)]
    log: PathBuf,

    /// fsync the WAL every N entries instead of on every write
    #[arg(long, value_name = "N")]
    relaxed_sync: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert a document into a collection
    Insert {
        collection: String,
        /// Document as a JSON object
        json: String,
    },

    /// Find documents in a collection
    Find {
        collection: String,
        /// Filter as a JSON object (default: match all)
        filter: Option<String>,
    },

    /// Update documents in a collection
    Update {
        collection: String,
        filter: String,
        /// Fields to merge into each match
        patch: String,
    },

    /// Delete documents from a collection
    Delete { collection: String, filter: String },

    /// Count documents in a collection
    Count {
        collection: String,
        filter: Option<String>,
    },

    /// Sort documents in a collection by a field
    Sort { collection: String, key: String },

    /// Save a snapshot and truncate the WAL
    Save,

    /// List all collections
    ListCollections,

    /// Interactive shell
    Repl,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,docstore=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = Config::builder().log_path(&args.log);
    if let Some(count) = args.relaxed_sync {
        builder = builder.wal_sync_strategy(WalSyncStrategy::EveryNEntries { count });
    }

    let db = match Database::open(builder.build()) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = to_request(args.command).and_then(|request| match request {
        Some(request) => {
            let response = db.execute(request)?;
            print_response(&response);
            Ok(())
        }
        None => repl(&db),
    });

    if let Err(e) = db.close() {
        tracing::error!("Failed to close database: {}", e);
    }

    if let Err(e) = outcome {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Build a request from CLI arguments; `None` means start the shell
fn to_request(command: Commands) -> docstore::Result<Option<Request>> {
    let optional_filter = |text: Option<String>| match text {
        Some(text) => parse_object(&text, "filter"),
        None => Ok(Record::new()),
    };

    Ok(Some(match command {
        Commands::Insert { collection, json } => Request::Insert {
            collection,
            record: parse_object(&json, "document")?,
        },
        Commands::Find { collection, filter } => Request::Find {
            collection,
            filter: optional_filter(filter)?,
        },
        Commands::Update {
            collection,
            filter,
            patch,
        } => Request::Update {
            collection,
            filter: parse_object(&filter, "filter")?,
            patch: parse_object(&patch, "update")?,
        },
        Commands::Delete { collection, filter } => Request::Delete {
            collection,
            filter: parse_object(&filter, "filter")?,
        },
        Commands::Count { collection, filter } => Request::Count {
            collection,
            filter: optional_filter(filter)?,
        },
        Commands::Sort { collection, key } => Request::Sort { collection, key },
        Commands::Save => Request::SaveSnapshot,
        Commands::ListCollections => Request::ListCollections,
        Commands::Repl => return Ok(None),
    }))
}

/// Read commands from stdin until EXIT/QUIT or end of input
fn repl(db: &Database) -> docstore::Result<()> {
    println!("DocStore v{} ({})", docstore::VERSION, db.config().log_path.display());
    println!("Commands:");
    println!("  INSERT <collection> <json>");
    println!("  FIND <collection> [filter_json]");
    println!("  UPDATE <collection> <filter_json> <update_json>");
    println!("  DELETE <collection> <filter_json>");
    println!("  COUNT <collection> [filter_json]");
    println!("  SORT <collection> <sort_key>");
    println!("  SAVE");
    println!("  LIST_COLLECTIONS");
    println!("  EXIT");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        if matches!(line.trim().to_ascii_uppercase().as_str(), "EXIT" | "QUIT") {
            break;
        }

        match parse_command(&line).and_then(|request| match request {
            Some(request) => db.execute(request).map(Some),
            None => Ok(None),
        }) {
            Ok(Some(response)) => print_response(&response),
            Ok(None) => {}
            Err(e) => println!("error: {}", e),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_response(response: &Response) {
    match response {
        Response::Inserted { id } => println!("inserted {}", id),
        Response::Updated { matched } => println!("updated {} document(s)", matched),
        Response::Deleted { removed } => println!("deleted {} document(s)", removed),
        Response::Count(count) => println!("{}", count),
        Response::Records(records) if records.is_empty() => println!("no documents found"),
        Response::Records(records) => {
            for record in records {
                match serde_json::to_string_pretty(record) {
                    Ok(json) => println!("{}", json),
                    Err(e) => println!("error: {}", e),
                }
            }
        }
        Response::Collections(names) if names.is_empty() => println!("no collections"),
        Response::Collections(names) => {
            for name in names {
                println!("{}", name);
            }
        }
        Response::SnapshotSaved { wal_truncated: true } => println!("snapshot saved"),
        Response::SnapshotSaved { wal_truncated: false } => {
            println!("snapshot saved (WAL truncation failed; will retry at next save)")
        }
    }
}

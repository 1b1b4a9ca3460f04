//! Shelf Enqueue - publish book ids for the worker to enrich

use anyhow::Result;
use clap::Parser;
use shelf_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::io::BufRead;
use std::process;
use tracing::{error, info};

use shelf_worker::{
    config::{DatabaseConfig, DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS, DEFAULT_DATABASE_URL},
    db,
    models::{parse_book_id, BookId},
    queue::{postgres::PgQueueConfig, PgQueue, Publisher, DEFAULT_QUEUE_NAME},
};

#[derive(Debug, Parser)]
#[command(name = "shelf-enqueue", version, about = "Queue books for metadata enrichment")]
struct Cli {
    /// Book ids to publish
    #[arg(value_parser = parse_id)]
    ids: Vec<BookId>,

    /// Also read one id per line from standard input
    #[arg(long)]
    stdin: bool,

    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Queue the worker subscribes to
    #[arg(long, env = "SHELF_QUEUE_NAME", default_value = DEFAULT_QUEUE_NAME)]
    queue: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_id(input: &str) -> std::result::Result<BookId, String> {
    parse_book_id(input).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("shelf-enqueue")
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI still works without logging
    let _guard = init_logging(&log_config);

    if let Err(e) = run(cli).await {
        error!(error = %e, "Enqueue failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut ids = cli.ids;
    if cli.stdin {
        for line in std::io::stdin().lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            ids.push(parse_book_id(&line)?);
        }
    }

    if ids.is_empty() {
        anyhow::bail!("No book ids given");
    }

    let pool = db::create_pool(&DatabaseConfig {
        url: cli.database_url,
        max_connections: 1,
        connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
    })
    .await?;

    let queue = PgQueue::new(
        pool.clone(),
        PgQueueConfig {
            name: cli.queue,
            ..PgQueueConfig::default()
        },
    );

    for id in ids {
        let message_id = queue.publish(id).await?;
        info!(book_id = id, message_id = %message_id, "Published");
        println!("{id}\t{message_id}");
    }

    pool.close().await;
    Ok(())
}

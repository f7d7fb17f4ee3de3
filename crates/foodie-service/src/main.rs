//! Main entry point for the foodie order tracker.
//!
//! Tracks food orders through their delivery pipeline from the command line.
//! Statuses are persisted by the configured storage backend, so an order that
//! was still in progress when the process stopped is resumed by the next run.

use clap::{Parser, Subcommand};
use foodie_config::Config;
use foodie_core::{TrackerBuilder, TrackerEngine};
use foodie_types::{OrderRecord, TrackerEvent};
use std::error::Error;
use std::path::PathBuf;
use tokio::sync::broadcast;

mod factory_registry;

/// Command-line arguments for the order tracker.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "FOODIE_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
	/// Track an order until it is delivered. A random id is used when none
	/// is given.
	Track { order_id: Option<String> },
	/// Print the stored record of an order
	Status { order_id: String },
	/// Resume the latest in-progress order and follow it until delivered
	Resume,
	/// List every stored order
	List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.tracker.id);

	let engine = build_engine(config)?;
	run(&engine, args.command).await
}

/// Builds the tracker engine from every registered backend implementation.
fn build_engine(config: Config) -> Result<TrackerEngine, Box<dyn Error>> {
	let registry = factory_registry::initialize_registry();
	Ok(TrackerBuilder::new(config).build(registry.tracker_factories())?)
}

async fn run(engine: &TrackerEngine, command: Command) -> Result<(), Box<dyn Error>> {
	match command {
		Command::Track { order_id } => {
			let printer = tokio::spawn(print_events(engine.event_bus().subscribe()));
			engine.initialize().await?;

			let order_id = order_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
			engine.tracker().start_tracking(&order_id).await?;
			println!("Tracking order {}", order_id);

			wait_for_delivery(engine).await?;
			printer.abort();
		},
		Command::Status { order_id } => match engine.tracker().get_status(&order_id).await? {
			Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
			None => println!("Order {} not found", order_id),
		},
		Command::Resume => {
			let printer = tokio::spawn(print_events(engine.event_bus().subscribe()));
			let report = engine.initialize().await?;

			match report.resumed {
				Some(resumed) => {
					println!(
						"Resumed order {} at {} ({}s after it took effect)",
						resumed.order_id,
						resumed.status,
						resumed.elapsed_ms / 1000
					);
					wait_for_delivery(engine).await?;
				},
				None => println!(
					"No active orders to resume ({} stored)",
					report.total_orders
				),
			}
			printer.abort();
		},
		Command::List => {
			let records = engine.ledger().all_orders().await?;
			if records.is_empty() {
				println!("No orders stored");
			}
			for record in records {
				println!("{}", format_record(&record));
			}
		},
	}
	Ok(())
}

/// Blocks until the active session completes or the user interrupts.
async fn wait_for_delivery(engine: &TrackerEngine) -> Result<(), Box<dyn Error>> {
	tokio::select! {
		_ = engine.tracker().wait_until_idle() => {
			tracing::info!("Tracking finished");
		}
		_ = tokio::signal::ctrl_c() => {
			let pending = engine.shutdown().await?;
			tracing::info!(pending, "Interrupted, pending transitions cancelled");
		}
	}
	Ok(())
}

/// Prints every persisted status as it happens.
async fn print_events(mut events: broadcast::Receiver<TrackerEvent>) {
	loop {
		match events.recv().await {
			Ok(TrackerEvent::StatusPersisted {
				order_id,
				status,
				timestamp,
			}) => println!("{}  {}  {}", format_millis(timestamp), order_id, status),
			Ok(_) => {},
			Err(broadcast::error::RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Status printer lagged behind");
			},
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
}

fn format_record(record: &OrderRecord) -> String {
	format!(
		"{}  {:<10}  since {}  (updated {})",
		record.id,
		record.status.to_string(),
		format_millis(record.timestamp),
		format_millis(record.last_update)
	)
}

/// Formats epoch milliseconds as a UTC date, or as the raw number when out of
/// range.
fn format_millis(ms: u64) -> String {
	i64::try_from(ms)
		.ok()
		.and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
		.map(|time| time.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
		.unwrap_or_else(|| ms.to_string())
}

//! `trail`: inspect and drive storefront attribution from the command line.
//!
//! Each invocation behaves like one page view of a single-tab profile whose
//! durable slot lives in the data directory.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "trail", version, about = "Campaign attribution tracking")]
struct Cli {
	/// Configuration file (defaults to `<config dir>/trail/config.toml` when present).
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	/// Directory holding the attribution slot (defaults to `<data dir>/trail`).
	#[arg(long, global = true)]
	data_dir: Option<PathBuf>,

	/// Enable debug logging.
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Land on a location: capture its parameters, merge and persist.
	Visit {
		/// A full URL, a path with a query, or a bare query string.
		location: String,
	},
	/// Print the persisted attribution.
	Show,
	/// Stamp the persisted attribution onto an outbound URL.
	Enrich {
		url: String,
	},
}

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let config = commands::load_config(cli.config.as_deref())?;
	let data_dir = match cli.data_dir {
		Some(dir) => dir,
		None => commands::default_data_dir()?,
	};
	let context = commands::open_context(config, &data_dir)?;

	let mut out = std::io::stdout().lock();
	match cli.command {
		Command::Visit { location } => commands::visit(&context, &location, &mut out),
		Command::Show => commands::show(&context, &mut out),
		Command::Enrich { url } => commands::enrich(&context, &url, &mut out),
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("TRAIL_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("trail=debug,trail_attribution=debug,warn")
			} else {
				EnvFilter::new("trail=info,trail_attribution=info,warn")
			}
		});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

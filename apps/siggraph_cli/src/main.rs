use std::path::PathBuf;

use clap::Parser as _;
use siggraph::{SecretKey, Timestamp};
use siggraph_cli::{
	commands::{self, Produced},
	history, listing,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(clap::Parser, Debug)]
#[clap(version, about)]
struct Cli {
	/// Path to the history to operate on, either an identity document or a
	/// json array of envelopes. `-` reads from stdin.
	#[clap(long, short = 'H', env = "SIGGRAPH_HISTORY")]
	history: PathBuf,
	#[clap(subcommand)]
	command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
	/// Validates the history and prints a summary.
	Verify,
	#[clap(subcommand)]
	Device(DeviceCommands),
	#[clap(subcommand)]
	Account(AccountCommands),
}

#[derive(clap::Subcommand, Debug)]
enum DeviceCommands {
	/// Lists every device key, including revoked ones.
	List,
	/// Adds a new device.
	Create {
		/// The signing key, as `kid:base64 seed`.
		#[clap(long, short, env = "SIGGRAPH_SECRET_KEY")]
		secret_key: SecretKey,
		/// Public key of the new device. Generated if not given.
		#[clap(long, short = 'p')]
		device_public_key: Option<String>,
	},
	/// Replaces the key of a device.
	Cycle {
		did: String,
		#[clap(long, short, env = "SIGGRAPH_SECRET_KEY")]
		secret_key: SecretKey,
		#[clap(long, short = 'p')]
		device_public_key: Option<String>,
	},
	/// Revokes the current key of a device.
	Revoke {
		did: String,
		#[clap(long, short, env = "SIGGRAPH_SECRET_KEY")]
		secret_key: SecretKey,
		/// Unix time the revocation takes effect. Defaults to now.
		#[clap(long, short = 'f')]
		effective_from: Option<Timestamp>,
	},
}

#[derive(clap::Subcommand, Debug)]
enum AccountCommands {
	/// Replaces a recovery key and adds a new device, signed by the recovery
	/// key being replaced.
	Recover {
		/// The recovery key, as `kid:base64 seed`, optionally prefixed by `rk_`.
		#[clap(long, short, env = "SIGGRAPH_RECOVERY_KEY", value_parser = parse_recovery_key)]
		recovery_key: SecretKey,
		#[clap(long, short = 'p')]
		device_public_key: Option<String>,
		#[clap(long, short = 'q')]
		recovery_public_key: Option<String>,
		#[clap(long, short = 'f')]
		effective_from: Option<Timestamp>,
	},
}

fn parse_recovery_key(s: &str) -> Result<SecretKey, siggraph::crypto::SecretKeyError> {
	s.strip_prefix("rk_").unwrap_or(s).parse()
}

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or("info".into()))
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let cli = Cli::parse();
	let graph = history::load(&cli.history)?;
	let now = siggraph_cli::now();

	let produced = match cli.command {
		Commands::Verify => {
			println!("{}", listing::summarize(&graph));
			return Ok(());
		}
		Commands::Device(DeviceCommands::List) => {
			print!("{}", listing::render_devices(&listing::device_rows(&graph)));
			return Ok(());
		}
		Commands::Device(DeviceCommands::Create {
			secret_key,
			device_public_key,
		}) => commands::create_device(
			&graph,
			&secret_key,
			device_public_key.as_deref(),
			now,
		)?,
		Commands::Device(DeviceCommands::Cycle {
			did,
			secret_key,
			device_public_key,
		}) => commands::cycle_device(
			&graph,
			&secret_key,
			&did,
			device_public_key.as_deref(),
			now,
		)?,
		Commands::Device(DeviceCommands::Revoke {
			did,
			secret_key,
			effective_from,
		}) => commands::revoke_device(&graph, &secret_key, &did, effective_from, now)?,
		Commands::Account(AccountCommands::Recover {
			recovery_key,
			device_public_key,
			recovery_public_key,
			effective_from,
		}) => commands::recover_account(
			&graph,
			&recovery_key,
			device_public_key.as_deref(),
			recovery_public_key.as_deref(),
			effective_from,
			now,
		)?,
	};
	emit(produced);
	Ok(())
}

/// Secrets go to stderr so that stdout carries only the envelope.
fn emit(produced: Produced) {
	for generated in produced.generated {
		eprintln!(
			"generated {}: {}",
			generated.label,
			generated.secret.to_encoded()
		);
	}
	println!("{}", produced.envelope.to_json());
}

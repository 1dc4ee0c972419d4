//! # easprov
//!
//! Encode ActiveSync provisioning documents, or extract the device identity
//! from binary ones.
//!
//! ```bash
//! # Print the binary form of a document as hex
//! easprov encode provision.xml
//!
//! # Log the device-identity record of a binary document
//! easprov decode provision.wbxml
//! ```

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use clap::Parser;
use easprov::{CodecConfiguration, Pipeline, ProtocolVersion, read_bounded};
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "easprov")]
#[command(about = "Encode and decode ActiveSync provisioning documents")]
#[command(version)]
struct Cli {
    /// Command (`encode`, anything else decodes) and input file
    #[arg(value_name = "ARGS")]
    args: Vec<String>,

    /// ActiveSync protocol version
    #[arg(short, long, default_value_t = ProtocolVersion::default())]
    protocol: ProtocolVersion,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let [command, file] = cli.args.as_slice() else {
        println!("{} [encode|decode] filename", env!("CARGO_BIN_NAME"));
        return Ok(());
    };

    let Some(data) = read_file(Path::new(file)) else {
        return Ok(());
    };

    let pipeline = Pipeline::new(CodecConfiguration::new(cli.protocol));

    if command.eq_ignore_ascii_case("encode") {
        match pipeline.encode(&String::from_utf8_lossy(&data)) {
            Ok(bytes) => println!("{}", hex::encode(bytes)),
            Err(err) => println!("{err}"),
        }
    } else {
        match pipeline.propagate_errors(true).extract(&data) {
            Ok(record) => info!(%record, "extracted record"),
            Err(err) => error!(%err, "failed to extract record"),
        }
    }

    Ok(())
}

/// Read the head of a file, or nothing if it cannot be read.
fn read_file(path: &Path) -> Option<Vec<u8>> {
    let data = File::open(path).and_then(read_bounded);

    match data {
        Ok(data) => Some(data),
        Err(err) => {
            debug!(%err, path = %path.display(), "skipping unreadable input");
            None
        }
    }
}

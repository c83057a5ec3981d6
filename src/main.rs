//! file-envelope - move a file through text-only channels.
//!
//! Encodes a file into a checksummed base64 XML envelope and restores it,
//! refusing to overwrite and verifying the digest of what was written.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use file_envelope::encoding::{decode_envelope_with, encode_file_report, verify_envelope};
use file_envelope::{digest_file, CodecConfig, DecodeOptions, DigestAlgorithm};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "file-envelope")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Convert a file to a checksummed base64 envelope and back",
    long_about = "Serializes a single file into a small XML envelope (base64 content, file name, digest) and restores it, verifying integrity."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file into an envelope
    Encode {
        /// File to encode
        file: PathBuf,

        /// Write the envelope here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Digest recorded in the envelope (md5, sha256)
        #[arg(long, default_value = "md5")]
        digest: DigestAlgorithm,

        /// Streaming chunk size in bytes
        #[arg(long, default_value = "1000")]
        chunk_size: usize,
    },

    /// Restore the file held by an envelope
    Decode {
        /// Read the envelope from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,

        /// Directory to write into (default: desktop, else current directory)
        #[arg(long)]
        target_dir: Option<PathBuf>,

        /// Delete the written file if its digest does not match
        #[arg(long)]
        remove_on_mismatch: bool,
    },

    /// Verify an envelope without writing anything
    Check {
        /// Read the envelope from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Print the digest of a file
    Digest {
        /// File to digest
        file: PathBuf,

        /// Digest algorithm (md5, sha256)
        #[arg(long, default_value = "md5")]
        digest: DigestAlgorithm,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        tracing::error!(error = %format!("{:#}", e), "command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Encode {
            file,
            output,
            digest,
            chunk_size,
        } => cmd_encode(&file, output, CodecConfig::new(chunk_size, digest)),

        Commands::Decode {
            input,
            target_dir,
            remove_on_mismatch,
        } => cmd_decode(
            input,
            target_dir,
            DecodeOptions { remove_on_mismatch },
        ),

        Commands::Check { input } => cmd_check(input),

        Commands::Digest { file, digest } => cmd_digest(&file, digest),
    }
}

/// Read envelope text from a file or stdin.
fn read_envelope(input: Option<PathBuf>) -> Result<String> {
    match input {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read envelope from {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read envelope from stdin")?;
            Ok(text)
        }
    }
}

/// Desktop if the platform has one, otherwise the current directory.
fn default_target_dir() -> Result<PathBuf> {
    if let Some(desktop) = directories::UserDirs::new()
        .and_then(|dirs| dirs.desktop_dir().map(Path::to_path_buf))
        .filter(|dir| dir.is_dir())
    {
        return Ok(desktop);
    }
    std::env::current_dir().context("failed to resolve current directory")
}

fn cmd_encode(file: &Path, output: Option<PathBuf>, config: CodecConfig) -> Result<()> {
    tracing::info!(path = %file.display(), digest = %config.digest, "encoding file");
    eprintln!("Conversion in progress...");

    let encoded = encode_file_report(file, &config)
        .with_context(|| format!("failed to encode {}", file.display()))?;

    tracing::info!(
        filename = %encoded.info.filename,
        size = encoded.info.size,
        checksum = %encoded.info.checksum,
        "file encoded"
    );

    match output {
        Some(path) => {
            fs::write(&path, encoded.envelope.as_bytes())
                .with_context(|| format!("failed to write envelope to {}", path.display()))?;
            eprintln!(
                "Encoded {} ({} bytes) to {}",
                encoded.info.filename,
                encoded.info.size,
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(encoded.envelope.as_bytes())
                .context("failed to write envelope to stdout")?;
            stdout.flush().context("failed to flush stdout")?;
            eprintln!(
                "Encoded {} ({} bytes)",
                encoded.info.filename, encoded.info.size
            );
        }
    }

    Ok(())
}

fn cmd_decode(
    input: Option<PathBuf>,
    target_dir: Option<PathBuf>,
    options: DecodeOptions,
) -> Result<()> {
    let text = read_envelope(input)?;
    let target_dir = match target_dir {
        Some(dir) => dir,
        None => default_target_dir()?,
    };

    tracing::info!(target_dir = %target_dir.display(), "decoding envelope");
    eprintln!("Deserializing file...");

    let written = decode_envelope_with(&text, &target_dir, &options)
        .with_context(|| format!("failed to decode into {}", target_dir.display()))?;

    tracing::info!(path = %written.display(), "file decoded");
    println!("{}", written.display());

    Ok(())
}

fn cmd_check(input: Option<PathBuf>) -> Result<()> {
    let text = read_envelope(input)?;
    let envelope = verify_envelope(&text).context("envelope verification failed")?;

    tracing::debug!(
        filename = %envelope.filename(),
        checksum = %envelope.checksum(),
        "envelope verified"
    );
    println!("OK {} {}", envelope.checksum(), envelope.filename());

    Ok(())
}

fn cmd_digest(file: &Path, algorithm: DigestAlgorithm) -> Result<()> {
    let hex = digest_file(file, algorithm)
        .with_context(|| format!("failed to digest {}", file.display()))?;

    println!("{}  {}", hex, file.display());

    Ok(())
}

mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use embedref_core::{
    Algorithm, KeeperUri, ReplaceOptions, S3Target, build_keeper_uri, get_embeds,
    get_s3_upload_target, parse_keeper_uri, replace_data_urls, replace_keeper_uris,
    strip_embed_prefix,
};
use output::{
    EmbedsOutput, ExternalizeOutput, KeeperBuildOutput, KeeperParseOutput, KeepersOutput,
    OutputWriter, ReplacementInfo, RewriteOutput, TargetOutput, document_text,
};
use serde_json::Value;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// embedref - move binary payloads in JSON documents between data URIs, keeper URIs and S3 URLs
#[derive(Parser)]
#[command(name = "embedref")]
#[command(about = "Rewrite embedded payload references in JSON documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where externalized objects go.
#[derive(Args)]
struct StoreArgs {
    /// Destination bucket
    #[arg(long)]
    bucket: String,

    /// Prefix prepended to the content hash
    #[arg(long, default_value = "")]
    key_prefix: String,

    /// S3 region (ignored when --endpoint is given)
    #[arg(long)]
    region: Option<String>,

    /// Explicit S3 endpoint, e.g. localhost:4572
    #[arg(long)]
    endpoint: Option<String>,

    /// Hash algorithm for data URI payloads
    #[arg(long, default_value = "sha256")]
    algo: Algorithm,
}

impl StoreArgs {
    fn into_options(self) -> ReplaceOptions {
        ReplaceOptions {
            region: self.region,
            endpoint: self.endpoint,
            bucket: self.bucket,
            key_prefix: self.key_prefix,
            algorithm: self.algo,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the S3 embeds in a document
    Embeds {
        /// JSON document (stdin if omitted or "-")
        file: Option<PathBuf>,
    },

    /// Remove u:s3:/p:s3: prefixes from embeds
    Strip {
        /// JSON document (stdin if omitted or "-")
        file: Option<PathBuf>,
    },

    /// Replace data URIs with S3 URLs keyed by content hash
    Externalize {
        /// JSON document (stdin if omitted or "-")
        file: Option<PathBuf>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Replace keeper URIs with S3 URLs
    Keepers {
        /// JSON document (stdin if omitted or "-")
        file: Option<PathBuf>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Parse or build keeper URIs
    #[command(subcommand)]
    Keeper(KeeperCommands),

    /// Show where an object would be uploaded
    Target {
        /// Destination bucket
        #[arg(long)]
        bucket: String,

        /// Object key
        #[arg(long)]
        key: String,

        /// S3 region (ignored when --endpoint is given)
        #[arg(long)]
        region: Option<String>,

        /// Explicit S3 endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[derive(Subcommand)]
enum KeeperCommands {
    /// Parse a keeper URI
    Parse {
        /// The URI to parse
        uri: String,
    },

    /// Build a keeper URI
    Build {
        /// Content hash
        hash: String,

        /// Attributes as name=value
        attributes: Vec<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let output = OutputWriter::new(cli.json);

    let result = match cli.command {
        Commands::Embeds { file } => cmd_embeds(&output, file.as_deref()),
        Commands::Strip { file } => cmd_strip(&output, file.as_deref()),
        Commands::Externalize { file, store } => {
            cmd_externalize(&output, file.as_deref(), store.into_options())
        }
        Commands::Keepers { file, store } => {
            cmd_keepers(&output, file.as_deref(), store.into_options())
        }
        Commands::Keeper(keeper_cmd) => match keeper_cmd {
            KeeperCommands::Parse { uri } => cmd_keeper_parse(&output, &uri),
            KeeperCommands::Build { hash, attributes } => {
                cmd_keeper_build(&output, &hash, &attributes)
            }
        },
        Commands::Target {
            bucket,
            key,
            region,
            endpoint,
        } => cmd_target(&output, bucket, key, region, endpoint),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.write_error(&err, 1);
            ExitCode::from(1)
        }
    }
}

/// Read a JSON document from a file, or from stdin for `None` / `-`.
fn read_document(file: Option<&Path>) -> Result<Value> {
    match file.filter(|path| *path != Path::new("-")) {
        Some(path) => {
            let reader = BufReader::new(
                File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
            );
            serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse JSON from {}", path.display()))
        }
        None => {
            if atty::is(atty::Stream::Stdin) {
                anyhow::bail!("No input: pass a FILE or pipe a JSON document on stdin");
            }
            serde_json::from_reader(io::stdin().lock()).context("Failed to parse JSON from stdin")
        }
    }
}

fn cmd_embeds(output: &OutputWriter, file: Option<&Path>) -> Result<()> {
    let document = read_document(file)?;
    let embeds = get_embeds(&document);

    output.write(
        &EmbedsOutput {
            success: true,
            result_code: 0,
            embeds: embeds.clone(),
        },
        || {
            let mut text = String::new();
            for embed in &embeds {
                let mode = if embed.location.presigned {
                    "presigned"
                } else {
                    embed.mode.prefix()
                };
                let _ = writeln!(
                    text,
                    "{} {} s3://{}/{}",
                    embed.path,
                    mode,
                    embed.bucket(),
                    embed.key()
                );
            }
            text
        },
    )
}

fn cmd_strip(output: &OutputWriter, file: Option<&Path>) -> Result<()> {
    let mut document = read_document(file)?;
    let rewritten = strip_embed_prefix(&mut document);

    let text = document_text(&document);
    output.write(
        &RewriteOutput {
            success: true,
            result_code: 0,
            rewritten,
            document,
        },
        || text,
    )
}

fn cmd_externalize(output: &OutputWriter, file: Option<&Path>, options: ReplaceOptions) -> Result<()> {
    let mut document = read_document(file)?;
    let replacements = replace_data_urls(&mut document, &options)
        .with_context(|| format!("Failed to externalize data URIs to bucket {:?}", options.bucket))?;

    let replacements: Vec<ReplacementInfo> = replacements.into_iter().map(Into::into).collect();
    for replacement in &replacements {
        tracing::info!(
            path = %replacement.path,
            size = replacement.size,
            url = %replacement.s3_url,
            "externalized"
        );
    }

    let text = document_text(&document);
    output.write(
        &ExternalizeOutput {
            success: true,
            result_code: 0,
            replacements,
            document,
        },
        || text,
    )
}

fn cmd_keepers(output: &OutputWriter, file: Option<&Path>, options: ReplaceOptions) -> Result<()> {
    let mut document = read_document(file)?;
    let replacements = replace_keeper_uris(&mut document, &options)
        .with_context(|| format!("Failed to convert keeper URIs for bucket {:?}", options.bucket))?;

    let text = document_text(&document);
    output.write(
        &KeepersOutput {
            success: true,
            result_code: 0,
            replacements,
            document,
        },
        || text,
    )
}

fn cmd_keeper_parse(output: &OutputWriter, uri: &str) -> Result<()> {
    let keeper = parse_keeper_uri(uri).with_context(|| format!("Not a keeper URI: {}", uri))?;

    let mut text = format!("hash: {}\n", keeper.hash);
    for (name, value) in &keeper.attributes {
        let _ = writeln!(text, "{}: {}", name, value);
    }
    output.write(
        &KeeperParseOutput {
            success: true,
            result_code: 0,
            keeper,
        },
        || text,
    )
}

fn cmd_keeper_build(output: &OutputWriter, hash: &str, attributes: &[String]) -> Result<()> {
    let mut keeper = KeeperUri::new(hash);
    for attribute in attributes {
        let (name, value) = attribute
            .split_once('=')
            .with_context(|| format!("Invalid attribute (expected name=value): {}", attribute))?;
        keeper = keeper.with_attribute(name, value);
    }

    let uri = build_keeper_uri(&keeper);
    output.write(
        &KeeperBuildOutput {
            success: true,
            result_code: 0,
            uri: uri.clone(),
        },
        || format!("{}\n", uri),
    )
}

fn cmd_target(
    output: &OutputWriter,
    bucket: String,
    key: String,
    region: Option<String>,
    endpoint: Option<String>,
) -> Result<()> {
    let options = ReplaceOptions {
        region,
        endpoint,
        ..ReplaceOptions::new(bucket)
    };
    let target = get_s3_upload_target(&S3Target {
        endpoint: options.resolve_endpoint(),
        bucket: options.bucket,
        key,
    })
    .context("Failed to compute upload target")?;

    let text = format!("{}\n", target.s3_url);
    output.write(
        &TargetOutput {
            success: true,
            result_code: 0,
            target,
        },
        || text,
    )
}

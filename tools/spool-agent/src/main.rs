mod config;
mod console;
mod dump;
mod http;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use config::Config;
use console::{ConsoleIndicator, FixedWeight};
use http::ReqwestHttp;
use opentag_spool_sync::{
    CycleReport, SpoolUuid, SyncEngine, decode_tag_json, fetch_catalog, find_in_catalog,
    read_tag_json, retrieve_spool,
};
use opentag_tag_codec::{MemoryTag, NdefEnvelope};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// spool-agent – host helper for the OpenTag spool scale.
#[derive(Parser, Debug)]
#[command(name = "spool-agent", version)]
struct Cli {
    /// Spoolman API root (overrides configs/spool-agent.toml).
    #[arg(long, global = true)]
    server: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Decode a tag dump offline and print the envelope and spool record.
    Inspect {
        /// Raw binary image, or hex text with a .hex/.txt extension.
        dump: PathBuf,
    },
    /// Look up the catalog id for a spool UUID.
    Resolve { uuid: String },
    /// Fetch one spool from the catalog and print it as a spool record.
    Fetch { id: u32 },
    /// Run a full sync cycle with the dump as the tag in the field.
    Sync {
        dump: PathBuf,
        /// Gross weight on the scale, in grams.
        #[arg(long)]
        weight: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = config::find_repo_root()?;
    let mut cfg = Config::load(&root)?;
    if let Some(server) = cli.server {
        cfg.server = server;
    }
    init_logging(&cfg.log_level)?;
    let sync = cfg.sync_config();
    tracing::debug!(server = %cfg.server, root = %root.display(), "config loaded");

    match cli.cmd {
        Cmd::Inspect { dump } => {
            let image = dump::load(&dump)?;
            let mut tag = MemoryTag::new(image);
            let (envelope, json) = read_tag_json(&mut tag, &sync.envelope)
                .await
                .map_err(|e| anyhow!("tag unreadable: {e:?}"))?;
            let record =
                decode_tag_json(&json).map_err(|e| anyhow!("invalid spool record: {e:?}"))?;
            let out = json!({
                "envelope": envelope_json(&envelope),
                "json": String::from_utf8_lossy(&json),
                "record": record,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Cmd::Resolve { uuid } => {
            let uuid = SpoolUuid::parse(&uuid).context("uuid is empty")?;
            let mut http = ReqwestHttp::new(Duration::from_secs(cfg.timeout_secs))?;
            let entries = fetch_catalog(&mut http, &sync)
                .await
                .map_err(|e| anyhow!("catalog fetch failed: {e:?}"))?;
            let Some(catalog_id) = find_in_catalog(&entries, &uuid) else {
                bail!("{uuid} not found among {} spools", entries.len());
            };
            let out = json!({ "uuid": uuid, "catalog_id": catalog_id });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Cmd::Fetch { id } => {
            let mut http = ReqwestHttp::new(Duration::from_secs(cfg.timeout_secs))?;
            let record = retrieve_spool(&mut http, &sync, id, || {
                *uuid::Uuid::new_v4().as_bytes()
            })
            .await
            .map_err(|e| anyhow!("spool {id} fetch failed: {e:?}"))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Cmd::Sync { dump, weight } => {
            let image = dump::load(&dump)?;
            println!("led: {}", console::describe_idle());
            let http = ReqwestHttp::new(Duration::from_secs(cfg.timeout_secs))?;
            let mut engine = SyncEngine::new(
                MemoryTag::new(image),
                http,
                FixedWeight(weight),
                ConsoleIndicator::default(),
                sync,
            );
            let report = engine.run_cycle().await;
            println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
            if !report.outcome.is_success() {
                bail!("sync ended with {}", report.outcome.as_str());
            }
        }
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();

    Ok(())
}

fn envelope_json(envelope: &NdefEnvelope) -> Value {
    json!({
        "tlv_tag": envelope.tlv.tag,
        "declared_length": envelope.tlv.declared_length,
        "header_len": envelope.tlv.header_len,
        "payload": { "start": envelope.payload.start, "len": envelope.payload.len },
        "json": { "start": envelope.json.start, "len": envelope.json.len },
    })
}

fn report_json(report: &CycleReport) -> Value {
    json!({
        "outcome": report.outcome.as_str(),
        "led": console::describe(report.outcome),
        "envelope": report.envelope.as_ref().map(envelope_json),
        "record": report.record,
        "catalog_id": report.catalog_id,
        "weight_grams": report.weight_grams,
        "error": report.error.map(|e| format!("{e:?}")),
    })
}

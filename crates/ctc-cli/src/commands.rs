use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use ctc_ledger::{ChainReader, ChainService, ChainWriter, LedgerConfig, ViolationKind};
use ctc_store::FileKvStore;
use ctc_types::BatchHash;
use serde_json::json;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    debug!(store = %cli.store.display(), head_key = %config.head_key, "opening chain");
    let store = FileKvStore::open(&cli.store)
        .with_context(|| format!("failed to open store {}", cli.store.display()))?;
    let chain = ChainService::new(store, config)?;

    match cli.command {
        Command::Commit(args) => cmd_commit(&chain, args, &cli.format),
        Command::History(args) => cmd_history(&chain, args, &cli.format),
        Command::Reset(_) => cmd_reset(&chain),
        Command::Head(_) => cmd_head(&chain, &cli.format),
        Command::Show(args) => cmd_show(&chain, args, &cli.format),
        Command::Verify(_) => cmd_verify(&chain, &cli.format),
    }
}

/// Defaults, overridden by whatever the TOML file sets.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LedgerConfig> {
    let Some(path) = path else {
        return Ok(LedgerConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: LedgerConfig =
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

type Chain = ChainService<FileKvStore>;

fn read_input(input: &str) -> anyhow::Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read batch from stdin")?;
        Ok(buf)
    } else {
        fs::read(input).with_context(|| format!("failed to read batch from {input}"))
    }
}

fn write_raw(bytes: &[u8]) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(bytes)?;
    out.write_all(b"\n")?;
    Ok(())
}

fn cmd_commit(chain: &Chain, args: CommitArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let bytes = read_input(&args.input)?;
    let hash = chain.commit(&bytes).context("commit failed")?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "hash": hash })),
        OutputFormat::Text => {
            println!("{} Committed batch {}", "✓".green().bold(), hash.to_hex().yellow());
        }
    }
    Ok(())
}

fn cmd_history(chain: &Chain, args: HistoryArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let history = chain.history().context("failed to walk the chain")?;

    if args.delimited {
        return write_raw(&history.to_delimited());
    }
    match format {
        OutputFormat::Json => write_raw(&history.to_json()),
        OutputFormat::Text => {
            if history.is_empty() {
                println!("Chain is empty.");
                return Ok(());
            }
            for entry in &history {
                let marker = if entry.batch.is_genesis() {
                    " (genesis)".green().to_string()
                } else {
                    String::new()
                };
                println!(
                    "{}  ts={}  {} transaction(s){}",
                    entry.hash.short_hex().yellow().bold(),
                    entry.batch.timestamp,
                    entry.batch.transactions.len(),
                    marker
                );
            }
            println!("{} batch(es)", history.len().to_string().bold());
            Ok(())
        }
    }
}

fn cmd_reset(chain: &Chain) -> anyhow::Result<()> {
    chain.reset().context("reset failed")?;
    println!("{} Chain head cleared", "✓".green().bold());
    Ok(())
}

fn cmd_head(chain: &Chain, format: &OutputFormat) -> anyhow::Result<()> {
    let head = chain.head()?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "head": head })),
        OutputFormat::Text => match head {
            Some(hash) => println!("{}", hash.to_hex().yellow()),
            None => println!("(empty chain)"),
        },
    }
    Ok(())
}

fn cmd_show(chain: &Chain, args: ShowArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let hash: BatchHash = args
        .hash
        .parse()
        .with_context(|| format!("not a batch hash: {}", args.hash))?;
    let Some(record) = chain.get(&hash)? else {
        bail!("no batch stored under {hash}");
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => {
            println!("Batch {}", hash.to_hex().yellow().bold());
            println!("  Timestamp: {}", record.timestamp);
            match record.prev_batch_hash {
                Some(prev) => println!("  Previous:  {}", prev.to_hex().cyan()),
                None => println!("  Previous:  {}", "(genesis)".green()),
            }
            println!("  Prior state: {}", hex_or_empty(&record.prev_state_hash));
            println!("  New state:   {}", hex_or_empty(&record.new_state_hash));
            for tx in &record.transactions {
                println!(
                    "  - {}.{}({})",
                    tx.chaincode_name.bold(),
                    tx.transaction_name,
                    tx.args.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn hex_or_empty(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        "(none)".dimmed().to_string()
    } else {
        hex::encode(bytes)
    }
}

fn cmd_verify(chain: &Chain, format: &OutputFormat) -> anyhow::Result<()> {
    let report = chain.validate()?;

    match format {
        OutputFormat::Json => {
            let violations: Vec<_> = report
                .violations
                .iter()
                .map(|v| {
                    json!({
                        "hash": v.hash,
                        "kind": format!("{:?}", v.kind),
                        "description": v.description,
                    })
                })
                .collect();
            println!(
                "{}",
                json!({
                    "valid": report.is_valid(),
                    "head": report.head,
                    "recordCount": report.record_count,
                    "complete": report.complete,
                    "violations": violations,
                })
            );
        }
        OutputFormat::Text => {
            if report.is_valid() {
                println!("{} Chain integrity verified", "✓".green().bold());
            } else {
                println!("{} Chain integrity check failed", "✗".red().bold());
            }
            println!("  Records: {}", report.record_count.to_string().bold());
            for v in &report.violations {
                let hash = v.hash.map(|h| h.short_hex()).unwrap_or_else(|| "head".into());
                let label = format!("{:?}", v.kind);
                let blocking =
                    v.kind != ViolationKind::StateDiscontinuity || report.continuity_enforced;
                let label = if blocking { label.red() } else { label.yellow() };
                println!("  {} at {}: {}", label, hash, v.description);
            }
        }
    }

    if !report.is_valid() {
        bail!("chain failed validation");
    }
    Ok(())
}

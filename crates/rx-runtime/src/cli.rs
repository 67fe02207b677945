//! # rx-ledger Command Line
//!
//! Administrative commands over the on-disk ledger. Issuance needs a
//! composition backend and is not exposed here; imports run through the
//! issuance workflow with an offline composer.

use crate::config::RuntimeConfig;
use crate::container::LedgerContainer;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use rx_02_block_ledger::{
    Block, BlockId, BlockRegistryApi, PrescriptionLogApi, SerialAllocatorApi, SerialScheme,
    SourceRef,
};
use rx_03_issuance::{ImportRequest, IssuanceApi, NoopSyncRelay, OfflineComposer};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Prescription block ledger administration.
#[derive(Parser, Debug)]
#[command(name = "rx-ledger")]
#[command(about = "Prescription block ledger administration", long_about = None)]
#[command(version)]
pub struct Args {
    /// Data directory (overrides RX_DATA_DIR).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log filter (overrides RX_LOG_LEVEL).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Layer flag overrides on top of the environment configuration.
    pub fn apply(&self, config: &mut RuntimeConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

/// Serial rendering scheme on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SchemeArg {
    /// `<prefix>-<zero-padded index + 1>`
    Padded,
    /// Trailing number of the prefix plus the index.
    Continuation,
}

impl From<SchemeArg> for SerialScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Padded => SerialScheme::Padded,
            SchemeArg::Continuation => SerialScheme::Continuation,
        }
    }
}

/// Ledger commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List blocks, newest import first.
    List,
    /// Show one block with its journal.
    Show {
        /// Block id.
        block_id: String,
    },
    /// Register a block of pre-numbered forms.
    Import {
        /// Source document reference.
        #[arg(long)]
        source: String,
        /// Serial prefix printed on the stock.
        #[arg(long)]
        prefix: String,
        /// Number of forms in the block. The page count cannot be read
        /// without a document service, so the import fails when omitted.
        #[arg(long)]
        capacity: Option<u32>,
        /// Display name. Defaults to the source reference.
        #[arg(long)]
        label: Option<String>,
        /// Serial scheme.
        #[arg(long, value_enum, default_value_t = SchemeArg::Padded)]
        scheme: SchemeArg,
        /// Read the source password from the first line of stdin.
        #[arg(long)]
        password_stdin: bool,
        /// Make the new block the active one.
        #[arg(long)]
        activate: bool,
    },
    /// Make a block the only active one.
    Activate {
        /// Block id.
        block_id: String,
    },
    /// Move a block's cursor (clamped to its capacity).
    SetCursor {
        /// Block id.
        block_id: String,
        /// New 0-based cursor.
        #[arg(allow_hyphen_values = true)]
        index: i64,
    },
    /// Delete a block. Irreversible.
    Remove {
        /// Block id.
        block_id: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Ledger totals.
    Stats,
    /// Check persisted data for problems.
    Verify,
    /// Serial a block would render for a slot.
    Preview {
        /// Block id.
        block_id: String,
        /// 0-based slot.
        index: u32,
    },
    /// List or search issued prescriptions.
    Prescriptions {
        /// Case-insensitive match on patient, serial or medication.
        #[arg(long)]
        search: Option<String>,
    },
}

/// Run one command against an opened ledger, writing results to `out`.
pub async fn execute(
    container: &LedgerContainer,
    command: Command,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let ledger = container.ledger();
    let registry = ledger.registry();

    match command {
        Command::List => {
            let blocks = registry.get_all().await;
            if json {
                return emit_json(out, &blocks);
            }
            if blocks.is_empty() {
                writeln!(out, "no blocks")?;
            }
            for block in &blocks {
                writeln!(out, "{}", summary_line(block))?;
            }
        }
        Command::Show { block_id } => {
            let id = BlockId::new(block_id);
            let block = registry
                .get(&id)
                .await
                .with_context(|| format!("Block not found: {}", id))?;
            if json {
                return emit_json(out, &block);
            }
            writeln!(out, "{}", summary_line(&block))?;
            writeln!(out, "  source:    {}", block.source_ref)?;
            writeln!(out, "  imported:  {}", block.imported_at.to_rfc3339())?;
            writeln!(out, "  protected: {}", block.is_protected())?;
            for entry in block.journal.iter() {
                writeln!(
                    out,
                    "  #{:<4} {}  {}",
                    entry.index,
                    entry.serial,
                    entry.issued_at.to_rfc3339()
                )?;
            }
        }
        Command::Import {
            source,
            prefix,
            capacity,
            label,
            scheme,
            password_stdin,
            activate,
        } => {
            let password = if password_stdin {
                let mut line = String::new();
                std::io::stdin()
                    .read_line(&mut line)
                    .context("Failed to read password from stdin")?;
                line.trim_end_matches(['\r', '\n']).to_string()
            } else {
                String::new()
            };
            let mut request = ImportRequest::new(SourceRef::new(source.clone()), prefix)
                .label(label.unwrap_or(source))
                .scheme(scheme.into())
                .password(password)
                .activate(activate);
            if let Some(capacity) = capacity {
                request = request.capacity(i64::from(capacity));
            }
            let block = container
                .workflow(Arc::new(OfflineComposer), Arc::new(NoopSyncRelay))
                .import_block(request)
                .await
                .context("Import failed; pass --capacity when no document service is attached")?;
            if json {
                return emit_json(out, &block);
            }
            writeln!(out, "imported {}", summary_line(&block))?;
        }
        Command::Activate { block_id } => {
            let block = registry.activate(&BlockId::new(block_id)).await?;
            if json {
                return emit_json(out, &block);
            }
            writeln!(out, "active {}", summary_line(&block))?;
        }
        Command::SetCursor { block_id, index } => {
            let block = ledger
                .allocator()
                .set_cursor(&BlockId::new(block_id), index)
                .await?;
            if json {
                return emit_json(out, &block);
            }
            writeln!(out, "{}", summary_line(&block))?;
        }
        Command::Remove { block_id, yes } => {
            if !yes {
                bail!("Refusing to remove {} without --yes", block_id);
            }
            let block = registry.remove(&BlockId::new(block_id)).await?;
            if json {
                return emit_json(out, &block);
            }
            writeln!(out, "removed {}", summary_line(&block))?;
        }
        Command::Stats => {
            let stats = ledger.stats().await;
            if json {
                return emit_json(out, &stats);
            }
            writeln!(out, "blocks:        {}", stats.total_blocks)?;
            writeln!(out, "  exhausted:   {}", stats.exhausted_blocks)?;
            writeln!(out, "  quarantined: {}", stats.quarantined_blocks)?;
            writeln!(out, "consumed:      {}/{}", stats.total_consumed, stats.total_capacity)?;
            match stats.active_remaining {
                Some(remaining) => writeln!(out, "active left:   {}", remaining)?,
                None => writeln!(out, "active left:   (no active block)")?,
            }
            writeln!(out, "issued:        {}", stats.total_issued)?;
            writeln!(
                out,
                "prescriptions: {} ({} today)",
                stats.prescriptions, stats.prescriptions_today
            )?;
        }
        Command::Verify => {
            let report = container.verify().await;
            if json {
                emit_json(out, &report)?;
            } else {
                for q in &report.quarantined {
                    writeln!(out, "quarantined {}: {}", q.block_id, q.reason)?;
                }
                if !report.multiple_active.is_empty() {
                    let ids: Vec<&str> =
                        report.multiple_active.iter().map(BlockId::as_str).collect();
                    writeln!(out, "multiple active blocks: {}", ids.join(", "))?;
                }
                for id in &report.undecryptable {
                    writeln!(out, "credential does not decrypt: {}", id)?;
                }
                if report.is_clean() {
                    writeln!(out, "ok")?;
                }
            }
            if !report.is_clean() {
                bail!("Ledger at {} has integrity problems", report.data_dir.display());
            }
        }
        Command::Preview { block_id, index } => {
            let serial = ledger
                .allocator()
                .preview_serial(&BlockId::new(block_id), index)
                .await?;
            if json {
                return emit_json(out, &serial);
            }
            writeln!(out, "{}", serial)?;
        }
        Command::Prescriptions { search } => {
            let log = ledger.prescriptions();
            let records = match search {
                Some(query) => log.search(&query).await,
                None => log.list().await,
            };
            if json {
                return emit_json(out, &records);
            }
            for rx in &records {
                writeln!(
                    out,
                    "{}  {}  {}  {}  {}",
                    rx.issued_at.format("%Y-%m-%d %H:%M"),
                    rx.serial,
                    rx.patient.patient_name,
                    rx.patient.medication,
                    rx.id
                )?;
            }
        }
    }

    Ok(())
}

fn summary_line(block: &Block) -> String {
    let marker = if block.active { "*" } else { " " };
    let next = block
        .next_serial()
        .unwrap_or_else(|| "exhausted".to_string());
    format!(
        "{} {}  {}  {}/{}  next {}  {}",
        marker,
        block.id,
        block.serial_prefix,
        block.cursor,
        block.capacity,
        next,
        block.label
    )
}

fn emit_json<T: Serialize>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

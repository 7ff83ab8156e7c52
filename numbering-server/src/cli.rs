//! `numbering` operator CLI
//!
//! - `numbering check`: guard index and duplicate report, read-only, exit 0
//! - `numbering repair`: dry run by default; `--apply` asks for a typed `yes`

use std::io::{BufRead, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use shared::models::{CheckReport, DocumentType, RepairSummary, ScopeFilter};

use crate::core::{Config, ServerState};
use crate::db::DbService;
use crate::numbering::{ReconcilePolicy, repair};

#[derive(Parser, Debug)]
#[command(name = "numbering")]
#[command(about = "Document number diagnostics and duplicate repair")]
#[command(version)]
pub struct Cli {
    /// SQLite database (defaults to DATABASE_PATH or {WORK_DIR}/numbering.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Restrict the run to part of the data
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    #[arg(long, value_name = "ID")]
    pub store: Option<i64>,

    #[arg(long, value_name = "ID")]
    pub partner: Option<i64>,

    /// Document type (PO / PR / PURCHASE_ORDER / PURCHASE_RETURN)
    #[arg(long = "type", value_name = "TYPE")]
    pub document_type: Option<DocumentType>,

    /// Period (YYYYMM)
    #[arg(long, value_name = "YYYYMM")]
    pub period: Option<String>,

    /// Exact scope key, e.g. 1:7:PR:202510
    #[arg(long, value_name = "KEY")]
    pub scope: Option<String>,
}

impl From<FilterArgs> for ScopeFilter {
    fn from(args: FilterArgs) -> Self {
        ScopeFilter {
            store_id: args.store,
            partner_id: args.partner,
            document_type: args.document_type,
            period_key: args.period,
            scope_key: args.scope,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report guard indexes and duplicate counts; never modifies data
    Check {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Reconcile duplicate document numbers
    Repair {
        #[command(flatten)]
        filter: FilterArgs,

        /// Write changes (default is a dry run)
        #[arg(long)]
        apply: bool,

        /// Skip the interactive confirmation of --apply
        #[arg(long, requires = "apply")]
        yes: bool,

        /// Soft-delete later duplicates instead of renumbering them
        #[arg(long, requires = "operator")]
        delete: bool,

        /// Operator responsible for a --delete run
        #[arg(long, value_name = "NAME")]
        operator: Option<String>,
    },
}

/// Execute a parsed command; prompts read from `input`, reports go to `out`
pub async fn run(
    cli: Cli,
    config: Config,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<ExitCode> {
    let database = cli
        .database
        .clone()
        .unwrap_or_else(|| config.database_path.clone());

    match cli.command {
        Command::Check { filter } => {
            match run_check(&database, config, filter.into()).await {
                Ok(report) => print_check(out, &report, cli.json)?,
                Err(e) => writeln!(out, "check could not complete: {e:#}")?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Repair {
            filter,
            apply,
            yes,
            delete,
            operator,
        } => {
            let policy = match (delete, operator) {
                (true, Some(operator)) => ReconcilePolicy::delete(operator),
                _ => ReconcilePolicy::renumber(),
            }
            .dry_run(!apply);

            if apply && !yes && !confirm(input, out, &database)? {
                writeln!(out, "Aborted, nothing was changed")?;
                return Ok(ExitCode::FAILURE);
            }

            let summary = run_repair(&database, config, filter.into(), &policy).await?;
            print_summary(out, &summary, cli.json)?;

            if apply && summary.unresolved > 0 {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_check(database: &str, config: Config, filter: ScopeFilter) -> anyhow::Result<CheckReport> {
    let db = DbService::open_existing(database)
        .await
        .with_context(|| format!("opening {database}"))?;
    let state = ServerState::with_pool(config, db.pool)?;
    Ok(repair::check(state.store.as_ref(), &filter).await?)
}

async fn run_repair(
    database: &str,
    config: Config,
    filter: ScopeFilter,
    policy: &ReconcilePolicy,
) -> anyhow::Result<RepairSummary> {
    // Applied runs migrate and ensure indexes; dry runs stay read-only
    let db = if policy.dry_run {
        DbService::open_existing(database).await
    } else {
        DbService::new(database).await
    }
    .with_context(|| format!("opening {database}"))?;

    let state = ServerState::with_pool(config, db.pool)?;
    Ok(state.repair.run(filter, policy).await?)
}

fn confirm(input: &mut impl BufRead, out: &mut impl Write, database: &str) -> anyhow::Result<bool> {
    write!(out, "Apply repairs to {database}? Type 'yes' to continue: ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim() == "yes")
}

fn print_check(out: &mut impl Write, report: &CheckReport, json: bool) -> anyhow::Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        return Ok(());
    }
    writeln!(out, "Guard indexes:")?;
    for index in &report.indexes {
        let state = match (index.present, index.correct) {
            (true, true) => "ok",
            (true, false) => "present, unexpected definition",
            (false, _) => "MISSING",
        };
        writeln!(out, "  {:<28} {state}", index.name)?;
    }
    writeln!(out, "Duplicate groups:    {}", report.duplicate_groups)?;
    writeln!(out, "Duplicate documents: {}", report.duplicate_documents)?;
    Ok(())
}

fn print_summary(out: &mut impl Write, summary: &RepairSummary, json: bool) -> anyhow::Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(summary)?)?;
        return Ok(());
    }
    let mode = if summary.dry_run { "dry run" } else { "applied" };
    writeln!(out, "Repair ({mode})")?;
    for outcome in &summary.outcomes {
        writeln!(
            out,
            "  {} {} keep={}",
            outcome.scope_key,
            outcome.document_number,
            outcome.kept.map(|id| id.to_string()).unwrap_or_else(|| "-".into())
        )?;
        for r in &outcome.renumbered {
            let target = r.new_number.as_deref().unwrap_or("(next free number)");
            writeln!(out, "    renumber {} -> {target}", r.id)?;
        }
        for id in &outcome.removed {
            writeln!(out, "    remove {id}")?;
        }
        for u in &outcome.unresolved {
            writeln!(out, "    UNRESOLVED {}: {}", u.id, u.reason)?;
        }
    }
    writeln!(
        out,
        "groups={} kept={} renumbered={} removed={} unresolved={}",
        summary.groups, summary.kept, summary.renumbered, summary.removed, summary.unresolved
    )?;
    Ok(())
}

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use wardstock_cli::{build_report, ReceiptDraft};
use wardstock_core::UserId;
use wardstock_receiving::ReceivingConfig;

#[derive(Parser)]
#[command(
    name = "wardstock-grn-report",
    about = "Value, total and validate a goods receipt draft",
    version
)]
struct Cli {
    /// Draft JSON file; `-` reads stdin.
    draft: PathBuf,

    /// Approve the receipt when it validates and include the submission payload.
    #[arg(long)]
    approve: bool,

    /// User recorded as the approver.
    #[arg(long, requires = "approve")]
    approved_by: Option<UserId>,

    /// Emit compact JSON instead of pretty-printed.
    #[arg(long)]
    compact: bool,
}

fn read_draft(path: &PathBuf) -> Result<ReceiptDraft> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read draft from stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read draft {}", path.display()))?
    };
    serde_json::from_str(&raw).context("draft is not a valid receipt draft")
}

fn main() -> Result<ExitCode> {
    wardstock_observability::init();

    let cli = Cli::parse();
    let config = ReceivingConfig::from_env();
    let draft = read_draft(&cli.draft)?;

    let approve_as = cli.approve.then_some(cli.approved_by);
    let report = build_report(&draft, config, approve_as);

    tracing::info!(
        receipt_id = %report.receipt_id,
        lines = report.lines.len(),
        errors = report.errors.len(),
        rejected = report.rejected.len(),
        approved = report.approved,
        "receipt report built"
    );

    let rendered = if cli.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .context("failed to render report")?;
    println!("{rendered}");

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

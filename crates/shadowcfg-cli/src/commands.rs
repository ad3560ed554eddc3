use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use colored::{ColoredString, Colorize};
use shadowcfg_checksum::Ledger;
use shadowcfg_recovery::{
    NameStatus, Outcome, PassReport, RecoveryDriver, StoreConfig, Verification,
};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Command::Recover(args) => cmd_recover(&cli, args),
        Command::Status(args) => cmd_status(&cli, args),
        Command::Begin(args) => cmd_begin(&cli, args),
        Command::Commit(args) => cmd_commit(&cli, args),
        Command::Abort(args) => cmd_abort(&cli, args),
        Command::Seal(args) => cmd_seal(&cli, args),
        Command::Check(args) => cmd_check(&cli, args),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = StoreConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    apply_overrides(cli, &mut config);
    debug!(
        path = %cli.config.display(),
        config_dir = %config.config_dir.display(),
        managed = config.managed.len(),
        "loaded store config"
    );
    Ok(config)
}

/// Checksum policy for raw `seal`/`check`: taken from the config file when
/// there is one.
fn ledger(cli: &Cli) -> anyhow::Result<Ledger> {
    if cli.config.exists() {
        return Ok(load_config(cli)?.ledger());
    }
    Ok(StoreConfig::default().ledger())
}

fn apply_overrides(cli: &Cli, config: &mut StoreConfig) {
    if let Some(dir) = &cli.config_dir {
        config.config_dir = dir.clone();
    }
    if let Some(dir) = &cli.readonly_dir {
        config.readonly_dir = dir.clone();
    }
}

fn driver(cli: &Cli) -> anyhow::Result<RecoveryDriver> {
    Ok(RecoveryDriver::new(load_config(cli)?)?)
}

fn cmd_recover(cli: &Cli, args: &NamesArgs) -> anyhow::Result<ExitCode> {
    let driver = driver(cli)?;
    let report = if args.names.is_empty() {
        driver.run()
    } else {
        driver.run_selected(args.names.as_slice())
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn print_report(report: &PassReport) {
    for entry in &report.outcomes {
        let mark = match &entry.outcome {
            o if o.lost_local_edits() => "!".yellow().bold(),
            Outcome::Intact | Outcome::Skipped => "·".dimmed(),
            _ => "✓".green().bold(),
        };
        println!("{mark} {:<20} {}", entry.name.bold(), entry.outcome);
    }
    for failure in &report.failures {
        println!("{} {:<20} {}", "✗".red().bold(), failure.name.bold(), failure.error.red());
    }

    let summary = format!(
        "{} recovered, {} failed",
        report.outcomes.len(),
        report.failures.len()
    );
    if report.is_success() {
        println!("\n{}", summary.green());
    } else {
        println!("\n{}", summary.red().bold());
    }
}

fn cmd_status(cli: &Cli, args: &NamesArgs) -> anyhow::Result<ExitCode> {
    let driver = driver(cli)?;
    let names: Vec<String> = if args.names.is_empty() {
        driver.config().names().map(str::to_string).collect()
    } else {
        args.names.clone()
    };
    let statuses = names
        .iter()
        .map(|name| driver.inspect(name))
        .collect::<Result<Vec<_>, _>>()?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&statuses)?),
        OutputFormat::Text => statuses.iter().for_each(print_status),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_status(status: &NameStatus) {
    let state = if status.optional && !status.reference_present {
        "not shipped".dimmed()
    } else if status.needs_recovery() {
        "needs recovery".yellow()
    } else {
        "ok".green()
    };
    println!("{} ({state})", status.name.bold());
    for snapshot in &status.snapshots {
        println!("  {:<5} {}", snapshot.kind.to_string(), describe(&snapshot.verification));
    }
    if status.upgrade_pending {
        println!("  {}", "new factory default pending".cyan());
    }
    if status.patch_present {
        println!("  {}", "merge patch left over".yellow());
    }
}

fn describe(verification: &Verification) -> ColoredString {
    match verification {
        Verification::Valid => "valid".green(),
        Verification::MissingFile => "absent".dimmed(),
        Verification::MissingSidecar => "not sealed".yellow(),
        Verification::Malformed { reason } => format!("bad sidecar: {reason}").red(),
        Verification::PathMismatch { recorded } => {
            format!("sealed for {}", recorded.display()).red()
        }
        Verification::DigestMismatch { .. } => "content changed since seal".red(),
        Verification::Unreadable { reason } => format!("unreadable: {reason}").red(),
    }
}

fn cmd_begin(cli: &Cli, args: &NameArgs) -> anyhow::Result<ExitCode> {
    let driver = driver(cli)?;
    let txn = driver.begin_update(&args.name)?;
    let conf = driver.snapshots(&args.name)?.paths().conf.clone();
    drop(txn);
    println!(
        "{} Backed up {}; edit {} then run `shadowcfg commit {}`",
        "✓".green().bold(),
        args.name.bold(),
        conf.display(),
        args.name
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_commit(cli: &Cli, args: &NameArgs) -> anyhow::Result<ExitCode> {
    driver(cli)?.resume_update(&args.name)?.commit()?;
    println!("{} Committed {}", "✓".green().bold(), args.name.bold());
    Ok(ExitCode::SUCCESS)
}

fn cmd_abort(cli: &Cli, args: &NameArgs) -> anyhow::Result<ExitCode> {
    driver(cli)?.resume_update(&args.name)?.abort()?;
    println!("{} Restored {} from backup", "✓".green().bold(), args.name.bold());
    Ok(ExitCode::SUCCESS)
}

fn cmd_seal(cli: &Cli, args: &PathArgs) -> anyhow::Result<ExitCode> {
    let ledger = ledger(cli)?;
    let sidecar = ledger.seal(&args.path)?;
    let sidecar_path = ledger.sidecar_path(&args.path);
    match cli.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "path": sidecar.path,
                "sidecar": sidecar_path,
                "algorithm": ledger.algorithm(),
                "digest": sidecar.digest,
            })
        ),
        OutputFormat::Text => println!(
            "{} {}  {}",
            "✓".green().bold(),
            sidecar.digest.dimmed(),
            sidecar_path.display()
        ),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_check(cli: &Cli, args: &PathArgs) -> anyhow::Result<ExitCode> {
    let ledger = ledger(cli)?;
    let verification = ledger.verify(&args.path);
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verification)?),
        OutputFormat::Text => println!("{}: {}", display(&args.path), describe(&verification)),
    }
    Ok(if verification.is_valid() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn display(path: &Path) -> ColoredString {
    path.display().to_string().bold()
}

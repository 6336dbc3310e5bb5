//! Reconciliation passes using brewkit: plan, install, upgrade, remove, purge.

use anyhow::{Context as _, Result};
use brewkit::{Action, Client, OperationBatch, PackageSpec};
use colored::Colorize;

use crate::Context;
use crate::cli::{PlanArgs, ReconcileArgs};
use crate::paths;
use crate::progress;
use crate::ui;

/// Batches to run plus the names that need nothing.
struct Planned {
    batches: Vec<OperationBatch>,
    satisfied: Vec<String>,
}

/// Specs from the command line, falling back to the configured list.
fn desired_specs(ctx: &Context, packages: Vec<PackageSpec>) -> Vec<PackageSpec> {
    if packages.is_empty() {
        ctx.config.packages.clone()
    } else {
        packages
    }
}

fn plan_pass(ctx: &Context, client: &Client, action: Action, specs: &[PackageSpec]) -> Planned {
    let pb = progress::spinner(&format!("Planning {action}..."), ctx.quiet);
    let planned = match action {
        Action::Upgrade => {
            let plan = client.plan_upgrade(specs);
            Planned {
                batches: plan.batches(),
                satisfied: plan.satisfied,
            }
        }
        _ => Planned {
            batches: client.plan(action, specs),
            satisfied: Vec::new(),
        },
    };
    pb.finish_and_clear();
    planned
}

/// Format a batch label with color.
fn colored_label(batch: &OperationBatch) -> colored::ColoredString {
    match batch {
        OperationBatch::Install(_) => "install".green(),
        OperationBatch::Upgrade(_) => "upgrade".blue(),
        OperationBatch::Remove(_) => "remove".yellow(),
        OperationBatch::Purge(_) => "purge".red(),
    }
}

fn print_plan(planned: &Planned) {
    ui::section("Plan");
    if planned.batches.is_empty() {
        ui::dim("nothing to do");
    }
    for batch in &planned.batches {
        println!("  {} {}", colored_label(batch), batch.formulae().join(" "));
    }
    if !planned.satisfied.is_empty() {
        ui::dim(&format!("already satisfied: {}", planned.satisfied.join(", ")));
    }
}

fn no_packages() {
    ui::warn("No packages given and none configured");
    let location = paths::config_file()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "config.toml".to_string());
    ui::dim(&format!(
        "Pass NAME or NAME=VERSION, or add [[packages]] to {location}"
    ));
}

/// Show what a pass would do without touching Homebrew.
pub fn plan(ctx: &Context, args: PlanArgs) -> Result<()> {
    let action = Action::from(args.action);
    let specs = desired_specs(ctx, args.packages);
    if specs.is_empty() {
        no_packages();
        return Ok(());
    }

    let client = ctx.config.client(true)?;
    let planned = plan_pass(ctx, &client, action, &specs);

    if args.json {
        let out = serde_json::json!({
            "action": action,
            "batches": planned.batches,
            "satisfied": planned.satisfied,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    ui::header(&format!("Plan: {action} {} formulae", specs.len()));
    print_plan(&planned);
    Ok(())
}

/// Plan and run one pass.
pub fn run(ctx: &Context, action: Action, args: ReconcileArgs) -> Result<()> {
    let specs = desired_specs(ctx, args.packages);
    if specs.is_empty() {
        no_packages();
        return Ok(());
    }

    if action == Action::Purge && !args.dry_run && !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Purge every installed version of {} formulae?",
                specs.len()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if !confirmed {
            ui::info("Purge cancelled");
            return Ok(());
        }
    }

    ui::header(&format!("Reconciling: {action}"));

    let client = ctx.config.client(args.dry_run)?;
    let host = client.host();
    ui::dim(&format!(
        "Homebrew at {} as {}",
        host.root().display(),
        host.owner().name
    ));

    let planned = plan_pass(ctx, &client, action, &specs);
    print_plan(&planned);

    if planned.batches.is_empty() {
        println!();
        ui::success("Everything is up to date");
        return Ok(());
    }

    if args.dry_run {
        println!();
        ui::info("Dry run - no changes made");
        return Ok(());
    }

    println!();
    let total = planned.batches.len();
    for (i, batch) in planned.batches.iter().enumerate() {
        ui::step(i + 1, total, &format!("brew {}", client.brew_args(batch).join(" ")));
        let pb = progress::spinner(&format!("Running brew {}...", batch.verb()), ctx.quiet);

        if let Err(e) = client.apply(std::slice::from_ref(batch)) {
            progress::finish_error(&pb, &e.to_string());
            report_failure(ctx, &e, total - i - 1);
            anyhow::bail!("{action} failed");
        }
        progress::finish_success(&pb, &batch.to_string());
    }

    println!();
    ui::success(&format!("{action} complete"));
    Ok(())
}

fn report_failure(ctx: &Context, err: &brewkit::Error, skipped: usize) {
    if let Some(category) = err.category() {
        ui::kv("Cause", category.description());
        ui::kv("Hint", category.advice());
    }
    if skipped > 0 {
        ui::warn(&format!("Skipped {skipped} remaining batch(es)"));
    }
    if ctx.verbose == 0 {
        ui::dim("Re-run with -vv to see every brew invocation");
    }
}

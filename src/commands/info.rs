//! `brewcore info` - what Homebrew knows about one formula.

use anyhow::Result;

use crate::Context;
use crate::progress;
use crate::ui;

pub fn run(ctx: &Context, formula: &str, json: bool) -> Result<()> {
    let client = ctx.config.client(false)?;

    let pb = progress::spinner(&format!("Querying {formula}..."), ctx.quiet || json);
    let info = client.info(formula);
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let installed = info.installed_version();
    let kegs: Vec<&str> = info.installed.iter().map(|k| k.version.as_str()).collect();

    ui::header(formula);
    ui::kv("Installed", &ui::or_none(installed.as_deref()));
    ui::kv("Linked keg", &ui::or_none(info.linked_keg.as_deref()));
    ui::kv("Keg-only", if info.keg_only { "yes" } else { "no" });
    ui::kv("Kegs", &ui::or_none((!kegs.is_empty()).then(|| kegs.join(", ")).as_deref()));
    ui::kv("Stable", &ui::or_none(info.stable_version.as_deref()));

    if installed.is_none() && !info.has_installed() {
        println!();
        ui::dim("Not installed, or unknown to Homebrew");
    }
    Ok(())
}

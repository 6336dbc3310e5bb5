//! `brewcore host` - detected owner, architecture and paths.

use anyhow::{Context as _, Result};
use brewkit::HostEnvironment;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let host = HostEnvironment::detect(&ctx.config.host_options())
        .context("Could not detect the Homebrew host")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&host)?);
        return Ok(());
    }

    let owner = host.owner();
    let arch = if host.is_emulated() {
        format!("{} (emulated)", host.arch())
    } else {
        host.arch().to_string()
    };
    let brew = if host.brew_exists() { "found" } else { "missing" };

    ui::header("Homebrew host");
    ui::kv("Owner", &format!("{} (uid {}, gid {})", owner.name, owner.uid, owner.gid));
    ui::kv("Home", &owner.home.display().to_string());
    ui::kv("Architecture", &arch);
    ui::kv("Root", &host.root().display().to_string());
    ui::kv("Prefix", &host.prefix().display().to_string());
    ui::kv("Repository", &host.repository().display().to_string());
    ui::kv("Brew", &format!("{} ({brew})", host.bin().display()));

    if host.is_emulated() {
        println!();
        ui::warn("Running under Rosetta emulation; brew commands will be refused");
    } else if !host.brew_exists() {
        println!();
        ui::warn("Homebrew is not installed. Install it from https://brew.sh");
    }
    Ok(())
}

//! Launchpad init command
//!
//! Writes the built-in tool list to `tools_config.json` and the default
//! supervisor timings to `.launchpad/launcher.json`.

use launchpad_foundation::{
    JsonStore, LauncherConfig, ToolsConfig, LAUNCHER_CONFIG_FILE, TOOLS_CONFIG_FILE,
};
use std::path::Path;

/// Write the default configuration files into `base_dir`
pub fn init_tools(base_dir: &Path, force: bool) -> anyhow::Result<()> {
    let launcher_path = JsonStore::project(base_dir).file_path(LAUNCHER_CONFIG_FILE);
    if force || !launcher_path.exists() {
        LauncherConfig::default().save_project(base_dir)?;
        println!("  Created {}", launcher_path.display());
    }

    let path = base_dir.join(TOOLS_CONFIG_FILE);
    let defaults = ToolsConfig::defaults();
    if force {
        defaults.save(&path)?;
    } else if !ToolsConfig::ensure_exists(&path)? {
        println!("✓ {} already exists.", path.display());
        println!("  Use --force to overwrite it with the defaults.");
        return Ok(());
    }
    println!("  Created {}", path.display());
    for tool in &defaults.tools {
        println!("    - {} ({}, {})", tool.id, tool.label, tool.kind);
    }

    println!("\n✓ Launchpad initialized.");
    println!("\nNext steps:");
    println!("  1. Edit {} to match your tools", TOOLS_CONFIG_FILE);
    println!("  2. Run 'launchpad check' to validate it");
    println!("  3. Run 'launchpad run --all' to start everything");

    Ok(())
}

//! `list` / `check` commands

use launchpad_foundation::{ToolDescriptor, ToolsConfig, TOOLS_CONFIG_FILE};
use std::collections::HashSet;
use std::path::Path;

/// Configuration as the registry would see it
struct Inspection {
    from_defaults: bool,
    tools: Vec<ToolDescriptor>,
    /// (id, reason)
    rejected: Vec<(String, String)>,
}

fn inspect(base_dir: &Path) -> Inspection {
    let loaded = ToolsConfig::load(&base_dir.join(TOOLS_CONFIG_FILE));
    let mut rejected: Vec<(String, String)> = loaded
        .rejected
        .iter()
        .map(|(id, e)| (id.clone(), e.to_string()))
        .collect();

    let mut seen = HashSet::new();
    let mut tools = Vec::new();
    for entry in &loaded.entries {
        match entry.validate(base_dir) {
            Ok(descriptor) if !seen.insert(descriptor.id.clone()) => {
                rejected.push((descriptor.id.clone(), "duplicate id".to_string()));
            }
            Ok(descriptor) => tools.push(descriptor),
            Err(e) => rejected.push((entry.id.trim().to_string(), e.to_string())),
        }
    }

    Inspection {
        from_defaults: loaded.from_defaults,
        tools,
        rejected,
    }
}

fn print_rejected(rejected: &[(String, String)]) {
    if rejected.is_empty() {
        return;
    }
    println!("\nRejected entries:");
    for (id, reason) in rejected {
        println!("  ✗ {}: {}", id, reason);
    }
}

/// Print every configured tool
pub fn list_tools(base_dir: &Path) -> anyhow::Result<()> {
    let inspection = inspect(base_dir);

    if inspection.from_defaults {
        println!("(no usable {}, showing built-in defaults)\n", TOOLS_CONFIG_FILE);
    }

    for tool in &inspection.tools {
        let enabled = if tool.enabled { "enabled" } else { "disabled" };
        println!("{} - {} [{}, {}]", tool.id, tool.label, tool.kind, enabled);
        println!("    dir: {}", tool.invocation.working_dir.display());
        println!("    log: {}", tool.log_path.display());
        if let Some(port) = tool.dashboard_port {
            println!("    dashboard: http://127.0.0.1:{}", port);
        }
    }

    print_rejected(&inspection.rejected);
    Ok(())
}

/// Validate the configuration; fails if any entry is rejected
pub fn check_tools(base_dir: &Path) -> anyhow::Result<()> {
    let inspection = inspect(base_dir);

    for tool in &inspection.tools {
        match tool.invocation.preflight() {
            Ok(()) => println!("  ✓ {}", tool.id),
            Err(reason) => println!("  ! {}: {}", tool.id, reason),
        }
    }
    print_rejected(&inspection.rejected);

    if !inspection.rejected.is_empty() {
        anyhow::bail!("{} invalid tool entries", inspection.rejected.len());
    }
    println!("\n✓ {} tools OK", inspection.tools.len());
    Ok(())
}

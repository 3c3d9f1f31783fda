//! `run` command - start tools and follow the merged feed

use launchpad_foundation::{LauncherConfig, ToolsConfig, TOOLS_CONFIG_FILE};
use launchpad_supervisor::{RegistryConfig, RegistryEvent, SupervisorRegistry, SupervisorState};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

pub async fn run_tools(base_dir: &Path, ids: Vec<String>, all: bool) -> anyhow::Result<()> {
    if ids.is_empty() && !all {
        anyhow::bail!("Nothing to run: pass tool ids or --all");
    }

    let launcher = LauncherConfig::load(base_dir);
    let loaded = ToolsConfig::load(&base_dir.join(TOOLS_CONFIG_FILE));
    for (id, e) in &loaded.rejected {
        warn!("Skipping {}: {}", id, e);
    }

    let registry =
        SupervisorRegistry::new(RegistryConfig::from_launcher_config(base_dir, &launcher));
    let report = registry.rebuild(&loaded.entries).await;
    for (id, e) in &report.rejected {
        warn!("Skipping {}: {}", id, e);
    }

    let targets = if all { registry.tool_ids() } else { ids };
    if targets.is_empty() {
        anyhow::bail!("No enabled tools in {}", TOOLS_CONFIG_FILE);
    }
    if let Some(unknown) = targets.iter().find(|id| registry.state(id).is_none()) {
        anyhow::bail!("Unknown or disabled tool: {}", unknown);
    }

    let labels: HashMap<String, String> = targets
        .iter()
        .filter_map(|id| registry.descriptor(id).map(|d| (id.clone(), d.label.clone())))
        .collect();
    let label_of = |id: &str| labels.get(id).map(String::as_str).unwrap_or(id).to_string();

    // Subscribe before starting so no line is missed
    let mut rx = registry.subscribe();

    let results = if all {
        registry.start_all().await
    } else {
        let mut results = Vec::with_capacity(targets.len());
        for id in &targets {
            results.push((id.clone(), registry.start(id).await));
        }
        results
    };
    // Tools whose final state change has not been printed yet
    let mut pending = HashSet::new();
    for (id, result) in results {
        match result {
            Ok(_) => {
                pending.insert(id);
            }
            Err(e) => eprintln!("✗ {}", e),
        }
    }
    info!("Following {} tools, Ctrl-C to stop", pending.len());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;

    while !pending.is_empty() {
        tokio::select! {
            _ = &mut ctrl_c, if !stopping => {
                println!("\nStopping...");
                stopping = true;
                registry.stop_all().await;
                registry.shutdown().await;
            }
            event = rx.recv() => match event {
                Ok(event) => {
                    if let RegistryEvent::StateChanged { tool_id, to, .. } = &event {
                        if is_idle(*to) {
                            pending.remove(tool_id);
                        }
                    }
                    print_event(&event, &label_of);
                }
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("... {} feed events skipped", skipped);
                    pending.retain(|id| registry.state(id).map_or(false, |s| !is_idle(s)));
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    let failed: Vec<_> = targets
        .iter()
        .filter(|id| registry.state(id) == Some(SupervisorState::Error))
        .map(|id| label_of(id))
        .collect();
    if !failed.is_empty() {
        anyhow::bail!("Failed: {}", failed.join(", "));
    }
    Ok(())
}

fn is_idle(state: SupervisorState) -> bool {
    matches!(state, SupervisorState::Stopped | SupervisorState::Error)
}

fn print_event(event: &RegistryEvent, label_of: &impl Fn(&str) -> String) {
    match event {
        RegistryEvent::Line(line) => println!("{}", line.format_prefixed(&label_of(&line.tool_id))),
        RegistryEvent::StateChanged { tool_id, to, .. } => {
            println!("{} [{}] {}", to.symbol(), label_of(tool_id), to)
        }
        RegistryEvent::Rebuilt { .. } => {}
    }
}

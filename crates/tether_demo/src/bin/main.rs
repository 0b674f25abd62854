//! Tether demo runner
//!
//! Builds a small settings page, attaches toggles and their buttons, clicks
//! each button and reports the resulting state.
//!
//! Usage:
//!   tether-demo                       # Run with defaults
//!   tether-demo --clicks 3            # Click every button three times
//!   tether-demo --lock airplane       # Veto changes to the `airplane` toggle
//!   tether-demo --config tether.toml  # Load registry options

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tether_demo::{Toggle, ToggleButton, TOGGLE_CHANGE};
use tether_dom::{Document, ElementId, Event, EventInit, ListenerOptions};
use tether_widget::{RegistryConfig, WidgetClass, WidgetRegistry, WidgetSource};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "tether-demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Walk through the Tether widget lifecycle", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Registry config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Clicks sent to every button
    #[arg(long, default_value = "1")]
    clicks: u32,

    /// Ids of toggles whose changes are vetoed
    #[arg(long)]
    lock: Vec<String>,
}

const SETTINGS: &[(&str, bool)] = &[("wifi", false), ("bluetooth", true), ("airplane", false)];

/// `<section>` holding one toggle and one button per setting
fn build_page(doc: &mut Document) -> Result<ElementId> {
    let root = doc.root();
    let section = doc.append_element(root, "section")?;
    doc.add_class(section, "settings")?;

    for &(id, on) in SETTINGS {
        let row = doc.append_element(section, "div")?;
        doc.add_class(row, "row")?;

        let toggle = doc.append_element(row, "div")?;
        doc.set_attribute(toggle, "id", id)?;
        doc.set_attribute(toggle, "data-toggle", if on { "on" } else { "off" })?;

        let button = doc.append_element(row, "button")?;
        doc.set_attribute(button, "data-controls", id)?;
    }

    Ok(section)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = match &cli.config {
        Some(path) => RegistryConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RegistryConfig::default(),
    };

    let mut doc = Document::new();
    let section = build_page(&mut doc)?;
    let root = doc.root();

    // Report every change that reaches the top of the tree
    doc.add_event_listener(root, TOGGLE_CHANGE, ListenerOptions::default(), |e| {
        let source = WidgetSource::name_of(e).unwrap_or("?");
        let on = e.field("on").and_then(|v| v.as_bool()).unwrap_or_default();
        info!("{} requested on={} (canceled={})", source, on, e.default_prevented());
    })?;

    // Locked toggles veto their own changes during capture at the section
    let locked: Vec<ElementId> = cli
        .lock
        .iter()
        .filter_map(|id| doc.element_by_id(id))
        .collect();
    doc.add_event_listener(section, TOGGLE_CHANGE, ListenerOptions::capture(), move |e| {
        if e.target().is_some_and(|t| locked.contains(&t)) {
            e.prevent_default();
        }
    })?;

    let mut registry = WidgetRegistry::with_config(config);
    let toggles = registry.init_all::<Toggle>(&mut doc, section)?;
    let buttons = registry.init_all::<ToggleButton>(&mut doc, section)?;
    info!(
        "attached {} toggles and {} buttons",
        toggles.created, buttons.created
    );

    let button_ids = ToggleButton::find_all(&doc, section)?;
    for &button in &button_ids {
        for _ in 0..cli.clicks {
            doc.dispatch_event(button, Event::new("click", EventInit::bubbling()))?;
        }
        let applied = ToggleButton::apply_clicks(button, &mut registry, &mut doc)?;
        tracing::debug!("button {:?} applied {} flip(s)", button, applied);
    }

    // Refresh pass picks up the rendered state
    let refreshed = registry.init_all::<Toggle>(&mut doc, section)?;
    info!("refreshed {} toggles", refreshed.refreshed);

    for &(id, _) in SETTINGS {
        let Some(element) = doc.element_by_id(id) else {
            continue;
        };
        if let Some(toggle) = registry.get_instance::<Toggle>(element) {
            info!("{}: {}", id, if toggle.is_on() { "on" } else { "off" });
        }
    }

    let removed = registry.delete_all::<ToggleButton>(&mut doc, section)?
        + registry.delete_all::<Toggle>(&mut doc, section)?;
    info!(
        "removed {} instances, {} remain, {} button listeners left",
        removed,
        registry.len(),
        button_ids
            .iter()
            .map(|&b| doc.listener_count(b))
            .sum::<usize>()
    );

    Ok(())
}

//! Structure map command (`repolens map`).

use anyhow::{Context, Result, bail};
use console::style;
use repolens::api::StructureResponse;
use repolens::config::RepolensConfig;
use repolens::graph::{Layout, LayoutBuilder, StructureState, StructureWatcher, Viewport, scene};
use repolens::ui::{self, icons::CHECK};
use std::path::PathBuf;
use std::sync::Arc;

/// Where the structure comes from.
pub enum MapSource {
    /// Fetch from the backend
    Project(String),
    /// A saved structure response
    File(PathBuf),
}

pub struct MapOptions {
    pub out: Option<PathBuf>,
    pub hover: Option<String>,
    pub zoom: Option<f64>,
    pub jitter: bool,
}

pub async fn cmd_map(config: &RepolensConfig, source: MapSource, options: MapOptions) -> Result<()> {
    let mut builder = LayoutBuilder::new(config.toml.layout);
    if !options.jitter {
        builder = builder.without_jitter();
    }

    let layout: Arc<Layout> = match source {
        MapSource::File(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let structure: StructureResponse = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse structure JSON in {}", path.display()))?;
            match builder.build(&structure.nodes, &structure.links) {
                Some(layout) => Arc::new(layout),
                None => bail!("{} contains no nodes", path.display()),
            }
        }
        MapSource::Project(project_id) => fetch_layout(config, builder, project_id).await?,
    };

    let mut viewport = Viewport::new(config.toml.viewport);
    viewport.center_on(&layout);
    if let Some(zoom) = options.zoom {
        viewport.set_zoom(zoom);
    }
    if let Some(id) = &options.hover {
        if layout.node(id).is_none() {
            bail!("No node with id '{}' in the structure", id);
        }
        viewport.hover(id.clone());
    }

    let svg = scene(&layout, &viewport).to_svg();

    match &options.out {
        Some(path) => {
            std::fs::write(path, svg)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{}Wrote {} nodes across {} levels to {}",
                CHECK,
                layout.len(),
                layout.max_depth() + 1,
                style(path.display()).bold()
            );
        }
        None => print!("{}", svg),
    }
    Ok(())
}

async fn fetch_layout(
    config: &RepolensConfig,
    builder: LayoutBuilder,
    project_id: String,
) -> Result<Arc<Layout>> {
    let (api, session) = super::connect(config)?;
    super::require_session(&session)?;

    let watcher = StructureWatcher::spawn_with_builder(api, session, builder);
    let mut states = watcher.subscribe();
    let spinner = ui::spinner(StructureState::Loading.describe());
    watcher.select(Some(project_id.clone()));

    let state = states
        .wait_for(|s| !matches!(s, StructureState::NoSelection | StructureState::Loading))
        .await
        .map(|s| (*s).clone())
        .context("Structure watcher stopped unexpectedly")?;
    spinner.finish_and_clear();
    watcher.shutdown().await;

    match state {
        StructureState::Ready(layout) => Ok(layout),
        other => bail!("{}: {}", project_id, other.describe()),
    }
}

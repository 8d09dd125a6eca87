//! Repository listing and connection commands (`repolens projects` and `repolens add`).

use anyhow::{Context, Result, bail};
use console::style;
use repolens::config::RepolensConfig;
use repolens::ui::{
    self,
    icons::{CHECK, FOLDER},
};

pub async fn cmd_projects(config: &RepolensConfig) -> Result<()> {
    let (api, session) = super::connect(config)?;
    let session = super::require_session(&session)?;

    let spinner = ui::spinner("Loading repositories...");
    let result = api.list_projects(Some(&session)).await;
    spinner.finish_and_clear();
    let projects = result.context("Failed to list repositories")?;

    if projects.is_empty() {
        println!("No repositories connected yet.");
        println!("Run 'repolens add <repo_url>' to connect one.");
        return Ok(());
    }

    for project in &projects {
        println!(
            "{}{}  {}",
            FOLDER,
            style(&project.name).bold(),
            style(&project.id).dim()
        );
        println!("    {}", project.repo_url);
    }
    Ok(())
}

pub async fn cmd_add(config: &RepolensConfig, repo_url: &str) -> Result<()> {
    let repo_url = repo_url.trim();
    if repo_url.is_empty() {
        bail!("Repository URL cannot be empty");
    }

    let (api, session) = super::connect(config)?;
    let session = super::require_session(&session)?;

    let spinner = ui::spinner(format!("Connecting {}...", repo_url));
    let result = api.create_project(repo_url, Some(&session)).await;
    spinner.finish_and_clear();
    let project = result.with_context(|| format!("Failed to connect {}", repo_url))?;

    println!(
        "{}Connected {} {}",
        CHECK,
        style(&project.name).bold(),
        style(format!("({})", project.id)).dim()
    );
    if let Some(message) = &project.message {
        println!("    {}", style(message).dim());
    }
    println!();
    println!("Indexing runs in the background. Once it finishes:");
    println!("  repolens chat --project {} \"How is this repo organized?\"", project.id);
    println!("  repolens map {} --out map.svg", project.id);
    Ok(())
}

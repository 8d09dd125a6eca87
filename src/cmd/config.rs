//! Configuration view and validation commands (`repolens config`).

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use repolens::config::{CONFIG_FILE_NAME, RepolensConfig, RepolensToml, config_dir};

    let dir = config_dir(project_dir);
    let config_path = dir.join(CONFIG_FILE_NAME);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Repolens Configuration");
            println!("======================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                RepolensToml::load(&config_path)?
            } else {
                println!("No repolens.toml found at {}", config_path.display());
                println!("Using default configuration.");
                RepolensToml::default()
            };
            println!();

            println!("[api]");
            println!("  base_url = \"{}\"", toml.api.base_url);
            println!("  timeout_secs = {}", toml.api.timeout_secs);
            println!();

            println!("[auth]");
            println!(
                "  access_token = {}",
                if toml.auth.access_token.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            if let Some(email) = &toml.auth.user_email {
                println!("  user_email = \"{}\"", email);
            }
            println!();

            println!("[chat]");
            println!("  default_project = \"{}\"", toml.chat.default_project);
            println!();

            println!("[layout]");
            println!("  sibling_spacing = {}", toml.layout.sibling_spacing);
            println!("  level_height = {}", toml.layout.level_height);
            println!("  base_offset = {}", toml.layout.base_offset);
            println!("  max_jitter = {}", toml.layout.max_jitter);
            println!(
                "  canvas = {} x {}",
                toml.layout.canvas_width, toml.layout.canvas_height
            );
            println!();

            println!("[viewport]");
            println!("  size = {} x {}", toml.viewport.width, toml.viewport.height);
            println!("  wheel_sensitivity = {}", toml.viewport.wheel_sensitivity);
            println!(
                "  zoom = {} .. {}",
                toml.viewport.min_zoom, toml.viewport.max_zoom
            );
            println!();

            // Effective values (including env overrides)
            println!("Effective values (with env overrides):");
            let config = RepolensConfig::new(project_dir.to_path_buf())?;
            println!("  api_url = \"{}\"", config.api_base_url());
            println!(
                "  authenticated = {}",
                config.access_token().is_some()
            );
            println!();

            if !config_path.exists() {
                println!("Run 'repolens config init' to create a repolens.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No repolens.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = RepolensToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("repolens.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
            }

            let toml = RepolensToml::default();
            toml.save(&config_path)?;

            println!("Created repolens.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] base_url, timeout_secs");
            println!("  - [chat] default_project");
            println!("  - [layout] spacing, level height and jitter of the structure map");
            println!("  - [viewport] size and zoom bounds");
            println!();
            println!("Keep the access token out of the file: set REPOLENS_ACCESS_TOKEN instead.");
            println!();
        }
    }

    Ok(())
}

//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled          |
//! |-----------------|---------------------------|
//! | `projects`      | `Projects`, `Add`         |
//! | `chat`          | `Chat`                    |
//! | `map`           | `Map`                     |
//! | `config`        | `Config`                  |

pub mod chat;
pub mod config;
pub mod map;
pub mod projects;

pub use chat::cmd_chat;
pub use config::cmd_config;
pub use map::{MapOptions, MapSource, cmd_map};
pub use projects::{cmd_add, cmd_projects};

use anyhow::{Context, Result};
use repolens::api::ApiClient;
use repolens::config::{ACCESS_TOKEN_ENV, RepolensConfig};
use repolens::session::{Session, SessionProvider};

/// Build the API client and a session provider seeded from the configured token.
fn connect(config: &RepolensConfig) -> Result<(ApiClient, SessionProvider)> {
    let base_url = config.api_base_url();
    let api = ApiClient::new(&base_url, config.request_timeout())
        .with_context(|| format!("Cannot use API base URL '{}'", base_url))?;

    let session = config.access_token().map(|token| {
        let session = Session::new(token);
        match &config.toml.auth.user_email {
            Some(email) => session.with_email(email.clone()),
            None => session,
        }
    });
    Ok((api, SessionProvider::new(session)))
}

/// The current session, or an error telling the user how to provide a token.
fn require_session(session: &SessionProvider) -> Result<Session> {
    session.current().with_context(|| {
        format!(
            "No access token configured. Set {} or pass --token.",
            ACCESS_TOKEN_ENV
        )
    })
}

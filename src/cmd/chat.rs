//! Streaming chat command (`repolens chat`).

use anyhow::{Context, Result, bail};
use console::style;
use repolens::chat::{ChatClient, ExchangeOutcome};
use repolens::config::RepolensConfig;
use repolens::ui::ChatView;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub async fn cmd_chat(config: &RepolensConfig, project_id: &str, message: Option<&str>) -> Result<()> {
    let (api, session) = super::connect(config)?;
    let client = ChatClient::new(api, session);
    let mut view = ChatView::new();

    if let Some(message) = message {
        let outcome = run_exchange(&client, &mut view, message, project_id).await;
        if let ExchangeOutcome::Failed { error, .. } = outcome {
            bail!("Chat request failed: {}", error);
        }
        return Ok(());
    }

    interactive(&client, &mut view, project_id).await
}

async fn interactive(client: &ChatClient, view: &mut ChatView, project_id: &str) -> Result<()> {
    use dialoguer::Input;

    println!(
        "{} {}",
        style("Chatting with").dim(),
        style(project_id).cyan().bold()
    );
    println!(
        "{}",
        style("Ctrl-C stops an answer. /clear resets the conversation, /exit quits.").dim()
    );
    println!();

    loop {
        let line: String = match Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => break,
            Err(e) => return Err(e).context("Failed to read message"),
        };

        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                client.clear();
                println!("{}", style("Conversation cleared.").dim());
                continue;
            }
            text => {
                run_exchange(client, view, text, project_id).await;
            }
        }
    }
    Ok(())
}

/// Run one exchange, printing tokens as they arrive. Ctrl-C cancels the exchange
/// rather than the process.
async fn run_exchange(
    client: &ChatClient,
    view: &mut ChatView,
    content: &str,
    project_id: &str,
) -> ExchangeOutcome {
    let mut events = client.subscribe();
    let cancel = CancellationToken::new();

    view.begin_exchange();
    let exchange = client.send_message(content, project_id, cancel.clone());
    tokio::pin!(exchange);

    loop {
        tokio::select! {
            outcome = &mut exchange => {
                while let Ok(event) = events.try_recv() {
                    view.handle(&event);
                }
                let message = client.message(outcome.assistant_id());
                view.end_exchange(&outcome, message.as_ref());
                return outcome;
            }
            event = events.recv() => match event {
                Ok(event) => view.handle(&event),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "chat view lagged behind events"),
                Err(RecvError::Closed) => {}
            },
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                debug!("cancelling exchange");
                cancel.cancel();
            }
        }
    }
}

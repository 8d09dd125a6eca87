use console::{Term, style};
use indicatif::ProgressBar;
use std::io::Write;

use crate::chat::{ChatEvent, ExchangeOutcome, Message, MessageId, Role, StreamStatus};
use crate::stream::{Citation, shorten_path};
use crate::ui::icons::{ASSISTANT, CROSS, SOURCE, STOP, USER};

const MIN_WIDTH: usize = 40;
const MAX_WIDTH: usize = 100;

/// Terminal renderer for a chat session.
///
/// Shows a spinner while the request is buffering, prints the assistant's answer
/// incrementally as content updates arrive, and lists citations once the
/// exchange ends.
pub struct ChatView {
    spinner: Option<ProgressBar>,
    width: usize,
    /// Assistant message currently being printed and how much of it is on screen
    streaming: Option<MessageId>,
    shown: String,
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView {
    pub fn new() -> Self {
        let (_, cols) = Term::stdout().size();
        Self {
            spinner: None,
            width: (cols as usize).clamp(MIN_WIDTH, MAX_WIDTH),
            streaming: None,
            shown: String::new(),
        }
    }

    /// Print a finished message, wrapped to the terminal width.
    pub fn show_message(&self, message: &Message) {
        let prefix = match message.role {
            Role::User => format!("{}", USER),
            Role::Assistant => format!("{}", ASSISTANT),
            Role::System => String::new(),
        };
        let wrapped = textwrap::fill(&message.content, self.width);
        println!("{}{}", prefix, wrapped);
        if let Some(citations) = &message.citations {
            for line in format_citations(citations) {
                println!("{}", line);
            }
        }
    }

    /// Start the waiting spinner for a new exchange.
    pub fn begin_exchange(&mut self) {
        self.spinner = Some(super::spinner(style("Thinking...").dim().to_string()));
        self.streaming = None;
        self.shown.clear();
    }

    pub fn handle(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::MessageAppended {
                id,
                role: Role::Assistant,
            } => {
                self.streaming = Some(id.clone());
                self.shown.clear();
            }
            ChatEvent::StatusChanged(StreamStatus::Streaming) => {
                if let Some(spinner) = &self.spinner {
                    spinner.set_message(style("Receiving...").dim().to_string());
                }
            }
            ChatEvent::ContentUpdated { id, content } if self.streaming.as_ref() == Some(id) => {
                self.stop_spinner();
                if self.shown.is_empty() {
                    print!("{}", ASSISTANT);
                }
                match content_delta(&self.shown, content) {
                    Some(delta) => print!("{}", delta),
                    None => print!("\n{}", content),
                }
                let _ = std::io::stdout().flush();
                self.shown = content.clone();
            }
            ChatEvent::Cleared => {
                println!("{}", style("(conversation cleared)").dim());
            }
            _ => {}
        }
    }

    /// Close out the exchange: finish the answer line, list citations and report
    /// how it ended.
    pub fn end_exchange(&mut self, outcome: &ExchangeOutcome, message: Option<&Message>) {
        self.stop_spinner();
        if !self.shown.is_empty() {
            println!();
        }

        match outcome {
            ExchangeOutcome::Completed { .. } => {}
            ExchangeOutcome::Cancelled { .. } => {
                println!("{}{}", STOP, style("Stopped").dim());
            }
            ExchangeOutcome::Failed { error, .. } => {
                eprintln!("{}{}", CROSS, style(error).red());
            }
        }

        if let Some(citations) = message.and_then(|m| m.citations.as_ref()) {
            for line in format_citations(citations) {
                println!("{}", line);
            }
        }
        println!();

        self.streaming = None;
        self.shown.clear();
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

/// The part of `content` not yet on screen, if `content` extends what was shown.
fn content_delta<'a>(shown: &str, content: &'a str) -> Option<&'a str> {
    content.strip_prefix(shown)
}

/// One styled line per citation, de-duplicated by file.
pub fn format_citations(citations: &[Citation]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut lines = Vec::new();
    for citation in citations {
        if !seen.insert(citation.file_name.as_str()) {
            continue;
        }
        lines.push(format!(
            "  {}{}",
            SOURCE,
            style(shorten_path(&citation.file_name)).cyan()
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(name: &str) -> Citation {
        Citation {
            file_name: name.to_string(),
            text: String::new(),
        }
    }

    #[test]
    fn test_content_delta_extends() {
        assert_eq!(content_delta("", "The "), Some("The "));
        assert_eq!(content_delta("The ", "The file"), Some("file"));
        assert_eq!(content_delta("The file", "The file"), Some(""));
        assert_eq!(content_delta("abc", "xyz"), None);
    }

    #[test]
    fn test_format_citations_dedups_and_shortens() {
        console::set_colors_enabled(false);
        let lines = format_citations(&[
            citation("src/lib/auth.ts"),
            citation("src/lib/auth.ts"),
            citation("README.md"),
        ]);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("lib/auth.ts"));
        assert!(lines[1].ends_with("README.md"));
    }

    #[test]
    fn test_view_tracks_streamed_message() {
        let mut view = ChatView::new();
        let id = MessageId::generate();
        view.handle(&ChatEvent::MessageAppended {
            id: id.clone(),
            role: Role::Assistant,
        });
        view.handle(&ChatEvent::ContentUpdated {
            id: id.clone(),
            content: "The ".into(),
        });
        assert_eq!(view.shown, "The ");

        // Updates for other messages are ignored.
        view.handle(&ChatEvent::ContentUpdated {
            id: MessageId::generate(),
            content: "other".into(),
        });
        assert_eq!(view.shown, "The ");

        view.end_exchange(&ExchangeOutcome::Completed { assistant_id: id }, None);
        assert!(view.streaming.is_none());
        assert!(view.shown.is_empty());
    }
}

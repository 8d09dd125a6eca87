//! Terminal presentation: chat rendering, spinners and icons.

pub mod chat_view;
pub mod icons;

pub use chat_view::{ChatView, format_citations};

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A ticking spinner for a short wait. Hidden when stderr is not a terminal.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = if console::Term::stderr().is_term() {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("progress bar template is a valid static string"),
    );
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

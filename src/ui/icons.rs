//! Shared UI icons.
//!
//! Each icon falls back to plain ASCII on terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static STOP: Emoji<'_, '_> = Emoji("⏹️  ", "[STOP]");

// Conversation roles
pub static USER: Emoji<'_, '_> = Emoji("🧑 ", "> ");
pub static ASSISTANT: Emoji<'_, '_> = Emoji("✨ ", "* ");

// Structure entries
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static FILE: Emoji<'_, '_> = Emoji("📄 ", "");
pub static SOURCE: Emoji<'_, '_> = Emoji("🔗 ", "@ ");

//! Plain-text rendering for the terminal.

use std::fmt::Write as _;

use kbchat_api::Theme;
use kbchat_core::{
    Delivery, HealthResponse, Message, Role, StarterPrompt, StatsResponse, ThreadId, ThreadSummary,
};

/// ANSI styling per theme.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub user: &'static str,
    pub assistant: &'static str,
    pub dim: &'static str,
    pub alert: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                user: "\x1b[1;96m",
                assistant: "\x1b[1;92m",
                dim: "\x1b[2m",
                alert: "\x1b[1;91m",
                reset: "\x1b[0m",
            },
            Theme::Light => Self {
                user: "\x1b[1;34m",
                assistant: "\x1b[1;32m",
                dim: "\x1b[90m",
                alert: "\x1b[1;31m",
                reset: "\x1b[0m",
            },
        }
    }

    pub fn plain() -> Self {
        Self {
            user: "",
            assistant: "",
            dim: "",
            alert: "",
            reset: "",
        }
    }
}

pub fn render_message(msg: &Message, p: &Palette) -> String {
    let mut out = String::new();
    let (label, color) = match msg.role {
        Role::User => ("you", p.user),
        Role::Assistant => ("assistant", p.assistant),
    };
    let _ = write!(out, "{color}{label}{}", p.reset);
    match msg.delivery {
        Delivery::Delivered => {}
        Delivery::Sending => {
            let _ = write!(out, " {}(sending…){}", p.dim, p.reset);
        }
        Delivery::Failed => {
            let _ = write!(out, " {}(failed to send){}", p.alert, p.reset);
        }
    }
    let _ = writeln!(out, "> {}", msg.content);

    let sources = msg.display_sources();
    if !sources.is_empty() {
        let _ = writeln!(out, "{}  sources:{}", p.dim, p.reset);
        for (i, src) in sources.iter().enumerate() {
            let _ = writeln!(out, "{}  [{}] {}{}", p.dim, i + 1, src.source, p.reset);
        }
    }
    out
}

pub fn render_log(log: &[Message], p: &Palette) -> String {
    if log.is_empty() {
        return format!("{}(new chat){}\n", p.dim, p.reset);
    }
    log.iter().map(|m| render_message(m, p)).collect()
}

/// Shown in place of the log when history could not be loaded.
pub fn render_load_failed(message: &str, p: &Palette) -> String {
    format!("{}Could not load this conversation: {message}{}\n", p.alert, p.reset)
}

pub fn render_turn_failed(message: &str, p: &Palette) -> String {
    format!("{}!! Message failed to send: {message}{}\n", p.alert, p.reset)
}

pub fn render_threads(list: &[ThreadSummary], active: Option<&ThreadId>, p: &Palette) -> String {
    if list.is_empty() {
        return format!("{}no conversations yet{}\n", p.dim, p.reset);
    }
    let mut out = String::new();
    for s in list {
        let marker = if Some(&s.thread_id) == active { "*" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {}  {}{} · {} messages · {}{}",
            s.thread_id,
            s.display_title(),
            p.dim,
            s.message_count,
            s.updated_at,
            p.reset
        );
    }
    out
}

pub fn render_starters(prompts: &[StarterPrompt], p: &Palette) -> String {
    let mut out = String::new();
    for (i, prompt) in prompts.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {}{}  {}{}",
            i + 1,
            prompt.title,
            p.dim,
            prompt.description,
            p.reset
        );
    }
    out
}

pub fn render_health(h: &HealthResponse) -> String {
    let flag = |ok: bool| if ok { "connected" } else { "disconnected" };
    format!(
        "status: {}\nvector index: {}\nllm: {}\n",
        h.status,
        flag(h.pinecone_connected),
        flag(h.gemini_connected)
    )
}

pub fn render_stats(s: &StatsResponse) -> String {
    format!(
        "vectors: {}\ndimension: {}\nindex fullness: {:.1}%\n",
        s.total_vector_count,
        s.dimension,
        s.index_fullness * 100.0
    )
}

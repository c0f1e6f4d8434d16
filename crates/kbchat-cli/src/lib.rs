//! Line-oriented terminal front end for the kbchat sync engine.

pub mod commands;
pub mod render;
pub mod tracing_setup;
pub mod user_config;

use std::sync::Arc;

use kbchat_api::{ApiError, HttpBackend, SessionContext, Theme};
use kbchat_core::starter_prompts;
use kbchat_sync::{ChatEngine, EventBus, EventBusCaps, EventPriority, LoadState, SyncEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use commands::{Command, HELP};
use render::Palette;
use user_config::UserConfig;

pub async fn try_main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();

    let config = UserConfig::load();
    tracing::debug!(?config, "configuration loaded");

    let session = Arc::new(SessionContext::new(config.theme));
    match config.credential() {
        Some(credential) => session.login(credential),
        None => tracing::warn!("no token configured; requests are sent unauthenticated"),
    }

    let backend = HttpBackend::new(
        reqwest::Client::new(),
        &config.api_base_url,
        Arc::clone(&session),
        config.client_config(),
    )?;
    let event_bus = Arc::new(EventBus::new(EventBusCaps::default()));
    let engine = ChatEngine::new(Arc::new(backend), Arc::clone(&event_bus));
    let repl = Repl::new(engine, session);

    // Connectivity problems are reported through the engine's error policy; the REPL still starts.
    if let Ok(health) = repl.engine.health().await {
        if !health.is_healthy() {
            tracing::warn!(status = %health.status, "service reports degraded health");
        }
    }

    println!("kbchat @ {}  (/help for commands)", config.api_base_url);
    run_repl(repl, event_bus.subscribe(EventPriority::Realtime)).await
}

async fn run_repl(
    repl: Repl,
    mut realtime: broadcast::Receiver<SyncEvent>,
) -> color_eyre::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match repl.handle(commands::parse(&line)).await {
                    Some(out) => print!("{out}"),
                    None => break,
                }
            }
            event = realtime.recv() => {
                match event {
                    Ok(SyncEvent::TurnFailed { message }) => {
                        print!("{}", render::render_turn_failed(&message, &repl.palette()));
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::trace!("repl event channel lagging by {n} messages");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
    Ok(())
}

/// Maps commands onto engine calls and renders the result.
pub struct Repl {
    engine: ChatEngine,
    session: Arc<SessionContext>,
}

impl Repl {
    pub fn new(engine: ChatEngine, session: Arc<SessionContext>) -> Self {
        Self { engine, session }
    }

    fn palette(&self) -> Palette {
        Palette::for_theme(self.session.theme())
    }

    /// Runs one command. Returns `None` when the REPL should exit.
    pub async fn handle(&self, cmd: Command) -> Option<String> {
        let p = self.palette();
        let out = match cmd {
            Command::Quit => return None,
            Command::Chat(text) => {
                self.engine.set_input(text).await;
                match self.engine.send(None).await {
                    Ok(None) => String::new(),
                    // Failures are announced through the event bus; the log shows the marker.
                    Ok(Some(_)) | Err(_) => self.render_visible_log(&p).await,
                }
            }
            Command::Starter(n) => {
                let prompts = starter_prompts(self.session.role());
                match n.checked_sub(1).and_then(|i| prompts.get(i)) {
                    Some(prompt) => {
                        let _ = self.engine.send(Some(prompt.query)).await;
                        self.render_visible_log(&p).await
                    }
                    None => format!("there are {} starters; see /starters\n", prompts.len()),
                }
            }
            Command::New => {
                let _ = self.engine.select_thread(None).await;
                self.render_visible_log(&p).await
            }
            Command::Open(id) => {
                let _ = self.engine.select_thread(Some(id)).await;
                self.render_visible_log(&p).await
            }
            Command::List => match self.engine.threads().await {
                Ok(list) => {
                    let active = self.engine.snapshot().await.active;
                    render::render_threads(&list, active.as_ref(), &p)
                }
                Err(e) => failure(&e, &p),
            },
            Command::Rename { id, title } => match self.engine.rename(&id, &title).await {
                Ok(true) => format!("renamed {id}\n"),
                Ok(false) => String::new(),
                Err(e) => failure(&e, &p),
            },
            Command::Delete(id) => match self.engine.delete(&id).await {
                Ok(()) => {
                    let mut out = format!("deleted {id}\n");
                    if self.engine.snapshot().await.active.is_none() {
                        out.push_str(&render::render_log(&[], &p));
                    }
                    out
                }
                Err(e) => failure(&e, &p),
            },
            Command::Health => match self.engine.health().await {
                Ok(h) => render::render_health(&h),
                Err(e) => failure(&e, &p),
            },
            Command::Stats => match self.engine.stats().await {
                Ok(s) => render::render_stats(&s),
                Err(e) => failure(&e, &p),
            },
            Command::Theme => match self.session.toggle_theme() {
                Theme::Dark => "theme: dark\n".to_string(),
                Theme::Light => "theme: light\n".to_string(),
            },
            Command::Starters => render::render_starters(starter_prompts(self.session.role()), &p),
            Command::Help => format!("{HELP}\n"),
            Command::Invalid(msg) => format!("{msg}\n"),
        };
        Some(out)
    }

    async fn render_visible_log(&self, p: &Palette) -> String {
        let snap = self.engine.snapshot().await;
        match &snap.load {
            LoadState::Failed(msg) => render::render_load_failed(msg, p),
            LoadState::Loading => format!("{}loading…{}\n", p.dim, p.reset),
            LoadState::Idle => render::render_log(&snap.visible_log, p),
        }
    }
}

fn failure(err: &ApiError, p: &Palette) -> String {
    format!("{}{}{}\n", p.alert, err.diagnostic(), p.reset)
}

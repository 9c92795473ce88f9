mod commands;
mod config;
mod logging;
mod view;

use std::{io, process::ExitCode, sync::Arc, time::Instant};

use commands::Input;
use config::{CliConfig, ConfigError};
use minichat_core::{
    RequestError, SessionChannelError, SessionCommand, SessionEvent, SessionSnapshot,
};
use minichat_http::{HttpChatApi, spawn_runtime};
use minichat_platform::{FileIdentityStore, IdentityStore, load_acting_user_id};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout},
    sync::broadcast::error::RecvError,
};
use tracing::{debug, error, info, trace, warn};
use view::{TranscriptView, render_frame};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const PROMPT: &str = "> ";

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] RequestError),
    #[error("session runtime stopped: {0}")]
    Session(#[from] SessionChannelError),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    logging::init();
    info!("starting minichat");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "minichat exited with an error");
            eprintln!("minichat: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    let config = CliConfig::from_env()?;
    info!(
        api_base_url = %config.api_base_url,
        polling_interval_ms = config.sync.polling_interval_ms,
        conversation_page_size = config.sync.conversation_page_size,
        message_page_size = config.sync.message_page_size,
        "cli config loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("minichat")
        .build()?;
    runtime.block_on(run_session(config))
}

async fn run_session(config: CliConfig) -> Result<(), AppError> {
    let api = HttpChatApi::new(&config.api_base_url, config.request_timeout)?;
    let store = FileIdentityStore::in_data_dir(&config.data_dir);
    let acting_user_id = load_acting_user_id(&store);
    debug!(path = %store.path().display(), acting_user_id, "acting user restored");
    let identity: Arc<dyn IdentityStore> = Arc::new(store);

    let handle = spawn_runtime(api, identity, config.sync);
    let mut events = handle.subscribe();
    handle
        .send(SessionCommand::SwitchUser {
            user_id: acting_user_id,
        })
        .await?;

    let started_at = Instant::now();
    let mut screen = Screen::new(config.viewport_lines);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    screen.show(handle.session().snapshot()).await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::Snapshot(snapshot)) => screen.show(*snapshot).await?,
                Ok(SessionEvent::PhaseChanged { phase }) => debug!(?phase, "session phase changed"),
                Ok(SessionEvent::PollTick { skipped }) => trace!(skipped, "poll tick"),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "event stream lagged; resyncing from session");
                    screen.show(handle.session().snapshot()).await?;
                }
                Err(RecvError::Closed) => break,
            },
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                match commands::parse(&line) {
                    Ok(None) => screen.prompt().await?,
                    Ok(Some(Input::Quit)) => break,
                    Ok(Some(Input::Help)) => screen.notice(commands::HELP).await?,
                    Ok(Some(Input::Scroll(rows))) => {
                        screen.transcript.scroll_by(rows);
                        let snapshot = handle.session().snapshot();
                        let now_ms =
                            u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
                        if screen
                            .transcript
                            .request_older_if_needed(snapshot.messages_has_more, now_ms)
                        {
                            handle.send(SessionCommand::LoadOlderMessages).await?;
                        }
                        screen.show(snapshot).await?;
                    }
                    Ok(Some(Input::Session(command))) => handle.send(command).await?,
                    Err(err) => screen.notice(&err.to_string()).await?,
                }
            }
        }
    }

    if let Err(err) = handle.send(SessionCommand::Shutdown).await {
        debug!(error = %err, "session runtime already stopped");
    }
    info!("minichat stopped");
    Ok(())
}

/// Redraws the terminal only when the rendered frame changes.
struct Screen {
    transcript: TranscriptView,
    stdout: Stdout,
    last_frame: String,
}

impl Screen {
    fn new(viewport_lines: usize) -> Self {
        Self {
            transcript: TranscriptView::new(viewport_lines),
            stdout: tokio::io::stdout(),
            last_frame: String::new(),
        }
    }

    async fn show(&mut self, snapshot: SessionSnapshot) -> io::Result<()> {
        self.transcript.apply(&snapshot);
        let frame = render_frame(&snapshot, &self.transcript);
        if frame == self.last_frame {
            return Ok(());
        }
        self.write(&format!("{CLEAR_SCREEN}{frame}{PROMPT}")).await?;
        self.last_frame = frame;
        Ok(())
    }

    async fn notice(&mut self, text: &str) -> io::Result<()> {
        self.write(&format!("{text}\n{PROMPT}")).await
    }

    async fn prompt(&mut self) -> io::Result<()> {
        self.write(PROMPT).await
    }

    async fn write(&mut self, text: &str) -> io::Result<()> {
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.flush().await
    }
}

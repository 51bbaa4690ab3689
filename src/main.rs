//! nco-chat - terminal client for the job-role matching service
//!
//! One process is one tab. Lines typed on stdin are sent to the backend;
//! the session's event feed is rendered to stdout.

use nco_chat::state_machine::RejectReason;
use nco_chat::{
    Action, ChatSession, ClientConfig, HttpTransport, LoggingTransport, Message, Outcome, Role,
    SessionEvent, SqliteStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nco_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env()?;
    if config.tab_id_generated {
        println!("Tab id: {} (set NCO_TAB_ID to reopen this tab)", config.tab_id);
    }

    let store = SqliteStore::open(&config.state_path, config.tab_id.clone())?;
    tracing::info!(path = %config.state_path.display(), tab_id = store.tab_id(), "Opened state store");

    tracing::info!(api_base = %config.api_base, "Connecting to backend");
    let transport = LoggingTransport::new(HttpTransport::new(
        &config.api_base,
        config.request_timeout,
    )?);

    let session = ChatSession::new(transport, store);
    let renderer = tokio::spawn(render_feed(BroadcastStream::new(session.subscribe())));

    if session.initialize().await? == Outcome::Completed {
        // A restored tab replays its transcript; a fresh one has none
        for message in session.messages() {
            print_message(&message);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "/quit" => break,
            "/close" => {
                session.close_tab()?;
                break;
            }
            "/state" => {
                println!(
                    "mode: {}  {}",
                    session.mode(),
                    serde_json::to_string(&session.affordances())?
                );
            }
            "/new" => report(session.start_new_chat().await?),
            text => {
                // A failed boot leaves no session; try again before sending.
                if !session.state().has_session() {
                    report(session.initialize().await?);
                }
                report(session.submit(text).await?);
            }
        }
    }

    drop(session);
    renderer.await?;
    Ok(())
}

async fn render_feed(mut feed: BroadcastStream<SessionEvent>) {
    while let Some(event) = feed.next().await {
        match event {
            Ok(SessionEvent::MessageAppended { message }) => print_message(&message),
            Ok(SessionEvent::SessionStarted { .. }) => {
                println!("Session created. Describe the job role.");
            }
            Ok(SessionEvent::ThreadStarted { .. }) => println!("New chat started."),
            Ok(SessionEvent::SessionRestored { mode, message_count }) => {
                println!("Resumed chat ({message_count} messages, {mode}).");
            }
            Ok(SessionEvent::ProcessingChanged { processing: true }) => println!("..."),
            Ok(SessionEvent::ErrorRaised {
                action: Action::ThreadTerminal,
                ..
            }) => println!("Type /new to start a new chat, or /close to leave."),
            Ok(SessionEvent::ErrorRaised {
                action: Action::RetryableWithOfflineIndicator,
                ..
            }) => println!("(offline - send again to retry)"),
            Ok(_) => {}
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind the event feed");
            }
        }
    }
}

fn print_message(message: &Message) {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "bot",
        Role::System => "system",
    };
    println!("[{who}] {}", message.content);
}

fn report(outcome: Outcome) {
    if let Outcome::Ignored(reason) = outcome {
        let hint = match reason {
            RejectReason::ThreadClosed => "This chat is closed. Type /new to start another.",
            RejectReason::InputLocked => "Input is disabled for this chat.",
            RejectReason::Busy => "Still waiting for the previous reply.",
            RejectReason::NoSession => "Not connected to a session yet.",
            RejectReason::EmptyMessage | RejectReason::AlreadyInitialized => return,
        };
        println!("{hint}");
    }
}

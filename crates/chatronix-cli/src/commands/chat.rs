use std::collections::HashSet;
use std::path::PathBuf;

use chatronix_core::actions::{ActionOutcome, AttachmentActions, Coordinates, Permission};
use chatronix_core::backend::Backend;
use chatronix_core::config::BackendConfig;
use chatronix_core::network::{HttpConnectivityCheck, NetworkMonitor};
use chatronix_core::session::ChatRoute;
use chatronix_core::store::LibSqlMessageStore;
use chatronix_core::storage::R2ObjectStore;
use chatronix_core::{Message, SyncController};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

use crate::cli::Grant;
use crate::commands::start::build_form;
use crate::commands::AppContext;
use crate::device::TerminalDevice;
use crate::error::CliError;
use crate::render::unseen_lines;

type Actions = AttachmentActions<LibSqlMessageStore, R2ObjectStore, TerminalDevice>;

const HELP: &str = "Commands: /location <lat> <lon>, /image <path>, /photo <path>, /quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Text(String),
    Location(Coordinates),
    Image(PathBuf),
    Photo(PathBuf),
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Text(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    match name {
        "quit" | "exit" => ChatInput::Quit,
        "location" => {
            let mut parts = rest.split_whitespace().map(str::parse::<f64>);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(Ok(latitude)), Some(Ok(longitude)), None)
                    if (-90.0..=90.0).contains(&latitude)
                        && (-180.0..=180.0).contains(&longitude) =>
                {
                    ChatInput::Location(Coordinates {
                        latitude,
                        longitude,
                    })
                }
                _ => ChatInput::Invalid("usage: /location <lat> <lon>".to_string()),
            }
        }
        "image" | "photo" if rest.is_empty() => {
            ChatInput::Invalid(format!("usage: /{name} <path>"))
        }
        "image" => ChatInput::Image(PathBuf::from(rest)),
        "photo" => ChatInput::Photo(PathBuf::from(rest)),
        _ => ChatInput::Invalid(format!("unknown command /{name}. {HELP}")),
    }
}

pub async fn run_chat_command(
    context: &AppContext,
    user_id: String,
    name: String,
    color: Option<&str>,
    grants: &[Grant],
) -> Result<(), CliError> {
    let form = build_form(&name, color)?;
    let route = ChatRoute {
        user_id,
        background_color: form.color,
        display_name: form.display_name,
    };
    let (backend, config) = context.backend().await?;
    run_chat(context, backend, &config, &route, grants).await
}

pub async fn run_chat(
    context: &AppContext,
    backend: &'static Backend,
    config: &BackendConfig,
    route: &ChatRoute,
    grants: &[Grant],
) -> Result<(), CliError> {
    let monitor = connectivity_monitor(context, config).await?;

    let mut controller = SyncController::new(backend.messages.clone(), backend.cache.clone())
        .with_collection(backend.collection.clone());
    let actions = AttachmentActions::new(
        controller.outbox(),
        backend.objects.clone(),
        TerminalDevice::new(grants.iter().copied().map(Permission::from)),
        route.author(),
    );
    let messages = controller.messages();

    println!(
        "Chatting as {} ({}). {HELP}",
        route.display_name, route.background_color
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let driver = controller.run(monitor.subscribe(), async {
        shutdown_rx.await.ok();
    });
    let session = async {
        let result = chat_session(&actions, route, messages).await;
        shutdown_tx.send(()).ok();
        result
    };

    let ((), result) = tokio::join!(driver, session);
    result
}

async fn connectivity_monitor(
    context: &AppContext,
    config: &BackendConfig,
) -> Result<NetworkMonitor, CliError> {
    if context.offline {
        return Ok(NetworkMonitor::new(false));
    }
    let Some(url) = config.connectivity_url() else {
        return Ok(NetworkMonitor::new(true));
    };

    tracing::debug!("Checking connectivity via {}", url);
    let connectivity = HttpConnectivityCheck::new(url)?;
    let monitor = NetworkMonitor::new(connectivity.check().await);
    tokio::spawn(connectivity.run(monitor.clone()));
    Ok(monitor)
}

async fn chat_session(
    actions: &Actions,
    route: &ChatRoute,
    mut messages: tokio::sync::watch::Receiver<Vec<Message>>,
) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seen = HashSet::new();
    let author = route.author();

    loop {
        tokio::select! {
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
                let list = messages.borrow_and_update().clone();
                for line in unseen_lines(&list, &mut seen) {
                    println!("{line}");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    ChatInput::Quit => break,
                    ChatInput::Empty => {}
                    ChatInput::Invalid(message) => println!("{message}"),
                    ChatInput::Text(text) => {
                        if let Err(error) = actions.outbox().send(Message::text(author.clone(), text)).await {
                            println!("Message not sent: {error}");
                        }
                    }
                    ChatInput::Location(coordinates) => {
                        actions.device().set_position(coordinates);
                        report(actions.send_location().await);
                    }
                    ChatInput::Image(path) => {
                        actions.device().set_asset(&path);
                        report(actions.pick_image().await);
                    }
                    ChatInput::Photo(path) => {
                        actions.device().set_asset(&path);
                        report(actions.take_photo().await);
                    }
                }
            }
        }
    }

    Ok(())
}

fn report(result: chatronix_core::actions::ActionResult) {
    match result {
        Ok(ActionOutcome::Cancelled) => println!("Nothing sent."),
        Ok(ActionOutcome::Sent | ActionOutcome::PermissionDenied) => {}
        Err(error) => println!("Attachment not sent: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_lines_are_text() {
        assert_eq!(parse_input("  hello there "), ChatInput::Text("hello there".to_string()));
        assert_eq!(parse_input("   "), ChatInput::Empty);
    }

    #[test]
    fn location_command_parses_coordinates() {
        assert_eq!(
            parse_input("/location 48.85 2.35"),
            ChatInput::Location(Coordinates {
                latitude: 48.85,
                longitude: 2.35,
            })
        );
        assert!(matches!(parse_input("/location 48.85"), ChatInput::Invalid(_)));
        assert!(matches!(parse_input("/location 91 0"), ChatInput::Invalid(_)));
    }

    #[test]
    fn file_commands_keep_paths_with_spaces() {
        assert_eq!(
            parse_input("/image ~/Pictures/my cat.png"),
            ChatInput::Image(PathBuf::from("~/Pictures/my cat.png"))
        );
        assert_eq!(
            parse_input("/photo shot.jpg"),
            ChatInput::Photo(PathBuf::from("shot.jpg"))
        );
        assert!(matches!(parse_input("/image"), ChatInput::Invalid(_)));
    }

    #[test]
    fn quit_and_unknown_commands() {
        assert_eq!(parse_input("/quit"), ChatInput::Quit);
        assert!(matches!(parse_input("/dance"), ChatInput::Invalid(_)));
    }
}

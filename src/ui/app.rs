use std::time::Duration;

use anyhow::Result;
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::protocol::{ConnectionManager, ConsoleMessage, MessageClass, SessionEvent};

/// Delay used for button-triggered commands, matching the coalescing
/// window that guards against double-clicks
const FAVORITE_DELAY: Duration = Duration::from_millis(100);

/// Line-mode presentation shell.
///
/// The single consumer of the session event channel: prints console
/// messages, tracks the derived title, and forwards typed input as
/// commands.
pub struct ConsoleApp {
    manager: ConnectionManager,
    events: mpsc::Receiver<SessionEvent>,
    config: ClientConfig,
}

impl ConsoleApp {
    /// Create an application over a connected (or connectable) session
    pub fn new(
        manager: ConnectionManager,
        events: mpsc::Receiver<SessionEvent>,
        config: ClientConfig,
    ) -> Self {
        Self {
            manager,
            events,
            config,
        }
    }

    /// Run until `/quit`, end of input, or Ctrl+C
    pub async fn run(mut self) -> Result<()> {
        let mut input = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                line = input.next_line() => match line? {
                    Some(line) => {
                        if self.handle_input(line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        self.manager.disconnect().await;
        Ok(())
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Console(message) => print_message(&message),
            SessionEvent::PlayerList(players) => {
                println!("* {} player(s) online", players.len());
            }
            SessionEvent::State(_) => {
                println!("* {}", self.manager.title().await);
            }
        }
    }

    /// Handle one line of user input. Returns whether to quit.
    async fn handle_input(&mut self, input: &str) -> bool {
        match input {
            "" => false,
            "/quit" => true,
            "/players" => {
                for player in self.manager.players() {
                    println!("* {} {} {}", player.name, player.ip, player.uuid);
                }
                false
            }
            _ if input.starts_with("/fav ") => {
                self.send_favorite(input["/fav ".len()..].trim()).await;
                false
            }
            _ if input.starts_with("/pc ") => {
                self.send_player_command(input["/pc ".len()..].trim()).await;
                false
            }
            command => {
                if let Err(e) = self.manager.send_command(command).await {
                    error!("Failed to send command: {}", e);
                }
                false
            }
        }
    }

    /// Dispatch a favorite command by label, coalesced like the original
    /// button handlers so a double fire sends once
    async fn send_favorite(&self, label: &str) {
        let Some(favorite) = self.config.favorites.iter().find(|f| f.label == label) else {
            error!("No favorite named {:?}", label);
            return;
        };
        if let Err(e) = self
            .manager
            .send_delayed_command(&favorite.command, true, FAVORITE_DELAY)
            .await
        {
            error!("Failed to send favorite: {}", e);
        }
    }

    /// Dispatch a player command template: `/pc <template name> <player>`
    async fn send_player_command(&self, args: &str) {
        let Some((name, player_name)) = args.split_once(' ') else {
            error!("Usage: /pc <command> <player>");
            return;
        };
        let Some(entry) = self.config.player_commands.iter().find(|c| c.name == name) else {
            error!("No player command named {:?}", name);
            return;
        };
        let Some(player) = self
            .manager
            .players()
            .into_iter()
            .find(|p| p.name == player_name)
        else {
            error!("No such player: {:?}", player_name);
            return;
        };

        let command = entry.build_command(&player);
        if let Err(e) = self
            .manager
            .send_delayed_command(&command, true, FAVORITE_DELAY)
            .await
        {
            error!("Failed to send player command: {}", e);
        }
    }
}

fn print_message(message: &ConsoleMessage) {
    match message.class {
        MessageClass::Normal => println!("{}", message.text),
        class => println!("[{}] {}", class, message.text),
    }
}

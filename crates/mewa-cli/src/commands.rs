//! Command handlers for the Mewa CLI

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

use mewa_client::{event_channel, ChannelConnection, ChannelEvent};

use crate::cli::Commands;
use crate::config::CliAppConfig;
use crate::error::{CliError, Result};
use crate::interactive::{parse_line, InteractiveCommand, HELP};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands, config: CliAppConfig) -> Result<()> {
        match command {
            Commands::Listen => Self::handle_listen_command(config).await,
            Commands::SendEvent { id, params, ack } => {
                Self::handle_send_event_command(config, id, params, ack).await
            }
            Commands::SendMessage {
                to_device,
                id,
                params,
            } => Self::handle_send_message_command(config, to_device, id, params).await,
            Commands::Devices => Self::handle_devices_command(config).await,
            Commands::LastEvents {
                from_device,
                prefix,
            } => Self::handle_last_events_command(config, from_device, prefix).await,
            Commands::Interactive => Self::handle_interactive_command(config).await,
            Commands::InitConfig { path, force } => {
                Self::handle_init_config_command(config, path, force)
            }
        }
    }

    /// Print every callback until the channel or the user ends the session
    async fn handle_listen_command(config: CliAppConfig) -> Result<()> {
        let mut session = Session::open(&config).await?;
        info!("Listening on {}... Press Ctrl+C to stop", session.channel);

        loop {
            tokio::select! {
                event = session.events.recv() => match event {
                    Some(event) => {
                        println!("{}", event);
                        if event.ends_session() {
                            return Ok(());
                        }
                    }
                    None => return Ok(()),
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, leaving the channel");
                    return session.finish().await;
                }
            }
        }
    }

    async fn handle_send_event_command(
        config: CliAppConfig,
        id: String,
        params: String,
        ack: bool,
    ) -> Result<()> {
        let mut session = Session::open(&config).await?;
        session.connection.send_event(&id, &params, ack).await?;
        println!("Event {} sent", id);

        session.print_replies(config.reply_window()).await;
        session.finish().await
    }

    async fn handle_send_message_command(
        config: CliAppConfig,
        to_device: String,
        id: String,
        params: String,
    ) -> Result<()> {
        let mut session = Session::open(&config).await?;
        session
            .connection
            .send_message(&to_device, &id, &params)
            .await?;
        println!("Message {} sent to {}", id, to_device);

        session.print_replies(config.reply_window()).await;
        session.finish().await
    }

    async fn handle_devices_command(config: CliAppConfig) -> Result<()> {
        let mut session = Session::open(&config).await?;
        session.connection.request_devices_list().await?;

        session.print_replies(config.reply_window()).await;
        session.finish().await
    }

    async fn handle_last_events_command(
        config: CliAppConfig,
        from_device: String,
        prefix: String,
    ) -> Result<()> {
        let mut session = Session::open(&config).await?;
        session
            .connection
            .request_last_events(&from_device, &prefix)
            .await?;

        session.print_replies(config.reply_window()).await;
        session.finish().await
    }

    /// Read commands from stdin while printing callbacks
    async fn handle_interactive_command(config: CliAppConfig) -> Result<()> {
        let mut session = Session::open(&config).await?;
        println!(
            "Joined {} as {}. Type 'help' for commands.",
            session.channel, config.connection.device
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        prompt(&config.cli.prompt);

        loop {
            tokio::select! {
                event = session.events.recv() => match event {
                    Some(event) => {
                        println!("{}", event);
                        if event.ends_session() {
                            return Ok(());
                        }
                    }
                    None => return Ok(()),
                },
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        return session.finish().await;
                    };
                    match parse_line(&line) {
                        Ok(Some(InteractiveCommand::Quit)) => return session.finish().await,
                        Ok(Some(InteractiveCommand::Help)) => println!("{}", HELP),
                        Ok(Some(command)) => {
                            if let Err(e) = run_interactive(&session.connection, command).await {
                                warn!("Request failed: {}", e);
                            }
                        }
                        Ok(None) => {}
                        Err(usage) => println!("{}", usage),
                    }
                    prompt(&config.cli.prompt);
                }
            }
        }
    }

    fn handle_init_config_command(config: CliAppConfig, path: PathBuf, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(CliError::Command(format!(
                "{} already exists, use --force to replace it",
                path.display()
            )));
        }

        config.save_to_file(&path)?;
        println!("Configuration written to {}", path.display());
        Ok(())
    }
}

async fn run_interactive(connection: &ChannelConnection, command: InteractiveCommand) -> Result<()> {
    match command {
        InteractiveCommand::SendEvent { id, params, ack } => {
            connection.send_event(&id, &params, ack).await?
        }
        InteractiveCommand::SendMessage {
            to_device,
            id,
            params,
        } => connection.send_message(&to_device, &id, &params).await?,
        InteractiveCommand::Devices => connection.request_devices_list().await?,
        InteractiveCommand::LastEvents { device, prefix } => {
            connection.request_last_events(&device, &prefix).await?
        }
        InteractiveCommand::Help | InteractiveCommand::Quit => {}
    }
    Ok(())
}

fn prompt(text: &str) {
    use std::io::Write;

    print!("{}", text);
    let _ = std::io::stdout().flush();
}

// ----------------------------------------------------------------------------
// Channel Session
// ----------------------------------------------------------------------------

/// A websocket connection that the channel has accepted
struct Session {
    connection: ChannelConnection,
    events: UnboundedReceiver<ChannelEvent>,
    channel: String,
}

impl Session {
    async fn open(config: &CliAppConfig) -> Result<Self> {
        let connection = ChannelConnection::websocket(config.connection.clone());
        let (forwarder, events) = event_channel();
        connection.set_listener(Some(forwarder)).await;

        info!(
            "Connecting to {} on {}",
            config.connection.channel, config.connection.endpoint
        );
        connection.connect().await?;

        let mut session = Self {
            connection,
            events,
            channel: config.connection.channel.clone(),
        };

        match timeout(config.connect_timeout(), session.wait_connected()).await {
            Ok(Ok(())) => Ok(session),
            Ok(Err(e)) => {
                session.connection.close().await;
                Err(e)
            }
            Err(_) => {
                session.connection.close().await;
                Err(CliError::Timeout(format!(
                    "channel did not accept the device within {}s",
                    config.cli.connect_timeout_secs
                )))
            }
        }
    }

    async fn wait_connected(&mut self) -> Result<()> {
        while let Some(event) = self.events.recv().await {
            match event {
                ChannelEvent::Connected => {
                    info!("Connected to {}", self.channel);
                    return Ok(());
                }
                ChannelEvent::Error(reason) if reason.is_fatal() => {
                    return Err(CliError::Rejected(reason.to_string()));
                }
                ChannelEvent::Closed => {
                    return Err(CliError::Rejected("session closed".to_string()));
                }
                other => debug!("Before connected: {}", other),
            }
        }
        Err(CliError::Rejected("session closed".to_string()))
    }

    /// Print callbacks for a while after a request
    async fn print_replies(&mut self, window: Duration) {
        let deadline = Instant::now() + window;
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => {
                        println!("{}", event);
                        if event.ends_session() {
                            return;
                        }
                    }
                    None => return,
                },
                _ = sleep_until(deadline) => return,
            }
        }
    }

    async fn finish(self) -> Result<()> {
        if let Err(e) = self.connection.disconnect().await {
            debug!("Disconnect after session end: {}", e);
        }
        Ok(())
    }
}

//! Telegram Bot API transport
//!
//! - `TelegramClient`: `sendMessage` and long-polling `getUpdates` over reqwest
//! - `TelegramSink`: delivers alerts to chat id == subscriber id
//! - `command_loop`: turns incoming chat commands into `CommandService` calls

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::core::commands::CommandService;
use crate::core::logging::sanitize;
use crate::core::registry::UserId;
use crate::notify::{render, DeliveryError, Notification, NotificationSink};

/// Pause after a failed getUpdates call before polling again
const UPDATE_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Slack added to the HTTP timeout of a long-poll request
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Incoming update; only text messages are consumed
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

// ============================================================================
// Client
// ============================================================================

/// Minimal Telegram Bot API client
pub struct TelegramClient {
    http: reqwest::Client,
    /// `<api>/bot<token>`; never logged
    base_url: String,
}

impl TelegramClient {
    pub fn new(
        api_url: &str,
        bot_token: &str,
        request_timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;

        debug!(
            api_url = %api_url,
            bot_token = %sanitize(bot_token),
            "Telegram client configured"
        );

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
        })
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T, DeliveryError> {
        let mut request = self.http.post(format!("{}/{}", self.base_url, method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let parsed: ApiResponse<T> = response.json().await?;

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            other => Err(DeliveryError::Rejected {
                status: other.error_code.unwrap_or(status),
                description: other
                    .description
                    .unwrap_or_else(|| format!("{} returned no result", method)),
            }),
        }
    }

    /// Send an HTML-formatted message
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let _: serde_json::Value = self.call("sendMessage", &body, None).await?;
        Ok(())
    }

    /// Long-poll for updates after `offset`, waiting up to `timeout_secs` server-side
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, DeliveryError> {
        let body = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message"],
        };
        let http_timeout = Duration::from_secs(timeout_secs) + LONG_POLL_GRACE;
        self.call("getUpdates", &body, Some(http_timeout)).await
    }
}

// ============================================================================
// Sink
// ============================================================================

/// Delivers alerts as Telegram messages; the subscriber id is the chat id
pub struct TelegramSink {
    client: Arc<TelegramClient>,
}

impl TelegramSink {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.client
            .send_message(notification.user_id, &render::alert(notification))
            .await
    }

    fn sink_name(&self) -> &'static str {
        "telegram"
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Parsed chat command; address arguments stay raw until validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Monitor(Option<String>),
    Unmonitor(Option<String>),
    Status(Option<String>),
    List,
    Trending,
    Graduating,
    Unknown(String),
}

/// Parse `/command[@bot] [arg]`. Plain text is not a command.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let mut parts = text.trim().split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
    let arg = parts.next().map(str::to_string);

    Some(match name.as_str() {
        "start" => BotCommand::Start,
        "help" => BotCommand::Help,
        "monitor" => BotCommand::Monitor(arg),
        "unmonitor" => BotCommand::Unmonitor(arg),
        "status" => BotCommand::Status(arg),
        "list" => BotCommand::List,
        "trending" => BotCommand::Trending,
        "graduating" => BotCommand::Graduating,
        _ => BotCommand::Unknown(name),
    })
}

/// Run one command and render the reply
pub async fn dispatch(
    service: &CommandService,
    user_id: UserId,
    command: BotCommand,
    graduating_cutoff: f64,
) -> String {
    let rendered = match command {
        BotCommand::Start | BotCommand::Help => Ok(render::help(graduating_cutoff)),
        BotCommand::Monitor(None) => Ok(render::usage("monitor")),
        BotCommand::Unmonitor(None) => Ok(render::usage("unmonitor")),
        BotCommand::Status(None) => Ok(render::usage("status")),
        BotCommand::Monitor(Some(address)) => service
            .monitor(user_id, &address)
            .await
            .map(|m| render::monitoring_started(&m)),
        BotCommand::Unmonitor(Some(address)) => service
            .unmonitor(user_id, &address)
            .await
            .map(|token| render::monitoring_stopped(&token)),
        BotCommand::Status(Some(address)) => service
            .status(user_id, &address)
            .await
            .map(|s| render::status(&s)),
        BotCommand::List => Ok(render::list(&service.list(user_id).await)),
        BotCommand::Trending => service.trending().await.map(|rows| render::trending(&rows)),
        BotCommand::Graduating => service
            .graduating()
            .await
            .map(|rows| render::graduating(&rows, graduating_cutoff)),
        BotCommand::Unknown(_) => Ok(render::unknown_command()),
    };

    rendered.unwrap_or_else(|e| {
        debug!(user_id, error = %e, "Command failed");
        render::command_error(&e)
    })
}

/// Poll Telegram for commands until shutdown; each message is handled on its own task.
pub async fn command_loop(
    client: Arc<TelegramClient>,
    service: Arc<CommandService>,
    graduating_cutoff: f64,
    long_poll_secs: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!("Command loop started");
    let mut offset: Option<i64> = None;
    let mut handled: u64 = 0;

    loop {
        let updates = tokio::select! {
            _ = shutdown_rx.recv() => {
                info!(handled, "Command loop shutting down");
                break;
            }
            result = client.get_updates(offset, long_poll_secs) => result,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed, retrying");
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(UPDATE_RETRY_DELAY) => continue,
                }
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.message else { continue };
            let Some(command) = message.text.as_deref().and_then(parse_command) else {
                continue;
            };

            handled += 1;
            let user_id = message.chat.id;
            let client = client.clone();
            let service = service.clone();
            tokio::spawn(async move {
                debug!(user_id, command = ?command, "Handling command");
                let reply = dispatch(&service, user_id, command, graduating_cutoff).await;
                if let Err(e) = client.send_message(user_id, &reply).await {
                    warn!(user_id, error = %e, "Failed to send reply");
                }
            });
        }
    }
}

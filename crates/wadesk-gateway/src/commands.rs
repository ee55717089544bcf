// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commands sent by UI clients over the WebSocket.
//!
//! Client -> Server (JSON, named by `type` or, failing that, `command`):
//! ```json
//! {"type": "sendMessage", "sessionId": "shop-1", "chatId": "9725...@c.us", "message": {"content": "hi"}, "tempId": 7}
//! {"command": "mute", "sessionId": "shop-1", "phoneNumber": "050-1234567", "duration": 24}
//! ```
//!
//! Replies meant for the requester go back on its own connection; state
//! changes are fanned out to every connection of the user.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use wadesk_core::records::ContactDetails;
use wadesk_core::{FanOut, Label, MessageId, MuteDuration, RealtimeEvent, SessionId, UserId};
use wadesk_engine::ChatOps;

use crate::hub::Frame;

pub const MALFORMED_MESSAGE: &str = "Msg proc. error";
pub const INVALID_FULL_HISTORY_REQUEST: &str = "Invalid request parameters.";

/// Commands whose `sessionId`, when present, must belong to the caller.
const SESSION_COMMANDS: &[&str] = &[
    "requestHistory",
    "requestAllChatsHistory",
    "mute",
    "command:mute",
    "unmute",
    "command:unmute",
    "sendMessage",
    "addContact",
    "deleteMessage",
    "reactMessage",
    "changeLabel",
    "updateContact",
    "addNote",
    "getScheduledCall",
    "requestFullHistory",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RequestInitialData,
    RequestHistory {
        session: SessionId,
        chat_id: String,
    },
    RequestAllChatsHistory {
        session: SessionId,
    },
    Mute {
        session: SessionId,
        phone: String,
        duration: MuteDuration,
    },
    Unmute {
        session: SessionId,
        phone: String,
    },
    SendMessage {
        session: SessionId,
        chat_id: String,
        content: String,
        temp_id: Option<Value>,
    },
    UpdateContact {
        phone: String,
        details: ContactDetails,
    },
    DeleteMessage {
        session: SessionId,
        chat_id: String,
        message_id: MessageId,
    },
    React {
        session: SessionId,
        chat_id: String,
        message_id: MessageId,
        reaction: String,
    },
    SetAiState {
        enabled: bool,
    },
    GetAiSettings,
    UpdateAiSettings {
        settings: Value,
    },
    ChangeLabel {
        session: SessionId,
        chat_id: String,
        label: Label,
    },
    GetScheduledCall {
        session: SessionId,
        chat_id: String,
    },
    RequestFullHistory {
        session: Option<SessionId>,
        chat_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not a JSON object, or no command name.
    Malformed,
    Unknown(String),
    /// A known command missing or mangling a required field.
    Invalid {
        command: String,
        reason: String,
    },
}

/// The command name: `type`, falling back to `command`.
pub fn command_name(obj: &Map<String, Value>) -> Option<&str> {
    obj.get("type")
        .and_then(Value::as_str)
        .or_else(|| obj.get("command").and_then(Value::as_str))
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A chat id given as a string or as `{"_serialized": "..."}`.
fn chat_id(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("chatId")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(o) => o
            .get("_serialized")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

impl Command {
    pub fn parse(value: &Value) -> Result<Self, ParseError> {
        let obj = value.as_object().ok_or(ParseError::Malformed)?;
        let name = command_name(obj).ok_or(ParseError::Malformed)?;
        let invalid = |reason: &str| ParseError::Invalid {
            command: name.to_string(),
            reason: reason.to_string(),
        };
        let session = || {
            text(obj, "sessionId")
                .map(SessionId::from)
                .ok_or_else(|| invalid("sessionId is required"))
        };
        let chat = || chat_id(obj).ok_or_else(|| invalid("chatId is required"));
        let phone = || text(obj, "phoneNumber").ok_or_else(|| invalid("phoneNumber is required"));
        let message_id = || {
            text(obj, "venomMessageId")
                .or_else(|| text(obj, "messageId"))
                .map(MessageId)
                .ok_or_else(|| invalid("message id is required"))
        };

        let command = match name {
            "requestInitialData" => Self::RequestInitialData,
            "requestHistory" => Self::RequestHistory {
                session: session()?,
                chat_id: chat()?,
            },
            "requestAllChatsHistory" => Self::RequestAllChatsHistory {
                session: session()?,
            },
            "mute" | "command:mute" => {
                let raw = obj
                    .get("duration")
                    .ok_or_else(|| invalid("duration is required"))?;
                Self::Mute {
                    session: session()?,
                    phone: phone()?,
                    duration: MuteDuration::from_value(raw).map_err(|e| invalid(&e.to_string()))?,
                }
            }
            "unmute" | "command:unmute" => Self::Unmute {
                session: session()?,
                phone: phone()?,
            },
            "sendMessage" => Self::SendMessage {
                session: session()?,
                chat_id: chat()?,
                content: obj
                    .get("message")
                    .and_then(|m| m.get("content"))
                    .and_then(Value::as_str)
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| invalid("message.content is required"))?
                    .to_string(),
                temp_id: obj.get("tempId").cloned(),
            },
            "addContact" => {
                let name = obj
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("name is required"))?;
                Self::UpdateContact {
                    phone: phone()?,
                    details: ContactDetails::from_raw(Some(name), None, None),
                }
            }
            "updateContact" => {
                let details = obj
                    .get("contactDetails")
                    .filter(|d| d.is_object())
                    .ok_or_else(|| invalid("contactDetails is required"))?;
                Self::UpdateContact {
                    phone: phone()?,
                    details: ContactDetails::from_value(details),
                }
            }
            "addNote" => {
                let note = obj
                    .get("note")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("note must be a string"))?;
                Self::UpdateContact {
                    phone: phone()?,
                    details: ContactDetails::from_raw(None, None, Some(note)),
                }
            }
            "deleteMessage" => Self::DeleteMessage {
                session: session()?,
                chat_id: chat()?,
                message_id: message_id()?,
            },
            "reactMessage" => Self::React {
                session: session()?,
                chat_id: chat()?,
                message_id: message_id()?,
                reaction: match obj.get("reaction") {
                    Some(Value::String(r)) => r.clone(),
                    Some(Value::Null) => String::new(),
                    _ => return Err(invalid("reaction is required")),
                },
            },
            "setAiState" => Self::SetAiState {
                enabled: obj
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| invalid("enabled must be a boolean"))?,
            },
            "getAiSettings" => Self::GetAiSettings,
            "updateAiSettings" => Self::UpdateAiSettings {
                settings: obj
                    .get("settings")
                    .filter(|s| !s.is_null())
                    .cloned()
                    .ok_or_else(|| invalid("settings are required"))?,
            },
            "changeLabel" => Self::ChangeLabel {
                session: session()?,
                chat_id: chat()?,
                label: text(obj, "label")
                    .and_then(|l| l.parse().ok())
                    .ok_or_else(|| invalid("unknown label"))?,
            },
            "getScheduledCall" => Self::GetScheduledCall {
                session: session()?,
                chat_id: chat()?,
            },
            "requestFullHistory" => Self::RequestFullHistory {
                session: text(obj, "sessionId").map(SessionId::from),
                chat_id: chat_id(obj),
            },
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Executes client commands for one user at a time.
pub struct CommandHandler {
    ops: Arc<ChatOps>,
    fanout: Arc<dyn FanOut>,
}

impl CommandHandler {
    pub fn new(ops: Arc<ChatOps>, fanout: Arc<dyn FanOut>) -> Self {
        Self { ops, fanout }
    }

    pub fn ops(&self) -> &Arc<ChatOps> {
        &self.ops
    }

    /// Handle one text frame from `user`, sending direct replies on `reply`.
    pub async fn handle_text(&self, user: &UserId, raw: &str, reply: &mpsc::Sender<Frame>) {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(user_id = %user, error = %e, "malformed client message");
                send(reply, RealtimeEvent::error(MALFORMED_MESSAGE)).await;
                return;
            }
        };

        if let Some(obj) = value.as_object() {
            let name = command_name(obj).unwrap_or_default();
            if let Some(session) = text(obj, "sessionId").filter(|_| SESSION_COMMANDS.contains(&name)) {
                let session = SessionId::from(session);
                if !self.ops.is_authorized(user, &session).await {
                    warn!(user_id = %user, session_id = %session, command = name, "unauthorized session access");
                    send(
                        reply,
                        RealtimeEvent::error(format!("Unauthorized for session {session}")),
                    )
                    .await;
                    return;
                }
            }
        }

        match Command::parse(&value) {
            Ok(command) => self.execute(user, command, reply).await,
            Err(ParseError::Malformed) => {
                warn!(user_id = %user, "client message without a command");
                send(reply, RealtimeEvent::error(MALFORMED_MESSAGE)).await;
            }
            Err(ParseError::Unknown(name)) => {
                debug!(user_id = %user, command = %name, "ignoring unknown command");
            }
            Err(ParseError::Invalid { command, reason }) => {
                warn!(user_id = %user, %command, %reason, "invalid command");
                send(reply, RealtimeEvent::error(format!("{command}: {reason}"))).await;
            }
        }
    }

    pub async fn execute(&self, user: &UserId, command: Command, reply: &mpsc::Sender<Frame>) {
        let ops = &self.ops;
        match command {
            Command::RequestInitialData => {
                for event in ops.initial_data(user).await {
                    send(reply, event).await;
                }
            }
            Command::RequestHistory { session, chat_id } => {
                match ops.chat_history(user, &session, &chat_id).await {
                    Ok(messages) => {
                        send(
                            reply,
                            RealtimeEvent::HistoryData {
                                session_id: session.to_string(),
                                chat_id,
                                messages,
                            },
                        )
                        .await
                    }
                    Err(e) => send(reply, RealtimeEvent::error(e.to_string())).await,
                }
            }
            Command::RequestAllChatsHistory { session } => {
                send(reply, ops.session_history(user, &session).await).await;
            }
            Command::Mute {
                session,
                phone,
                duration,
            } => {
                if let Err(e) = ops.mute(user, &session, &phone, duration).await {
                    send(reply, RealtimeEvent::error(format!("Mute failed: {e}"))).await;
                }
            }
            Command::Unmute { session, phone } => {
                if let Err(e) = ops.unmute(user, &session, &phone).await {
                    send(reply, RealtimeEvent::error(format!("Unmute failed: {e}"))).await;
                }
            }
            Command::SendMessage {
                session,
                chat_id,
                content,
                temp_id,
            } => match ops.send_text(user, &session, &chat_id, &content).await {
                Ok(row) => self.fanout.send_to_user(
                    user,
                    RealtimeEvent::MessageSent {
                        temp_id,
                        final_id: row.external_id.to_string(),
                        final_timestamp: row.timestamp_ms,
                    },
                ),
                Err(e) => {
                    warn!(session_id = %session, %chat_id, error = %e, "client send failed");
                    send(
                        reply,
                        RealtimeEvent::MessageSendError {
                            error: e.to_string(),
                            temp_id,
                        },
                    )
                    .await;
                }
            },
            Command::UpdateContact { phone, details } => {
                if let Err(e) = ops.update_contact(user, &phone, details).await {
                    send(reply, RealtimeEvent::error(format!("Contact update failed: {e}"))).await;
                }
            }
            Command::DeleteMessage {
                session,
                chat_id,
                message_id,
            } => {
                let event = match ops.delete_message(user, &session, &chat_id, &message_id).await {
                    Ok(()) => RealtimeEvent::MessageDeleted {
                        success: true,
                        chat_id,
                        message_id: message_id.to_string(),
                    },
                    Err(e) => RealtimeEvent::MessageDeleteError {
                        error: e.to_string(),
                        chat_id,
                        message_id: message_id.to_string(),
                    },
                };
                send(reply, event).await;
            }
            Command::React {
                session,
                chat_id,
                message_id,
                reaction,
            } => {
                let event = match ops.react(&session, &message_id, &reaction).await {
                    Ok(()) => RealtimeEvent::ReactionSent {
                        success: true,
                        chat_id,
                        message_id: message_id.to_string(),
                        reaction,
                    },
                    Err(e) => RealtimeEvent::ReactionSendError {
                        error: e.to_string(),
                        chat_id,
                        message_id: message_id.to_string(),
                    },
                };
                send(reply, event).await;
            }
            Command::SetAiState { enabled } => {
                info!(user_id = %user, enabled, "AI state change requested");
                ops.set_ai_enabled(enabled);
            }
            Command::GetAiSettings => {
                let settings = ops.ai_settings(user).await;
                send(reply, RealtimeEvent::AiSettingsData { settings }).await;
            }
            Command::UpdateAiSettings { settings } => {
                let event = match ops.update_ai_settings(user, &settings).await {
                    Ok(_) => RealtimeEvent::AiSettingsUpdated {
                        success: true,
                        error: None,
                    },
                    Err(e) => RealtimeEvent::AiSettingsUpdated {
                        success: false,
                        error: Some(e.to_string()),
                    },
                };
                send(reply, event).await;
            }
            Command::ChangeLabel {
                session,
                chat_id,
                label,
            } => {
                if let Err(e) = ops.set_label(user, &session, &chat_id, label).await {
                    send(reply, RealtimeEvent::error(format!("Label change failed: {e}"))).await;
                }
            }
            Command::GetScheduledCall { session, chat_id } => {
                let call_info = ops
                    .scheduled_call(user, &session, &chat_id)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(%chat_id, error = %e, "scheduled call lookup failed");
                        None
                    });
                send(
                    reply,
                    RealtimeEvent::ScheduledCallData {
                        session_id: session.to_string(),
                        chat_id,
                        call_info,
                    },
                )
                .await;
            }
            Command::RequestFullHistory { session, chat_id } => {
                self.full_history(user, session, chat_id, reply).await;
            }
        }
    }

    async fn full_history(
        &self,
        user: &UserId,
        session: Option<SessionId>,
        chat_id: Option<String>,
        reply: &mpsc::Sender<Frame>,
    ) {
        let live = session
            .as_ref()
            .is_some_and(|s| self.ops.sessions().transport(s).is_some());
        let (Some(session), Some(chat_id), true) = (session.clone(), chat_id.clone(), live) else {
            warn!(user_id = %user, "full history requested without a live session or chat");
            send(
                reply,
                RealtimeEvent::FullHistoryError {
                    session_id: session.map(|s| s.to_string()).unwrap_or_default(),
                    chat_id: chat_id.unwrap_or_default(),
                    error: INVALID_FULL_HISTORY_REQUEST.to_string(),
                },
            )
            .await;
            return;
        };

        send(
            reply,
            RealtimeEvent::FullHistoryLoading {
                session_id: session.to_string(),
                chat_id: chat_id.clone(),
            },
        )
        .await;
        let event = match self.ops.full_history(user, &session, &chat_id).await {
            Ok(messages) => {
                info!(session_id = %session, %chat_id, count = messages.len(), "full history loaded");
                RealtimeEvent::FullHistoryData {
                    session_id: session.to_string(),
                    chat_id,
                    messages,
                }
            }
            Err(e) => {
                warn!(session_id = %session, %chat_id, error = %e, "full history failed");
                RealtimeEvent::FullHistoryError {
                    session_id: session.to_string(),
                    chat_id,
                    error: format!("Failed to load full history: {e}"),
                }
            }
        };
        send(reply, event).await;
    }
}

async fn send(reply: &mpsc::Sender<Frame>, event: RealtimeEvent) {
    if reply.send(event.to_json().into()).await.is_err() {
        debug!("connection closed before reply");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use wadesk_core::TransportFactory;
    use wadesk_engine::{AiControl, Engine, EngineDeps};
    use wadesk_test_utils::TestHarness;

    fn parse(value: Value) -> Result<Command, ParseError> {
        Command::parse(&value)
    }

    #[test]
    fn command_name_falls_back_to_command_field() {
        let cmd = parse(json!({ "command": "command:unmute", "sessionId": "s1", "phoneNumber": "0501234567" }));
        assert_eq!(
            cmd,
            Ok(Command::Unmute {
                session: SessionId::from("s1"),
                phone: "0501234567".into(),
            })
        );
    }

    #[test]
    fn mute_duration_forms() {
        let base = |d: Value| json!({ "type": "mute", "sessionId": "s1", "phoneNumber": "1", "duration": d });
        assert!(matches!(
            parse(base(Value::Null)),
            Ok(Command::Mute { duration: MuteDuration::Forever, .. })
        ));
        assert!(matches!(
            parse(base(json!("12"))),
            Ok(Command::Mute { duration: MuteDuration::Hours(12), .. })
        ));
        assert!(matches!(parse(base(json!(0))), Err(ParseError::Invalid { .. })));
        assert!(matches!(
            parse(json!({ "type": "mute", "sessionId": "s1", "phoneNumber": "1" })),
            Err(ParseError::Invalid { .. })
        ));
    }

    #[test]
    fn chat_id_may_be_serialized_object() {
        let cmd = parse(json!({
            "type": "requestHistory",
            "sessionId": "s1",
            "chatId": { "_serialized": "1@c.us" }
        }));
        assert!(matches!(cmd, Ok(Command::RequestHistory { chat_id, .. }) if chat_id == "1@c.us"));
    }

    #[test]
    fn contact_commands_share_one_shape() {
        let add = parse(json!({ "type": "addContact", "phoneNumber": "1", "name": " Dana " })).unwrap();
        let Command::UpdateContact { details, .. } = add else {
            panic!("expected contact update");
        };
        assert_eq!(details.contact_name, Some(Some("Dana".into())));

        let note = parse(json!({ "type": "addNote", "phoneNumber": "1", "note": "" })).unwrap();
        let Command::UpdateContact { details, .. } = note else {
            panic!("expected contact update");
        };
        assert_eq!(details.notes, Some(None));

        assert!(matches!(
            parse(json!({ "type": "addNote", "phoneNumber": "1", "note": 5 })),
            Err(ParseError::Invalid { .. })
        ));
    }

    #[test]
    fn labels_and_unknowns() {
        assert!(matches!(
            parse(json!({ "type": "changeLabel", "sessionId": "s1", "chatId": "1@c.us", "label": "paid" })),
            Ok(Command::ChangeLabel { label: Label::Paid, .. })
        ));
        assert!(matches!(
            parse(json!({ "type": "changeLabel", "sessionId": "s1", "chatId": "1@c.us", "label": "vip" })),
            Err(ParseError::Invalid { .. })
        ));
        assert_eq!(
            parse(json!({ "type": "dance" })),
            Err(ParseError::Unknown("dance".into()))
        );
        assert_eq!(parse(json!([1, 2])), Err(ParseError::Malformed));
    }

    struct Fixture {
        harness: TestHarness,
        engine: Engine,
        handler: CommandHandler,
    }

    async fn fixture() -> Fixture {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.register("s1", "u1").await.unwrap();
        harness.register("s2", "u2").await.unwrap();
        let deps = EngineDeps {
            store: harness.storage.clone(),
            llm: harness.llm.clone(),
            transcriber: harness.transcriber.clone(),
            fanout: harness.fanout.clone(),
            ai: Arc::new(AiControl::default()),
            config: Arc::new(harness.config.clone()),
        };
        let factory: Arc<dyn TransportFactory> = harness.transports.clone();
        let engine = Engine::new(deps, factory, CancellationToken::new());
        let handler = CommandHandler::new(Arc::clone(&engine.ops), harness.fanout.clone());
        Fixture {
            harness,
            engine,
            handler,
        }
    }

    impl Fixture {
        async fn run(&self, user: &str, command: Value) -> Vec<RealtimeEvent> {
            let (tx, mut rx) = mpsc::channel(64);
            self.handler
                .handle_text(&UserId::from(user), &command.to_string(), &tx)
                .await;
            drop(tx);
            let mut events = Vec::new();
            while let Some(frame) = rx.recv().await {
                events.push(serde_json::from_str(&frame).unwrap());
            }
            events
        }
    }

    #[tokio::test]
    async fn malformed_json_gets_an_error() {
        let f = fixture().await;
        let (tx, mut rx) = mpsc::channel(4);
        f.handler
            .handle_text(&UserId::from("u1"), "{not json", &tx)
            .await;
        let frame = rx.recv().await.unwrap();
        assert_eq!(
            serde_json::from_str::<RealtimeEvent>(&frame).unwrap(),
            RealtimeEvent::error(MALFORMED_MESSAGE)
        );
    }

    #[tokio::test]
    async fn foreign_sessions_are_rejected() {
        let f = fixture().await;
        let events = f
            .run("u1", json!({ "type": "requestAllChatsHistory", "sessionId": "s2" }))
            .await;
        assert_eq!(events, vec![RealtimeEvent::error("Unauthorized for session s2")]);
    }

    #[tokio::test]
    async fn send_message_broadcasts_confirmation() {
        let f = fixture().await;
        let command = json!({
            "type": "sendMessage",
            "sessionId": "s1",
            "chatId": "1@c.us",
            "message": { "content": "hello" },
            "tempId": "tmp-1"
        });
        let events = f.run("u1", command.clone()).await;
        assert!(matches!(
            &events[..],
            [RealtimeEvent::MessageSendError { temp_id: Some(t), .. }] if t == "tmp-1"
        ));

        f.engine.sessions.start_session(&SessionId::from("s1")).await;
        let events = f.run("u1", command).await;
        assert!(events.is_empty());
        assert_eq!(f.harness.fanout.count_of("messageSent"), 1);
        assert_eq!(f.harness.fanout.count_of("newMessage"), 1);
    }

    #[tokio::test]
    async fn full_history_requires_a_live_session() {
        let f = fixture().await;
        let events = f
            .run("u1", json!({ "type": "requestFullHistory", "sessionId": "s1", "chatId": "1@c.us" }))
            .await;
        assert!(matches!(
            &events[..],
            [RealtimeEvent::FullHistoryError { error, .. }] if error == INVALID_FULL_HISTORY_REQUEST
        ));

        f.engine.sessions.start_session(&SessionId::from("s1")).await;
        let events = f
            .run("u1", json!({ "type": "requestFullHistory", "sessionId": "s1", "chatId": "1@c.us" }))
            .await;
        assert!(matches!(events[0], RealtimeEvent::FullHistoryLoading { .. }));
        assert!(matches!(events[1], RealtimeEvent::FullHistoryData { .. }));
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let f = fixture().await;
        let events = f
            .run(
                "u1",
                json!({ "type": "updateAiSettings", "settings": { "ai_max_tokens": 400 } }),
            )
            .await;
        assert_eq!(
            events,
            vec![RealtimeEvent::AiSettingsUpdated {
                success: true,
                error: None
            }]
        );
        let events = f.run("u1", json!({ "type": "getAiSettings" })).await;
        let [RealtimeEvent::AiSettingsData { settings }] = &events[..] else {
            panic!("expected settings, got {events:?}");
        };
        assert_eq!(settings.max_tokens, 400);
    }

    #[tokio::test]
    async fn unknown_commands_are_ignored() {
        let f = fixture().await;
        assert!(f.run("u1", json!({ "type": "dance" })).await.is_empty());
    }

    #[tokio::test]
    async fn scheduled_call_lookup_replies_even_when_empty() {
        let f = fixture().await;
        let events = f
            .run("u1", json!({ "type": "getScheduledCall", "sessionId": "s1", "chatId": "1@c.us" }))
            .await;
        assert!(matches!(
            &events[..],
            [RealtimeEvent::ScheduledCallData { call_info: None, .. }]
        ));
    }
}

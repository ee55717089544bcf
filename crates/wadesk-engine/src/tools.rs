// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry for the assistant's function calls.
//!
//! Each [`Tool`] owns its JSON Schema and produces the confirmation text sent
//! back to the customer. The [`ToolRegistry`] looks tools up by name and emits
//! their definitions, sorted by name, for the completion request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use wadesk_core::chat::ToolDefinition;
use wadesk_core::phone::normalize_phone;
use wadesk_core::records::{ContactDetails, NewScheduledCall};
use wadesk_core::{FanOut, Label, PersistenceGateway, RealtimeEvent};

use crate::deps::ChatTarget;

/// What a tool invocation can touch.
pub struct ToolContext<'a> {
    pub target: &'a ChatTarget,
    pub store: &'a dyn PersistenceGateway,
    pub fanout: &'a dyn FanOut,
}

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub success: bool,
    /// Text sent to the customer, on success and on failure alike.
    pub reply: String,
}

impl ToolOutcome {
    fn ok(reply: impl Into<String>) -> Self {
        Self {
            success: true,
            reply: reply.into(),
        }
    }

    fn failed(reply: impl Into<String>) -> Self {
        Self {
            success: false,
            reply: reply.into(),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn invoke(&self, ctx: &ToolContext<'_>, args: Value) -> ToolOutcome;
}

/// Registry of available tools, indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the contact and call-scheduling tools.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(UpdateContactDetails));
        registry.register(Arc::new(ScheduleCall));
        registry.register(Arc::new(UpdateScheduledCall));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions of all registered tools, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Reply for a tool name the registry does not know.
pub fn unknown_tool_reply(name: &str) -> String {
    format!("ניסיתי לבצע פעולה לא מוכרת ({name}).")
}

/// A non-blank string argument.
fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub struct UpdateContactDetails;

#[async_trait]
impl Tool for UpdateContactDetails {
    fn name(&self) -> &str {
        "update_contact_details"
    }

    fn description(&self) -> &str {
        "עדכון פרטי איש קשר כמו שם או תחום עיסוק."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "contact_name": { "type": "string", "description": "שם הלקוח המלא." },
                "business_field": { "type": "string", "description": "תחום העיסוק של העסק." }
            }
        })
    }

    async fn invoke(&self, ctx: &ToolContext<'_>, args: Value) -> ToolOutcome {
        let name = args.get("contact_name").and_then(Value::as_str);
        let details = ContactDetails::from_raw(
            name,
            args.get("business_field").and_then(Value::as_str),
            None,
        );
        let phone = normalize_phone(&ctx.target.phone);
        let reply = format!(
            "תודה {}, עדכנתי את הפרטים 🙂",
            name.map(str::trim).unwrap_or_default()
        );

        if details.is_empty() {
            return ToolOutcome::ok(reply);
        }
        match ctx.store.upsert_contact(&ctx.target.user, &phone, &details).await {
            Ok(()) => {
                ctx.fanout.send_to_user(
                    &ctx.target.user,
                    RealtimeEvent::ContactUpdated {
                        phone_number: phone,
                        details,
                    },
                );
                ToolOutcome::ok(reply)
            }
            Err(e) => {
                warn!(chat_id = %ctx.target.chat_id, error = %e, "contact update failed");
                ToolOutcome::failed("אני מצטערת, הייתה בעיה בעדכון הפרטים כרגע.")
            }
        }
    }
}

pub struct ScheduleCall;

#[async_trait]
impl Tool for ScheduleCall {
    fn name(&self) -> &str {
        "schedule_call"
    }

    fn description(&self) -> &str {
        "קביעת שיחת טלפון חדשה עם הלקוח *לאחר* שהמשתמש אישר זמן ספציפי."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "requested_time_text": {
                    "type": "string",
                    "description": "תיאור טקסטואלי של הזמן שהמשתמש אישר (למשל 'מחר ב-10:00', 'יום חמישי ב-16:00'). חובה לקבל אישור מהמשתמש על הזמן לפני קריאה לפונקציה זו."
                },
                "customer_name": { "type": "string", "description": "שם הלקוח (אם ידוע)." }
            },
            "required": ["requested_time_text"]
        })
    }

    async fn invoke(&self, ctx: &ToolContext<'_>, args: Value) -> ToolOutcome {
        let Some(time) = str_arg(&args, "requested_time_text") else {
            warn!(chat_id = %ctx.target.chat_id, "schedule_call without a time");
            return ToolOutcome::failed("אני צריכה לדעת מתי תרצה שנקבע את השיחה.");
        };
        let target = ctx.target;
        let phone = normalize_phone(&target.phone);

        let customer_name = match str_arg(&args, "customer_name") {
            Some(name) => Some(name.to_string()),
            None => ctx
                .store
                .get_contact(&target.user, &phone)
                .await
                .ok()
                .flatten()
                .and_then(|c| c.contact_name),
        };

        let call = NewScheduledCall {
            user_id: target.user.clone(),
            session_id: target.session.clone(),
            chat_id: target.chat_id.clone(),
            callback_phone: phone,
            customer_name,
            requested_time_text: time.to_string(),
        };
        let stored = match ctx.store.insert_call(&call).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(chat_id = %target.chat_id, error = %e, "failed to schedule call");
                return ToolOutcome::failed(
                    "אני מצטערת, הייתה בעיה בקביעת השיחה כרגע. מיה תבדוק את זה ידנית.",
                );
            }
        };
        info!(chat_id = %target.chat_id, call_id = stored.id, "call scheduled");
        ctx.fanout.send_to_user(
            &target.user,
            RealtimeEvent::CallScheduled {
                session_id: target.session.to_string(),
                chat_id: target.chat_id.clone(),
                details: stored,
            },
        );

        match ctx
            .store
            .set_label(&target.user, &target.session, &target.chat_id, Label::Waiting)
            .await
        {
            Ok(()) => ctx.fanout.send_to_user(
                &target.user,
                RealtimeEvent::LabelUpdated {
                    session_id: target.session.to_string(),
                    chat_id: target.chat_id.clone(),
                    label: Label::Waiting,
                },
            ),
            Err(e) => warn!(chat_id = %target.chat_id, error = %e, "failed to label chat as waiting"),
        }

        ToolOutcome::ok(format!(
            "מעולה! השיחה עם מיה נקבעה ל־{time}. היא תתקשר אליך בשעה הזו 📞 מצוין, נקבעה שיחת טלפון."
        ))
    }
}

pub struct UpdateScheduledCall;

#[async_trait]
impl Tool for UpdateScheduledCall {
    fn name(&self) -> &str {
        "update_scheduled_call"
    }

    fn description(&self) -> &str {
        "עדכון זמן של שיחה טלפונית שכבר נקבעה, *לאחר* שהמשתמש אישר זמן חדש."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "new_requested_time_text": {
                    "type": "string",
                    "description": "תיאור טקסטואלי של הזמן החדש שהמשתמש אישר."
                }
            },
            "required": ["new_requested_time_text"]
        })
    }

    async fn invoke(&self, ctx: &ToolContext<'_>, args: Value) -> ToolOutcome {
        let Some(time) = str_arg(&args, "new_requested_time_text") else {
            warn!(chat_id = %ctx.target.chat_id, "update_scheduled_call without a time");
            return ToolOutcome::failed("לאיזה זמן חדש תרצה שנעדכן את השיחה?");
        };
        let target = ctx.target;
        let failed = || {
            ToolOutcome::failed(
                "אני מצטערת, הייתה בעיה בעדכון מועד השיחה. אולי השיחה כבר לא הייתה בהמתנה?",
            )
        };

        match ctx
            .store
            .update_pending_call(
                &target.user,
                &target.session,
                &target.chat_id,
                time,
                wadesk_core::now_ms(),
            )
            .await
        {
            Ok(Some(call)) => {
                ctx.fanout.send_to_user(
                    &target.user,
                    RealtimeEvent::CallUpdated {
                        session_id: target.session.to_string(),
                        chat_id: target.chat_id.clone(),
                        details: call,
                    },
                );
                ToolOutcome::ok(format!(
                    "בסדר גמור – עדכנתי את מועד השיחה ל־{time}. תודה!"
                ))
            }
            Ok(None) => {
                warn!(chat_id = %target.chat_id, "no pending call to update");
                failed()
            }
            Err(e) => {
                warn!(chat_id = %target.chat_id, error = %e, "failed to update scheduled call");
                failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wadesk_core::records::CallStatus;
    use wadesk_core::{SessionId, UserId};
    use wadesk_test_utils::TestHarness;

    fn target() -> ChatTarget {
        ChatTarget::new(
            UserId::from("u1"),
            SessionId::from("s1"),
            "972501234567@c.us",
        )
    }

    #[test]
    fn definitions_are_sorted_by_name() {
        let registry = ToolRegistry::with_builtin();
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["schedule_call", "update_contact_details", "update_scheduled_call"]
        );
        assert_eq!(registry.len(), 3);
        assert!(registry.get("delete_everything").is_none());
    }

    #[test]
    fn required_arguments_are_declared() {
        let registry = ToolRegistry::with_builtin();
        let schedule = registry.get("schedule_call").unwrap().parameters_schema();
        assert_eq!(schedule["required"], json!(["requested_time_text"]));
    }

    #[tokio::test]
    async fn schedule_call_inserts_labels_and_fans_out() {
        let harness = TestHarness::builder().build().await.unwrap();
        let target = target();
        let ctx = ToolContext {
            target: &target,
            store: harness.storage.as_ref(),
            fanout: harness.fanout.as_ref(),
        };

        let outcome = ScheduleCall
            .invoke(&ctx, json!({ "requested_time_text": "tomorrow 10:00" }))
            .await;
        assert!(outcome.success);
        assert!(outcome.reply.contains("tomorrow 10:00"));

        let call = harness
            .storage
            .latest_call(&target.user, &target.session, &target.chat_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(call.status, CallStatus::Pending);
        assert_eq!(call.callback_phone, "972501234567");

        let label = harness
            .storage
            .get_label(&target.user, &target.session, &target.chat_id)
            .await
            .unwrap();
        assert_eq!(label, Label::Waiting);
        assert_eq!(
            harness.fanout.event_types(),
            vec!["callScheduled", "labelUpdated"]
        );
    }

    #[tokio::test]
    async fn schedule_call_uses_known_contact_name() {
        let harness = TestHarness::builder().build().await.unwrap();
        let target = target();
        harness
            .storage
            .upsert_contact(
                &target.user,
                "972501234567",
                &ContactDetails::from_raw(Some("Dana"), None, None),
            )
            .await
            .unwrap();
        let ctx = ToolContext {
            target: &target,
            store: harness.storage.as_ref(),
            fanout: harness.fanout.as_ref(),
        };

        ScheduleCall
            .invoke(&ctx, json!({ "requested_time_text": "Sunday 16:00" }))
            .await;
        let call = harness
            .storage
            .latest_call(&target.user, &target.session, &target.chat_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(call.customer_name.as_deref(), Some("Dana"));
    }

    #[tokio::test]
    async fn missing_time_asks_again() {
        let harness = TestHarness::builder().build().await.unwrap();
        let target = target();
        let ctx = ToolContext {
            target: &target,
            store: harness.storage.as_ref(),
            fanout: harness.fanout.as_ref(),
        };

        let outcome = ScheduleCall.invoke(&ctx, json!({})).await;
        assert!(!outcome.success);
        assert_eq!(outcome.reply, "אני צריכה לדעת מתי תרצה שנקבע את השיחה.");

        let outcome = UpdateScheduledCall
            .invoke(&ctx, json!({ "new_requested_time_text": "  " }))
            .await;
        assert_eq!(outcome.reply, "לאיזה זמן חדש תרצה שנעדכן את השיחה?");
        assert!(harness.fanout.deliveries().is_empty());
    }

    #[tokio::test]
    async fn update_without_pending_call_fails() {
        let harness = TestHarness::builder().build().await.unwrap();
        let target = target();
        let ctx = ToolContext {
            target: &target,
            store: harness.storage.as_ref(),
            fanout: harness.fanout.as_ref(),
        };

        let outcome = UpdateScheduledCall
            .invoke(&ctx, json!({ "new_requested_time_text": "Monday" }))
            .await;
        assert!(!outcome.success);

        ScheduleCall
            .invoke(&ctx, json!({ "requested_time_text": "Sunday" }))
            .await;
        let outcome = UpdateScheduledCall
            .invoke(&ctx, json!({ "new_requested_time_text": "Monday" }))
            .await;
        assert!(outcome.success);
        assert!(outcome.reply.contains("Monday"));
        assert_eq!(harness.fanout.count_of("callUpdated"), 1);
    }

    #[tokio::test]
    async fn contact_update_normalizes_phone() {
        let harness = TestHarness::builder().build().await.unwrap();
        let target = target();
        let ctx = ToolContext {
            target: &target,
            store: harness.storage.as_ref(),
            fanout: harness.fanout.as_ref(),
        };

        let outcome = UpdateContactDetails
            .invoke(
                &ctx,
                json!({ "contact_name": "Dana", "business_field": "bakery" }),
            )
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.reply, "תודה Dana, עדכנתי את הפרטים 🙂");

        let contact = harness
            .storage
            .get_contact(&target.user, "972501234567")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contact.business_field.as_deref(), Some("bakery"));
        assert_eq!(harness.fanout.count_of("contactUpdated"), 1);
    }
}

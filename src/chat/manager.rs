use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::MySqlPool;
use tracing::{error, info};

use super::error::Result;
use super::inference::{ChatMessage, InferenceClient};
use super::tools;
use crate::shared::models::{Conversation, ConversationMessage, MessageRole};

/// Longest user message accepted for a turn, in characters.
pub const MAX_MESSAGE_CHARS: usize = 10_000;

const EMPTY_MESSAGE_PLACEHOLDER: &str = "Hello";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurnResponse {
    pub response: String,
    pub conversation_id: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// One executed tool invocation, as reported back to the caller. Transient:
/// lives only in the turn's response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub result: Value,
}

/// Owns one full chat turn: conversation resolution, message persistence,
/// the single model call, sequential tool execution, the bulk-delete
/// post-process, and error recovery. Holds its resources explicitly; nothing
/// here is process-global.
#[derive(Clone)]
pub struct ChatManager {
    db: Arc<MySqlPool>,
    inference: InferenceClient,
}

impl ChatManager {
    pub fn new(db: Arc<MySqlPool>, inference: InferenceClient) -> Self {
        Self { db, inference }
    }

    /// Process one user message and produce the response envelope.
    ///
    /// The user message is persisted before the model is called, so history
    /// survives a provider failure. Any failure after that point is
    /// converted into a persisted assistant-side apology; the caller always
    /// sees a normal envelope once the user message is durable.
    pub async fn process_turn(
        &self,
        user_id: &str,
        req: ChatRequest,
    ) -> Result<ChatTurnResponse> {
        let conversation = self.resolve_conversation(user_id, req.conversation_id.as_deref()).await?;

        ConversationMessage::create(
            &self.db,
            &conversation.id,
            user_id,
            MessageRole::User,
            &req.message,
        )
        .await?;

        let (response_text, tool_calls) =
            match self.run_model_phase(user_id, &conversation.id, &req.message).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Error processing chat turn: {}", e);
                    let text = format!(
                        "I'm sorry, I encountered an error processing your request: {}",
                        e
                    );
                    (text, Vec::new())
                }
            };

        ConversationMessage::create(
            &self.db,
            &conversation.id,
            user_id,
            MessageRole::Assistant,
            &response_text,
        )
        .await?;

        Conversation::touch(&self.db, &conversation.id).await?;

        Ok(ChatTurnResponse {
            response: response_text,
            conversation_id: conversation.id,
            tool_calls,
        })
    }

    /// Reuse the supplied conversation when it exists and belongs to the
    /// caller; otherwise start a fresh one. An id that does not resolve (or
    /// resolves to another user's thread) deliberately falls back to
    /// creating a new conversation instead of erroring.
    async fn resolve_conversation(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Conversation> {
        if let Some(id) = conversation_id {
            match Conversation::find_by_id(&self.db, id).await? {
                Some(conversation) if conversation.user_id == user_id => {
                    return Ok(conversation)
                }
                _ => {
                    info!("Conversation {} not usable for caller, creating a new one", id);
                }
            }
        }
        Ok(Conversation::create(&self.db, user_id).await?)
    }

    /// Everything that can fail without losing the turn: context build,
    /// model call, tool execution, bulk post-process.
    async fn run_model_phase(
        &self,
        user_id: &str,
        conversation_id: &str,
        message: &str,
    ) -> Result<(String, Vec<ToolCallRecord>)> {
        let history = ConversationMessage::find_by_conversation(&self.db, conversation_id).await?;
        let context = build_context(&history, message);

        let reply = self
            .inference
            .complete(context, tools::declarations())
            .await?;

        let mut response_text = reply.content;
        let mut records: Vec<ToolCallRecord> = Vec::new();

        // Execute in model order; each call's effects are visible to the
        // next one within the turn.
        for call in reply.tool_calls {
            let mut exec_args = call.arguments.clone();
            inject_owner(&mut exec_args, user_id);

            let result = tools::dispatch(&self.db, &call.name, &exec_args).await;
            records.push(ToolCallRecord {
                id: call.id,
                name: call.name,
                arguments: call.arguments,
                result,
            });
        }

        if wants_bulk_delete(message) {
            let listed = listed_task_ids(&records);
            if let Some(task_ids) = listed {
                let mut deleted_count = 0u64;
                for task_id in task_ids {
                    let arguments = json!({"task_id": task_id, "user_id": user_id});
                    let result =
                        tools::dispatch(&self.db, "delete_task", &arguments).await;
                    if result["success"].as_bool().unwrap_or(false) {
                        deleted_count += 1;
                    }
                    records.push(ToolCallRecord {
                        id: format!("delete_task_{}", task_id),
                        name: "delete_task".to_string(),
                        arguments,
                        result,
                    });
                }
                response_text = format!(
                    "I've successfully deleted {} tasks for you.",
                    deleted_count
                );
            }
        }

        Ok((response_text, records))
    }
}

/// Build the model context: the stored history (blank messages dropped,
/// roles folded onto the two-role vocabulary) with the current user message
/// appended last. An empty incoming message becomes a placeholder greeting
/// so the prompt is never empty.
fn build_context(history: &[ConversationMessage], current_message: &str) -> Vec<ChatMessage> {
    let mut context: Vec<ChatMessage> = Vec::with_capacity(history.len() + 1);

    for msg in history {
        if msg.content.trim().is_empty() {
            continue;
        }
        context.push(ChatMessage {
            role: fold_role(&msg.role).to_string(),
            content: msg.content.clone(),
        });
    }

    let current = if current_message.is_empty() {
        EMPTY_MESSAGE_PLACEHOLDER
    } else {
        current_message
    };
    context.push(ChatMessage {
        role: "user".to_string(),
        content: current.to_string(),
    });

    context
}

// Stored roles are folded onto what the provider accepts; a small synonym
// set maps onto "assistant", everything else is user input.
fn fold_role(role: &str) -> &'static str {
    match role.to_lowercase().as_str() {
        "assistant" | "ai" | "bot" => "assistant",
        _ => "user",
    }
}

/// The bulk-delete trigger: a fixed keyword check over the literal user
/// text, tolerating the "eall" misspelling. This fires independently of the
/// model's intent; see DESIGN.md for the known mis-fire risk.
fn wants_bulk_delete(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("delete") && (lowered.contains("all") || lowered.contains("eall"))
}

/// Task ids surfaced by this turn's successful `list_tasks` calls, in
/// listing order. `None` when no listing succeeded (the heuristic must not
/// fire on a failed listing).
fn listed_task_ids(records: &[ToolCallRecord]) -> Option<Vec<i64>> {
    let mut found_listing = false;
    let mut task_ids = Vec::new();

    for record in records {
        if record.name != "list_tasks" {
            continue;
        }
        if !record.result["success"].as_bool().unwrap_or(false) {
            continue;
        }
        let Some(tasks) = record.result["tasks"].as_array() else {
            continue;
        };
        found_listing = true;
        task_ids.extend(tasks.iter().filter_map(|task| task["id"].as_i64()));
    }

    found_listing.then_some(task_ids)
}

/// The authenticated caller's id always wins over whatever the model put in
/// the arguments.
fn inject_owner(args: &mut Value, user_id: &str) {
    match args {
        Value::Object(map) => {
            map.insert("user_id".to_string(), Value::String(user_id.to_string()));
        }
        other => {
            *other = json!({"user_id": user_id});
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored(role: &str, content: &str, seq: i64) -> ConversationMessage {
        ConversationMessage {
            id: format!("m{}", seq),
            seq,
            conversation_id: "c1".to_string(),
            user_id: "u1".to_string(),
            role: role.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn context_keeps_history_order_and_appends_current_message() {
        let history = vec![
            stored("user", "add a task", 1),
            stored("assistant", "Done.", 2),
            stored("user", "show my tasks", 3),
        ];
        let context = build_context(&history, "show my tasks");
        assert_eq!(context.len(), 4);
        assert_eq!(context[0].content, "add a task");
        assert_eq!(context[1].role, "assistant");
        assert_eq!(context[3].role, "user");
        assert_eq!(context[3].content, "show my tasks");
    }

    #[test]
    fn context_folds_role_synonyms_and_casing() {
        let history = vec![
            stored("AI", "hi", 1),
            stored("Bot", "hello", 2),
            stored("Assistant", "hey", 3),
            stored("system", "ignored role", 4),
        ];
        let context = build_context(&history, "ok");
        assert_eq!(context[0].role, "assistant");
        assert_eq!(context[1].role, "assistant");
        assert_eq!(context[2].role, "assistant");
        // Unrecognized roles degrade to user input.
        assert_eq!(context[3].role, "user");
    }

    #[test]
    fn context_drops_blank_messages() {
        let history = vec![
            stored("user", "   ", 1),
            stored("assistant", "", 2),
            stored("user", "real content", 3),
        ];
        let context = build_context(&history, "next");
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].content, "real content");
    }

    #[test]
    fn empty_current_message_becomes_placeholder() {
        let context = build_context(&[], "");
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].content, "Hello");
    }

    #[test]
    fn bulk_delete_trigger_matches_keywords() {
        assert!(wants_bulk_delete("please delete all my tasks"));
        assert!(wants_bulk_delete("DELETE ALL"));
        assert!(wants_bulk_delete("deleteall"));
        assert!(wants_bulk_delete("delete eall tasks"));
        assert!(!wants_bulk_delete("delete the milk task"));
        assert!(!wants_bulk_delete("show all my tasks"));
    }

    fn listing_record(result: Value) -> ToolCallRecord {
        ToolCallRecord {
            id: "call_list_tasks_0".to_string(),
            name: "list_tasks".to_string(),
            arguments: json!({}),
            result,
        }
    }

    #[test]
    fn listed_ids_come_from_successful_listings_only() {
        let records = vec![
            listing_record(json!({
                "success": true,
                "tasks": [{"id": 1}, {"id": 2}],
                "count": 2,
            })),
            listing_record(json!({"error": "Failed to list tasks: boom"})),
        ];
        assert_eq!(listed_task_ids(&records), Some(vec![1, 2]));
    }

    #[test]
    fn failed_listing_does_not_arm_the_heuristic() {
        let records = vec![listing_record(json!({"error": "nope"}))];
        assert_eq!(listed_task_ids(&records), None);
    }

    #[test]
    fn empty_successful_listing_arms_the_heuristic_with_no_ids() {
        let records = vec![listing_record(json!({
            "success": true,
            "tasks": [],
            "count": 0,
        }))];
        assert_eq!(listed_task_ids(&records), Some(vec![]));
    }

    #[test]
    fn non_listing_records_are_ignored() {
        let records = vec![ToolCallRecord {
            id: "call_add_task_0".to_string(),
            name: "add_task".to_string(),
            arguments: json!({"title": "x"}),
            result: json!({"success": true, "task_id": 9}),
        }];
        assert_eq!(listed_task_ids(&records), None);
    }

    #[test]
    fn owner_is_always_overwritten_before_dispatch() {
        let mut args = json!({"task_id": 4, "user_id": "someone-else"});
        inject_owner(&mut args, "u1");
        assert_eq!(args["user_id"], "u1");

        let mut missing = json!({"task_id": 4});
        inject_owner(&mut missing, "u1");
        assert_eq!(missing["user_id"], "u1");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A chat thread between one user and the assistant. Conversations are never
/// deleted; `updated_at` is refreshed at the end of every turn that appends
/// an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One message within a conversation. Immutable once written; `seq` is the
/// insertion-order tie-break for messages sharing a `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationMessage {
    pub id: String,
    pub seq: i64,
    pub conversation_id: String,
    pub user_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl Conversation {
    pub async fn create(
        pool: &sqlx::MySqlPool,
        user_id: &str,
    ) -> Result<Conversation, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(Conversation {
            id,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::MySqlPool,
        id: &str,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user_id, created_at, updated_at
            FROM conversations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_owner(
        pool: &sqlx::MySqlPool,
        user_id: &str,
    ) -> Result<Vec<Conversation>, sqlx::Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user_id, created_at, updated_at
            FROM conversations
            WHERE user_id = ?
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Refresh `updated_at` after a turn completes.
    pub async fn touch(pool: &sqlx::MySqlPool, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(r#"UPDATE conversations SET updated_at = ? WHERE id = ?"#)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

impl ConversationMessage {
    pub async fn create(
        pool: &sqlx::MySqlPool,
        conversation_id: &str,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ConversationMessage, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO conversation_messages (id, conversation_id, user_id, role, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(content)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(ConversationMessage {
            id,
            seq: result.last_insert_id() as i64,
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            role: role.as_str().to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// All messages of a conversation, oldest first. The `seq` tie-break
    /// keeps ordering stable when timestamps collide.
    pub async fn find_by_conversation(
        pool: &sqlx::MySqlPool,
        conversation_id: &str,
    ) -> Result<Vec<ConversationMessage>, sqlx::Error> {
        sqlx::query_as::<_, ConversationMessage>(
            r#"
            SELECT id, seq, conversation_id, user_id, role, content, created_at
            FROM conversation_messages
            WHERE conversation_id = ?
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await
    }
}

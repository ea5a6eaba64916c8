//! SQLite backend for every collaborator store.
//!
//! One database file, six tables:
//! - `exemplars`: the user's corpus
//! - `patterns`: engagement patterns and their learned success rates
//! - `snapshots`: fingerprints and knowledge maps as JSON, keyed by (kind, user)
//! - `turns`: append-only conversation log
//! - `summaries`: long-term conversational memory
//! - `profiles`: public profile details
//!
//! Timestamps are stored as RFC 3339 text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use voiceprint_core::corpus::{CorpusQuery, ExemplarOrder, ExemplarText, Pattern, PatternQuery, PatternType};
use voiceprint_core::error::StoreError;
use voiceprint_core::fingerprint::StyleFingerprint;
use voiceprint_core::message::{ConversationId, Message, MessageToolCall, Role};
use voiceprint_core::store::*;
use voiceprint_core::user::{UserProfile, UserStatus};

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "exemplars table",
        r#"
        CREATE TABLE IF NOT EXISTS exemplars (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL,
            text          TEXT NOT NULL,
            engagement    REAL,
            published_at  TEXT NOT NULL
        )
        "#,
    ),
    (
        "exemplars index",
        "CREATE INDEX IF NOT EXISTS idx_exemplars_user ON exemplars(user_id, published_at DESC)",
    ),
    (
        "patterns table",
        r#"
        CREATE TABLE IF NOT EXISTS patterns (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL,
            kind          TEXT NOT NULL,
            description   TEXT NOT NULL,
            source_ids    TEXT NOT NULL DEFAULT '[]',
            success_rate  REAL NOT NULL DEFAULT 0.0,
            usage_count   INTEGER NOT NULL DEFAULT 0,
            updated_at    TEXT NOT NULL
        )
        "#,
    ),
    (
        "snapshots table",
        r#"
        CREATE TABLE IF NOT EXISTS snapshots (
            kind        TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            body        TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            PRIMARY KEY (kind, user_id)
        )
        "#,
    ),
    (
        "turns table",
        r#"
        CREATE TABLE IF NOT EXISTS turns (
            iid              INTEGER PRIMARY KEY AUTOINCREMENT,
            id               TEXT UNIQUE NOT NULL,
            conversation_id  TEXT NOT NULL,
            role             TEXT NOT NULL,
            content          TEXT NOT NULL,
            tool_calls       TEXT NOT NULL DEFAULT '[]',
            tool_call_id     TEXT,
            created_at       TEXT NOT NULL
        )
        "#,
    ),
    (
        "turns index",
        "CREATE INDEX IF NOT EXISTS idx_turns_conversation ON turns(conversation_id, iid)",
    ),
    (
        "summaries table",
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            iid              INTEGER PRIMARY KEY AUTOINCREMENT,
            id               TEXT UNIQUE NOT NULL,
            conversation_id  TEXT NOT NULL,
            kind             TEXT NOT NULL,
            content          TEXT NOT NULL,
            covers_turns     INTEGER NOT NULL,
            token_estimate   INTEGER NOT NULL,
            created_at       TEXT NOT NULL
        )
        "#,
    ),
    (
        "profiles table",
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id       TEXT PRIMARY KEY,
            display_name  TEXT NOT NULL,
            headline      TEXT NOT NULL DEFAULT '',
            about         TEXT NOT NULL DEFAULT '',
            niche         TEXT NOT NULL DEFAULT ''
        )
        "#,
    ),
];

/// A SQLite store implementing every collaborator trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite://{path}")
        };
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // An in-memory database exists per connection, so keep exactly one.
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        for (name, sql) in MIGRATIONS {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{name}: {e}")))?;
        }
        debug!("SQLite migrations complete");
        Ok(())
    }

    fn limit(limit: usize) -> i64 {
        if limit == 0 { -1 } else { limit as i64 }
    }

    fn placeholders(start: usize, n: usize) -> String {
        (start..start + n)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn row_to_exemplar(row: &sqlx::sqlite::SqliteRow) -> Result<ExemplarText, StoreError> {
        Ok(ExemplarText {
            id: column(row, "id")?,
            user_id: column(row, "user_id")?,
            text: column(row, "text")?,
            engagement: column(row, "engagement")?,
            published_at: parse_time(&column::<String>(row, "published_at")?),
        })
    }

    fn row_to_pattern(row: &sqlx::sqlite::SqliteRow) -> Result<Pattern, StoreError> {
        let kind: String = column(row, "kind")?;
        let source_ids: String = column(row, "source_ids")?;
        let usage_count: i64 = column(row, "usage_count")?;
        Ok(Pattern {
            id: column(row, "id")?,
            user_id: column(row, "user_id")?,
            kind: PatternType::parse(&kind)
                .ok_or_else(|| StoreError::QueryFailed(format!("unknown pattern kind '{kind}'")))?,
            description: column(row, "description")?,
            source_ids: serde_json::from_str(&source_ids).unwrap_or_default(),
            success_rate: column(row, "success_rate")?,
            usage_count: u32::try_from(usage_count).unwrap_or(u32::MAX),
            updated_at: parse_time(&column::<String>(row, "updated_at")?),
        })
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, StoreError> {
        let role: String = column(row, "role")?;
        let tool_calls: String = column(row, "tool_calls")?;
        let tool_calls: Vec<MessageToolCall> = serde_json::from_str(&tool_calls).unwrap_or_default();
        Ok(Message {
            id: column(row, "id")?,
            role: Role::parse(&role)
                .ok_or_else(|| StoreError::QueryFailed(format!("unknown role '{role}'")))?,
            content: column(row, "content")?,
            tool_calls,
            tool_call_id: column(row, "tool_call_id")?,
            timestamp: parse_time(&column::<String>(row, "created_at")?),
        })
    }

    fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Result<SummaryRecord, StoreError> {
        let kind: String = column(row, "kind")?;
        let covers_turns: i64 = column(row, "covers_turns")?;
        let token_estimate: i64 = column(row, "token_estimate")?;
        Ok(SummaryRecord {
            id: column(row, "id")?,
            conversation_id: ConversationId(column(row, "conversation_id")?),
            kind: if kind == SummaryKind::Deep.as_str() {
                SummaryKind::Deep
            } else {
                SummaryKind::Batch
            },
            content: column(row, "content")?,
            covers_turns: covers_turns.max(0) as usize,
            token_estimate: token_estimate.max(0) as usize,
            created_at: parse_time(&column::<String>(row, "created_at")?),
        })
    }

    async fn insert_summary<'e, E>(executor: E, record: &SummaryRecord) -> Result<(), StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO summaries (id, conversation_id, kind, content, covers_turns, token_estimate, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(record.conversation_id.as_str())
        .bind(record.kind.as_str())
        .bind(&record.content)
        .bind(record.covers_turns as i64)
        .bind(record.token_estimate as i64)
        .bind(record.created_at.to_rfc3339())
        .execute(executor)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT summary failed: {e}")))?;
        Ok(())
    }
}

fn column<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl CorpusSource for SqliteStore {
    async fn list_exemplars(
        &self,
        user_id: &str,
        query: CorpusQuery,
    ) -> Result<Vec<ExemplarText>, StoreError> {
        let sql = match query.order {
            ExemplarOrder::Engagement => {
                "SELECT * FROM exemplars WHERE user_id = ?1 AND engagement IS NOT NULL \
                 ORDER BY engagement DESC LIMIT ?2"
            }
            ExemplarOrder::Recency => {
                "SELECT * FROM exemplars WHERE user_id = ?1 ORDER BY published_at DESC LIMIT ?2"
            }
        };

        let rows = sqlx::query(sql)
            .bind(user_id)
            .bind(Self::limit(query.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("list exemplars: {e}")))?;

        rows.iter().map(Self::row_to_exemplar).collect()
    }

    async fn count(&self, user_id: &str) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM exemplars WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("count exemplars: {e}")))?;
        let n: i64 = column(&row, "n")?;
        Ok(n as usize)
    }
}

#[async_trait]
impl CorpusWriter for SqliteStore {
    async fn add_exemplars(&self, texts: Vec<ExemplarText>) -> Result<usize, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin: {e}")))?;

        for text in &texts {
            sqlx::query(
                r#"
                INSERT INTO exemplars (id, user_id, text, engagement, published_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    user_id = excluded.user_id,
                    text = excluded.text,
                    engagement = excluded.engagement,
                    published_at = excluded.published_at
                "#,
            )
            .bind(&text.id)
            .bind(&text.user_id)
            .bind(&text.text)
            .bind(text.engagement)
            .bind(text.published_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT exemplar failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("commit: {e}")))?;
        debug!(count = texts.len(), "Stored exemplars");
        Ok(texts.len())
    }

    async fn set_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, display_name, headline, about, niche)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                headline = excluded.headline,
                about = excluded.about,
                niche = excluded.niche
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.display_name)
        .bind(&profile.headline)
        .bind(&profile.about)
        .bind(&profile.niche)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT profile failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl PatternStore for SqliteStore {
    async fn list_patterns(
        &self,
        user_id: &str,
        query: PatternQuery,
    ) -> Result<Vec<Pattern>, StoreError> {
        let type_filter = if query.types.is_empty() {
            String::new()
        } else {
            format!("AND kind IN ({})", Self::placeholders(3, query.types.len()))
        };

        let sql = format!(
            r#"
            SELECT * FROM patterns
            WHERE user_id = ?1 {type_filter}
            ORDER BY success_rate DESC, usage_count DESC
            LIMIT ?2
            "#
        );

        let mut db_query = sqlx::query(&sql)
            .bind(user_id)
            .bind(Self::limit(query.limit));
        for kind in &query.types {
            db_query = db_query.bind(kind.as_str());
        }

        let rows = db_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("list patterns: {e}")))?;

        rows.iter().map(Self::row_to_pattern).collect()
    }

    async fn get_pattern(&self, pattern_id: &str) -> Result<Option<Pattern>, StoreError> {
        let row = sqlx::query("SELECT * FROM patterns WHERE id = ?1")
            .bind(pattern_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("get pattern: {e}")))?;
        row.as_ref().map(Self::row_to_pattern).transpose()
    }

    async fn upsert_pattern(&self, pattern: Pattern) -> Result<(), StoreError> {
        let source_ids = serde_json::to_string(&pattern.source_ids)
            .map_err(|e| StoreError::Storage(format!("source_ids serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO patterns (id, user_id, kind, description, source_ids, success_rate, usage_count, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                description = excluded.description,
                source_ids = excluded.source_ids,
                success_rate = excluded.success_rate,
                usage_count = excluded.usage_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&pattern.id)
        .bind(&pattern.user_id)
        .bind(pattern.kind.as_str())
        .bind(&pattern.description)
        .bind(&source_ids)
        .bind(pattern.success_rate)
        .bind(i64::from(pattern.usage_count))
        .bind(pattern.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT pattern failed: {e}")))?;
        Ok(())
    }

    async fn bump_success_rate(&self, pattern_id: &str, delta: f64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE patterns SET
                success_rate = MIN(1.0, MAX(0.0, success_rate + ?1)),
                usage_count = usage_count + 1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(delta)
        .bind(Utc::now().to_rfc3339())
        .bind(pattern_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("bump pattern failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("pattern {pattern_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Snapshot> SnapshotStore<T> for SqliteStore {
    async fn get(&self, user_id: &str) -> Result<Option<Stamped<T>>, StoreError> {
        let row = sqlx::query("SELECT body, updated_at FROM snapshots WHERE kind = ?1 AND user_id = ?2")
            .bind(T::KIND)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("get {}: {e}", T::KIND)))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let body: String = column(&row, "body")?;
        let value = serde_json::from_str(&body)
            .map_err(|e| StoreError::QueryFailed(format!("{} body: {e}", T::KIND)))?;
        Ok(Some(Stamped {
            value,
            updated_at: parse_time(&column::<String>(&row, "updated_at")?),
        }))
    }

    async fn put(&self, user_id: &str, snapshot: Stamped<T>) -> Result<(), StoreError> {
        let body = serde_json::to_string(&snapshot.value)
            .map_err(|e| StoreError::Storage(format!("{} serialization: {e}", T::KIND)))?;

        sqlx::query(
            r#"
            INSERT INTO snapshots (kind, user_id, body, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(kind, user_id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(T::KIND)
        .bind(user_id)
        .bind(&body)
        .bind(snapshot.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("put {} failed: {e}", T::KIND)))?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM snapshots WHERE kind = ?1 AND user_id = ?2")
            .bind(T::KIND)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("delete {} failed: {e}", T::KIND)))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn append(
        &self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> Result<(), StoreError> {
        let tool_calls = serde_json::to_string(&message.tool_calls)
            .map_err(|e| StoreError::Storage(format!("tool_calls serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO turns (id, conversation_id, role, content, tool_calls, tool_call_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&message.id)
        .bind(conversation_id.as_str())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&tool_calls)
        .bind(&message.tool_call_id)
        .bind(message.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT turn failed: {e}")))?;
        Ok(())
    }

    async fn recent(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
        roles: &[Role],
    ) -> Result<Vec<Message>, StoreError> {
        let role_filter = if roles.is_empty() {
            String::new()
        } else {
            format!("AND role IN ({})", Self::placeholders(3, roles.len()))
        };

        let sql = format!(
            r#"
            SELECT * FROM turns
            WHERE conversation_id = ?1 {role_filter}
            ORDER BY iid DESC
            LIMIT ?2
            "#
        );

        let mut db_query = sqlx::query(&sql)
            .bind(conversation_id.as_str())
            .bind(Self::limit(limit));
        for role in roles {
            db_query = db_query.bind(role.as_str());
        }

        let rows = db_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("recent turns: {e}")))?;

        let mut messages = rows
            .iter()
            .map(Self::row_to_message)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn count(&self, conversation_id: &ConversationId) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM turns WHERE conversation_id = ?1")
            .bind(conversation_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("count turns: {e}")))?;
        let n: i64 = column(&row, "n")?;
        Ok(n as usize)
    }
}

#[async_trait]
impl SummaryStore for SqliteStore {
    async fn list(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<SummaryRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM summaries WHERE conversation_id = ?1 ORDER BY iid ASC")
            .bind(conversation_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("list summaries: {e}")))?;
        rows.iter().map(Self::row_to_summary).collect()
    }

    async fn append(&self, record: SummaryRecord) -> Result<(), StoreError> {
        Self::insert_summary(&self.pool, &record).await
    }

    async fn replace_all(
        &self,
        conversation_id: &ConversationId,
        record: SummaryRecord,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin: {e}")))?;

        sqlx::query("DELETE FROM summaries WHERE conversation_id = ?1")
            .bind(conversation_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE summaries failed: {e}")))?;

        Self::insert_summary(&mut *tx, &record).await?;

        // Dropping `tx` without commit rolls back, leaving prior records intact.
        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("commit: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("get profile: {e}")))?;

        row.map(|row| {
            Ok(UserProfile {
                user_id: column(&row, "user_id")?,
                display_name: column(&row, "display_name")?,
                headline: column(&row, "headline")?,
                about: column(&row, "about")?,
                niche: column(&row, "niche")?,
            })
        })
        .transpose()
    }

    async fn status(&self, user_id: &str) -> Result<UserStatus, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM exemplars WHERE user_id = ?1) AS corpus_size,
                (SELECT COUNT(*) FROM exemplars WHERE user_id = ?1 AND engagement IS NOT NULL) AS analyzed,
                (SELECT COUNT(*) FROM patterns WHERE user_id = ?1) AS patterns,
                (SELECT updated_at FROM snapshots WHERE user_id = ?1 AND kind = ?2) AS fingerprint_at
            "#,
        )
        .bind(user_id)
        .bind(StyleFingerprint::KIND)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("user status: {e}")))?;

        let corpus_size: i64 = column(&row, "corpus_size")?;
        let analyzed: i64 = column(&row, "analyzed")?;
        let patterns: i64 = column(&row, "patterns")?;
        let fingerprint_at: Option<String> = column(&row, "fingerprint_at")?;
        let fingerprint_updated_at = fingerprint_at.as_deref().map(parse_time);

        Ok(UserStatus {
            has_corpus: corpus_size > 0,
            has_fingerprint: fingerprint_updated_at.is_some(),
            has_patterns: patterns > 0,
            corpus_size: corpus_size as usize,
            analyzed_texts: analyzed as usize,
            fingerprint_updated_at,
        })
    }
}

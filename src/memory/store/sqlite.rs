// src/memory/store/sqlite.rs
// SQLite-backed ScoreStore: durable rows plus in-memory HNSW indices.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::index::ContextIndex;
use super::{NearestMatch, ScoreStore};
use crate::embedding::Embedding;
use crate::error::CoreError;
use crate::memory::core::{QueryContextScore, Signal, SignalType};

/// How many approximate neighbours to pull from the HNSW index before
/// exact-cosine re-ranking. HNSW's integer-quantized distance can blur the
/// ordering among very close vectors, so the store always asks for a small
/// window and re-ranks it exactly rather than trusting the approximate order
/// outright (spec section 9's open question on ANN-miss races).
const ANN_SEARCH_K: usize = 16;

pub struct SqliteScoreStore {
    pool: SqlitePool,
    index: ContextIndex,
}

impl SqliteScoreStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// Build a store directly from an already-open pool, used by tests that
    /// want an in-memory SQLite database shared across connections.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CoreError> {
        let store = Self {
            pool,
            index: ContextIndex::new(),
        };
        store.migrate().await?;
        store.rebuild_index().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS query_fact_usefulness (
                id TEXT PRIMARY KEY,
                bank_id TEXT NOT NULL,
                fact_id TEXT NOT NULL,
                embedding TEXT NOT NULL,
                query_example TEXT,
                usefulness_score REAL NOT NULL,
                signal_count INTEGER NOT NULL,
                last_signal_at TEXT,
                last_decay_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_qfu_bank ON query_fact_usefulness(bank_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_qfu_fact ON query_fact_usefulness(fact_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_qfu_bank_fact ON query_fact_usefulness(bank_id, fact_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usefulness_signals (
                id TEXT PRIMARY KEY,
                bank_id TEXT NOT NULL,
                fact_id TEXT NOT NULL,
                context_id TEXT NOT NULL,
                signal_type TEXT NOT NULL,
                confidence REAL NOT NULL,
                query TEXT,
                context_note TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn rebuild_index(&self) -> Result<(), CoreError> {
        let rows = sqlx::query("SELECT id, bank_id, fact_id, embedding FROM query_fact_usefulness")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        for row in rows {
            let id: String = row.get("id");
            let bank_id: String = row.get("bank_id");
            let fact_id: String = row.get("fact_id");
            let embedding_json: String = row.get("embedding");

            let Ok(values) = serde_json::from_str::<Vec<f32>>(&embedding_json) else {
                continue;
            };
            let Ok(embedding) = Embedding::new(values) else {
                continue;
            };
            let Ok(context_id) = Uuid::parse_str(&id) else {
                continue;
            };

            self.index.insert(&bank_id, &fact_id, context_id, &embedding);
        }

        Ok(())
    }

    fn row_to_context(row: &sqlx::sqlite::SqliteRow) -> Result<QueryContextScore, CoreError> {
        let id: String = row.get("id");
        let embedding_json: String = row.get("embedding");
        let values: Vec<f32> = serde_json::from_str(&embedding_json)
            .map_err(|e| CoreError::Invariant(format!("corrupt embedding row: {e}")))?;

        Ok(QueryContextScore {
            id: Uuid::parse_str(&id).map_err(|e| CoreError::Invariant(e.to_string()))?,
            bank_id: row.get("bank_id"),
            fact_id: row.get("fact_id"),
            embedding: Embedding::new(values)?,
            query_example: row.get("query_example"),
            usefulness_score: row.get::<f64, _>("usefulness_score") as f32,
            signal_count: row.get::<i64, _>("signal_count") as u64,
            last_signal_at: row.get("last_signal_at"),
            last_decay_at: row.get("last_decay_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn get_by_id(&self, context_id: Uuid) -> Result<Option<QueryContextScore>, CoreError> {
        let row = sqlx::query("SELECT * FROM query_fact_usefulness WHERE id = ?")
            .bind(context_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        row.as_ref().map(Self::row_to_context).transpose()
    }

    fn row_to_signal(row: &sqlx::sqlite::SqliteRow) -> Result<Signal, CoreError> {
        let id: String = row.get("id");
        let signal_type_raw: String = row.get("signal_type");

        Ok(Signal {
            id: Uuid::parse_str(&id).map_err(|e| CoreError::Invariant(e.to_string()))?,
            bank_id: row.get("bank_id"),
            fact_id: row.get("fact_id"),
            signal_type: SignalType::parse(&signal_type_raw)?,
            confidence: row.get::<f64, _>("confidence") as f32,
            query: row.get("query"),
            context_note: row.get("context_note"),
            created_at: row.get("created_at"),
        })
    }

    /// Post-commit invariant check (spec section 7): a score outside
    /// `[0, 1]` or a `signal_count` that doesn't match what the caller just
    /// wrote indicates a bug upstream of the store, not a value to silently
    /// clamp. Logs and fails the operation instead.
    fn verify_committed(context: &QueryContextScore, expected_signal_count: u64) -> Result<(), CoreError> {
        if !(0.0..=1.0).contains(&context.usefulness_score) {
            tracing::error!(
                context_id = %context.id,
                score = context.usefulness_score,
                "usefulness_score outside [0,1] after commit"
            );
            return Err(CoreError::Invariant(format!(
                "usefulness_score {} outside [0,1] for context {}",
                context.usefulness_score, context.id
            )));
        }

        if context.signal_count != expected_signal_count {
            tracing::error!(
                context_id = %context.id,
                expected = expected_signal_count,
                got = context.signal_count,
                "signal_count disagreement after commit"
            );
            return Err(CoreError::Invariant(format!(
                "signal_count mismatch for context {}: expected {expected_signal_count}, got {}",
                context.id, context.signal_count
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ScoreStore for SqliteScoreStore {
    async fn find_nearest(
        &self,
        bank_id: &str,
        fact_id: &str,
        embedding: &Embedding,
    ) -> Result<Option<NearestMatch>, CoreError> {
        // The HNSW graph for this (bank, fact) narrows the field to a small
        // approximate-neighbour window; each candidate is then re-scored by
        // exact cosine so the merge decision never relies on the index's
        // quantized distance ordering alone.
        let ann_hits = self.index.search_fact(bank_id, fact_id, embedding, ANN_SEARCH_K);

        let mut best: Option<NearestMatch> = None;
        for (id, _approx_similarity) in ann_hits {
            let Some(context) = self.get_by_id(id).await? else {
                continue;
            };
            let similarity = context.embedding.cosine_similarity(embedding);
            if best.as_ref().map(|b| similarity > b.similarity).unwrap_or(true) {
                best = Some(NearestMatch { context, similarity });
            }
        }
        Ok(best)
    }

    async fn find_nearest_any(
        &self,
        bank_id: &str,
        embedding: &Embedding,
        k: usize,
    ) -> Result<Vec<NearestMatch>, CoreError> {
        let hits = self.index.search_bank(bank_id, embedding, k);

        let mut out = Vec::with_capacity(hits.len());
        for (id, _approx_similarity) in hits {
            if let Some(context) = self.get_by_id(id).await? {
                let similarity = context.embedding.cosine_similarity(embedding);
                out.push(NearestMatch { context, similarity });
            }
        }
        out.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        Ok(out)
    }

    async fn insert(&self, context: QueryContextScore) -> Result<QueryContextScore, CoreError> {
        let embedding_json = serde_json::to_string(context.embedding.as_slice())
            .map_err(|e| CoreError::Invariant(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO query_fact_usefulness
                (id, bank_id, fact_id, embedding, query_example, usefulness_score,
                 signal_count, last_signal_at, last_decay_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(context.id.to_string())
        .bind(&context.bank_id)
        .bind(&context.fact_id)
        .bind(embedding_json)
        .bind(&context.query_example)
        .bind(context.usefulness_score as f64)
        .bind(context.signal_count as i64)
        .bind(context.last_signal_at)
        .bind(context.last_decay_at)
        .bind(context.created_at)
        .bind(context.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        self.index
            .insert(&context.bank_id, &context.fact_id, context.id, &context.embedding);

        let row = sqlx::query("SELECT * FROM query_fact_usefulness WHERE id = ?")
            .bind(context.id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        let committed = Self::row_to_context(&row)?;
        Self::verify_committed(&committed, context.signal_count)?;
        Ok(committed)
    }

    async fn update(
        &self,
        context_id: Uuid,
        expected_updated_at: DateTime<Utc>,
        new_score: f32,
        new_signal_count: u64,
        new_last_signal_at: DateTime<Utc>,
        new_last_decay_at: DateTime<Utc>,
    ) -> Result<QueryContextScore, CoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE query_fact_usefulness
            SET usefulness_score = ?, signal_count = ?, last_signal_at = ?, last_decay_at = ?, updated_at = ?
            WHERE id = ? AND updated_at = ?
            "#,
        )
        .bind(new_score as f64)
        .bind(new_signal_count as i64)
        .bind(new_last_signal_at)
        .bind(new_last_decay_at)
        .bind(now)
        .bind(context_id.to_string())
        .bind(expected_updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::StoreConflict(context_id.to_string()));
        }

        let row = sqlx::query("SELECT * FROM query_fact_usefulness WHERE id = ?")
            .bind(context_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        let committed = Self::row_to_context(&row)?;
        Self::verify_committed(&committed, new_signal_count)?;
        Ok(committed)
    }

    async fn list_by_fact(
        &self,
        bank_id: &str,
        fact_id: &str,
    ) -> Result<Vec<QueryContextScore>, CoreError> {
        let rows = sqlx::query(
            "SELECT * FROM query_fact_usefulness WHERE bank_id = ? AND fact_id = ?",
        )
        .bind(bank_id)
        .bind(fact_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        rows.iter().map(Self::row_to_context).collect()
    }

    async fn list_by_bank(&self, bank_id: &str) -> Result<Vec<QueryContextScore>, CoreError> {
        let rows = sqlx::query("SELECT * FROM query_fact_usefulness WHERE bank_id = ?")
            .bind(bank_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        rows.iter().map(Self::row_to_context).collect()
    }

    async fn apply_decay_sweep(
        &self,
        bank_id: &str,
        lambda_per_day: f32,
        now: DateTime<Utc>,
    ) -> Result<u64, CoreError> {
        let contexts = self.list_by_bank(bank_id).await?;
        let mut touched = 0u64;
        let stale_cutoff = now - chrono::Duration::hours(24);

        for context in contexts {
            if context.last_decay_at > stale_cutoff {
                continue;
            }

            let decayed = crate::memory::decay::decay(
                context.usefulness_score,
                context.last_decay_at,
                now,
                lambda_per_day,
            );
            if (decayed - context.usefulness_score).abs() < f32::EPSILON {
                continue;
            }

            match self
                .update(
                    context.id,
                    context.updated_at,
                    decayed,
                    context.signal_count,
                    context.last_signal_at.unwrap_or(context.last_decay_at),
                    now,
                )
                .await
            {
                Ok(_) => touched += 1,
                Err(CoreError::StoreConflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(touched)
    }

    async fn list_bank_ids(&self) -> Result<Vec<String>, CoreError> {
        let rows = sqlx::query("SELECT DISTINCT bank_id FROM query_fact_usefulness")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        Ok(rows.iter().map(|r| r.get("bank_id")).collect())
    }

    async fn record_signal(&self, context_id: Uuid, signal: &Signal) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO usefulness_signals
                (id, bank_id, fact_id, context_id, signal_type, confidence, query, context_note, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(signal.id.to_string())
        .bind(&signal.bank_id)
        .bind(&signal.fact_id)
        .bind(context_id.to_string())
        .bind(signal.signal_type.as_str())
        .bind(signal.confidence as f64)
        .bind(&signal.query)
        .bind(&signal.context_note)
        .bind(signal.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn list_signals_by_fact(&self, bank_id: &str, fact_id: &str) -> Result<Vec<Signal>, CoreError> {
        let rows = sqlx::query(
            "SELECT * FROM usefulness_signals WHERE bank_id = ? AND fact_id = ?",
        )
        .bind(bank_id)
        .bind(fact_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        rows.iter().map(Self::row_to_signal).collect()
    }

    async fn list_signals_by_bank(&self, bank_id: &str) -> Result<Vec<Signal>, CoreError> {
        let rows = sqlx::query("SELECT * FROM usefulness_signals WHERE bank_id = ?")
            .bind(bank_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        rows.iter().map(Self::row_to_signal).collect()
    }
}

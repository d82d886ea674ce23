//! # Quiz Model
//!
//! The customer's immutable creative brief. Owned 1:1 by the order that
//! consumes it; retry-queue recovery may create the quiz first and attach
//! it to the order afterwards.
//!
//! A brief is valid when it carries a recipient, a style, and exactly one of
//! the two message shapes: the structured `message` field or the legacy
//! narrative trio (`occasion`, `story`, `details`). Validation happens in
//! order creation, before any write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: i64,
    pub recipient: String,
    pub style: String,
    pub tone: Option<String>,
    pub message: Option<String>,
    pub occasion: Option<String>,
    pub story: Option<String>,
    pub details: Option<String>,
    pub voice_preference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuiz {
    pub recipient: String,
    pub style: String,
    pub tone: Option<String>,
    pub message: Option<String>,
    pub occasion: Option<String>,
    pub story: Option<String>,
    pub details: Option<String>,
    pub voice_preference: Option<String>,
}

impl NewQuiz {
    /// The free-text fields that feed name extraction and addressing
    /// analysis, in brief order.
    pub fn narrative_text(&self) -> String {
        [&self.message, &self.occasion, &self.story, &self.details]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

const QUIZ_COLUMNS: &str =
    "id, recipient, style, tone, message, occasion, story, details, voice_preference, created_at";

impl Quiz {
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        new_quiz: &NewQuiz,
    ) -> Result<Quiz, sqlx::Error> {
        let sql = format!(
            "INSERT INTO quizzes (recipient, style, tone, message, occasion, story, details, \
             voice_preference, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now()) \
             RETURNING {QUIZ_COLUMNS}"
        );
        sqlx::query_as::<_, Quiz>(&sql)
            .bind(&new_quiz.recipient)
            .bind(&new_quiz.style)
            .bind(&new_quiz.tone)
            .bind(&new_quiz.message)
            .bind(&new_quiz.occasion)
            .bind(&new_quiz.story)
            .bind(&new_quiz.details)
            .bind(&new_quiz.voice_preference)
            .fetch_one(&mut **tx)
            .await
    }

    /// Standalone insert, used by the retry queue when it recovers a quiz
    /// whose primary write failed.
    pub async fn create(pool: &PgPool, new_quiz: &NewQuiz) -> Result<Quiz, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let quiz = Quiz::create_in_tx(&mut tx, new_quiz).await?;
        tx.commit().await?;
        Ok(quiz)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Quiz>, sqlx::Error> {
        let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1");
        sqlx::query_as::<_, Quiz>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub fn narrative_text(&self) -> String {
        [&self.message, &self.occasion, &self.story, &self.details]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrative_text_joins_present_fields_in_order() {
        let quiz = NewQuiz {
            recipient: "Maria".into(),
            style: "ballad".into(),
            tone: None,
            message: Some("happy birthday".into()),
            occasion: None,
            story: Some("we met in Lisbon".into()),
            details: None,
            voice_preference: None,
        };
        assert_eq!(quiz.narrative_text(), "happy birthday\nwe met in Lisbon");
    }
}

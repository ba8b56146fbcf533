#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tempo_insights_lib::db::repositories::daily_stats_repository::DailyStatsRepository;
use tempo_insights_lib::db::repositories::user_repository::UserRepository;
use tempo_insights_lib::db::DbPool;
use tempo_insights_lib::error::{AiErrorCode, AppError, AppResult};
use tempo_insights_lib::models::ai_types::{BackendMetadata, GenerativeBackend};
use tempo_insights_lib::models::insights::DailyMetric;
use tempo_insights_lib::services::model_invoker::ModelInvoker;
use tempfile::TempDir;

pub enum Reply {
    Text(String),
    Fail(AiErrorCode),
}

/// Backend that answers from a script and records every call.
///
/// Each call yields to the runtime once before answering, so joined futures
/// interleave at the model call.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Answer every call with `text`.
    pub fn always(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(text.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, model: &str, prompt: &str) -> AppResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        tokio::task::yield_now().await;

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(code)) => Err(AppError::ai_with_details(
                code,
                "scripted backend failure",
                Some("scripted-correlation-id"),
                None,
            )),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| AppError::other("scripted backend ran out of replies")),
        }
    }

    fn describe(&self) -> BackendMetadata {
        BackendMetadata {
            provider_id: "scripted".to_string(),
            base_url: None,
            has_api_key: false,
        }
    }
}

pub fn invoker(backend: Arc<ScriptedBackend>) -> ModelInvoker {
    ModelInvoker::new(backend, "gemini-1.5-flash")
}

pub fn temp_pool() -> (DbPool, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");
    (pool, dir)
}

pub fn day(date: &str, tasks: i64, habits: i64, minutes: i64, score: f64) -> DailyMetric {
    DailyMetric {
        date: chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("date"),
        tasks_completed: tasks,
        habits_completed: habits,
        focus_minutes: minutes,
        productivity_score: score,
    }
}

/// User with two active habits and three days of stats in the week of 2026-10-18.
pub fn seed_user(pool: &DbPool, user_id: &str, name: Option<&str>) {
    pool.with_connection(|conn| {
        UserRepository::upsert_user(conn, user_id, name)?;
        UserRepository::add_habit(conn, user_id, "Read 20 pages")?;
        UserRepository::add_habit(conn, user_id, "Morning run")?;
        for metric in [
            day("2026-10-18", 3, 2, 60, 70.0),
            day("2026-10-19", 5, 2, 120, 85.0),
            day("2026-10-20", 4, 1, 90, 78.0),
        ] {
            DailyStatsRepository::upsert(conn, user_id, &metric)?;
        }
        Ok(())
    })
    .expect("seed user");
}

pub const REPORT_REPLY: &str = r#"```json
{
  "summary": "A focused week with steady habit completion.",
  "strengths": ["Consistent mornings", "Long focus blocks"],
  "improvements": ["Wednesday dip"],
  "suggestions": ["Plan Wednesdays the evening before"]
}
```"#;

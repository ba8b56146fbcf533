pub mod ai_commands;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{error, info, warn};

use crate::config::InsightsConfig;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::ai_types::GenerativeBackend;
use crate::services::ai_service::GeminiProvider;
use crate::services::insight_service::InsightService;
use crate::services::model_invoker::ModelInvoker;
use crate::services::weekly_report_service::WeeklyReportService;

/// Everything a command needs, built once per process.
#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    config: Arc<InsightsConfig>,
    backend: Arc<dyn GenerativeBackend>,
    insight_service: Arc<InsightService>,
    report_service: Arc<WeeklyReportService>,
}

impl AppState {
    pub fn new(db_pool: DbPool, config: InsightsConfig) -> AppResult<Self> {
        let backend: Arc<dyn GenerativeBackend> = Arc::new(GeminiProvider::try_new(&config)?);
        if !config.has_api_key() {
            warn!(target: "app::ai", "Gemini API key is not configured; AI commands will fail");
        }
        Ok(Self::with_backend(db_pool, config, backend))
    }

    /// Wire the services around an explicit backend handle.
    pub fn with_backend(
        db_pool: DbPool,
        config: InsightsConfig,
        backend: Arc<dyn GenerativeBackend>,
    ) -> Self {
        let invoker = ModelInvoker::new(Arc::clone(&backend), config.model.clone());
        let insight_service = Arc::new(InsightService::new(invoker.clone()));
        let report_service = Arc::new(WeeklyReportService::new(
            db_pool.clone(),
            invoker,
            config.report_timezone,
            config.report_model.clone(),
        ));

        info!(
            target: "app::ai",
            model = %config.model,
            report_model = %config.report_model,
            timezone = %config.report_timezone,
            "insight services ready"
        );

        Self {
            db_pool,
            config: Arc::new(config),
            backend,
            insight_service,
            report_service,
        }
    }

    pub fn insights(&self) -> Arc<InsightService> {
        Arc::clone(&self.insight_service)
    }

    pub fn reports(&self) -> Arc<WeeklyReportService> {
        Arc::clone(&self.report_service)
    }

    pub fn backend(&self) -> Arc<dyn GenerativeBackend> {
        Arc::clone(&self.backend)
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::InvalidRequest { message } => CommandError::new("INVALID_REQUEST", message, None),
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => CommandError::new("NOT_FOUND", "requested resource was not found", None),
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Ai {
                code,
                message,
                correlation_id,
                details,
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => {
                            for (key, value) in map {
                                merged.insert(key, value);
                            }
                        }
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                let detail_value = if merged.is_empty() {
                    None
                } else {
                    Some(JsonValue::Object(merged))
                };
                CommandError::new(code.as_str(), message, detail_value)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Caller-facing response shape: `{success, data?, message?, error?, code?}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            code: None,
            details: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn failure(error: CommandError) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.message),
            code: Some(error.code),
            details: error.details,
        }
    }

    pub fn from_result(result: CommandResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::failure(error),
        }
    }
}

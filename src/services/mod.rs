pub mod ai_service;
pub mod insight_service;
pub mod model_invoker;
pub mod prompt_templates;
pub mod schema_validator;
pub mod week_utils;
pub mod weekly_report_service;

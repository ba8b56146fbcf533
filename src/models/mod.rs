pub mod ai_types;
pub mod insights;

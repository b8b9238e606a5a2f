//! Storage module for Lingo
//!
//! - `json`: JSON - 범용 파일 저장/로드 (설정, 태스크 레코드)

mod json;

// JSON Storage (범용)
pub use json::{JsonStore, APP_DIR_NAME, PROJECT_DIR_NAME};

//! JSON 파일 저장소

mod store;

pub use store::{JsonStore, APP_DIR_NAME, PROJECT_DIR_NAME};

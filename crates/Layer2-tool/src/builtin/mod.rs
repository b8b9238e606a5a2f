//! Builtin tools for Lingo

pub mod command;
pub mod delete;
pub mod glob;
pub mod plan;
pub mod query;
pub mod read;
pub mod write;

use lingo_foundation::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// 워크스페이스 안의 경로로 해석
///
/// 상대 경로는 루트 기준, 절대 경로는 루트 아래일 때만 허용합니다.
/// 존재하지 않는 파일도 다뤄야 하므로 `canonicalize` 대신 경로 구성요소를 직접 정리합니다.
pub fn resolve_in_workspace(root: &Path, path: &str) -> Result<PathBuf> {
    if path.trim().is_empty() {
        return Err(Error::InvalidInput("path must not be empty".into()));
    }

    let root = normalize(root);
    let requested = Path::new(path);
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };

    let resolved = normalize(&joined);
    let escapes = resolved.components().any(|c| c == Component::ParentDir)
        || (requested.is_absolute() && !root.is_absolute());
    if escapes || !resolved.starts_with(&root) {
        return Err(Error::InvalidInput(format!(
            "path '{}' is outside the workspace",
            path
        )));
    }
    Ok(resolved)
}

/// 워크스페이스 기준 상대 경로 표시
pub fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(normalize(root))
        .unwrap_or(path)
        .display()
        .to_string()
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // 루트 밖으로 나가는 `..`는 그대로 남겨 starts_with 검사에서 걸리게 함
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

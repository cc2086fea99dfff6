//! # File System Operations Module / 文件系统操作模块
//!
//! This module creates the isolated, per-task environment directories.
//!
//! 此模块创建每个任务独立的隔离环境目录。

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory that holds one task's provisioned dependencies.
///
/// Every call to [`Environment::create`] yields a directory nobody else has
/// seen, even for two tasks with the same version. The directory is deleted
/// when this value is dropped.
///
/// 保存单个任务已构建依赖的目录。
/// 每次调用 [`Environment::create`] 都会得到一个全新的目录，即使两个任务的版本相同。
/// 当此值被丢弃时，目录会被删除。
pub struct Environment {
    /// The `TempDir` guard. When this goes out of scope, the directory on disk is deleted.
    /// `TempDir` 的 guard。当它超出作用域时，磁盘上的目录将被删除。
    _temp_root: TempDir,
    path: PathBuf,
}

impl Environment {
    /// Creates a fresh environment directory under `root`, named after `slug`.
    pub fn create(root: &Path, slug: &str) -> Result<Self> {
        fs::create_dir_all(root).with_context(|| {
            format!("Failed to create environment root: {}", root.display())
        })?;

        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("envmatrix-{}-", sanitize(slug)))
            .tempdir_in(root)
            .with_context(|| {
                format!(
                    "Failed to create environment directory in {}",
                    root.display()
                )
            })?;
        let path = temp_dir.path().to_path_buf();

        Ok(Self {
            _temp_root: temp_dir,
            path,
        })
    }

    /// The absolute path of the environment directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn sanitize(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "task".to_string()
    } else {
        sanitized
    }
}

/// Gets the absolute path from a potentially relative path.
///
/// # Arguments
/// * `path` - Path to canonicalize
///
/// # Returns
/// Canonicalized absolute path, or an error if the path doesn't exist
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}

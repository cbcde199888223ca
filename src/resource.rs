//! Resolution of resource references (image `src` values) against a base
//! directory.

use std::path::{Component, Path, PathBuf};

pub trait ResourceResolver {
    /// Turn `reference` into something the image collaborators can open.
    fn resolve(&self, reference: &str, base: Option<&Path>) -> String;
}

/// Resolves relative references against the base directory on the local
/// filesystem. `http:`, `https:` and `data:` references pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResourceResolver;

impl ResourceResolver for FsResourceResolver {
    fn resolve(&self, reference: &str, base: Option<&Path>) -> String {
        let reference = reference.trim();
        if is_passthrough(reference) {
            return reference.to_string();
        }
        let reference = reference.strip_prefix("file://").unwrap_or(reference);
        match base {
            Some(base) if Path::new(reference).is_relative() => {
                normalize(&base.join(reference)).to_string_lossy().into_owned()
            }
            _ => reference.to_string(),
        }
    }
}

fn is_passthrough(reference: &str) -> bool {
    ["http://", "https://", "data:"]
        .iter()
        .any(|scheme| reference.starts_with(scheme))
}

/// Fold `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

//! File loader contract (`spec.md` §6): resolves an `*IMPORT` location
//! string to source text. Relative-path resolution and security policy are
//! the loader's concern, not the evaluator's — `crate::driver` calls this
//! at most once per `*IMPORT`, exactly as the original's
//! `ModlInterpreter._load_config_file`/`_load_file` does.

use crate::{err_msg, ModlError};
use std::path::{Path, PathBuf};

/// A pluggable source for `*IMPORT` targets.
pub trait Loader: Send + Sync {
    fn load(&self, location: &str) -> Result<String, ModlError>;
}

/// Appends `.modl` when `location` carries neither `.modl` nor `.txt`,
/// per `spec.md` §6's file loader contract, verbatim.
pub fn resolve_extension(location: &str) -> PathBuf {
    let path = Path::new(location);
    let has_known_ext = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("modl") | Some("txt")
    );
    if has_known_ext {
        path.to_path_buf()
    } else {
        PathBuf::from(format!("{location}.modl"))
    }
}

/// Default, filesystem-backed `Loader`: reads the resolved path as UTF-8
/// text, relative to an optional base directory.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    pub base_dir: Option<PathBuf>,
}

impl FsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

impl Loader for FsLoader {
    fn load(&self, location: &str) -> Result<String, ModlError> {
        let resolved = resolve_extension(location);
        let path = match &self.base_dir {
            Some(base) => base.join(resolved),
            None => resolved,
        };
        std::fs::read_to_string(&path).map_err(|e| {
            err_msg!(LoaderError, message: format!("failed to read `{}`: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_modl_extension_when_missing() {
        assert_eq!(resolve_extension("colors"), PathBuf::from("colors.modl"));
    }

    #[test]
    fn leaves_known_extensions_alone() {
        assert_eq!(resolve_extension("colors.modl"), PathBuf::from("colors.modl"));
        assert_eq!(resolve_extension("colors.txt"), PathBuf::from("colors.txt"));
    }

    #[test]
    fn missing_file_is_a_loader_error() {
        let loader = FsLoader::new();
        let err = loader.load("/nonexistent/path/definitely-not-here");
        assert!(matches!(err, Err(ModlError::LoaderError { .. })));
    }
}

//! Host path translation.
//!
//! The wrapped tool runs inside a Linux environment that sees the host's
//! drives under a mount root (`/mnt` by default), so `C:\work\app` on the host
//! is `/mnt/c/work/app` to the tool. Paths into the Linux environment itself
//! (`\\wsl$\<distro>\...`) map back to plain absolute paths.

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use std::path::PathBuf;

use super::{ConversionResult, Converted, ValueHandler};
use crate::cleanup::Cleanup;
use crate::config::ShimConfig;

/// Marker for standard input or output in place of a path.
pub const STDIO_MARKER: &str = "-";

/// Translates host paths into paths visible to the wrapped tool.
#[derive(Debug, Clone)]
pub struct PathTranslator {
    mount_root: String,
    working_dir: Option<String>,
    drive_path: Regex,
    drive_prefix: Regex,
    wsl_share: Regex,
}

impl PathTranslator {
    /// Creates a translator mounting host drives under `mount_root`.
    pub fn new(mount_root: impl Into<String>) -> Result<Self> {
        let mount_root = mount_root.into();
        let mount_root = match mount_root.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        Ok(Self {
            mount_root,
            working_dir: None,
            drive_path: Regex::new(r"^([A-Za-z]):(?:[\\/](.*))?$")?,
            drive_prefix: Regex::new(r"^[A-Za-z]:")?,
            wsl_share: Regex::new(r"(?i)^(?:\\\\|//)wsl(?:\$|\.localhost)[\\/][^\\/]+(?:[\\/](.*))?$")?,
        })
    }

    pub fn from_config(config: &ShimConfig) -> Result<Self> {
        let translator = Self::new(config.mount_root.clone())?;
        Ok(match &config.working_dir {
            Some(dir) => translator.with_working_dir(dir.clone()),
            None => translator,
        })
    }

    /// Relative paths are resolved against `dir` before translation.
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn mount_root(&self) -> &str {
        &self.mount_root
    }

    /// Whether `value` starts with a drive letter and colon (`C:`).
    pub fn has_drive_prefix(&self, value: &str) -> bool {
        self.drive_prefix.is_match(value)
    }

    pub fn translate(&self, raw: &str) -> Result<String> {
        if raw.is_empty() {
            bail!("empty path");
        }
        if let Some(translated) = self.translate_absolute(raw)? {
            return Ok(translated);
        }
        match &self.working_dir {
            Some(dir) => {
                let joined = join_host_path(dir, raw);
                self.translate_absolute(&joined)?.ok_or_else(|| {
                    anyhow!("working directory {dir:?} is not an absolute path")
                })
            }
            None => Ok(raw.to_string()),
        }
    }

    /// The path on the host that `translate(raw)` refers to: relative paths
    /// are joined to the working directory exactly as translation joins them.
    pub fn host_path(&self, raw: &str) -> Result<PathBuf> {
        if self.translate_absolute(raw)?.is_some() {
            return Ok(PathBuf::from(raw));
        }
        Ok(match &self.working_dir {
            Some(dir) => PathBuf::from(join_host_path(dir, raw)),
            None => PathBuf::from(raw),
        })
    }

    /// Translates an absolute path; returns `None` for relative paths.
    fn translate_absolute(&self, raw: &str) -> Result<Option<String>> {
        if let Some(captures) = self.drive_path.captures(raw) {
            let drive = captures[1].to_ascii_lowercase();
            let mut translated = if self.mount_root == "/" {
                format!("/{drive}")
            } else {
                format!("{}/{}", self.mount_root, drive)
            };
            let rest = captures.get(2).map_or("", |m| m.as_str());
            let rest = normalize_separators(rest);
            if !rest.is_empty() {
                translated.push('/');
                translated.push_str(&rest);
            }
            return Ok(Some(translated));
        }
        if self.has_drive_prefix(raw) {
            bail!("drive-relative path {raw:?} cannot be translated");
        }
        if let Some(captures) = self.wsl_share.captures(raw) {
            let rest = captures.get(1).map_or("", |m| m.as_str());
            return Ok(Some(format!("/{}", normalize_separators(rest))));
        }
        if raw.starts_with("\\\\") || raw.starts_with("//") {
            bail!("network path {raw:?} is not reachable from the container environment");
        }
        if raw.starts_with('/') {
            return Ok(Some(raw.to_string()));
        }
        Ok(None)
    }
}

fn normalize_separators(rest: &str) -> String {
    rest.replace('\\', "/").trim_end_matches('/').to_string()
}

fn join_host_path(dir: &str, relative: &str) -> String {
    let separator = if dir.contains('\\') { '\\' } else { '/' };
    let dir = dir.trim_end_matches(['\\', '/']);
    let relative = relative
        .strip_prefix("./")
        .or_else(|| relative.strip_prefix(".\\"))
        .unwrap_or(relative);
    format!("{dir}{separator}{relative}")
}

/// Rewrites an input file or directory path.
#[derive(Debug, Clone)]
pub struct FilePathHandler {
    translator: std::sync::Arc<PathTranslator>,
}

impl FilePathHandler {
    pub fn new(translator: std::sync::Arc<PathTranslator>) -> Self {
        Self { translator }
    }
}

impl ValueHandler for FilePathHandler {
    fn name(&self) -> &str {
        "file path"
    }

    fn convert(&self, value: &str) -> ConversionResult {
        if value == STDIO_MARKER {
            return Ok(Converted::new(value));
        }
        let translated = self
            .translator
            .translate(value)
            .with_context(|| format!("cannot translate file path {value:?}"))?;
        Ok(Converted::new(translated))
    }
}

/// Rewrites a path the wrapped tool will create.
///
/// When nothing exists at the host path yet, a failure-only cleanup removes
/// whatever the tool left there, so a failed run does not leave a partial file
/// behind. Files that already existed are never removed.
#[derive(Debug, Clone)]
pub struct OutputPathHandler {
    translator: std::sync::Arc<PathTranslator>,
}

impl OutputPathHandler {
    pub fn new(translator: std::sync::Arc<PathTranslator>) -> Self {
        Self { translator }
    }
}

impl ValueHandler for OutputPathHandler {
    fn name(&self) -> &str {
        "output path"
    }

    fn convert(&self, value: &str) -> ConversionResult {
        if value == STDIO_MARKER {
            return Ok(Converted::new(value));
        }
        let translated = self
            .translator
            .translate(value)
            .with_context(|| format!("cannot translate output path {value:?}"))?;

        let host_path = self.translator.host_path(value)?;
        if host_path.exists() {
            return Ok(Converted::new(translated));
        }
        let label = format!("remove partial output {}", host_path.display());
        Ok(
            Converted::new(translated).with_cleanup(Cleanup::on_failure(label, move || {
                if host_path.exists() {
                    std::fs::remove_file(&host_path).with_context(|| {
                        format!("Failed to remove partial output {}", host_path.display())
                    })?;
                }
                Ok(())
            })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::{Outcome, run_cleanups};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn translator() -> PathTranslator {
        PathTranslator::new("/mnt").unwrap()
    }

    #[test]
    fn translates_drive_paths() {
        let t = translator();
        assert_eq!(t.translate(r"C:\Users\me\app").unwrap(), "/mnt/c/Users/me/app");
        assert_eq!(t.translate("D:/data/x.tar").unwrap(), "/mnt/d/data/x.tar");
        assert_eq!(t.translate(r"C:\").unwrap(), "/mnt/c");
        assert_eq!(t.translate("e:").unwrap(), "/mnt/e");
    }

    #[test]
    fn honours_mount_root() {
        let t = PathTranslator::new("/").unwrap();
        assert_eq!(t.translate(r"C:\work").unwrap(), "/c/work");
        let t = PathTranslator::new("/host/").unwrap();
        assert_eq!(t.mount_root(), "/host");
        assert_eq!(t.translate(r"C:\work\").unwrap(), "/host/c/work");
    }

    #[test]
    fn translates_wsl_shares() {
        let t = translator();
        assert_eq!(
            t.translate(r"\\wsl$\rancher-desktop\var\lib").unwrap(),
            "/var/lib"
        );
        assert_eq!(
            t.translate(r"\\WSL.localhost\Ubuntu\home\me").unwrap(),
            "/home/me"
        );
        assert_eq!(t.translate(r"\\wsl$\Ubuntu").unwrap(), "/");
    }

    #[test]
    fn posix_paths_are_unchanged() {
        assert_eq!(translator().translate("/host/path").unwrap(), "/host/path");
    }

    #[test]
    fn rejects_untranslatable_paths() {
        let t = translator();
        assert!(t.translate("").is_err());
        assert!(t.translate("C:relative").is_err());
        assert!(t.translate(r"\\fileserver\share\x").is_err());
    }

    #[test]
    fn relative_paths_use_working_dir() {
        let t = translator();
        assert_eq!(t.translate("src/app").unwrap(), "src/app");

        let t = translator().with_working_dir(r"C:\work\");
        assert_eq!(t.translate(r".\Dockerfile").unwrap(), "/mnt/c/work/Dockerfile");
        assert_eq!(t.translate("sub/dir").unwrap(), "/mnt/c/work/sub/dir");

        let t = translator().with_working_dir("relative");
        assert!(t.translate("x").is_err());
    }

    #[test]
    fn file_path_handler_keeps_stdio_marker() {
        let handler = FilePathHandler::new(Arc::new(translator()));
        assert_eq!(handler.convert("-").unwrap().value, "-");
        let converted = handler.convert(r"C:\compose.yaml").unwrap();
        assert_eq!(converted.value, "/mnt/c/compose.yaml");
        assert!(converted.cleanups.is_empty());
        let failure = handler.convert("C:oops").unwrap_err();
        assert!(format!("{:#}", failure.error).contains("cannot translate file path"));
    }

    #[test]
    fn output_handler_removes_new_file_only_on_failure() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("image.tar");
        let handler = OutputPathHandler::new(Arc::new(translator()));

        let converted = handler.convert(target.to_str().unwrap()).unwrap();
        assert_eq!(converted.value, target.to_str().unwrap());
        assert_eq!(converted.cleanups.len(), 1);
        std::fs::write(&target, "partial").unwrap();
        run_cleanups(converted.cleanups, Outcome::Success);
        assert!(target.exists(), "successful output must be kept");

        let converted = handler
            .convert(temp.path().join("other.tar").to_str().unwrap())
            .unwrap();
        std::fs::write(temp.path().join("other.tar"), "partial").unwrap();
        run_cleanups(converted.cleanups, Outcome::Failure);
        assert!(!temp.path().join("other.tar").exists());
    }

    #[test]
    fn output_handler_cleans_up_relative_path_under_working_dir() {
        let work = TempDir::new().unwrap();
        let translator = translator().with_working_dir(work.path().to_str().unwrap());
        assert_eq!(
            translator.host_path("out/image.tar").unwrap(),
            work.path().join("out/image.tar")
        );
        let handler = OutputPathHandler::new(Arc::new(translator));

        let converted = handler.convert("image.tar").unwrap();
        let target = work.path().join("image.tar");
        assert_eq!(converted.value, target.to_str().unwrap());
        assert_eq!(converted.cleanups.len(), 1);

        std::fs::write(&target, "partial").unwrap();
        run_cleanups(converted.cleanups, Outcome::Failure);
        assert!(!target.exists(), "partial output under the working dir must go");

        // An existing file in the working directory is never scheduled for removal.
        std::fs::write(&target, "kept").unwrap();
        assert!(handler.convert("image.tar").unwrap().cleanups.is_empty());
    }

    #[test]
    fn output_handler_never_removes_existing_file() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("cid");
        std::fs::write(&target, "existing").unwrap();
        let handler = OutputPathHandler::new(Arc::new(translator()));

        let converted = handler.convert(target.to_str().unwrap()).unwrap();
        assert!(converted.cleanups.is_empty());
        assert_eq!(handler.convert("-").unwrap().value, "-");
    }
}

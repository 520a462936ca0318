//! Small helpers for text normalization, log previews and output paths.

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Collapse all whitespace runs to single spaces and trim the ends.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `Some(normalized)` unless the text is blank.
pub fn non_empty(s: &str) -> Option<String> {
    let n = normalize_ws(s);
    (!n.is_empty()).then_some(n)
}

/// Ensure the parent directory of `path` exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file so
/// that permission problems surface before any network work starts.
///
/// # Arguments
///
/// * `path` - Output file path; only its parent directory is checked
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the probe file
/// cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_parent(path: &str) -> Result<(), Box<dyn Error>> {
    let dir = match Path::new(path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;
    let probe_path = dir.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}

/// Records the fields each span was opened with, for asserting on
/// instrumentation in tests.
#[cfg(test)]
pub(crate) mod span_fields {
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing::subscriber::DefaultGuard;
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    type Fields = HashMap<String, String>;

    #[derive(Clone, Default)]
    pub struct SpanFields(Arc<Mutex<HashMap<String, Fields>>>);

    struct Collect<'a>(&'a mut Fields);

    impl Visit for Collect<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: Subscriber> Layer<S> for SpanFields {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            let mut fields = Fields::new();
            attrs.record(&mut Collect(&mut fields));
            self.0
                .lock()
                .unwrap()
                .insert(attrs.metadata().name().to_string(), fields);
        }
    }

    impl SpanFields {
        /// Capture spans on the current thread until the guard drops.
        pub fn install(&self) -> DefaultGuard {
            tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
        }

        /// Recorded value of `field` on the last span named `span`.
        pub fn get(&self, span: &str, field: &str) -> Option<String> {
            self.0.lock().unwrap().get(span)?.get(field).cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let s = "é".repeat(10);
        let result = truncate_for_log(&s, 3);
        assert!(result.starts_with('é'));
        assert!(result.contains("(+18 bytes)"));
    }

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  Office \n\t Manager  "), "Office Manager");
        assert_eq!(normalize_ws("   "), "");
        assert_eq!(non_empty(" \n "), None);
        assert_eq!(non_empty(" Acme  Corp "), Some("Acme Corp".to_string()));
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_creates_dir() {
        let dir = std::env::temp_dir().join(format!("job_harvest_test_{}", std::process::id()));
        let file = dir.join("nested").join("out.jsonl");
        ensure_writable_parent(file.to_str().unwrap()).await.unwrap();
        assert!(dir.join("nested").is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

//! Loading stopword lists from disk / environment.

use std::path::Path;
use webfreq_core::{Error, Result, StopwordSet};

pub const STOPWORDS_FILE_ENV: &str = "WEBFREQ_STOPWORDS_FILE";

pub fn load_stopwords(path: &Path) -> Result<StopwordSet> {
    let txt = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidConfig(format!("stopwords file {}: {e}", path.display())))?;
    let set = StopwordSet::parse(&txt);
    log::debug!("loaded {} stopwords from {}", set.len(), path.display());
    Ok(set)
}

/// Effective stopword set.
///
/// - `replace`: use this file instead of the built-in list
/// - otherwise `WEBFREQ_STOPWORDS_FILE`, if set, replaces the built-in list
/// - `extra`: files whose words are added on top
pub fn resolve_stopwords(replace: Option<&Path>, extra: &[&Path]) -> Result<StopwordSet> {
    let env_path = std::env::var(STOPWORDS_FILE_ENV)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let mut set = match (replace, env_path) {
        (Some(p), _) => load_stopwords(p)?,
        (None, Some(p)) => load_stopwords(Path::new(&p))?,
        (None, None) => StopwordSet::default(),
    };
    for p in extra {
        let more = load_stopwords(p)?;
        set.extend(more.sorted());
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn list_file(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn replace_file_overrides_builtin_list() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var(STOPWORDS_FILE_ENV);
        let f = list_file("# 自定义\n公司\n");
        let set = resolve_stopwords(Some(f.path()), &[]).unwrap();
        assert!(set.contains("公司"));
        assert!(!set.contains("的"));
    }

    #[test]
    fn extra_files_extend_builtin_list() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var(STOPWORDS_FILE_ENV);
        let f = list_file("记者\n报道\n");
        let set = resolve_stopwords(None, &[f.path()]).unwrap();
        assert!(set.contains("的"));
        assert!(set.contains("记者"));
        assert!(set.contains("报道"));
    }

    #[test]
    fn env_file_replaces_builtin_list() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let f = list_file("网站\n");
        std::env::set_var(STOPWORDS_FILE_ENV, f.path());
        let set = resolve_stopwords(None, &[]);
        std::env::remove_var(STOPWORDS_FILE_ENV);
        let set = set.unwrap();
        assert!(set.contains("网站"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_stopwords(Path::new("/nonexistent/stopwords.txt")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}

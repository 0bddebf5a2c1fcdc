use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf, MAIN_SEPARATOR, MAIN_SEPARATOR_STR};
use std::sync::Mutex;

/// Reversible (best-effort) mapping between an absolute project path and the
/// flattened directory-name token used under the projects root.
///
/// Encoding replaces every separator with a dash, which is lossy: a dash in
/// an original directory name is indistinguishable from an encoded
/// separator. Decoding therefore runs through fallback strategies, each
/// consulted only when the previous one fails to name a path that exists.
pub struct ProjectPathCodec {
    cache: Mutex<HashMap<String, PathBuf>>,
}

impl Default for ProjectPathCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectPathCodec {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Flatten an absolute path into a directory-name token. Pure, no
    /// filesystem access.
    pub fn encode(path: &Path) -> String {
        path.to_string_lossy().replace(MAIN_SEPARATOR, "-")
    }

    /// Best-effort inverse of `encode`. The result is cached for the
    /// lifetime of this codec; callers must still verify existence before
    /// relying on it, since the final fallback is the naive inverse whether
    /// or not it exists on disk.
    pub fn decode(&self, token: &str) -> PathBuf {
        if let Some(cached) = self.cache.lock().unwrap().get(token) {
            return cached.clone();
        }

        let decoded = decode_uncached(token);
        self.cache
            .lock()
            .unwrap()
            .insert(token.to_string(), decoded.clone());
        decoded
    }
}

/// Last non-empty path segment, for human-readable project labels.
pub fn project_name(path: &Path) -> String {
    path.to_string_lossy()
        .split(MAIN_SEPARATOR)
        .filter(|part| !part.is_empty())
        .next_back()
        .map(str::to_string)
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn decode_uncached(token: &str) -> PathBuf {
    let naive = PathBuf::from(token.replace('-', MAIN_SEPARATOR_STR));
    if naive.exists() {
        return naive;
    }

    let parts: Vec<&str> = token.split('-').collect();
    let (root, start) = if parts.first() == Some(&"") {
        (PathBuf::from(MAIN_SEPARATOR_STR), 1)
    } else {
        (PathBuf::new(), 0)
    };

    let mut failed = HashSet::new();
    if let Some(found) = merge_search(&parts, start, &root, &mut failed) {
        return found;
    }

    if let Some(found) = prefix_glob_search(&parts, start, &root) {
        return found;
    }

    naive
}

/// Depth-first search over ways to merge consecutive token parts back into
/// single dash-containing directory names, preferring the longest merge at
/// each level. `failed` memoizes (directory, part-index) states that cannot
/// resolve, which keeps pathological many-part tokens from going
/// exponential.
fn merge_search(
    parts: &[&str],
    idx: usize,
    current: &Path,
    failed: &mut HashSet<(PathBuf, usize)>,
) -> Option<PathBuf> {
    if idx == parts.len() {
        return current.exists().then(|| current.to_path_buf());
    }
    if failed.contains(&(current.to_path_buf(), idx)) {
        return None;
    }

    for end in (idx + 1..=parts.len()).rev() {
        let segment = parts[idx..end].join("-");
        let candidate = current.join(&segment);
        let viable = if end == parts.len() {
            candidate.exists()
        } else {
            candidate.is_dir()
        };
        if viable {
            if let Some(found) = merge_search(parts, end, &candidate, failed) {
                return Some(found);
            }
        }
    }

    failed.insert((current.to_path_buf(), idx));
    None
}

/// Extend a known-good prefix one part at a time; once extension fails,
/// treat the rest of the token as one ambiguous directory name and look for
/// exactly one directory under the prefix matching the parts joined by
/// wildcards. Catches names where the external encoder flattened characters
/// other than separators.
fn prefix_glob_search(parts: &[&str], start: usize, root: &Path) -> Option<PathBuf> {
    let mut prefix = root.to_path_buf();
    let mut idx = start;
    while idx < parts.len() && prefix.join(parts[idx]).is_dir() {
        prefix = prefix.join(parts[idx]);
        idx += 1;
    }
    if idx >= parts.len() {
        return None;
    }

    let pattern = parts[idx..].join("*");
    let entries = std::fs::read_dir(&prefix).ok()?;

    let mut matches = Vec::new();
    for entry in entries.flatten() {
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if glob_match(&name, &pattern) {
            matches.push(name);
        }
    }

    // Anything other than exactly one candidate is ambiguous.
    if matches.len() == 1 {
        Some(prefix.join(&matches[0]))
    } else {
        None
    }
}

/// Simple glob matching: `*` matches any sequence of characters.
fn glob_match(text: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return text == pattern;
    }

    let mut pos = 0;

    // First part must match at start
    if !parts[0].is_empty() {
        if !text.starts_with(parts[0]) {
            return false;
        }
        pos = parts[0].len();
    }

    // Last part must match at end
    let last = parts[parts.len() - 1];
    if !last.is_empty() && !text.ends_with(last) {
        return false;
    }

    // Middle parts must appear in order
    for &part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(idx) = text[pos..].find(part) {
            pos += idx + part.len();
        } else {
            return false;
        }
    }

    true
}

// Name and path helpers shared by the analyzers

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::constants::PATH_SEPARATOR;

/// Regex compiled on first use. Patterns are literals, so `None` only
/// shows up if a literal is malformed, and matching then yields nothing.
pub type LazyRegex = LazyLock<Option<Regex>>;

pub fn captures<'t>(re: &LazyRegex, text: &'t str) -> Option<Captures<'t>> {
    re.as_ref().and_then(|re| re.captures(text))
}

pub fn is_match(re: &LazyRegex, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// Compile a static pattern table, dropping anything that fails to compile.
pub fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

/// Text of capture group `n`, or the empty string.
pub fn group<'t>(caps: &Captures<'t>, n: usize) -> &'t str {
    caps.get(n).map(|m| m.as_str()).unwrap_or("")
}

/// Name without its final `.ext` (a leading or trailing dot is kept).
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[..idx],
        _ => name,
    }
}

/// Lowercase extension without the dot.
pub fn extension(name: &str) -> Option<String> {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => Some(name[idx + 1..].to_lowercase()),
        _ => None,
    }
}

/// Directory part of a `/`-separated path (empty for a bare name).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind(PATH_SEPARATOR) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Non-empty `/`-separated segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Trim leading/trailing slashes and unify separators.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

/// Number of leading path segments two paths have in common. Empty parts
/// (a leading slash, doubled separators) are not segments.
pub fn shared_leading_parts(a: &str, b: &str) -> usize {
    segments(a)
        .into_iter()
        .zip(segments(b))
        .take_while(|(x, y)| x == y)
        .count()
}

/// Character-level edit distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// 1 - distance / longest length, 0 when both are empty.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("A001_C001_000.R3D"), "A001_C001_000");
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension("trailing."), "trailing.");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("clip.MOV").as_deref(), Some("mov"));
        assert_eq!(extension("noext"), None);
    }

    #[test]
    fn test_shared_leading_parts_ignores_leading_slash() {
        assert_eq!(shared_leading_parts("/Projects/Shoot/a.mov", "/Projects/Shoot/b.mp4"), 2);
        assert_eq!(shared_leading_parts("Projects/Shoot/a.mov", "/Projects/Shoot/b.mp4"), 2);
        assert_eq!(shared_leading_parts("/Root/ProjectA/Scene1.mp4", "/Root/ProjectB/Scene9.mp4"), 1);
        assert_eq!(shared_leading_parts("ProjectA/Scene1.mp4", "ProjectB/Scene9.mp4"), 0);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/Shoot/A001/clip.mov/"), "Shoot/A001/clip.mov");
        assert_eq!(normalize_path("\\Shoot\\clip.mov"), "Shoot/clip.mov");
    }

    #[test]
    fn test_jaccard_empty_sets() {
        let empty = BTreeSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }
}

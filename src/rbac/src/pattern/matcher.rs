//! Segment matcher for dot-separated permission names

use std::num::NonZeroUsize;
use std::sync::LazyLock;

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Segment separator for names and patterns
const SEPARATOR: char = '.';

/// Trailing wildcard matching the remainder of a name
const DOUBLE_WILDCARD: &str = "**";

/// Maximum number of compiled expressions kept
pub const REGEX_CACHE_CAPACITY: usize = 256;

/// Compiled `%r{...}` expressions, keyed by source, least recently used
/// evicted first
static REGEX_CACHE: LazyLock<Mutex<LruCache<String, Regex>>> = LazyLock::new(|| {
    let capacity = NonZeroUsize::new(REGEX_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
    Mutex::new(LruCache::new(capacity))
});

/// Errors that can occur while matching a pattern
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    /// `**` used anywhere but the last segment
    #[error("invalid pattern: ** must be at the end -> {0}")]
    DoubleWildcardNotLast(String),

    /// `%r{...}` segment with an expression that does not compile
    #[error("invalid pattern: bad regular expression `{pattern}`: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Matches a dot-separated name against a pattern
///
/// The walk is a single left-to-right pass over both strings; the number of
/// segments has to agree unless the pattern ends with `**`.
///
/// # Errors
///
/// Returns [`PatternError`] if `**` is not the final segment or a regular
/// expression segment does not compile.
pub fn match_name(pattern: &str, name: &str) -> Result<bool, PatternError> {
    if pattern == "*" || pattern == DOUBLE_WILDCARD {
        return Ok(true);
    }

    // `**` is only legal as the final segment
    if pattern
        .split(SEPARATOR)
        .rev()
        .skip(1)
        .any(|part| part == DOUBLE_WILDCARD)
    {
        return Err(PatternError::DoubleWildcardNotLast(pattern.to_string()));
    }

    let mut parts = pattern.split(SEPARATOR);
    let mut names = name.split(SEPARATOR);

    loop {
        match (parts.next(), names.next()) {
            (None, None) => return Ok(true),
            (None, Some(_)) | (Some(_), None) => return Ok(false),
            (Some(DOUBLE_WILDCARD), Some(_)) => return Ok(true),
            (Some(part), Some(segment)) => {
                if !match_segment(part, segment)? {
                    return Ok(false);
                }
            }
        }
    }
}

/// Returns true if the name matches any of the patterns
///
/// Pattern errors are treated as "no match".
pub fn match_any(name: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| match match_name(pattern, name) {
        Ok(matched) => matched,
        Err(err) => {
            debug!(pattern, name, error = %err, "pattern ignored");
            false
        }
    })
}

/// Matches a resource-scoped name against patterns
///
/// Every pattern is tried as an absolute name (`app.User.view`) and as a
/// name local to the resource (`view`).
pub fn match_resource_pattern(resource_name: &str, local_name: &str, patterns: &[&str]) -> bool {
    let full_name = format!("{resource_name}{SEPARATOR}{local_name}");
    patterns.iter().any(|pattern| {
        let local_pattern = format!("{resource_name}{SEPARATOR}{pattern}");
        match_any(&full_name, &[*pattern]) || match_any(&full_name, &[local_pattern.as_str()])
    })
}

/// Matches a single segment
fn match_segment(part: &str, segment: &str) -> Result<bool, PatternError> {
    if part == "*" {
        return Ok(true);
    }

    if let Some(expr) = part.strip_prefix("%r{").and_then(|p| p.strip_suffix('}')) {
        return compiled(expr).map(|re| re.is_match(segment));
    }

    if let Some(alternatives) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
        if alternatives.split('|').any(|alt| alt == segment) {
            return Ok(true);
        }
    }

    Ok(match_chars(part, segment))
}

/// Character-wise comparison where `?` matches any single character
fn match_chars(part: &str, segment: &str) -> bool {
    if part == segment {
        return true;
    }

    let mut expected = part.chars();
    let mut actual = segment.chars();
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return true,
            (Some(e), Some(a)) if e == '?' || e == a => continue,
            _ => return false,
        }
    }
}

/// Fetches a compiled expression from the cache, compiling it on first use
fn compiled(expr: &str) -> Result<Regex, PatternError> {
    if let Some(re) = REGEX_CACHE.lock().get(expr) {
        return Ok(re.clone());
    }

    // Compile outside the lock
    let re = Regex::new(expr).map_err(|source| PatternError::InvalidRegex {
        pattern: expr.to_string(),
        source,
    })?;
    REGEX_CACHE.lock().put(expr.to_string(), re.clone());

    Ok(re)
}

/// Clear the compiled expression cache
pub fn clear_regex_cache() {
    REGEX_CACHE.lock().clear();
}

/// Number of compiled expressions currently cached
pub fn regex_cache_len() -> usize {
    REGEX_CACHE.lock().len()
}

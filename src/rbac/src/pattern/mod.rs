//! Permission name pattern matching
//!
//! Permission names are dot-separated (`app.User.view.owner`). Patterns use
//! the same segmentation with a few extensions:
//!
//! - `*` or `**` as the whole pattern matches any name
//! - `*` matches exactly one segment
//! - `**` matches the rest of the name and must be the final segment
//! - `{a|b|c}` matches one of the listed segments
//! - `%r{expr}` matches a segment against a regular expression
//! - `?` matches any single character within a segment
//!
//! # Examples
//!
//! ```
//! use cretoai_rbac::pattern::{match_any, match_name};
//!
//! assert!(match_name("app.*.view", "app.User.view").unwrap());
//! assert!(match_name("app.**", "app.User.view.owner").unwrap());
//! assert!(match_any("app.User.edit", &["app.*.view", "app.User.{edit|delete}"]));
//! ```

mod matcher;

#[cfg(test)]
mod tests;

pub use matcher::{
    clear_regex_cache, match_any, match_name, match_resource_pattern, regex_cache_len, PatternError,
    REGEX_CACHE_CAPACITY,
};

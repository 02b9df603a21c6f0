/// Test suite for the pattern matcher
///
/// Tests cover:
/// - Exact and wildcard matching
/// - Alternation, regular expression and `?` segments
/// - Pattern syntax errors
/// - Resource-scoped matching

use super::*;
use proptest::prelude::*;

// ============================================================================
// Wildcards
// ============================================================================

#[test]
fn test_universal_patterns() {
    for name in ["test", "test.it", "test.it.admin", ""] {
        assert!(match_name("*", name).unwrap());
        assert!(match_name("**", name).unwrap());
    }
}

#[test]
fn test_single_wildcard() {
    assert!(match_name("a.*.c", "a.b.c").unwrap());
    assert!(!match_name("a.*.c", "a.b.b.c").unwrap());
    assert!(match_name("test.*", "test.it").unwrap());
    assert!(match_name("test.*.*", "test.it.owner").unwrap());
    assert!(!match_name("test.*.owner", "test.it.admin").unwrap());
    assert!(!match_name("test.*.*.*", "test.goo.admin").unwrap());
}

#[test]
fn test_double_wildcard() {
    assert!(match_name("a.**", "a.b.c.d").unwrap());
    assert!(match_name("test.**", "test.it.admin").unwrap());
    assert!(match_name("test.*.**", "test.it.admin").unwrap());
    assert!(!match_name("other.**", "test.it.admin").unwrap());
    // `**` still needs a segment to consume
    assert!(!match_name("a.**", "a").unwrap());
}

#[test]
fn test_exact_match() {
    assert!(match_name("test", "test").unwrap());
    assert!(!match_name("test", "test.it").unwrap());
    assert!(!match_name("test.it", "test").unwrap());
    assert!(!match_name("test.permission.*", "test.it.admin").unwrap());
}

// ============================================================================
// Segment syntax
// ============================================================================

#[test]
fn test_alternation() {
    assert!(match_name("a.{x|y}.c", "a.y.c").unwrap());
    assert!(!match_name("a.{x|y}.c", "a.z.c").unwrap());
    assert!(match_name("test.{foo|boo|it}.{owner|admin}", "test.boo.admin").unwrap());
}

#[test]
fn test_regex_segment() {
    assert!(match_name("a.%r{[0-9]+}", "a.42").unwrap());
    assert!(!match_name("a.%r{[0-9]+}", "a.x").unwrap());
    assert!(match_name("test.%r{[a-z]*}.%r{(admin|[0-9]+)}", "test.goo.admin").unwrap());
}

#[test]
fn test_question_mark() {
    assert!(match_name("test.??.admin", "test.es.admin").unwrap());
    assert!(!match_name("test.??.owner", "test.es.admin").unwrap());
    // Lengths have to agree
    assert!(!match_name("test.???.admin", "test.es.admin").unwrap());
}

#[test]
fn test_empty_pattern_segment() {
    assert!(!match_name("a..c", "a.b.c").unwrap());
    assert!(!match_name("", "a").unwrap());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_double_wildcard_not_last() {
    assert!(matches!(
        match_name("a.**.b", "a.x.b"),
        Err(PatternError::DoubleWildcardNotLast(_))
    ));
    assert!(matches!(
        match_name("a.**.b", "z.x.b"),
        Err(PatternError::DoubleWildcardNotLast(_))
    ));
}

#[test]
fn test_invalid_regex() {
    let result = match_name("a.%r{[0-9}", "a.1");
    assert!(matches!(result, Err(PatternError::InvalidRegex { .. })));
}

#[test]
fn test_match_any_ignores_errors() {
    assert!(!match_any("a.x.b", &["a.**.b"]));
    assert!(match_any("a.x.b", &["a.**.b", "a.*.b"]));
    assert!(!match_any("a.x.b", &[]));
}

// ============================================================================
// Regex cache
// ============================================================================

#[test]
fn test_regex_cache_is_bounded() {
    for i in 0..REGEX_CACHE_CAPACITY * 4 {
        let pattern = format!("doc.%r{{^id{i}$}}");
        assert!(match_name(&pattern, &format!("doc.id{i}")).unwrap());
        assert!(regex_cache_len() <= REGEX_CACHE_CAPACITY);
    }
}

#[test]
fn test_regex_cache_clear() {
    assert!(match_name("doc.%r{^v[0-9]+$}", "doc.v12").unwrap());
    clear_regex_cache();
    // Compiled again on the next use
    assert!(match_name("doc.%r{^v[0-9]+$}", "doc.v12").unwrap());
    assert!(!match_name("doc.%r{^v[0-9]+$}", "doc.x").unwrap());
}

// ============================================================================
// Multiple and resource patterns
// ============================================================================

#[test]
fn test_match_any() {
    assert!(match_any("test", &["test", "test2"]));
    assert!(match_any("test.it", &["test.*", "test2"]));
    assert!(match_any("test.it.owner", &["test.*.*", "test2.*"]));
    assert!(!match_any("test.it.admin", &["test.*.owner"]));
}

#[test]
fn test_match_resource_pattern() {
    assert!(match_resource_pattern("test.Object", "owner", &["*"]));
    assert!(match_resource_pattern("test.Object", "register.owner", &["register.*"]));
    assert!(match_resource_pattern(
        "test.Object",
        "register.owner",
        &["test.Object.register.*"]
    ));
    assert!(!match_resource_pattern("test.Object", "register.owner", &["other.*"]));
    assert!(!match_resource_pattern("test.Object", "view", &["test.Other.view"]));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_universal_patterns_match(name in "[a-z]{1,8}(\\.[a-z]{1,8}){0,5}") {
        prop_assert!(match_name("*", &name).unwrap());
        prop_assert!(match_name("**", &name).unwrap());
    }

    #[test]
    fn prop_name_matches_itself(name in "[a-zA-Z0-9_]{1,8}(\\.[a-zA-Z0-9_]{1,8}){0,5}") {
        prop_assert!(match_name(&name, &name).unwrap());
    }

    #[test]
    fn prop_trailing_double_wildcard_matches_extensions(
        prefix in "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}",
        suffix in "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}",
    ) {
        let pattern = format!("{prefix}.**");
        let name = format!("{prefix}.{suffix}");
        prop_assert!(match_name(&pattern, &name).unwrap());
        prop_assert!(!match_name(&pattern, &prefix).unwrap());
    }

    #[test]
    fn prop_single_wildcard_keeps_segment_count(
        head in "[a-z]{1,8}",
        middle in "[a-z]{1,8}",
        tail in "[a-z]{1,8}",
    ) {
        let pattern = format!("{head}.*.{tail}");
        let exact = format!("{head}.{middle}.{tail}");
        prop_assert!(match_name(&pattern, &exact).unwrap());
        let longer = format!("{head}.{middle}.{middle}.{tail}");
        prop_assert!(!match_name(&pattern, &longer).unwrap());
    }
}

//! Pure functions over scope strings (spec.md §4.2).
//!
//! A scope is a colon-separated string. The leading segment is conventionally
//! one of the reserved tokens (`tab`, `route`, `session`, `global`) but any
//! string is a legal scope — `room:lobby`, `stock:AAPL`. A `*` anywhere in the
//! string makes it a wildcard pattern matched against concrete scopes.

use regex::Regex;

pub const TAB: &str = "tab";
pub const ROUTE: &str = "route";
pub const SESSION: &str = "session";
pub const GLOBAL: &str = "global";

const BUILT_INS: [&str; 4] = [TAB, ROUTE, SESSION, GLOBAL];

/// Join segments with `:`.
pub fn build(parts: &[&str]) -> String {
    parts.join(":")
}

/// Split a scope string on `:`.
pub fn parse(scope: &str) -> Vec<&str> {
    scope.split(':').collect()
}

/// True iff `scope` is exactly one of the four reserved leading tokens.
pub fn is_built_in(scope: &str) -> bool {
    BUILT_INS.contains(&scope)
}

/// `route:<route>`.
pub fn route_scope(route: &str) -> String {
    build(&[ROUTE, route])
}

/// Exact match, or (if `pattern` contains `*`) glob match where `*` stands
/// for any run of characters and every other regex metacharacter in
/// `pattern` is escaped literally.
pub fn matches(scope: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return scope == pattern;
    }
    let mut regex_src = String::with_capacity(pattern.len() + 2);
    regex_src.push('^');
    for part in pattern.split('*') {
        regex_src.push_str(&regex::escape(part));
        regex_src.push_str(".*");
    }
    // split('*') produces one trailing ".*" too many; trim it back off.
    regex_src.truncate(regex_src.len() - 2);
    regex_src.push('$');
    Regex::new(&regex_src)
        .map(|re| re.is_match(scope))
        .unwrap_or(false)
}

/// True if `scope` is `route` itself, or `route:<route_arg>` when `route` is
/// given (or any `route:*` when `route` is `None`).
pub fn is_route_based(scope: &str, route: Option<&str>) -> bool {
    if scope == ROUTE {
        return true;
    }
    let mut segments = parse(scope);
    if segments.is_empty() || segments.remove(0) != ROUTE {
        return false;
    }
    match route {
        None => true,
        Some(r) => segments.first().copied() == Some(r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_joins_with_colon() {
        assert_eq!(build(&["room", "lobby"]), "room:lobby");
    }

    #[test]
    fn parse_splits_on_colon() {
        assert_eq!(parse("room:lobby"), vec!["room", "lobby"]);
        assert_eq!(parse("global"), vec!["global"]);
    }

    #[test]
    fn is_built_in_recognizes_reserved_tokens() {
        assert!(is_built_in("tab"));
        assert!(is_built_in("global"));
        assert!(!is_built_in("room:lobby"));
    }

    #[test]
    fn route_scope_prefixes_route() {
        assert_eq!(route_scope("/users"), "route:/users");
    }

    #[test]
    fn matches_exact_string_without_wildcard() {
        assert!(matches("room:lobby", "room:lobby"));
        assert!(!matches("room:lobby", "room:other"));
    }

    #[test]
    fn matches_wildcard_glob() {
        assert!(matches("room:lobby", "room:*"));
        assert!(matches("room:", "room:*"));
        assert!(!matches("stock:AAPL", "room:*"));
    }

    #[test]
    fn matches_escapes_other_metacharacters() {
        // A literal '.' in the pattern must not act as regex "any char".
        assert!(!matches("roomXlobby", "room.lobby*"));
        assert!(matches("room.lobby-extra", "room.lobby*"));
    }

    #[test]
    fn is_route_based_bare_route() {
        assert!(is_route_based(ROUTE, None));
        assert!(is_route_based(ROUTE, Some("/users")));
    }

    #[test]
    fn is_route_based_with_suffix() {
        assert!(is_route_based("route:/users", None));
        assert!(is_route_based("route:/users", Some("/users")));
        assert!(!is_route_based("route:/users", Some("/other")));
        assert!(!is_route_based("room:lobby", None));
    }
}

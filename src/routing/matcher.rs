//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request method against an entry's method set (`*` = all)
//! - Match the request path by prefix (`path`) or whole-path pattern
//!   (`path_pattern`)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Methods are compared case-sensitively (RFC 9110)
//! - Query strings never take part in path matching
//! - No regex: patterns are compiled into segment lists once per descriptor

use axum::http::Method;

use crate::registry::RoutingEntry;

/// Trait for matching a request (method + path) against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, method: &Method, path: &str) -> bool;
}

/// Matches the request method against a method set.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    any: bool,
    methods: Vec<String>,
}

impl MethodMatcher {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let methods: Vec<String> = methods.into_iter().map(Into::into).collect();
        Self {
            any: methods.iter().any(|m| m == "*"),
            methods,
        }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, method: &Method, _path: &str) -> bool {
        self.any || self.methods.iter().any(|m| m == method.as_str())
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, _method: &Method, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    /// `{name}`: one or more characters up to the next `/`.
    Segment,
    /// `*`: any run of characters, including `/`.
    Any,
}

/// Matches the whole path against a pattern such as `/users/{id}/*`.
#[derive(Debug, Clone)]
pub struct PathPatternMatcher {
    tokens: Vec<Token>,
}

impl PathPatternMatcher {
    pub fn new(pattern: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    // Skip the variable name.
                    for inner in chars.by_ref() {
                        if inner == '}' {
                            break;
                        }
                    }
                    tokens.push(Token::Segment);
                }
                '*' => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(Token::Any);
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Self { tokens }
    }

    /// Walk the tokens once, carrying the set of byte offsets in `path`
    /// reachable after each token. Cost is bounded by tokens x path length.
    fn match_path(&self, path: &str) -> bool {
        let bytes = path.as_bytes();
        let len = path.len();
        let mut reachable = vec![false; len + 1];
        reachable[0] = true;

        for token in &self.tokens {
            let mut next = vec![false; len + 1];
            match token {
                Token::Literal(lit) => {
                    for pos in (0..=len).filter(|&pos| reachable[pos]) {
                        if path[pos..].starts_with(lit.as_str()) {
                            next[pos + lit.len()] = true;
                        }
                    }
                }
                Token::Segment => {
                    // `open` while some reachable offset precedes `pos` with
                    // no '/' in between.
                    let mut open = false;
                    for pos in 0..=len {
                        if open && path.is_char_boundary(pos) {
                            next[pos] = true;
                        }
                        if pos == len {
                            break;
                        }
                        if bytes[pos] == b'/' {
                            open = false;
                        } else if reachable[pos] {
                            open = true;
                        }
                    }
                }
                Token::Any => {
                    if let Some(first) = reachable.iter().position(|&r| r) {
                        for pos in (first..=len).filter(|&pos| path.is_char_boundary(pos)) {
                            next[pos] = true;
                        }
                    }
                }
            }
            if !next.iter().any(|&r| r) {
                return false;
            }
            reachable = next;
        }

        reachable[len]
    }
}

impl Matcher for PathPatternMatcher {
    fn matches(&self, _method: &Method, path: &str) -> bool {
        self.match_path(path)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, method: &Method, path: &str) -> bool {
        !self.matchers.is_empty() && self.matchers.iter().all(|m| m.matches(method, path))
    }
}

/// Compile a routing entry into a matcher.
///
/// `path_pattern` wins over `path` when an entry declares both. An entry
/// with neither never matches.
pub fn compile(entry: &RoutingEntry) -> AndMatcher {
    let path: Option<Box<dyn Matcher>> = match (&entry.path_pattern, &entry.path) {
        (Some(pattern), _) => Some(Box::new(PathPatternMatcher::new(pattern))),
        (None, Some(prefix)) => Some(Box::new(PathPrefixMatcher::new(prefix.clone()))),
        (None, None) => None,
    };

    match path {
        Some(path) => AndMatcher::new(vec![
            Box::new(MethodMatcher::new(entry.methods.iter().cloned())),
            path,
        ]),
        None => AndMatcher::new(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_matcher() {
        let matcher = MethodMatcher::new(["GET", "POST"]);
        assert!(matcher.matches(&Method::GET, "/"));
        assert!(matcher.matches(&Method::POST, "/"));
        assert!(!matcher.matches(&Method::DELETE, "/"));

        let wildcard = MethodMatcher::new(["*"]);
        assert!(wildcard.matches(&Method::PATCH, "/"));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");
        assert!(matcher.matches(&Method::GET, "/api/v1"));
        assert!(!matcher.matches(&Method::GET, "/images"));
    }

    #[test]
    fn test_path_pattern_matcher() {
        let matcher = PathPatternMatcher::new("/users/{id}");
        assert!(matcher.matches(&Method::GET, "/users/17"));
        assert!(!matcher.matches(&Method::GET, "/users/17/notes"));
        assert!(!matcher.matches(&Method::GET, "/users/"));

        let suffix = PathPatternMatcher::new("/files/{name}.json");
        assert!(suffix.matches(&Method::GET, "/files/report.json"));
        assert!(!suffix.matches(&Method::GET, "/files/report.xml"));

        let any = PathPatternMatcher::new("/notes*");
        assert!(any.matches(&Method::GET, "/notes"));
        assert!(any.matches(&Method::GET, "/notes/1/comments"));
        assert!(!any.matches(&Method::GET, "/note"));

        let nested = PathPatternMatcher::new("/users/{id}/notes/*");
        assert!(nested.matches(&Method::GET, "/users/7/notes/"));
        assert!(nested.matches(&Method::GET, "/users/7/notes/1/2"));
        assert!(!nested.matches(&Method::GET, "/users//notes/1"));
    }

    #[test]
    fn test_path_pattern_long_path_is_linear() {
        let matcher = PathPatternMatcher::new("/*a*a*a*b");
        let path = format!("/{}", "a".repeat(20_000));

        let start = std::time::Instant::now();
        assert!(!matcher.matches(&Method::GET, &path));
        assert!(start.elapsed() < std::time::Duration::from_secs(2));

        assert!(matcher.matches(&Method::GET, &format!("{path}b")));
        assert!(PathPatternMatcher::new("/{a}{b}").matches(&Method::GET, "/xy"));
        assert!(!PathPatternMatcher::new("/{a}{b}").matches(&Method::GET, "/x"));
    }

    #[test]
    fn test_compile_entry() {
        let entry: RoutingEntry = toml::from_str(
            r#"
            methods = ["GET"]
            path = "/foo"
            "#,
        )
        .unwrap();
        let matcher = compile(&entry);
        assert!(matcher.matches(&Method::GET, "/foo/bar"));
        assert!(!matcher.matches(&Method::PUT, "/foo"));

        let pathless: RoutingEntry = toml::from_str(r#"methods = ["*"]"#).unwrap();
        assert!(!compile(&pathless).matches(&Method::GET, "/"));
    }
}

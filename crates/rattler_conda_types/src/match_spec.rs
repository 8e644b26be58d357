//! A deliberately small match-spec: a predicate over package identity,
//! evaluated by [`crate::PackageRecord`]-shaped queries.
//!
//! Conda's real `MatchSpec` grammar (version ranges, build-string globs,
//! `[key=value]` feature brackets) is out of scope here; the cache only
//! needs name/version/build globbing with `*` wildcards, which is all the
//! scanner and planner ever ask of it.

use regex::Regex;

/// A glob-style predicate over `name`, `version`, and `build_string`.
///
/// Any field left as `None` matches anything.
#[derive(Debug, Clone)]
pub struct MatchSpec {
    pub name: Option<GlobPattern>,
    pub version: Option<GlobPattern>,
    pub build_string: Option<GlobPattern>,
}

impl MatchSpec {
    /// Parses a spec of the form `name`, `name-version`, or
    /// `name-version-build`, where each component may contain `*` wildcards.
    pub fn parse(spec: &str) -> Self {
        let mut parts = spec.splitn(3, '-');
        let name = parts.next().filter(|s| !s.is_empty()).map(GlobPattern::new);
        let version = parts.next().map(GlobPattern::new);
        let build_string = parts.next().map(GlobPattern::new);
        Self {
            name,
            version,
            build_string,
        }
    }

    /// Returns whether `(name, version, build_string)` satisfies this spec.
    pub fn matches(&self, name: &str, version: &str, build_string: &str) -> bool {
        self.name.as_ref().map_or(true, |p| p.matches(name))
            && self.version.as_ref().map_or(true, |p| p.matches(version))
            && self
                .build_string
                .as_ref()
                .map_or(true, |p| p.matches(build_string))
    }
}

/// A compiled `*`-glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Self {
        let mut regex_src = String::from("^");
        for part in pattern.split('*') {
            if !regex_src.ends_with('^') {
                regex_src.push_str(".*");
            }
            regex_src.push_str(&regex::escape(part));
        }
        regex_src.push('$');
        Self {
            regex: Regex::new(&regex_src).expect("glob-derived regex is always valid"),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

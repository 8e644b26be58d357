//! Requirement-string parsing and marker evaluation.

use lazy_regex::regex;

/// `(name, extras, constraints, marker, url)`, the fields a `Requires-Dist`
/// header line carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub constraints: String,
    pub marker: String,
    pub url: String,
}

/// Parses one `Requires-Dist`-style line into its components.
///
/// Mirrors the upstream parser's tolerant approach: malformed input yields
/// a best-effort `Requirement` rather than an error, since metadata in the
/// wild is not always spec-conformant.
pub fn parse_requirement(spec: &str) -> Requirement {
    let collapsed = spec.split_whitespace().collect::<Vec<_>>().join(" ");
    let (spec, marker) = split_on_last(&collapsed, ';');
    let (spec, url) = split_on_last(&spec, '@');

    let mut name = spec.trim().to_string();
    let mut extras = Vec::new();
    let mut constraints = String::new();

    let pattern = regex!(
        r"(?xi)
        ^(?P<name>[A-Z0-9][A-Z0-9._-]*)?
        \s?
        (\[(?P<extras>.*?)\])?
        \s?
        (?P<constraints>\(?\s?[\w\d<>=!~,\s.*]*\s?\)?)?
        \s?$"
    );
    if let Some(caps) = pattern.captures(spec.trim()) {
        if let Some(m) = caps.name("name") {
            name = norm_package_name(m.as_str());
        }
        if let Some(m) = caps.name("extras") {
            extras = m
                .as_str()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(m) = caps.name("constraints") {
            let trimmed = m.as_str().split_whitespace().collect::<String>();
            constraints = trimmed
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .unwrap_or(&trimmed)
                .to_string();
        }
    }

    Requirement {
        name,
        extras,
        constraints,
        marker: marker.trim().to_string(),
        url: url.trim().to_string(),
    }
}

fn split_on_last(spec: &str, sep: char) -> (String, String) {
    match spec.rsplit_once(sep) {
        Some((head, tail)) => (head.trim().to_string(), tail.trim().to_string()),
        None => (spec.trim().to_string(), String::new()),
    }
}

fn norm_package_name(name: &str) -> String {
    name.replace(['.', '_'], "-").to_lowercase()
}

/// Evaluates a marker expression against `python_version`. Supports the
/// common `python_version <op> "X.Y"` comparisons joined by `and`/`or`
/// (left-to-right, `and` binds tighter); any other marker variable is
/// treated as unknown and makes its clause evaluate to `false`.
pub fn evaluate_marker(marker: &str, python_version: &str) -> bool {
    if marker.trim().is_empty() {
        return true;
    }
    marker
        .split(" or ")
        .any(|conjunction| conjunction.split(" and ").all(|clause| eval_clause(clause.trim(), python_version)))
}

fn eval_clause(clause: &str, python_version: &str) -> bool {
    let clause = clause.trim_matches(|c| c == '(' || c == ')').trim();
    let Some((lhs, op, rhs)) = split_comparison(clause) else {
        return false;
    };
    if lhs.trim() != "python_version" {
        return false;
    }
    let rhs = rhs.trim().trim_matches(['\'', '"']);
    compare_versions(python_version, op, rhs)
}

fn split_comparison<'a>(clause: &'a str) -> Option<(&'a str, &'a str, &'a str)> {
    for op in ["==", "!=", ">=", "<=", ">", "<"] {
        if let Some(idx) = clause.find(op) {
            return Some((&clause[..idx], op, &clause[idx + op.len()..]));
        }
    }
    None
}

fn compare_versions(lhs: &str, op: &str, rhs: &str) -> bool {
    let parse = |s: &str| -> Vec<u64> { s.split('.').filter_map(|p| p.parse().ok()).collect() };
    let (a, b) = (parse(lhs), parse(rhs));
    let ordering = a.cmp(&b);
    match op {
        "==" => ordering.is_eq(),
        "!=" => ordering.is_ne(),
        ">=" => ordering.is_ge(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        "<" => ordering.is_lt(),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_name_extras_and_constraints() {
        let r = parse_requirement("requests[security]>=3.3.0; python_version >= '2.7'");
        assert_eq!(r.name, "requests");
        assert_eq!(r.extras, vec!["security".to_string()]);
        assert_eq!(r.constraints, ">=3.3.0");
        assert_eq!(r.marker, "python_version >= '2.7'");
    }

    #[test]
    fn parses_url_requirement() {
        let r = parse_requirement("pkg @ https://example.com/pkg.whl");
        assert_eq!(r.name, "pkg");
        assert_eq!(r.url, "https://example.com/pkg.whl");
    }

    #[test]
    fn marker_gates_on_python_version() {
        assert!(evaluate_marker("python_version >= '3.8'", "3.10"));
        assert!(!evaluate_marker("python_version >= '3.8'", "3.6"));
        assert!(evaluate_marker("", "3.10"));
    }
}

//! `PackageRef`, the identity tuple entries and queries are keyed on.

use std::fmt;

use rattler_conda_types::Version;
use url::Url;

/// A reference to a package, as a client would name one.
///
/// Equality and ordering are over `(channel, name, version, build_string,
/// build_number)` only — `subdir`, `filename`, `md5`, `size` and `url` are
/// side-channel attributes carried along for planning, not part of identity.
#[derive(Debug, Clone)]
pub struct PackageRef {
    pub channel: String,
    pub name: String,
    pub version: Version,
    pub build_string: String,
    pub build_number: u64,
    pub subdir: Option<String>,
    pub filename: Option<String>,
    pub md5: Option<String>,
    pub size: Option<u64>,
    pub url: Option<Url>,
}

impl PackageRef {
    fn identity(&self) -> (&str, &str, &Version, &str, u64) {
        (
            &self.channel,
            &self.name,
            &self.version,
            &self.build_string,
            self.build_number,
        )
    }

    /// `"<channel>::<name>-<version>-<build>"`, stable across process runs.
    pub fn dist_str(&self) -> String {
        format!(
            "{}::{}-{}-{}",
            self.channel, self.name, self.version, self.build_string
        )
    }

    /// [`Self::dist_str`] with the channel prefix stripped, used to tolerate
    /// refs whose channel provenance is unknown (`entry_to_link`'s fallback
    /// scan).
    pub fn dist_str_no_channel(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.build_string)
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dist_str())
    }
}

impl PartialEq for PackageRef {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for PackageRef {}

impl std::hash::Hash for PackageRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for PackageRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.identity().cmp(&other.identity())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make(name: &str, md5: Option<&str>) -> PackageRef {
        PackageRef {
            channel: "defaults".into(),
            name: name.into(),
            version: "1.0".parse().unwrap(),
            build_string: "0".into(),
            build_number: 0,
            subdir: None,
            filename: None,
            md5: md5.map(str::to_owned),
            size: None,
            url: None,
        }
    }

    #[test]
    fn equality_ignores_side_channel_fields() {
        let a = make("x", Some("abc"));
        let b = make("x", Some("def"));
        assert_eq!(a, b);
    }

    #[test]
    fn dist_str_strips_channel_when_requested() {
        let r = make("x", None);
        assert_eq!(r.dist_str(), "defaults::x-1.0-0");
        assert_eq!(r.dist_str_no_channel(), "x-1.0-0");
    }
}

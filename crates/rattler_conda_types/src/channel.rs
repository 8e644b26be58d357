//! Channel identification, derived from a package URL.
//!
//! The cache stores packages under `<root>/<channel-safe-name>/<subdir>/...`.
//! The "safe name" is a filesystem-friendly rendering of the
//! channel portion of a URL: the host plus every path segment that isn't the
//! platform subdir or the filename itself.

use url::Url;

/// A small set of recognized conda platform subdirs. A URL's second-to-last
/// path segment is only treated as a `subdir` if it looks like one of
/// these (or matches the generic `<os>-<arch>` shape); otherwise the URL is
/// assumed to not carry channel/subdir information at all.
const KNOWN_SUBDIRS: &[&str] = &[
    "noarch",
    "linux-64",
    "linux-32",
    "linux-aarch64",
    "linux-ppc64le",
    "linux-s390x",
    "linux-armv6l",
    "linux-armv7l",
    "osx-64",
    "osx-arm64",
    "win-64",
    "win-32",
    "win-arm64",
    "zos-z",
];

/// The channel and subdir a package archive was downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// A filesystem-safe rendering of the channel, e.g. `"conda-forge"` or
    /// `"my-internal-host.example.com/mirror"`.
    pub safe_name: String,
    /// The platform subdir, e.g. `"linux-64"` or `"noarch"`.
    pub subdir: String,
}

impl Channel {
    /// Attempts to derive a channel and subdir from a package URL.
    ///
    /// Returns `None` if the URL doesn't carry at least two meaningful path
    /// segments before the filename (channel is then considered unknown,
    /// and the caller should fall back to the global urls bucket,).
    pub fn from_url(url: &Url) -> Option<Self> {
        let mut segments: Vec<&str> = url
            .path_segments()?
            .filter(|s| !s.is_empty())
            .collect();
        // Drop the filename itself.
        segments.pop()?;
        let subdir = segments.pop()?;
        if !is_subdir_like(subdir) {
            return None;
        }
        let host = url.host_str().unwrap_or_default();
        let safe_name = if segments.is_empty() {
            host.to_string()
        } else {
            format!("{host}/{}", segments.join("/"))
        };
        Some(Self {
            safe_name,
            subdir: subdir.to_string(),
        })
    }
}

fn is_subdir_like(candidate: &str) -> bool {
    if KNOWN_SUBDIRS.contains(&candidate) {
        return true;
    }
    // Generic fallback: `<os>-<arch>`, two non-empty hyphen-separated parts.
    matches!(candidate.split_once('-'), Some((os, arch)) if !os.is_empty() && !arch.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_channel_and_subdir_from_url() {
        let url: Url = "https://h/c/linux-64/x-1-0.tar.bz2".parse().unwrap();
        let channel = Channel::from_url(&url).unwrap();
        assert_eq!(channel.safe_name, "h/c");
        assert_eq!(channel.subdir, "linux-64");
    }

    #[test]
    fn recognizes_noarch() {
        let url: Url = "https://conda.anaconda.org/conda-forge/noarch/foo-1.0-0.tar.bz2"
            .parse()
            .unwrap();
        let channel = Channel::from_url(&url).unwrap();
        assert_eq!(channel.safe_name, "conda.anaconda.org/conda-forge");
        assert_eq!(channel.subdir, "noarch");
    }

    #[test]
    fn returns_none_for_urls_without_enough_segments() {
        let url: Url = "https://example.com/just-a-file.tar.bz2".parse().unwrap();
        assert_eq!(Channel::from_url(&url), None);
    }
}

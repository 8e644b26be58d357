//! Per-root mapping from tarball filename to origin URL.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rattler_conda_types::Channel;
use url::Url;

use crate::error::CacheError;

const URLS_FILE: &str = "urls.txt";
/// Bucket key for URLs not attributable to a known channel/subdir.
const GLOBAL_BUCKET: &str = "global";

/// A root's URL log, split into a global bucket and one bucket per
/// `<channel>/<subdir>` seen so far. Within a bucket, entries are
/// newest-first; on disk the backing `urls.txt` is oldest-first and
/// append-only, so the in-memory list is reversed once on load.
#[derive(Debug)]
pub struct UrlsIndex {
    root: PathBuf,
    /// Insertion-ordered so bucket iteration order in `get_url` matches the
    /// order buckets were first seen, so `get_url`'s search order matches.
    /// The global bucket's key is always reserved first (in `new`/`load`),
    /// regardless of which bucket a caller touches first, so `get_url`'s
    /// "global first" search order holds even before any URL is recorded.
    buckets: IndexMap<String, Vec<String>>,
}

impl Default for UrlsIndex {
    fn default() -> Self {
        UrlsIndex::new(PathBuf::new())
    }
}

impl UrlsIndex {
    fn new(root: PathBuf) -> Self {
        let mut buckets = IndexMap::new();
        buckets.insert(GLOBAL_BUCKET.to_string(), Vec::new());
        UrlsIndex { root, buckets }
    }

    /// Loads `<root>/urls.txt` into the global bucket, then every
    /// `<root>/<channel>/<subdir>/urls.txt` into its own bucket.
    pub fn load(root: &Path) -> Result<Self, CacheError> {
        let mut index = UrlsIndex::new(root.to_path_buf());

        if let Some(lines) = read_lines(&root.join(URLS_FILE))? {
            index.buckets.insert(GLOBAL_BUCKET.to_string(), lines);
        }

        if root.is_dir() {
            for channel_entry in fs::read_dir(root).map_err(|e| CacheError::io(root, e))?.flatten() {
                let channel_dir = channel_entry.path();
                if !channel_dir.is_dir() {
                    continue;
                }
                let channel_name = channel_entry.file_name().to_string_lossy().into_owned();
                let Ok(subdir_entries) = fs::read_dir(&channel_dir) else {
                    continue;
                };
                for subdir_entry in subdir_entries.flatten() {
                    let subdir_dir = subdir_entry.path();
                    if !subdir_dir.is_dir() {
                        continue;
                    }
                    let subdir_name = subdir_entry.file_name().to_string_lossy().into_owned();
                    if let Some(lines) = read_lines(&subdir_dir.join(URLS_FILE))? {
                        index
                            .buckets
                            .insert(format!("{channel_name}/{subdir_name}"), lines);
                    }
                }
            }
        }

        Ok(index)
    }

    /// Records `url`'s origin. Prepends to the global bucket and, when the
    /// url's channel/subdir can be determined, to that bucket too.
    /// In-memory state is updated before the disk append; a failed append
    /// is reported but not rolled back — the URL is recoverable on the
    /// next scan from whatever state remains on disk.
    pub fn add_url(&mut self, url: &Url) -> Result<(), CacheError> {
        if let Some(channel) = Channel::from_url(url) {
            let bucket = format!("{}/{}", channel.safe_name, channel.subdir);
            self.buckets
                .entry(bucket.clone())
                .or_default()
                .insert(0, url.to_string());
            let path = self.root.join(&channel.safe_name).join(&channel.subdir).join(URLS_FILE);
            append_line(&path, url.as_str())?;
        }

        self.buckets
            .entry(GLOBAL_BUCKET.to_string())
            .or_default()
            .insert(0, url.to_string());
        append_line(&self.root.join(URLS_FILE), url.as_str())
    }

    /// The most recent URL across all buckets whose basename is `name`
    /// (the tarball extension is appended if `name` doesn't already carry
    /// one). Global bucket first, then per-channel buckets in the order
    /// they were first seen; within a bucket, newest first.
    pub fn get_url(&self, name: &str, tarball_ext: &str) -> Option<&str> {
        let name = if name.ends_with(tarball_ext) {
            name.to_string()
        } else {
            format!("{name}{tarball_ext}")
        };

        for bucket in self.buckets.values() {
            if let Some(url) = bucket.iter().find(|u| basename(u) == name) {
                return Some(url.as_str());
            }
        }
        None
    }
}

fn basename(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn read_lines(path: &Path) -> Result<Option<Vec<String>>, CacheError> {
    if !path.is_file() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|e| CacheError::io(path, e))?;
    let mut lines: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect();
    lines.reverse();
    Ok(Some(lines))
}

fn append_line(path: &Path, line: &str) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CacheError::io(path, e))?;
    writeln!(file, "{line}").map_err(|e| CacheError::io(path, e))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_a_url_through_the_global_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = UrlsIndex::load(dir.path()).unwrap();

        let url = Url::parse("https://example.com/noarch/a-1-0.tar.bz2").unwrap();
        index.add_url(&url).unwrap();

        assert_eq!(index.get_url("a-1-0", ".tar.bz2"), Some(url.as_str()));
    }

    #[test]
    fn reloading_reverses_the_on_disk_oldest_first_log() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut index = UrlsIndex::load(dir.path()).unwrap();
            index
                .add_url(&Url::parse("https://example.com/a-1-0.tar.bz2").unwrap())
                .unwrap();
            index
                .add_url(&Url::parse("https://example.com/a-2-0.tar.bz2").unwrap())
                .unwrap();
        }

        let reloaded = UrlsIndex::load(dir.path()).unwrap();
        assert_eq!(
            reloaded.get_url("a-2-0", ".tar.bz2"),
            Some("https://example.com/a-2-0.tar.bz2")
        );
    }

    #[test]
    fn global_bucket_is_searched_first_even_on_a_fresh_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = UrlsIndex::load(dir.path()).unwrap();

        // The only URL recorded so far carries a channel/subdir, so the
        // per-channel bucket is the first one `add_url` touches.
        let channel_url = Url::parse("https://example.com/channel/linux-64/x-1-0.tar.bz2").unwrap();
        index.add_url(&channel_url).unwrap();

        // A colliding basename lands directly in the global bucket via a
        // `file://` URL, which has no channel/subdir.
        let global_url = Url::parse("file:///elsewhere/x-1-0.tar.bz2").unwrap();
        index.add_url(&global_url).unwrap();

        assert_eq!(index.get_url("x-1-0", ".tar.bz2"), Some(global_url.as_str()));
    }
}

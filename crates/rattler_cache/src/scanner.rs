//! Walks a cache root's directory tree and reconstructs `CacheEntry`
//! records from whatever on-disk state is found.

use std::fs;
use std::path::{Path, PathBuf};

use rattler_conda_types::package::{read_index_json, read_index_json_from_tar_bz2, read_repodata_record};
use url::Url;
use walkdir::WalkDir;

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::package_ref::PackageRef;
use crate::urls_index::UrlsIndex;

/// Channel safe-names may themselves contain path separators (a mirror
/// nested under a host, e.g. `h/c`), so a channel marker can be found more
/// than one level below the cache root. Bounds how deep that search goes.
const MAX_CHANNEL_DEPTH: usize = 6;

/// A single flat-layout directory to walk: either the root itself (legacy
/// layout, no channel) or a `<channel>/<subdir>/` beneath it (new layout).
struct FlatDir {
    path: PathBuf,
    channel: Option<(String, String)>,
}

/// Scans `root` and returns every entry recoverable from its on-disk state.
/// `writable` gates whether partial extractions are repaired and whether
/// `repodata_record.json` is written out to short-circuit future scans.
pub fn scan(root: &Path, urls_index: &UrlsIndex, config: &CacheConfig, writable: bool) -> Vec<CacheEntry> {
    let mut dirs = vec![FlatDir {
        path: root.to_path_buf(),
        channel: None,
    }];

    let mut walker = WalkDir::new(root).min_depth(1).max_depth(MAX_CHANNEL_DEPTH).into_iter();
    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else { continue };
        let channel_dir = entry.path();
        if !entry.file_type().is_dir() || is_symlink(channel_dir) {
            continue;
        }
        if !channel_dir.join("metadata.json").is_file() {
            continue;
        }
        // This directory is the channel marker itself; its own subdirs are
        // walked below, so the walker doesn't need to recurse into it.
        walker.skip_current_dir();

        let channel_name = channel_dir
            .strip_prefix(root)
            .unwrap_or(channel_dir)
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");

        let Ok(subdirs) = fs::read_dir(channel_dir) else {
            continue;
        };
        for sub in subdirs.flatten() {
            let subdir_path = sub.path();
            if is_symlink(&subdir_path) || !subdir_path.is_dir() {
                continue;
            }
            if !subdir_path.join(&config.magic_file).is_file() {
                continue;
            }
            let subdir_name = sub.file_name().to_string_lossy().into_owned();
            dirs.push(FlatDir {
                path: subdir_path,
                channel: Some((channel_name.clone(), subdir_name)),
            });
        }
    }

    let mut entries = Vec::new();
    for dir in dirs {
        entries.extend(scan_flat_dir(&dir, urls_index, config, writable));
    }
    entries
}

fn scan_flat_dir(dir: &FlatDir, urls_index: &UrlsIndex, config: &CacheConfig, writable: bool) -> Vec<CacheEntry> {
    let Ok(read_dir) = fs::read_dir(&dir.path) else {
        return Vec::new();
    };

    let mut names: Vec<String> = read_dir
        .flatten()
        .filter(|e| !is_symlink(&e.path()))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "metadata.json" && name != config.magic_file.as_str())
        .collect();
    names.sort();

    dedupe(&names, &config.tarball_ext)
        .into_iter()
        .filter_map(|stem_or_tarball| {
            let stem = stem_or_tarball
                .strip_suffix(&config.tarball_ext)
                .unwrap_or(&stem_or_tarball)
                .to_string();
            make_entry(&stem, dir, urls_index, config, writable)
        })
        .collect()
}

/// Pair-dedup over a sorted listing: when `y` immediately
/// follows `x` and `y == x + tarball_ext`, `x` is dropped.
pub fn dedupe(sorted_names: &[String], tarball_ext: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < sorted_names.len() {
        let current = &sorted_names[i];
        if let Some(next) = sorted_names.get(i + 1) {
            if *next == format!("{current}{tarball_ext}") {
                i += 1;
                continue;
            }
        }
        out.push(current.clone());
        i += 1;
    }
    out
}

fn make_entry(
    stem: &str,
    dir: &FlatDir,
    urls_index: &UrlsIndex,
    config: &CacheConfig,
    writable: bool,
) -> Option<CacheEntry> {
    let tarball_path = dir.path.join(format!("{stem}{}", config.tarball_ext));
    let tarball_path = tarball_path.is_file().then_some(tarball_path);
    let extracted_dir = dir.path.join(stem);
    let extracted_dir = extracted_dir.is_dir().then_some(extracted_dir);

    if let Some(dir_path) = &extracted_dir {
        if dir_path.join("info").join("repodata_record.json").is_file() {
            if let Ok(record) = read_repodata_record(dir_path) {
                let origin_url = record.url.as_deref().and_then(|u| Url::parse(u).ok());
                return Some(CacheEntry {
                    reference: package_ref_from_record(&record, dir, tarball_path.as_deref(), origin_url.clone()),
                    tarball_path: tarball_path.clone(),
                    extracted_dir: extracted_dir.clone(),
                    md5: record.md5.clone(),
                    size: record.size,
                    origin_url,
                });
            }
        }

        let index_json = dir_path.join("info").join("index.json");
        if index_json.is_file() {
            let record = read_index_json(dir_path).ok()?;
            let md5 = tarball_path
                .as_deref()
                .and_then(|p| rattler_digest::compute_file_digest::<rattler_digest::Md5>(p).ok())
                .map(|d| rattler_digest::digest_to_hex::<rattler_digest::Md5>(&d));
            let origin_url = urls_index
                .get_url(stem, &config.tarball_ext)
                .and_then(|u| Url::parse(u).ok())
                .or_else(|| tarball_path.as_deref().and_then(|p| Url::from_file_path(p).ok()));

            let entry = CacheEntry {
                reference: package_ref_from_record(&record, dir, tarball_path.as_deref(), origin_url.clone()),
                tarball_path: tarball_path.clone(),
                extracted_dir: extracted_dir.clone(),
                md5,
                size: tarball_path.as_deref().and_then(|p| fs::metadata(p).ok()).map(|m| m.len()),
                origin_url,
            };

            if writable {
                if let Some(dir_path) = &entry.extracted_dir {
                    let _ = crate::index::write_repodata_record(dir_path, &entry);
                }
            }

            return Some(entry);
        }

        // Extracted dir with no recoverable metadata and no tarball to
        // fall back to: not enough information to build an entry.
        if tarball_path.is_none() {
            tracing::trace!(dir = %dir_path.display(), "extracted dir has no recoverable metadata, ignoring");
            return None;
        }
    }

    // No usable extracted dir: attempt extraction from the tarball.
    let tarball = tarball_path.as_ref()?;
    if writable {
        if let Some(dir_path) = &extracted_dir {
            let _ = fs::remove_dir_all(dir_path);
        }
        let destination = dir.path.join(stem);
        if let Err(err) = rattler_package_streaming::fs::extract(tarball, &destination) {
            tracing::warn!(tarball = %tarball.display(), %err, "corrupt archive, deleting tarball");
            let _ = fs::remove_file(tarball);
            return None;
        }
        let record = read_index_json(&destination).ok()?;
        let md5 = rattler_digest::compute_file_digest::<rattler_digest::Md5>(tarball)
            .ok()
            .map(|d| rattler_digest::digest_to_hex::<rattler_digest::Md5>(&d));
        let origin_url = urls_index
            .get_url(stem, &config.tarball_ext)
            .and_then(|u| Url::parse(u).ok())
            .or_else(|| Url::from_file_path(tarball).ok());
        Some(CacheEntry {
            reference: package_ref_from_record(&record, dir, Some(tarball), origin_url.clone()),
            tarball_path: Some(tarball.clone()),
            extracted_dir: Some(destination),
            size: fs::metadata(tarball).ok().map(|m| m.len()),
            md5,
            origin_url,
        })
    } else {
        let file = fs::File::open(tarball).ok()?;
        match read_index_json_from_tar_bz2(file) {
            Ok(record) => {
                let origin_url = urls_index
                    .get_url(stem, &config.tarball_ext)
                    .and_then(|u| Url::parse(u).ok())
                    .or_else(|| Url::from_file_path(tarball).ok());
                Some(CacheEntry {
                    reference: package_ref_from_record(&record, dir, Some(tarball), origin_url.clone()),
                    tarball_path: Some(tarball.clone()),
                    extracted_dir: None,
                    size: fs::metadata(tarball).ok().map(|m| m.len()),
                    md5: None,
                    origin_url,
                })
            }
            Err(err) => {
                tracing::warn!(tarball = %tarball.display(), %err, "corrupt archive, deleting tarball");
                let _ = fs::remove_file(tarball);
                None
            }
        }
    }
}

fn package_ref_from_record(
    record: &rattler_conda_types::PackageRecord,
    dir: &FlatDir,
    tarball_path: Option<&Path>,
    origin_url: Option<Url>,
) -> PackageRef {
    let channel = dir
        .channel
        .as_ref()
        .map(|(c, _)| c.clone())
        .unwrap_or_else(|| record.channel.clone().unwrap_or_default());
    PackageRef {
        channel,
        name: record.name.clone(),
        version: record.version.parse().expect("version parsing is infallible"),
        build_string: record.build.clone(),
        build_number: record.build_number,
        subdir: dir.channel.as_ref().map(|(_, s)| s.clone()).or_else(|| record.subdir.clone()),
        filename: tarball_path.and_then(|p| p.file_name()).map(|n| n.to_string_lossy().into_owned()),
        md5: record.md5.clone(),
        size: record.size,
        url: origin_url,
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).map(|m| m.file_type().is_symlink()).unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dedupe_drops_the_bare_dir_when_tarball_exists() {
        let names = vec![
            "a-1-0".to_string(),
            "a-1-0.tar.bz2".to_string(),
            "b-2-0".to_string(),
            "c-3-0.tar.bz2".to_string(),
        ];
        assert_eq!(
            dedupe(&names, ".tar.bz2"),
            vec!["a-1-0.tar.bz2", "b-2-0", "c-3-0.tar.bz2"]
        );
    }

    #[test]
    fn dedupe_is_idempotent() {
        let names = vec!["a-1-0.tar.bz2".to_string(), "b-2-0".to_string()];
        let once = dedupe(&names, ".tar.bz2");
        let twice = dedupe(&once, ".tar.bz2");
        assert_eq!(once, twice);
    }

    #[test]
    fn finds_channel_dirs_nested_under_a_mirror_host() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let config = CacheConfig::default();

        // root/h/c/ is the channel marker; root/h/c/linux-64/ is the subdir.
        let channel_dir = root.join("h").join("c");
        let subdir_dir = channel_dir.join("linux-64");
        fs::create_dir_all(&subdir_dir).unwrap();
        fs::write(channel_dir.join("metadata.json"), b"{}").unwrap();
        fs::write(subdir_dir.join(&config.magic_file), b"").unwrap();

        let dirs = {
            let mut found = Vec::new();
            let mut walker = WalkDir::new(root).min_depth(1).max_depth(MAX_CHANNEL_DEPTH).into_iter();
            while let Some(entry) = walker.next() {
                let entry = entry.unwrap();
                if entry.file_type().is_dir() && entry.path().join("metadata.json").is_file() {
                    found.push(entry.path().strip_prefix(root).unwrap().to_path_buf());
                    walker.skip_current_dir();
                }
            }
            found
        };

        assert_eq!(dirs, vec![PathBuf::from("h").join("c")]);

        let urls_index = UrlsIndex::default();
        let entries = scan(root, &urls_index, &config, true);
        // No recoverable package metadata was placed under the subdir, so no
        // entries are produced, but the scan must not error or hang.
        assert!(entries.is_empty());
    }
}

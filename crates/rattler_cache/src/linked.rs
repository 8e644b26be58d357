//! The "not linked" hard-link heuristic.
//!
//! An extracted package whose files all carry a link count of 1 has no
//! environment hard-linking into it. This is an approximation: a consumer
//! that copied the file instead of hard-linking it, or that reached it
//! through a symlinked environment, is invisible to `st_nlink`.

use rattler_conda_types::package::{PathType, PathsJson};

use crate::entry::CacheEntry;

/// True if nothing appears to hard-link into `entry`'s extracted files.
///
/// Hard-link counts are a POSIX concept; on platforms without `st_nlink`
/// this heuristic can't tell, so it conservatively reports "linked" (i.e.
/// not a candidate for cleanup) rather than false-positive.
pub fn is_not_linked(entry: &CacheEntry) -> bool {
    let Some(extracted_dir) = &entry.extracted_dir else {
        return false;
    };
    let Ok(paths) = PathsJson::from_extracted_dir(extracted_dir) else {
        return false;
    };

    paths
        .paths
        .iter()
        .filter(|p| p.path_type == PathType::HardLink)
        .all(|p| nlink_at_most(&extracted_dir.join(&p.path), 1 + p.inode_paths.len() as u64))
}

#[cfg(unix)]
fn nlink_at_most(path: &std::path::Path, expected: u64) -> bool {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).map(|m| m.nlink() <= expected).unwrap_or(true)
}

#[cfg(not(unix))]
fn nlink_at_most(_path: &std::path::Path, _expected: u64) -> bool {
    false
}

#[cfg(all(test, unix))]
mod test {
    use super::*;
    use crate::package_ref::PackageRef;

    fn write_paths_json(extracted_dir: &std::path::Path, paths: &str) {
        let info = extracted_dir.join("info");
        std::fs::create_dir_all(&info).unwrap();
        std::fs::write(info.join("paths.json"), paths).unwrap();
    }

    fn make_entry(extracted_dir: std::path::PathBuf) -> CacheEntry {
        CacheEntry {
            reference: PackageRef {
                channel: "defaults".into(),
                name: "x".into(),
                version: "1.0".parse().unwrap(),
                build_string: "0".into(),
                build_number: 0,
                subdir: None,
                filename: None,
                md5: None,
                size: None,
                url: None,
            },
            tarball_path: None,
            extracted_dir: Some(extracted_dir),
            md5: None,
            size: None,
            origin_url: None,
        }
    }

    #[test]
    fn a_file_with_no_extra_hardlinks_is_not_linked() {
        let dir = tempfile::tempdir().unwrap();
        let extracted = dir.path().join("x-1.0-0");
        std::fs::create_dir_all(&extracted).unwrap();
        std::fs::write(extracted.join("bin"), b"tool").unwrap();
        write_paths_json(
            &extracted,
            r#"{"paths":[{"_path":"bin","path_type":"hard_link"}]}"#,
        );

        assert!(is_not_linked(&make_entry(extracted)));
    }

    #[test]
    fn an_extra_hardlink_beyond_the_expected_count_means_linked() {
        let dir = tempfile::tempdir().unwrap();
        let extracted = dir.path().join("x-1.0-0");
        std::fs::create_dir_all(&extracted).unwrap();
        std::fs::write(extracted.join("bin"), b"tool").unwrap();
        write_paths_json(
            &extracted,
            r#"{"paths":[{"_path":"bin","path_type":"hard_link"}]}"#,
        );

        // Simulate an environment hard-linking the file in: one extra link
        // beyond the expected count of 1.
        let linked_from_elsewhere = dir.path().join("env-link");
        std::fs::hard_link(extracted.join("bin"), &linked_from_elsewhere).unwrap();

        assert!(!is_not_linked(&make_entry(extracted)));
    }

    #[test]
    fn missing_paths_json_is_treated_as_linked() {
        let dir = tempfile::tempdir().unwrap();
        let extracted = dir.path().join("x-1.0-0");
        std::fs::create_dir_all(extracted.join("info")).unwrap();

        assert!(!is_not_linked(&make_entry(extracted)));
    }
}

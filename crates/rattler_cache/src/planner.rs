//! The R0–R3 decision ladder.

use std::sync::Arc;

use rattler_conda_types::Channel;

use crate::action::{ExtractAction, FetchAction};
use crate::error::CacheError;
use crate::index::QueryPattern;
use crate::package_ref::PackageRef;
use crate::root::CacheRoot;

/// What a ref still needs done, if anything.
pub struct Plan {
    pub fetch: Option<FetchAction>,
    pub extract: Option<ExtractAction>,
}

impl Plan {
    fn none() -> Self {
        Plan {
            fetch: None,
            extract: None,
        }
    }
}

/// Applies the R0–R3 ladder for a single ref against `writable` (in
/// declared order) and `read_only` caches.
pub fn plan_one(
    reference: &PackageRef,
    writable: &[Arc<CacheRoot>],
    read_only: &[Arc<CacheRoot>],
) -> Result<Plan, CacheError> {
    // R0: an extracted entry already satisfies this ref.
    if reference.md5.is_some() {
        for root in writable.iter().chain(read_only.iter()) {
            if let Some(entry) = single_match(root, reference) {
                if entry.is_extracted() {
                    return Ok(Plan::none());
                }
            }
        }
    }

    // R1: a writable cache already has the tarball.
    for root in writable {
        if let Some(entry) = single_match(root, reference) {
            if entry.is_fetched() {
                let tarball = entry.tarball_path.clone().expect("is_fetched");
                let dirname = extracted_dirname(&tarball);
                return Ok(Plan {
                    fetch: None,
                    extract: Some(ExtractAction {
                        source_tarball: tarball,
                        target_root_path: root.path().to_path_buf(),
                        target_root_config: root.config().clone(),
                        channel: entry.reference.subdir.as_ref().map(|_| entry.reference.channel.clone()),
                        subdir: entry.reference.subdir.clone(),
                        extracted_dirname: dirname,
                        md5: entry.md5.clone(),
                        size: entry.size,
                        origin_url: entry.origin_url.clone(),
                    }),
                });
            }
        }
    }

    let first_writable = writable.first().ok_or(CacheError::NoWritableCache)?;

    // R2: a read-only cache has the tarball; promote it by copying then
    // extract.
    for root in read_only {
        if let Some(entry) = single_match(root, reference) {
            if entry.is_fetched() {
                let tarball = entry.tarball_path.clone().expect("is_fetched");
                let basename = tarball
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let dirname = extracted_dirname(&tarball);
                let url = url::Url::from_file_path(&tarball)
                    .map_err(|()| CacheError::PlanUnsatisfiable(reference.clone()))?;

                return Ok(Plan {
                    fetch: Some(FetchAction {
                        url: url.clone(),
                        target_root_path: first_writable.path().to_path_buf(),
                        target_root_config: first_writable.config().clone(),
                        channel: entry.reference.subdir.as_ref().map(|_| entry.reference.channel.clone()),
                        subdir: entry.reference.subdir.clone(),
                        basename: basename.clone(),
                        md5: entry.md5.clone(),
                        expected_size: entry.size,
                    }),
                    extract: Some(ExtractAction {
                        source_tarball: first_writable.path().join(&basename),
                        target_root_path: first_writable.path().to_path_buf(),
                        target_root_config: first_writable.config().clone(),
                        channel: entry.reference.subdir.as_ref().map(|_| entry.reference.channel.clone()),
                        subdir: entry.reference.subdir.clone(),
                        extracted_dirname: dirname,
                        md5: entry.md5.clone(),
                        size: entry.size,
                        origin_url: Some(url),
                    }),
                });
            }
        }
    }

    // R3: nothing cached anywhere; fetch from the ref's own url.
    let url = reference
        .url
        .clone()
        .ok_or_else(|| CacheError::PlanUnsatisfiable(reference.clone()))?;
    let basename = reference
        .filename
        .clone()
        .or_else(|| url.path_segments().and_then(|s| s.last()).map(str::to_owned))
        .ok_or_else(|| CacheError::PlanUnsatisfiable(reference.clone()))?;
    let channel = Channel::from_url(&url);
    let dirname = basename
        .strip_suffix(".tar.bz2")
        .unwrap_or(&basename)
        .to_string();

    Ok(Plan {
        fetch: Some(FetchAction {
            url: url.clone(),
            target_root_path: first_writable.path().to_path_buf(),
            target_root_config: first_writable.config().clone(),
            channel: channel.as_ref().map(|c| c.safe_name.clone()),
            subdir: channel.as_ref().map(|c| c.subdir.clone()),
            basename: basename.clone(),
            md5: reference.md5.clone(),
            expected_size: reference.size,
        }),
        extract: Some(ExtractAction {
            source_tarball: match &channel {
                Some(c) => first_writable.path().join(&c.safe_name).join(&c.subdir).join(&basename),
                None => first_writable.path().join(&basename),
            },
            target_root_path: first_writable.path().to_path_buf(),
            target_root_config: first_writable.config().clone(),
            channel: channel.as_ref().map(|c| c.safe_name.clone()),
            subdir: channel.as_ref().map(|c| c.subdir.clone()),
            extracted_dirname: dirname,
            md5: reference.md5.clone(),
            size: reference.size,
            origin_url: Some(url),
        }),
    })
}

fn single_match(root: &Arc<CacheRoot>, reference: &PackageRef) -> Option<crate::entry::CacheEntry> {
    root.query(QueryPattern::Ref(reference)).into_iter().next()
}

fn extracted_dirname(tarball: &std::path::Path) -> String {
    let name = tarball.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    name.strip_suffix(".tar.bz2").unwrap_or(&name).to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::CacheConfig;
    use crate::test_support::{make_ref, write_extracted, write_tarball};

    #[test]
    fn r0_no_op_when_extracted_entry_already_satisfies_ref() {
        let dir = tempfile::tempdir().unwrap();
        write_extracted(&dir.path().join("x-1-0"), "x", "1", "0");
        let read_only = Arc::new(CacheRoot::new(dir.path().to_path_buf(), CacheConfig::default()));

        let mut reference = make_ref("x", "1", "0");
        reference.md5 = Some("abc".into());

        let plan = plan_one(&reference, &[], &[read_only]).unwrap();
        assert!(plan.fetch.is_none());
        assert!(plan.extract.is_none());
    }

    #[test]
    fn r1_extract_in_place_when_writable_cache_has_the_tarball() {
        let dir = tempfile::tempdir().unwrap();
        write_tarball(&dir.path().join("x-1-0.tar.bz2"), "x", "1", "0");
        let writable = Arc::new(CacheRoot::new(dir.path().to_path_buf(), CacheConfig::default()));
        assert!(writable.is_writable());

        let reference = make_ref("x", "1", "0");
        let plan = plan_one(&reference, &[writable.clone()], &[]).unwrap();

        assert!(plan.fetch.is_none());
        let extract = plan.extract.expect("expected an extract action");
        assert_eq!(extract.source_tarball, dir.path().join("x-1-0.tar.bz2"));
        assert_eq!(extract.extracted_dirname, "x-1-0");
        assert_eq!(extract.target_root_path, writable.path());
    }

    #[test]
    fn r2_promotes_from_read_only_cache_into_first_writable() {
        let ro_dir = tempfile::tempdir().unwrap();
        write_tarball(&ro_dir.path().join("x-1-0.tar.bz2"), "x", "1", "0");
        // Pre-create the magic file read-only so `is_writable`'s probe fails
        // to append to it, simulating a genuinely read-only root.
        std::fs::write(ro_dir.path().join("urls.txt"), b"").unwrap();
        let mut perms = std::fs::metadata(ro_dir.path().join("urls.txt")).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(ro_dir.path().join("urls.txt"), perms).unwrap();
        let read_only = Arc::new(CacheRoot::new(ro_dir.path().to_path_buf(), CacheConfig::default()));
        assert!(!read_only.is_writable());

        let w_dir = tempfile::tempdir().unwrap();
        let writable = Arc::new(CacheRoot::new(w_dir.path().to_path_buf(), CacheConfig::default()));
        assert!(writable.is_writable());

        let reference = make_ref("x", "1", "0");
        let plan = plan_one(&reference, &[writable.clone()], &[read_only]).unwrap();

        let fetch = plan.fetch.expect("expected a fetch action");
        assert_eq!(fetch.url.scheme(), "file");
        assert_eq!(fetch.target_root_path, writable.path());
        let extract = plan.extract.expect("expected an extract action");
        assert_eq!(extract.extracted_dirname, "x-1-0");
        assert_eq!(extract.target_root_path, writable.path());
    }

    #[test]
    fn r3_fetches_from_the_refs_own_url_when_nothing_is_cached() {
        let w_dir = tempfile::tempdir().unwrap();
        let writable = Arc::new(CacheRoot::new(w_dir.path().to_path_buf(), CacheConfig::default()));
        assert!(writable.is_writable());

        let mut reference = make_ref("x", "1", "0");
        reference.url = Some("https://h/c/linux-64/x-1-0.tar.bz2".parse().unwrap());
        reference.md5 = Some("abc".into());

        let plan = plan_one(&reference, &[writable.clone()], &[]).unwrap();

        let fetch = plan.fetch.expect("expected a fetch action");
        assert_eq!(fetch.url.as_str(), "https://h/c/linux-64/x-1-0.tar.bz2");
        assert_eq!(fetch.channel.as_deref(), Some("h/c"));
        assert_eq!(fetch.subdir.as_deref(), Some("linux-64"));
        let extract = plan.extract.expect("expected an extract action");
        assert_eq!(extract.extracted_dirname, "x-1-0");
        assert_eq!(
            extract.source_tarball,
            w_dir.path().join("h/c").join("linux-64").join("x-1-0.tar.bz2")
        );
    }

    #[test]
    fn r3_is_unsatisfiable_without_a_url() {
        let w_dir = tempfile::tempdir().unwrap();
        let writable = Arc::new(CacheRoot::new(w_dir.path().to_path_buf(), CacheConfig::default()));
        let reference = make_ref("x", "1", "0");

        let err = plan_one(&reference, &[writable], &[]).unwrap_err();
        assert!(matches!(err, CacheError::PlanUnsatisfiable(_)));
    }

    #[test]
    fn fails_fast_when_no_writable_cache_is_configured() {
        let reference = make_ref("x", "1", "0");
        let err = plan_one(&reference, &[], &[]).unwrap_err();
        assert!(matches!(err, CacheError::NoWritableCache));
    }
}

//! Synchronous, reader-based tar extraction shared by the `fs` and `reqwest`
//! modules. Works over any [`std::io::Read`], so it is equally at home
//! reading a file on disk or a streamed HTTP body.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::error::ExtractError;

/// Wraps `reader` in a `bzip2` decoder and a `tar::Archive`, returning an
/// archive ready to `.entries()` or extract.
pub fn stream_tar_bz2<R: Read>(reader: R) -> tar::Archive<bzip2::read::BzDecoder<R>> {
    tar::Archive::new(bzip2::read::BzDecoder::new(reader))
}

/// Extracts every entry of `archive` into `destination`, creating the
/// directory if it doesn't exist.
///
/// Rejects any entry whose path would escape `destination` (absolute paths,
/// `..` components, or symlinks pointing outside) with
/// [`ExtractError::UnsafeEntryPath`], mirroring the archive-streaming crate's
/// own `is_target_outside_of_path` guard.
pub fn extract_archive<R: Read>(
    archive: &mut tar::Archive<R>,
    destination: &Path,
) -> Result<(), ExtractError> {
    fs::create_dir_all(destination).map_err(ExtractError::CouldNotCreateDestination)?;
    let destination = fs::canonicalize(destination)
        .map_err(|e| ExtractError::IoError(e, Some(destination.to_path_buf())))?;

    let entries = archive
        .entries()
        .map_err(|e| ExtractError::IoError(e, None))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ExtractError::IoError(e, None))?;
        let entry_path = entry
            .path()
            .map_err(|e| ExtractError::IoError(e, None))?
            .into_owned();

        if is_unsafe_path(&entry_path) {
            return Err(ExtractError::UnsafeEntryPath(
                entry_path.to_string_lossy().into_owned(),
            ));
        }

        let target = destination.join(&entry_path);
        if !is_target_outside_of_path(&target, &destination) {
            return Err(ExtractError::UnsafeEntryPath(
                entry_path.to_string_lossy().into_owned(),
            ));
        }

        entry
            .unpack(&target)
            .map_err(|e| ExtractError::IoError(e, Some(target.clone())))?;
    }

    Ok(())
}

/// True if `path` contains a component that could climb out of an
/// extraction root (`..`, or an absolute/prefix component).
fn is_unsafe_path(path: &Path) -> bool {
    path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// True if `target`, once joined to `base`, is still within `base`.
///
/// `target` need not exist yet, so this compares the lexical path rather
/// than canonicalizing (the entry hasn't been unpacked yet).
fn is_target_outside_of_path(target: &Path, base: &Path) -> bool {
    let mut resolved = PathBuf::from(base);
    for component in target
        .strip_prefix(base)
        .unwrap_or(target)
        .components()
    {
        match component {
            Component::ParentDir => {
                if !resolved.pop() {
                    return false;
                }
            }
            Component::Normal(part) => resolved.push(part),
            _ => {}
        }
    }
    resolved.starts_with(base)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn build_tar_bz2(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        let tar_bytes = builder.into_inner().unwrap();

        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::fast());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn extracts_a_well_formed_archive() {
        let bytes = build_tar_bz2(&[("info/index.json", b"{}"), ("bin/tool", b"#!/bin/sh\n")]);
        let dir = tempfile::tempdir().unwrap();

        let mut archive = stream_tar_bz2(bytes.as_slice());
        extract_archive(&mut archive, dir.path()).unwrap();

        assert!(dir.path().join("info/index.json").is_file());
        assert!(dir.path().join("bin/tool").is_file());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        let bytes = build_tar_bz2(&[("../escape.txt", b"oops")]);
        let dir = tempfile::tempdir().unwrap();

        let mut archive = stream_tar_bz2(bytes.as_slice());
        let err = extract_archive(&mut archive, dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::UnsafeEntryPath(_)));
    }
}

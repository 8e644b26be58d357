//! Fixture helpers shared by this crate's unit tests: building a fake
//! package on disk (tarball and/or extracted directory) without going
//! through a real download or a real tar.bz2 in the test corpus.

use std::io::Write;
use std::path::Path;

use crate::package_ref::PackageRef;

/// A minimal, valid `info/index.json` body for `name`/`version`/`build`.
pub(crate) fn index_json(name: &str, version: &str, build: &str) -> String {
    serde_json::json!({
        "name": name,
        "version": version,
        "build": build,
        "build_number": 0,
    })
    .to_string()
}

/// Builds a one-entry `.tar.bz2` containing `info/index.json` at `path`.
pub(crate) fn write_tarball(path: &Path, name: &str, version: &str, build: &str) {
    let data = index_json(name, version, build);
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "info/index.json", data.as_bytes())
        .unwrap();
    let tar_bytes = builder.into_inner().unwrap();

    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::fast());
    encoder.write_all(&tar_bytes).unwrap();
    let compressed = encoder.finish().unwrap();

    std::fs::write(path, compressed).unwrap();
}

/// Writes an extracted package directory (just enough for `is_extracted`
/// to be true: a readable `info/index.json`).
pub(crate) fn write_extracted(dir: &Path, name: &str, version: &str, build: &str) {
    let info = dir.join("info");
    std::fs::create_dir_all(&info).unwrap();
    std::fs::write(info.join("index.json"), index_json(name, version, build)).unwrap();
}

/// A `PackageRef` with no side-channel attributes, for identity lookups.
pub(crate) fn make_ref(name: &str, version: &str, build: &str) -> PackageRef {
    PackageRef {
        channel: "defaults".into(),
        name: name.into(),
        version: version.parse().unwrap(),
        build_string: build.into(),
        build_number: 0,
        subdir: None,
        filename: None,
        md5: None,
        size: None,
        url: None,
    }
}

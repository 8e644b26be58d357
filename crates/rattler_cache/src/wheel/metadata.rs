//! Site-packages scanning and RFC-822 metadata parsing.

use std::fs;
use std::path::{Path, PathBuf};

use super::requirement::{evaluate_marker, parse_requirement, Requirement};
use super::{DEVELOP_CHANNEL, PYPI_CHANNEL};
use crate::package_ref::PackageRef;

/// Which on-disk shape a site-packages entry was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PythonDistributionKind {
    /// A `<name>-<version>.dist-info/` directory (installed wheel).
    DistInfo,
    /// A `<name>.egg-info` file or directory (legacy setuptools install).
    EggInfo,
    /// A `<name>.egg` directory.
    Egg,
    /// A `<name>.egg-link` pointing at a development checkout.
    EggLink,
}

/// One recognized Python distribution on a prefix, with its metadata
/// already parsed.
#[derive(Debug, Clone)]
pub struct PythonDistribution {
    pub kind: PythonDistributionKind,
    pub anchor_path: PathBuf,
    pub name: String,
    pub version: String,
    pub requires_dist: Vec<Requirement>,
    pub requires_python: Option<String>,
}

impl PythonDistribution {
    /// The requirements of this distribution whose marker is satisfied by
    /// `python_version` (and which name no unrequested extra).
    pub fn active_dependencies(&self, python_version: &str) -> Vec<&Requirement> {
        self.requires_dist
            .iter()
            .filter(|r| evaluate_marker(&r.marker, python_version))
            .collect()
    }

    /// A synthetic cache-style reference for this distribution, carrying
    /// the sentinel channel appropriate to how it was installed.
    pub fn to_package_ref(&self) -> PackageRef {
        let channel = match self.kind {
            PythonDistributionKind::EggLink => DEVELOP_CHANNEL,
            _ => PYPI_CHANNEL,
        };
        PackageRef {
            channel: channel.to_string(),
            name: self.name.clone(),
            version: self.version.parse().expect("version parsing is infallible"),
            build_string: "pypi_0".to_string(),
            build_number: 0,
            subdir: None,
            filename: None,
            md5: None,
            size: None,
            url: None,
        }
    }
}

/// Walks `site_packages` and parses every recognized distribution's
/// metadata. Unrecognized entries (`.pth` files, ordinary packages) are
/// silently skipped, matching the anchor-file classification upstream.
pub fn scan_site_packages(site_packages: &Path) -> std::io::Result<Vec<PythonDistribution>> {
    let mut out = Vec::new();
    let mut names: Vec<_> = fs::read_dir(site_packages)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    for name in names {
        let path = site_packages.join(&name);
        if let Some(dist) = classify_and_parse(&path, &name) {
            out.push(dist);
        }
    }
    Ok(out)
}

fn classify_and_parse(path: &Path, name: &str) -> Option<PythonDistribution> {
    if name.ends_with(".dist-info") {
        parse_metadata_file(path, path.join("METADATA"), PythonDistributionKind::DistInfo)
    } else if name.ends_with(".egg-info") {
        if path.is_file() {
            parse_metadata_file(path, path.to_path_buf(), PythonDistributionKind::EggInfo)
        } else {
            parse_metadata_file(path, path.join("PKG-INFO"), PythonDistributionKind::EggInfo)
        }
    } else if name.ends_with(".egg") && path.is_dir() {
        let pkg_info = path.join("EGG-INFO").join("PKG-INFO");
        parse_metadata_file(path, pkg_info, PythonDistributionKind::Egg)
    } else if name.ends_with(".egg-link") {
        parse_egg_link(path)
    } else {
        None
    }
}

fn parse_egg_link(link_path: &Path) -> Option<PythonDistribution> {
    let contents = fs::read_to_string(link_path).ok()?;
    let target = contents.lines().next()?.trim();
    if target.is_empty() {
        return None;
    }
    let target_dir = PathBuf::from(target);
    let egg_info = fs::read_dir(&target_dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some("egg-info") || p.to_string_lossy().ends_with(".egg-info"))?;

    let pkg_info = if egg_info.is_dir() { egg_info.join("PKG-INFO") } else { egg_info };
    parse_metadata_file(link_path, pkg_info, PythonDistributionKind::EggLink)
}

fn parse_metadata_file(anchor_path: &Path, metadata_path: PathBuf, kind: PythonDistributionKind) -> Option<PythonDistribution> {
    let contents = fs::read_to_string(&metadata_path).ok()?;
    let headers = parse_rfc822(&contents);

    let name = headers.get_first("Name")?.to_string();
    let version = headers.get_first("Version").unwrap_or("0").to_string();
    let requires_python = headers.get_first("Requires-Python").map(str::to_string);
    let requires_dist = headers
        .get_all("Requires-Dist")
        .into_iter()
        .chain(headers.get_all("Requires"))
        .map(parse_requirement)
        .collect();

    Some(PythonDistribution {
        kind,
        anchor_path: anchor_path.to_path_buf(),
        name,
        version,
        requires_dist,
        requires_python,
    })
}

/// The subset of headers a `METADATA`/`PKG-INFO` file carries, keyed
/// case-sensitively by the original field name (RFC-822 header parsing,
/// not a full email message — no body, no folding).
struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    fn get_first(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
    }
}

/// Parses `text` as RFC-822-style `Key: value` headers, stopping at the
/// first blank line (the remainder is the message body / long
/// description, which this adapter does not need).
fn parse_rfc822(text: &str) -> Headers {
    let mut entries = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            entries.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    Headers { entries }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_dist_info_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let dist_info = dir.path().join("requests-2.31.0.dist-info");
        fs::create_dir_all(&dist_info).unwrap();
        fs::write(
            dist_info.join("METADATA"),
            "Metadata-Version: 2.1\nName: requests\nVersion: 2.31.0\nRequires-Dist: urllib3 (>=1.21.1)\nRequires-Dist: certifi; python_version >= '3.6'\n\nA long description.\n",
        )
        .unwrap();

        let dist = parse_metadata_file(&dist_info, dist_info.join("METADATA"), PythonDistributionKind::DistInfo).unwrap();
        assert_eq!(dist.name, "requests");
        assert_eq!(dist.version, "2.31.0");
        assert_eq!(dist.requires_dist.len(), 2);
    }

    #[test]
    fn scans_site_packages_and_skips_pth_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("easy-install.pth"), "..\n").unwrap();
        let dist_info = dir.path().join("foo-1.0.dist-info");
        fs::create_dir_all(&dist_info).unwrap();
        fs::write(dist_info.join("METADATA"), "Name: foo\nVersion: 1.0\n\n").unwrap();

        let dists = scan_site_packages(dir.path()).unwrap();
        assert_eq!(dists.len(), 1);
        assert_eq!(dists[0].name, "foo");
    }

    #[test]
    fn active_dependencies_filters_by_marker() {
        let dist = PythonDistribution {
            kind: PythonDistributionKind::DistInfo,
            anchor_path: PathBuf::new(),
            name: "foo".into(),
            version: "1.0".into(),
            requires_dist: vec![
                parse_requirement("bar"),
                parse_requirement("baz; python_version < '3.0'"),
            ],
            requires_python: None,
        };
        let active = dist.active_dependencies("3.11");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "bar");
    }
}

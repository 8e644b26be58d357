use std::path::PathBuf;

use rattler_cache::{CacheConfig, MultiCache, PipelineConfig, PipelineExecutor};
use rattler_conda_types::Channel;
use url::Url;

/// Fetches and extracts one or more packages into a cache.
#[derive(Debug, clap::Parser)]
pub struct Opt {
    /// URL of a package tarball to make available (repeatable).
    #[arg(required = true)]
    url: Vec<Url>,

    /// Cache directories to plan against, in priority order. The first
    /// writable one receives new downloads.
    #[arg(long = "cache-dir", required = true)]
    cache_dirs: Vec<PathBuf>,

    /// Print the plan without downloading or extracting anything.
    #[arg(long)]
    dry_run: bool,

    /// Suppress progress bars.
    #[arg(short, long)]
    quiet: bool,

    /// Emit one JSON object per ref instead of progress bars.
    #[arg(long)]
    json: bool,
}

pub async fn fetch(opt: Opt) -> anyhow::Result<()> {
    let cache = MultiCache::new(&opt.cache_dirs, CacheConfig::default());

    let refs = opt
        .url
        .iter()
        .map(|url| package_ref_from_url(url))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let plans = cache.plan(&refs)?;

    if opt.dry_run {
        for (reference, plan) in &plans {
            tracing::info!(
                %reference,
                fetch = plan.fetch.is_some(),
                extract = plan.extract.is_some(),
                "planned",
            );
        }
        return Ok(());
    }

    let config = PipelineConfig {
        cache: CacheConfig::default(),
        quiet: opt.quiet,
        json: opt.json,
        dry_run: false,
    };
    let executor = PipelineExecutor::new(config, plans);
    executor.execute().await?;

    Ok(())
}

/// Builds a minimal `PackageRef` purely from a tarball URL, for callers
/// that don't already have repodata for the package. Name/version/build
/// are parsed from the conda-standard `<name>-<version>-<build>.tar.bz2`
/// basename.
fn package_ref_from_url(url: &Url) -> anyhow::Result<rattler_cache::PackageRef> {
    let basename = url
        .path_segments()
        .and_then(|s| s.last())
        .ok_or_else(|| anyhow::anyhow!("url has no path segments: {url}"))?;
    let stem = basename
        .strip_suffix(".tar.bz2")
        .ok_or_else(|| anyhow::anyhow!("not a .tar.bz2 url: {url}"))?;

    let mut parts = stem.rsplitn(3, '-');
    let build_string = parts.next().ok_or_else(|| anyhow::anyhow!("malformed package filename: {stem}"))?;
    let version = parts.next().ok_or_else(|| anyhow::anyhow!("malformed package filename: {stem}"))?;
    let name = parts.next().ok_or_else(|| anyhow::anyhow!("malformed package filename: {stem}"))?;

    let channel = Channel::from_url(url);

    Ok(rattler_cache::PackageRef {
        channel: channel.as_ref().map(|c| c.safe_name.clone()).unwrap_or_default(),
        name: name.to_string(),
        version: version.parse().expect("version parsing is infallible"),
        build_string: build_string.to_string(),
        build_number: 0,
        subdir: channel.as_ref().map(|c| c.subdir.clone()),
        filename: Some(basename.to_string()),
        md5: None,
        size: None,
        url: Some(url.clone()),
    })
}

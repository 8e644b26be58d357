//! Explicit configuration, threaded through constructors rather than read
//! from a global or process-wide singleton.

/// The sentinel filename that marks a directory as a recognized cache
/// layout level and doubles as the writability probe target.
pub const DEFAULT_MAGIC_FILE: &str = "urls.txt";

/// The one tarball extension this deployment recognizes.
pub const DEFAULT_TARBALL_EXT: &str = ".tar.bz2";

/// Settings shared by every `CacheRoot` constructed in a process.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub magic_file: String,
    pub tarball_ext: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            magic_file: DEFAULT_MAGIC_FILE.to_string(),
            tarball_ext: DEFAULT_TARBALL_EXT.to_string(),
        }
    }
}

/// Settings for a [`crate::executor::PipelineExecutor`] run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cache: CacheConfig,
    /// Suppresses progress bars.
    pub quiet: bool,
    /// Emits machine-readable progress instead of bars.
    pub json: bool,
    /// When set, `PipelineExecutor::execute` refuses to run and returns
    /// immediately — the executor asserts this is `false` in real use
    ///, the flag exists so a CLI can plan-and-print without fetching.
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            cache: CacheConfig::default(),
            quiet: false,
            json: false,
            dry_run: false,
        }
    }
}

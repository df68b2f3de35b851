use crate::Mode;

#[derive(Clone, Debug)]
pub struct FsConfig {
    /// Upper bound on the total number of file content bytes.
    pub capacity: u64,

    /// How many payloads the disk manager's cache keeps around.
    pub cache_entries: usize,

    /// Directories created under `/` when bootstrapping a fresh namespace.
    pub top_level_dirs: Vec<(String, Mode)>,
}

impl FsConfig {
    pub const DEFAULT_CAPACITY: u64 = 100 * 1024 * 1024;
    pub const DEFAULT_CACHE_ENTRIES: usize = 64;

    pub const TOP_LEVEL_DIRS: [&'static str; 11] = [
        "home", "bin", "etc", "var", "tmp", "usr", "opt", "mnt", "proc", "sys", "dev",
    ];

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_cache_entries(mut self, cache_entries: usize) -> Self {
        self.cache_entries = cache_entries;
        self
    }
}

impl Default for FsConfig {
    fn default() -> Self {
        let top_level_dirs = Self::TOP_LEVEL_DIRS
            .iter()
            .map(|name| {
                let mode = if *name == "tmp" {
                    Mode::new(0o1777)
                } else {
                    Mode::DIR_DEFAULT
                };

                (name.to_string(), mode)
            })
            .collect();

        Self {
            capacity: Self::DEFAULT_CAPACITY,
            cache_entries: Self::DEFAULT_CACHE_ENTRIES,
            top_level_dirs,
        }
    }
}

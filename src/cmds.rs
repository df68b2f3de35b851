mod create;
mod exec;
mod inspect;
mod useradd;

pub use self::create::*;
pub use self::exec::*;
pub use self::inspect::*;
pub use self::useradd::*;

use simfs::FsConfig;
use structopt::StructOpt;

/// Flags shared by every command that boots the namespace.
///
/// The capacity isn't among them: it's chosen by `create` and stays with the
/// snapshot from then on.
#[derive(Debug, StructOpt)]
pub struct ConfigArgs {
    /// Number of file payloads kept in the cache
    #[structopt(long, default_value = "64")]
    cache_entries: usize,
}

impl ConfigArgs {
    pub fn config(&self) -> FsConfig {
        FsConfig::default().with_cache_entries(self.cache_entries)
    }
}

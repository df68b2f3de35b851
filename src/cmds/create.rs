use super::ConfigArgs;
use anyhow::{Context, Result};
use simfs::{Filesystem, Store, UserDb};
use std::fs;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct CreateCmd {
    /// Path to the state directory
    src: PathBuf,

    /// When set, tries to remove `src` first
    #[structopt(short, long)]
    recreate: bool,

    /// Total number of content bytes the filesystem may hold
    #[structopt(long, default_value = "104857600")]
    capacity: u64,

    #[structopt(flatten)]
    config: ConfigArgs,
}

impl CreateCmd {
    pub fn run(self) -> Result<()> {
        if self.recreate && self.src.exists() {
            fs::remove_dir_all(&self.src)
                .with_context(|| format!("couldn't delete: {}", self.src.display()))?;
        }

        let store = Store::create(&self.src)?;
        let fs = Filesystem::new(&self.config.config().with_capacity(self.capacity));

        store.save(&fs)?;
        store.save_users(&UserDb::default())?;

        println!("ok");

        Ok(())
    }
}

use super::ConfigArgs;
use anyhow::Result;
use simfs::{FindPredicate, Identity, Store, VfsPath};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct InspectCmd {
    /// Path to the state directory
    src: PathBuf,

    #[structopt(flatten)]
    config: ConfigArgs,
}

impl InspectCmd {
    pub fn run(self) -> Result<()> {
        let store = Store::open(&self.src)?;
        let users = store.load_users();
        let fs = store.boot(&self.config.config());
        let root = Identity::root();

        let name_of = |uid: u32| {
            users
                .by_uid(uid)
                .map(|user| user.name.clone())
                .unwrap_or_else(|| uid.to_string())
        };

        for path in fs.find(&VfsPath::root(), FindPredicate::default(), &root)? {
            let stat = fs.lookup(&path, &root)?;

            println!(
                "{} {:>8} {:>8} {:>10} {}",
                stat.mode.display(stat.kind),
                name_of(stat.uid),
                stat.gid,
                stat.size,
                path
            );
        }

        let (used, capacity) = fs.usage();

        println!();
        println!("{} / {} bytes used", used, capacity);

        Ok(())
    }
}

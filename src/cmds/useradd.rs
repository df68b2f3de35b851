use super::ConfigArgs;
use anyhow::Result;
use simfs::{Identity, Mode, Store};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct UseraddCmd {
    /// Path to the state directory
    src: PathBuf,

    /// Login name
    name: String,

    /// Explicit uid; the next free one is picked otherwise
    #[structopt(short, long)]
    uid: Option<u32>,

    /// Password; without one the account can't authenticate
    #[structopt(short, long)]
    password: Option<String>,

    #[structopt(flatten)]
    config: ConfigArgs,
}

impl UseraddCmd {
    pub fn run(self) -> Result<()> {
        let store = Store::open(&self.src)?;
        let mut users = store.load_users();
        let fs = store.boot(&self.config.config());
        let root = Identity::root();

        let user = users
            .add_user(&self.name, self.uid, self.password.as_deref())?
            .clone();

        fs.mkdir(&user.home, Mode::DIR_DEFAULT, &root)?;
        fs.chown(&user.home, user.uid, Some(user.gid), &root)?;

        store.save(&fs)?;
        store.save_users(&users)?;

        println!("{} (uid={}, home={})", user.name, user.uid, user.home);

        Ok(())
    }
}

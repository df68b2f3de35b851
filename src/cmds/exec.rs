use super::ConfigArgs;
use anyhow::{Context, Result};
use simfs::{Session, Store};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use structopt::StructOpt;
use tracing::debug;

#[derive(Debug, StructOpt)]
pub struct ExecCmd {
    /// Path to the state directory
    src: PathBuf,

    /// User to run the commands as
    #[structopt(short, long, default_value = "root")]
    user: String,

    /// Command lines, e.g. "mkdir -p /tmp/a/b" "ls -l /tmp"
    commands: Vec<String>,

    #[structopt(flatten)]
    config: ConfigArgs,
}

impl ExecCmd {
    pub fn run(self) -> Result<()> {
        let store = Store::open(&self.src)?;
        let users = store.load_users();
        let fs = store.boot(&self.config.config());

        let mut session = Session::login(&fs, &users, &self.user)
            .with_context(|| format!("couldn't log in as {}", self.user))?;

        let mut status = 0;
        let mut stdout = std::io::stdout().lock();

        for line in &self.commands {
            debug!("$ {}", line);

            match session.exec(line) {
                Ok(out) => stdout.write_all(out.as_bytes())?,

                Err(err) => {
                    eprintln!("{}: {}", line.split_whitespace().next().unwrap_or(""), err);
                    status = err.log_and_convert();
                }
            }
        }

        stdout.flush()?;
        drop(stdout);

        store.save(&fs)?;
        store.save_users(&users)?;

        if status != 0 {
            process::exit(status);
        }

        Ok(())
    }
}

mod cmds;

use self::cmds::*;
use anyhow::Result;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

/// SimFS, an in-memory Unix-like filesystem with quotas, permissions and
/// snapshots
#[derive(Debug, StructOpt)]
enum Cmd {
    Create(CreateCmd),
    Exec(ExecCmd),
    Inspect(InspectCmd),
    Useradd(UseraddCmd),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cmd::from_args() {
        Cmd::Create(cmd) => cmd.run(),
        Cmd::Exec(cmd) => cmd.run(),
        Cmd::Inspect(cmd) => cmd.run(),
        Cmd::Useradd(cmd) => cmd.run(),
    }
}

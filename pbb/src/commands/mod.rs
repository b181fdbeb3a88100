mod branch;
mod init;
mod list;
mod load;
mod save;

use clap::{Parser, Subcommand};

/// Simple branching version control program.
#[derive(Parser)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new repository in the current directory.
    Init,

    /// Save a new snapshot of the current state of the directory.
    Save(save::Args),

    /// Load an existing snapshot or branch.
    Load(load::Args),

    /// Create a new branch.
    Branch(branch::Args),

    /// List snapshots and/or branches of the repository.
    List(list::Args)
}

pub fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    use Commands::*;

    match cli.command {
        Init => init::parse(),
        Save(args) => save::parse(args),
        Load(args) => load::parse(args),
        Branch(args) => branch::parse(args),
        List(args) => list::parse(args)
    }
}

use std::env::current_dir;

use clap::Args as A;
use eyre::Result;

use libpbb::repository::{Repository, SnapshotOutcome};

#[derive(A)]
pub struct Args {
    /// Assign a label to the snapshot.
    #[arg(short, long, default_value = "")]
    label: String,

    /// Attach a message to the snapshot.
    #[arg(short, long, default_value = "")]
    message: String,

    /// Record a user on the snapshot.
    #[arg(short, long, default_value = "")]
    user: String
}

pub fn parse(args: Args) -> Result<()> {
    let mut repo = Repository::open(current_dir()?, false)?;

    match repo.snapshot(&args.label, &args.message, &args.user)? {
        SnapshotOutcome::NoChanges => println!("No changes to repository"),

        SnapshotOutcome::Saved(hash) => println!("Saved snapshot {}", hash.full())
    }

    Ok(())
}

use std::{env::current_dir, process};

use clap::Args as A;
use eyre::Result;

use libpbb::{error::RepoError, repository::Repository};

#[derive(A)]
pub struct Args {
    /// The name of the new branch.
    name: String,

    /// The snapshot to branch from.
    /// Defaults to the current snapshot.
    snapshot: Option<String>
}

pub fn parse(args: Args) -> Result<()> {
    let repo = Repository::open(current_dir()?, false)?;

    match repo.create_branch(&args.name, args.snapshot.as_deref()) {
        Ok(hash) => {
            println!("Branch {:?} now points at {}", args.name, hash.full());

            Ok(())
        }

        Err(report) => match report.downcast_ref::<RepoError>() {
            Some(RepoError::InvalidHash { candidates, .. }) if !candidates.is_empty() => {
                eprintln!("{report}");

                for candidate in candidates {
                    eprintln!("  - {candidate}");
                }

                process::exit(1);
            }

            _ => Err(report)
        }
    }
}

use std::{env::current_dir, process};

use clap::Args as A;
use eyre::Result;

use libpbb::{error::RepoError, repository::Repository};

#[derive(A)]
pub struct Args {
    /// The snapshot digest (or unique prefix) to load,
    /// or a branch name with -b.
    snapshot: String,

    /// Treat the identifier as a branch name.
    #[arg(short, long)]
    branch: bool,

    /// Create a new branch at the target snapshot before switching.
    #[arg(short, long, value_name = "NAME")]
    create: Option<String>,

    /// Force the checkout even with unsaved changes in the directory.
    #[arg(short, long)]
    force: bool
}

pub fn parse(args: Args) -> Result<()> {
    let mut repo = Repository::open(current_dir()?, false)?;

    let result = if args.branch {
        repo.checkout_branch(&args.snapshot, args.force)
    }
    else {
        repo.checkout(&args.snapshot, args.force, args.create.as_deref())
    };

    match result {
        Ok(hash) => {
            println!("Loaded snapshot {}", hash.full());

            Ok(())
        }

        Err(report) => match report.downcast_ref::<RepoError>() {
            Some(RepoError::DirtyDirectory) => {
                eprintln!("{report}");
                eprintln!("Use -f (--force) to override. All changes since the last snapshot will be lost.");

                process::exit(1);
            }

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

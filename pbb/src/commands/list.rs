use std::env::current_dir;

use clap::Args as A;
use eyre::Result;

use libpbb::repository::Repository;

#[derive(A)]
pub struct Args {
    /// Display the list of snapshots.
    #[arg(short, long)]
    snapshots: bool,

    /// Display the list of branches.
    #[arg(short, long)]
    branches: bool,

    /// Display detailed information.
    #[arg(short, long)]
    detailed: bool
}

pub fn parse(args: Args) -> Result<()> {
    let repo = Repository::open(current_dir()?, false)?;

    let show_both = !args.snapshots && !args.branches;

    let (current_hash, _) = repo.current_snapshot_hash()?;
    let current_branch = repo.current_branch()?;

    if args.snapshots || show_both {
        print_snapshots(&repo, args.detailed, current_hash.map(|hash| hash.full()), &current_branch)?;
    }

    if args.branches || show_both {
        print_branches(&repo, &current_branch)?;
    }

    Ok(())
}

fn print_snapshots(
    repo: &Repository,
    detailed: bool,
    current_hash: Option<String>,
    current_branch: &Option<String>
) -> Result<()>
{
    println!("\nSnapshots:");

    let header = if detailed {
        format!(
            "  {: <3} {: <40} {: <10} {: <19} {: <10} {: <10} {}",
            "id", "hash", "branch", "timestamp", "label", "user", "message"
        )
    }
    else {
        format!("  {: <3} {: <40} {: <10} {}", "id", "hash", "branch", "timestamp")
    };

    println!("{header}");
    println!("{}", "-".repeat(header.len()));

    for row in repo.list_snapshots()? {
        let marker = if Some(&row.hash) == current_hash.as_ref()
            && Some(&row.branch) == current_branch.as_ref()
        {
            '*'
        }
        else {
            ' '
        };

        let timestamp = row.timestamp.to_string();

        if detailed {
            println!(
                "{marker} {: <3} {: <40} {: <10} {: <19} {: <10} {: <10} {}",
                row.id, row.hash, row.branch, timestamp, row.label, row.user, row.message
            );
        }
        else {
            println!(
                "{marker} {: <3} {: <40} {: <10} {}",
                row.id, row.hash, row.branch, timestamp
            );
        }
    }

    Ok(())
}

fn print_branches(repo: &Repository, current_branch: &Option<String>) -> Result<()> {
    println!("\nBranches:");

    for name in repo.list_branches()? {
        let marker = if Some(&name) == current_branch.as_ref() { '*' } else { ' ' };

        println!(" {marker} {name}");
    }

    Ok(())
}

use std::env::current_dir;

use eyre::Result;

use libpbb::repository::Repository;

pub fn parse() -> Result<()> {
    let root_dir = current_dir()?;

    let repo = Repository::open(&root_dir, true)?;

    println!("Initialized repository in {}", repo.root_dir.display());

    Ok(())
}

use std::{fs::{self, File}, io::Write, path::Path};

use eyre::{Context, Result};
use serde::Serialize;

use crate::unwrap;

/// Open a file on disk.
///
/// This wraps [`File::open`] to also include the path that was opened
/// in the case of an error.
pub fn open_file(path: impl AsRef<Path>) -> Result<File> {
    File::open(&path)
        .wrap_err_with(|| format!(
            "failed to open path {}",
            path.as_ref().display()
        )
    )
}

/// Create a file on disk.
///
/// This wraps [`File::create`] to also include the path that was created
/// in the case of an error.
pub fn create_file(path: impl AsRef<Path>) -> Result<File> {
    File::create(&path)
        .wrap_err_with(|| format!(
            "failed to create path {}",
            path.as_ref().display()
        )
    )
}

pub fn save_as_msgpack<T: Serialize>(data: &T, path: impl AsRef<Path>) -> Result<()> {
    let mut fp = create_file(path)?;

    let bytes = rmp_serde::to_vec(data)?;

    fp.write_all(&bytes)?;

    Ok(())
}

/// List the names of the immediate subdirectories of `directory`, skipping
/// any named `exclude`, sorted by name.
///
/// Sorting makes tree digests independent of filesystem enumeration order,
/// so the same working tree always hashes the same on every platform.
pub fn list_directories(directory: &Path, exclude: &str) -> Result<Vec<String>> {
    list_entries(directory, |file_type| file_type.is_dir(), Some(exclude))
}

/// List the names of the immediate files of `directory`, sorted by name.
pub fn list_files(directory: &Path) -> Result<Vec<String>> {
    list_entries(directory, |file_type| file_type.is_file(), None)
}

fn list_entries(
    directory: &Path,
    keep: impl Fn(fs::FileType) -> bool,
    exclude: Option<&str>
) -> Result<Vec<String>>
{
    let entries = unwrap!(
        fs::read_dir(directory),
        "failed to read contents of directory: {}", directory.display()
    );

    let mut names = vec![];

    for entry in entries {
        let entry = entry?;

        if !keep(entry.file_type()?) {
            continue;
        }

        let name = unwrap!(
            entry.file_name().into_string().ok(),
            "file name contains invalid UTF-8 in: {}", directory.display()
        );

        if exclude == Some(name.as_str()) {
            continue;
        }

        names.push(name);
    }

    names.sort();

    Ok(names)
}

/// Join a POSIX-normalized path key with a child name.
///
/// These keys index the path cache: `.` for the working-tree root, then
/// forward-slash-joined relative paths below it.
pub fn posix_join(base: &str, name: &str) -> String {
    if base == "." {
        name.to_string()
    }
    else {
        format!("{base}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{list_directories, list_files, posix_join};

    #[test]
    fn join_from_root_drops_the_dot() {
        assert_eq!(posix_join(".", "notes.txt"), "notes.txt");
    }

    #[test]
    fn join_below_root_uses_forward_slashes() {
        assert_eq!(posix_join("a/b", "c.txt"), "a/b/c.txt");
    }

    #[test]
    fn listings_are_sorted_and_respect_the_exclusion() {
        let dir = tempfile::tempdir().unwrap();

        fs::create_dir(dir.path().join("zebra")).unwrap();
        fs::create_dir(dir.path().join("apple")).unwrap();
        fs::create_dir(dir.path().join(".pbb")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        assert_eq!(list_directories(dir.path(), ".pbb").unwrap(), ["apple", "zebra"]);
        assert_eq!(list_files(dir.path()).unwrap(), ["a.txt", "b.txt"]);
    }
}

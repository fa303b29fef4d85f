//! Attribute-preserving file copy

use crate::types::SyncError;
use filetime::FileTime;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const BUFFER_SIZE: usize = 128 * 1024;

/// Copy a file over `dest`, preserving permissions and timestamps
///
/// 1. Write to a hidden `.part` sibling of `dest`
/// 2. Flush and sync to disk
/// 3. Copy permissions, access and modification times
/// 4. Rename over `dest`, replacing any previous version
///
/// The rename never crosses devices since the `.part` file lives next to
/// `dest`. A failed copy removes its `.part` file.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes copied
/// * `Err(SyncError)` - IO error; `dest` is left untouched
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64, SyncError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let part_path = part_path_for(dest);
    let result = write_part(src, &part_path).and_then(|bytes| {
        fs::rename(&part_path, dest)?;
        Ok(bytes)
    });

    if result.is_err() {
        let _ = fs::remove_file(&part_path);
    }
    result
}

fn write_part(src: &Path, part_path: &Path) -> Result<u64, SyncError> {
    let mut src_file = File::open(src)?;
    let mut part_file = File::create(part_path)?;

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = src_file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        part_file.write_all(&buffer[..bytes_read])?;
        total_bytes += bytes_read as u64;
    }

    part_file.sync_all()?;
    // Drop the handle before touching metadata and renaming (required on Windows)
    drop(part_file);

    let src_metadata = fs::metadata(src)?;
    fs::set_permissions(part_path, src_metadata.permissions())?;
    filetime::set_file_times(
        part_path,
        FileTime::from_last_access_time(&src_metadata),
        FileTime::from_last_modification_time(&src_metadata),
    )?;

    Ok(total_bytes)
}

fn part_path_for(dest: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path_is_hidden_sibling() {
        assert_eq!(
            part_path_for(Path::new("/d/report.pdf")),
            PathBuf::from("/d/.report.pdf.part")
        );
        assert_eq!(
            part_path_for(Path::new("/d/Makefile")),
            PathBuf::from("/d/.Makefile.part")
        );
    }
}

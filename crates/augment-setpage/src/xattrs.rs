//! Extended-attribute stash: preserved across the rename-out/rename-in
//! pass since most filesystems keep xattrs with the inode but some
//! workflows (archive/restore, network mounts) don't.
//! Grounded on the fixed attribute list the original host reads per
//! UUID directory.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// The fixed set of xattrs read from, and restored to, each UUID
/// directory.
pub const TRACKED_XATTRS: &[&str] = &[
 "user.song-index",
 "user.song-color",
 "user.last-modified-time",
 "user.was-externally-modified",
 "user.local-cloud-state",
];

/// Reads every tracked xattr from every UUID subdirectory of `library_dir`
/// and appends `uuid attr value` lines to `stash_dir/xattrs.txt`.
pub fn save_xattrs(library_dir: &Path, stash_dir: &Path) -> std::io::Result<()> {
 fs::create_dir_all(stash_dir)?;
 let path = stash_dir.join("xattrs.txt");
 let mut file = fs::File::create(path)?;

 let entries = match fs::read_dir(library_dir) {
 Ok(e) => e,
 Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
 Err(e) => return Err(e),
 };

 for entry in entries {
 let entry = entry?;
 if !entry.file_type()?.is_dir() {
 continue;
 }
 let uuid = entry.file_name();
 let uuid = uuid.to_string_lossy();
 for attr in TRACKED_XATTRS {
 if let Ok(Some(value)) = xattr::get(entry.path(), attr) {
 let value = String::from_utf8_lossy(&value);
 writeln!(file, "{uuid} {attr} {value}")?;
 }
 }
 }
 Ok(())
}

/// Restores xattrs previously written by `save_xattrs` onto the UUID
/// directories now present in `library_dir`.
pub fn restore_xattrs(library_dir: &Path, stash_dir: &Path) -> std::io::Result<()> {
 let path = stash_dir.join("xattrs.txt");
 let file = match fs::File::open(&path) {
 Ok(f) => f,
 Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
 Err(e) => return Err(e),
 };

 for line in BufReader::new(file).lines() {
 let line = line?;
 let mut parts = line.splitn(3, ' ');
 let (Some(uuid), Some(attr), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
 continue;
 };
 let target = library_dir.join(uuid);
 if target.is_dir() {
 let _ = xattr::set(&target, attr, value.as_bytes());
 }
 }
 Ok(())
}

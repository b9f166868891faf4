// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Various helper functions for other modules.

use std::{
    ffi::{CString, NulError, OsStr},
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use smallvec::SmallVec;

/// The inline capacity used when building paths. Longer paths spill onto the heap.
const MAX_PATH: usize = 256;

/// Gets a [`CString`] from an [`OsStr`].
///
/// # Errors
///
/// May return an `Error` if the string contains an interior nul byte.
pub(crate) fn os_to_cstring(str: &OsStr) -> Result<CString, NulError> {
    CString::new(str.as_bytes())
}

/// Gets a [`CString`] path given a directory prefix and a relative filename.
///
/// A separator is only inserted when the prefix does not already end with one.
///
/// # Errors
///
/// May return an `Error` if either part contains an interior nul byte.
pub(crate) fn join_cstring(prefix: &Path, filename: &[u8]) -> Result<CString, NulError> {
    let prefix = prefix.as_os_str().as_bytes();
    let mut path_buf: SmallVec<[u8; MAX_PATH]> =
        SmallVec::with_capacity(prefix.len() + 1 + filename.len());

    path_buf.extend_from_slice(prefix);
    if !prefix.ends_with(b"/") {
        path_buf.push(b'/');
    }
    path_buf.extend_from_slice(filename);

    CString::new(path_buf.into_vec())
}

/// Gets the path of a script named `name` inside of a script directory.
#[must_use = "Has no effect if the result is unused"]
pub fn script_path(script_dir: &Path, name: &str) -> PathBuf {
    script_dir.join(format!("{name}.sh"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_cstring() -> Result<(), NulError> {
        let path = join_cstring(Path::new("/system/bin"), b"sh")?;
        assert_eq!(path.as_bytes(), b"/system/bin/sh");
        let path = join_cstring(Path::new("/system/bin/"), b"sh")?;
        assert_eq!(path.as_bytes(), b"/system/bin/sh");
        assert!(join_cstring(Path::new("/bin"), b"s\0h").is_err());
        Ok(())
    }

    #[test]
    fn test_script_path() {
        assert_eq!(
            script_path(Path::new("/system/bootmenu/script"), "2nd-boot"),
            PathBuf::from("/system/bootmenu/script/2nd-boot.sh")
        );
    }
}

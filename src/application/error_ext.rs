//! Attaching map file paths to I/O failures

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

pub trait IoResultExt<T> {
    /// Wrap an I/O error as [`ApplicationError::MapFile`] naming `path`.
    ///
    /// ```ignore
    /// fs.read_to_string(path).for_map_file("read", path)?;
    /// ```
    fn for_map_file(self, action: &'static str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn for_map_file(self, action: &'static str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::MapFile {
            action,
            path: path.to_path_buf(),
            source,
        })
    }
}

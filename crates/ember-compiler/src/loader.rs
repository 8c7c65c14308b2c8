//! Import resolution is a thin external collaborator; this trait is the
//! seam that keeps the compiler decoupled from the filesystem so
//! `emberc` (or a test) can supply its own loader.

use std::fs;
use std::io;
use std::path::Path;

pub trait SourceLoader {
    /// Reads the source text at `path`. `path` is exactly the string the
    /// `import "..."` statement carried, resolved relative to the
    /// process's current working directory - not to the directory of the
    /// file doing the importing.
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Default loader used by `emberc`: a plain whole-file read, relative to
/// the process's current working directory.
#[derive(Debug, Default)]
pub struct FsSourceLoader;

impl SourceLoader for FsSourceLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

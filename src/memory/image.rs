//! Loading raw binary program images.
//!
//! An image has no header: its bytes are copied into memory starting at
//! address `0x0000`. Images longer than the memory are truncated at the
//! boundary, shorter ones leave the remaining bytes zeroed.

use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use super::{Byte, Memory};

#[derive(Debug)]
pub struct ImageError {
    path: PathBuf,
    source: io::Error,
}

impl ImageError {
    fn new<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    /// The image that failed to load
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to read image `{}`", self.path.display())
    }
}

impl error::Error for ImageError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.source)
    }
}

impl<const S: usize> Memory<S> {
    /// Copies `image` into memory starting at address 0.
    ///
    /// Returns the number of bytes that were loaded, which is at most `S`.
    pub fn load_image(&mut self, image: &[Byte]) -> usize {
        let len = image.len().min(S);
        self.data[..len].copy_from_slice(&image[..len]);

        if image.len() > S {
            log::warn!(
                "image is {} bytes long, truncated to the first {}",
                image.len(),
                S
            );
        }

        len
    }

    /// Creates zeroed memory and loads the image stored at `path` into it.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| ImageError::new(path, err))?;

        // Read one byte past the boundary so truncation can be reported
        let mut image = Vec::new();
        file.take(S as u64 + 1)
            .read_to_end(&mut image)
            .map_err(|err| ImageError::new(path, err))?;

        let mut memory = Self::default();
        let loaded = memory.load_image(&image);
        log::info!("Loaded {} bytes into memory", loaded);

        Ok(memory)
    }
}

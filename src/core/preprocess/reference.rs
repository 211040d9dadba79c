//! Image references and byte loading.
//!
//! Large files are memory-mapped to skip the kernel-to-user copy; small files
//! and in-memory buffers are read directly.

use crate::error::DecodeError;
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Minimum file size to use memory-mapped I/O (1MB)
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Opaque handle to the bytes of one image.
///
/// Owned by the caller and cheap to clone; the bytes are only read when the
/// image is preprocessed.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// An image file on disk
    File(PathBuf),
    /// An image already held in memory (e.g. handed over by a picker)
    Memory { name: String, bytes: Arc<[u8]> },
}

impl ImageReference {
    /// Reference an image file
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        ImageReference::File(path.into())
    }

    /// Reference an in-memory image
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        ImageReference::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// The file path, for file references
    pub fn path(&self) -> Option<&Path> {
        match self {
            ImageReference::File(path) => Some(path),
            ImageReference::Memory { .. } => None,
        }
    }

    /// Load the referenced bytes.
    pub fn read_bytes(&self) -> Result<ImageBytes, DecodeError> {
        match self {
            ImageReference::File(path) => read_file_bytes(path),
            ImageReference::Memory { bytes, .. } => Ok(ImageBytes::Shared(Arc::clone(bytes))),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::File(path) => write!(f, "{}", path.display()),
            ImageReference::Memory { name, .. } => write!(f, "memory:{}", name),
        }
    }
}

impl fmt::Debug for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::File(path) => f.debug_tuple("File").field(path).finish(),
            ImageReference::Memory { name, bytes } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// Image bytes that may be owned, shared or memory-mapped.
pub enum ImageBytes {
    /// Standard heap-allocated bytes
    Vec(Vec<u8>),
    /// Memory-mapped bytes (zero-copy from disk)
    Mmap(Mmap),
    /// Bytes shared with an in-memory reference
    Shared(Arc<[u8]>),
}

impl AsRef<[u8]> for ImageBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            ImageBytes::Vec(v) => v,
            ImageBytes::Mmap(m) => m,
            ImageBytes::Shared(s) => s,
        }
    }
}

impl std::ops::Deref for ImageBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

fn io_error(path: &Path, source: std::io::Error) -> DecodeError {
    if source.kind() == ErrorKind::NotFound {
        DecodeError::NotFound {
            reference: path.display().to_string(),
        }
    } else {
        DecodeError::Io {
            reference: path.display().to_string(),
            source,
        }
    }
}

fn read_file_bytes(path: &Path) -> Result<ImageBytes, DecodeError> {
    let metadata = std::fs::metadata(path).map_err(|e| io_error(path, e))?;

    if metadata.len() >= MMAP_THRESHOLD {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        // SAFETY: the map is read-only and owns its own handle to the file.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| io_error(path, e))?;
        Ok(ImageBytes::Mmap(mmap))
    } else {
        let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
        Ok(ImageBytes::Vec(bytes))
    }
}

/// Check magic bytes to reject non-images before a full decode.
pub fn validate_image_header(bytes: &[u8]) -> bool {
    if bytes.len() < 8 {
        return false;
    }

    // JPEG: FF D8 FF
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return true;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return true;
    }

    // GIF87a / GIF89a
    if bytes.starts_with(b"GIF8") {
        return true;
    }

    // WebP: RIFF....WEBP
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return true;
    }

    // BMP
    if bytes.starts_with(b"BM") {
        return true;
    }

    // TIFF, little or big endian
    bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
}

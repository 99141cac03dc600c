//! Raw copies between memory and files.
//!
//! Transfers move at most one 64K page, [`MAX_TRANSFER`] bytes; longer
//! buffers are truncated to that count.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Largest single transfer, the widest 16-bit byte count.
pub const MAX_TRANSFER: usize = u16::MAX as usize;

fn check_args(path: &Path, len: usize) -> io::Result<usize> {
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }
    if len == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty buffer"));
    }
    Ok(len.min(MAX_TRANSFER))
}

/// Fills `dest` from the start of the file at `path`.
///
/// Returns the number of bytes read, which is short when the file is.
///
/// # Errors
///
/// - [`io::ErrorKind::InvalidInput`] for an empty path or buffer
/// - any error opening or reading the file
pub fn load_from_file(path: impl AsRef<Path>, dest: &mut [u8]) -> io::Result<usize> {
    let path = path.as_ref();
    let count = check_args(path, dest.len())?;

    let mut file = File::open(path)?;
    let mut loaded = 0;
    while loaded < count {
        match file.read(&mut dest[loaded..count]) {
            Ok(0) => break,
            Ok(n) => loaded += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }

    realmode_log::debug!("loaded {loaded} bytes from {}", path.display());
    Ok(loaded)
}

/// Writes `src` to the file at `path`, creating or truncating it.
///
/// # Errors
///
/// - [`io::ErrorKind::InvalidInput`] for an empty path or buffer
/// - any error creating or writing the file
pub fn save_to_file(path: impl AsRef<Path>, src: &[u8]) -> io::Result<usize> {
    let path = path.as_ref();
    let count = check_args(path, src.len())?;

    let mut file = File::create(path)?;
    file.write_all(&src[..count])?;
    file.flush()?;

    realmode_log::debug!("saved {count} bytes to {}", path.display());
    Ok(count)
}

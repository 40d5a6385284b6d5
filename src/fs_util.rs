use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::OsdrError;

pub const CHUNK_SIZE: usize = 8192;

/// Streams `reader` into `destination` in `CHUNK_SIZE` pieces.
///
/// Missing parent directories are created. The body lands in a temporary
/// file next to the destination and is renamed into place once the stream
/// is exhausted, so an interrupted transfer never leaves a partial file
/// under the final name. Returns the number of bytes written.
pub fn write_stream_atomic<R: Read>(reader: &mut R, destination: &Path) -> Result<u64, OsdrError> {
    let parent = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|err| {
        OsdrError::Filesystem(format!("create {}: {err}", parent.display()))
    })?;

    let mut temp = tempfile::Builder::new()
        .prefix(".osdr-dl")
        .tempfile_in(parent)
        .map_err(|err| OsdrError::Filesystem(err.to_string()))?;

    let mut buffer = [0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(OsdrError::DownloadHttp(err.to_string())),
        };
        if read == 0 {
            break;
        }
        temp.write_all(&buffer[..read])
            .map_err(|err| OsdrError::Filesystem(err.to_string()))?;
        written += read as u64;
    }
    temp.flush()
        .map_err(|err| OsdrError::Filesystem(err.to_string()))?;

    temp.persist(destination).map_err(|err| {
        OsdrError::Filesystem(format!("persist {}: {}", destination.display(), err.error))
    })?;
    Ok(written)
}

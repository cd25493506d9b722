use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Error, Result};

/// Local file header signature.
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// How a payload is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Json,
    Zip,
}

/// Sniff the payload kind from its first bytes, then rewind.
pub fn detect_kind<R: Read + Seek>(reader: &mut R) -> io::Result<PayloadKind> {
    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        match reader.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    reader.seek(SeekFrom::Start(0))?;

    Ok(if filled == magic.len() && &magic == ZIP_MAGIC {
        PayloadKind::Zip
    } else {
        PayloadKind::Json
    })
}

/// Open the payload at `path` and hand its JSON stream to `f`.
///
/// The file (and archive entry, if any) stays open only for the duration of
/// `f` and is closed on every exit path.
pub fn open_payload<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce(&mut dyn Read) -> Result<T>,
{
    let file = File::open(path).map_err(|source| Error::ResourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Opened payload {}", path.display());
    read_payload(file, f)
}

/// Like [`open_payload`], for an already opened source.
///
/// For a zip archive the first file entry is streamed; directories are
/// skipped and an archive without files is [`Error::EmptyArchive`].
pub fn read_payload<R, T, F>(mut reader: R, f: F) -> Result<T>
where
    R: Read + Seek,
    F: FnOnce(&mut dyn Read) -> Result<T>,
{
    match detect_kind(&mut reader)? {
        PayloadKind::Json => f(&mut reader),
        PayloadKind::Zip => {
            let mut archive = ZipArchive::new(reader)?;

            let mut first = None;
            for i in 0..archive.len() {
                if archive.by_index(i)?.is_file() {
                    first = Some(i);
                    break;
                }
            }
            let index = first.ok_or(Error::EmptyArchive)?;

            let mut entry = archive.by_index(index)?;
            log::debug!("Streaming archive entry {} ({} bytes)", entry.name(), entry.size());
            f(&mut entry)
        }
    }
}

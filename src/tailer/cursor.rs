use crate::config::types::ReadStart;
use std::fs::{File, Metadata};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const READ_CHUNK: usize = 8 * 1024;

/// The file currently being tailed and its unread partial line.
///
/// Bytes after the last newline stay in `pending` until a later read
/// completes the line. Replacing the `ActiveFile` drops that fragment.
#[derive(Debug)]
pub struct ActiveFile {
    path: PathBuf,
    file: File,
    pending: Vec<u8>,
    offset: u64,
    inode: Option<u64>,
}

impl ActiveFile {
    pub fn open(path: &Path, start: ReadStart) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let inode = get_inode(&file.metadata()?);
        let offset = match start {
            ReadStart::Beginning => 0,
            ReadStart::End => file.seek(SeekFrom::End(0))?,
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            pending: Vec::new(),
            offset,
            inode,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte position of the read cursor
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether `path` names this file. Only the file name is compared, since
    /// the watch backend and the directory scan may spell the parent differently.
    pub fn is_same_file(&self, path: &Path) -> bool {
        path.file_name().is_some() && path.file_name() == self.path.file_name()
    }

    /// Whether `path` currently refers to the very file this handle has open.
    /// A file renamed away and replaced under the same name is not.
    pub fn is_open_at(&self, path: &Path) -> bool {
        match (self.inode, std::fs::metadata(path)) {
            (Some(inode), Ok(metadata)) => get_inode(&metadata) == Some(inode),
            _ => false,
        }
    }

    /// Read everything appended since the last call and return the complete
    /// lines, without their line terminators. End of file yields no lines.
    pub fn read_lines(&mut self) -> io::Result<Vec<String>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    self.offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(self.split_complete_lines())
    }

    fn split_complete_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..last_newline]
            .split(|&b| b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .collect()
    }
}

#[cfg(unix)]
fn get_inode(metadata: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn get_inode(_metadata: &Metadata) -> Option<u64> {
    None
}

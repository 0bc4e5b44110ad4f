/*!
    Byte inputs that extractors read containers from.
*/

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use media_types::{Error, Result};
use tracing::error;

/**
    Random-access byte input consumed by extractor implementations.
*/
pub trait ByteInput: Send {
    /**
        Read up to `buf.len()` bytes. Returns 0 at end of input.
    */
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /**
        Move the read cursor to an absolute byte offset.
    */
    fn seek(&mut self, position: u64) -> Result<()>;

    /**
        Total size in bytes, without disturbing the read cursor.
    */
    fn size(&mut self) -> Result<u64>;

    fn close(&mut self) -> Result<()>;
}

/**
    [`ByteInput`] over a local file.
*/
#[derive(Debug)]
pub struct FileInput {
    path: PathBuf,
    file: Option<File>,
}

impl FileInput {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            error!("failed to open file {}: {e}", path.display());
            Error::from(e)
        })?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| Error::invalid_state("file input already closed"))
    }
}

impl ByteInput for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file()?.read(buf).map_err(|e| {
            error!("file read error: {e}");
            Error::Io(e.to_string())
        })
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.file()?.seek(SeekFrom::Start(position)).map_err(|e| {
            error!("file seek error: {e}");
            Error::Io(e.to_string())
        })?;
        Ok(())
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_none() {
            return Err(Error::invalid_state("file input already closed"));
        }
        Ok(())
    }
}

//! FileSink - appends payloads to `<output_dir>/<destination>.txt`

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ByteSink, ContractError, EndpointId};
use tracing::{debug, error, instrument};

/// Sink that appends raw payloads to one file per destination
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// File name used for `destination` inside an output directory
    pub fn file_name(destination: EndpointId) -> String {
        format!("{destination}.txt")
    }

    /// Open (or create) the append-mode file for `destination`
    pub fn open(output_dir: impl AsRef<Path>, destination: EndpointId) -> std::io::Result<Self> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let path = output_dir.join(Self::file_name(destination));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "FileSink opened");

        Ok(Self {
            name: format!("file:{destination}"),
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "trace", name = "file_sink_append", skip_all, fields(sink = %self.name, len = bytes.len()))]
    fn append(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(ContractError::sink_write(&self.name, "sink already closed"));
        };
        writer.write_all(bytes).map_err(|e| {
            error!(sink = %self.name, error = %e, "append failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        match self.writer.as_mut() {
            Some(writer) => writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string())),
            None => Ok(()),
        }
    }

    #[instrument(name = "file_sink_close", skip(self), fields(sink = %self.name))]
    fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
            debug!(path = %self.path.display(), "FileSink closed");
        }
        Ok(())
    }
}

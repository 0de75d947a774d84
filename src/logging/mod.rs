use std::{
    fs::{create_dir_all, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use env_logger::Builder;
use log::LevelFilter;

use crate::{
    config,
    core::{ErrorContext, LoaderResult},
};

/// Writer that appends log records to a shared file handle
#[derive(Clone)]
pub struct FileWriter {
    file: Arc<Mutex<io::BufWriter<std::fs::File>>>,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self
            .file
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        file.write_all(buf)?;
        // records are written whole, flush so nothing sits in the buffer
        file.flush()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        file.flush()
    }
}

pub struct Logger {
    config: config::Log,
}

impl Logger {
    pub fn new(config: config::Log) -> Self {
        Self { config }
    }

    /// Open the configured log file, creating its directory if needed
    fn create_file_writer(&self, log_file_path: &str) -> LoaderResult<FileWriter> {
        if let Some(parent) = Path::new(log_file_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent).with_context("Failed to create log path")?;
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(log_file_path)
            .with_context("Failed to open or create log file")?;

        Ok(FileWriter {
            file: Arc::new(Mutex::new(io::BufWriter::new(file))),
        })
    }

    fn builder(&self) -> LoaderResult<Builder> {
        let mut builder = Builder::from_env(env_logger::Env::default());
        builder.filter(None, LevelFilter::from(self.config.level));

        if let Some(path) = &self.config.path {
            let writer = self.create_file_writer(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(writer)));
        }

        Ok(builder)
    }

    /// Install the global logger
    ///
    /// Fails when a logger is already installed.
    pub fn init_env_logger(&self) -> LoaderResult<()> {
        self.builder()?
            .try_init()
            .with_context("Failed to install logger")
    }
}

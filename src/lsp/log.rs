use chrono::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{Error, ErrorKind};
use std::path::Path;

/// The workflow's log file. Every line is prefixed with a local timestamp.
pub struct LspLog {
    file_name: String,
    file: File,
}

impl LspLog {
    /// Creates the log file, refusing to touch one that already exists.
    pub fn create(file_name: &str) -> Result<LspLog, Error> {
        if Path::new(file_name).exists() {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                format!("Log file {} already exists.", file_name),
            ));
        }
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(file_name)?;
        Ok(LspLog {
            file_name: file_name.to_string(),
            file,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn write(&mut self, message: &str) -> Result<(), Error> {
        let now = Local::now();
        writeln!(self.file, "[{}] {}", now.format("%Y-%m-%d %H:%M:%S"), message)?;
        self.file.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_lines_are_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("run.log").to_string_lossy().to_string();
        let mut log = LspLog::create(&f).unwrap();
        log.write("first").unwrap();
        log.write("second").unwrap();
        let contents = fs::read_to_string(&f).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('[') && lines[0].ends_with("] first"));
        assert_eq!(log.file_name(), f);
    }

    #[test]
    fn test_existing_log_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("run.log").to_string_lossy().to_string();
        fs::write(&f, "keep me").unwrap();
        let err = LspLog::create(&f).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&f).unwrap(), "keep me");
    }
}

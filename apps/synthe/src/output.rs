use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

/// File writer that creates its file on first write or flush, so a run that
/// emits nothing leaves no file behind.
pub struct LazyFile {
    path: PathBuf,
    file: Option<File>,
}

impl LazyFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            self.file = Some(File::create(&self.path)?);
        }
        match self.file.as_mut() {
            Some(f) => Ok(f),
            None => Err(io::Error::new(io::ErrorKind::Other, "output file not open")),
        }
    }
}

impl Write for LazyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("synthe_{}_{:x}.wav", tag, nanos))
    }

    #[test]
    fn test_no_file_until_written() {
        let path = temp_path("lazy");
        let out = LazyFile::new(path.clone());
        drop(out);
        assert!(!path.exists());
    }

    #[test]
    fn test_writes_exact_bytes() {
        let path = temp_path("write");
        let mut out = LazyFile::new(path.clone());
        out.write_all(b"RIFF\x00\x01").unwrap();
        out.flush().unwrap();
        drop(out);

        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF\x00\x01");
        std::fs::remove_file(&path).unwrap();
    }
}

use super::KeyValueStore;
use crate::error::{MentorError, Result};
use crate::log_debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// One `<key>.json` file per key inside a data directory.
///
/// Writes go to a sibling temp file first and are renamed into place so a crash
/// mid-write never leaves a half-written session list behind.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            MentorError::Storage(format!(
                "failed to create data dir '{}': {err}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Keys carry backend-assigned ids, so they are percent-encoded to keep the
/// file name a single component inside the data directory.
fn encode_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(MentorError::Storage(format!(
                "failed to read '{}': {err}",
                path.display()
            ))),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };
        write().map_err(|err| {
            let _ = fs::remove_file(&tmp);
            log_debug(&format!("FileStore write failed for {key}: {err}"));
            MentorError::Storage(format!("failed to write '{}': {err}", path.display()))
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MentorError::Storage(format!(
                "failed to remove '{}': {err}",
                path.display()
            ))),
        }
    }
}

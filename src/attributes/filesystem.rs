//! Filesystem attribute store: one `attributes.json` per group directory.

use super::{normalize_group, AttributeStore};
use crate::error::{ProjectError, Result};
use fs2::FileExt;
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Name of the per-group attributes file.
const ATTRIBUTES_FILE: &str = "attributes.json";

/// Staging file renamed over [`ATTRIBUTES_FILE`] on write.
const STAGING_FILE: &str = "attributes.json.tmp";

/// Sidecar lock file guarding a group's attributes.
const LOCK_FILE: &str = ".attributes.lock";

/// Attribute store rooted at a directory.
///
/// Writes go to a staging file that is synced and then renamed into
/// place, so readers see either the old or the new attributes, never a
/// partially written file. Each read or write holds an advisory lock on
/// the group only for the duration of that call.
#[derive(Clone, Debug)]
pub struct FsAttributeStore {
    root: PathBuf,
}

impl FsAttributeStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the attributes file of `group`.
    pub fn attributes_path(&self, group: &str) -> PathBuf {
        self.group_dir(group).join(ATTRIBUTES_FILE)
    }

    fn group_dir(&self, group: &str) -> PathBuf {
        let group = normalize_group(group);
        if group.is_empty() {
            self.root.clone()
        } else {
            self.root.join(group)
        }
    }

    fn acquire_lock(dir: &Path, exclusive: bool) -> Result<File> {
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        let locked = if exclusive {
            FileExt::try_lock_exclusive(&lock_file)
        } else {
            FileExt::try_lock_shared(&lock_file)
        };
        locked.map_err(|_| ProjectError::Locked)?;

        Ok(lock_file)
    }

    /// Shared lock for one read.
    ///
    /// In a project the process cannot write to, the lock file may not be
    /// creatable. An existing one is then locked through a read-only handle;
    /// without one the read proceeds unlocked.
    fn acquire_read_lock(dir: &Path) -> Result<Option<File>> {
        let error = match Self::acquire_lock(dir, false) {
            Ok(lock_file) => return Ok(Some(lock_file)),
            Err(ProjectError::Io(e)) => e,
            Err(other) => return Err(other),
        };

        match File::open(dir.join(LOCK_FILE)) {
            Ok(lock_file) => {
                FileExt::try_lock_shared(&lock_file).map_err(|_| ProjectError::Locked)?;
                Ok(Some(lock_file))
            }
            Err(_) => {
                tracing::warn!(
                    path = %dir.display(),
                    error = %error,
                    "Cannot create attribute lock file, reading unlocked"
                );
                Ok(None)
            }
        }
    }

    fn read_attributes(path: &Path) -> Result<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }

        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(attributes)) => Ok(attributes),
            Ok(_) => Err(ProjectError::malformed(
                path.display().to_string(),
                "expected a JSON object",
            )),
            Err(e) => Err(ProjectError::malformed(path.display().to_string(), e.to_string())),
        }
    }

    fn write_attributes(dir: &Path, attributes: &Map<String, Value>) -> Result<()> {
        let staging = dir.join(STAGING_FILE);
        {
            let mut file = File::create(&staging)?;
            serde_json::to_writer_pretty(&mut file, attributes)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&staging, dir.join(ATTRIBUTES_FILE))?;
        Ok(())
    }
}

impl AttributeStore for FsAttributeStore {
    fn get_attribute(&self, group: &str, key: &str) -> Result<Option<Value>> {
        let dir = self.group_dir(group);
        let path = dir.join(ATTRIBUTES_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let _lock = Self::acquire_read_lock(&dir)?;
        let mut attributes = Self::read_attributes(&path)?;
        Ok(attributes.remove(key))
    }

    fn set_attribute(&self, group: &str, key: &str, value: Value) -> Result<()> {
        let dir = self.group_dir(group);
        fs::create_dir_all(&dir)?;

        let _lock = Self::acquire_lock(&dir, true)?;
        let mut attributes = Self::read_attributes(&dir.join(ATTRIBUTES_FILE))?;
        attributes.insert(key.to_string(), value);
        Self::write_attributes(&dir, &attributes)?;

        tracing::debug!(group, key, path = %dir.display(), "Wrote attribute");
        Ok(())
    }
}

use anyhow::Context;
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// String values persisted by key, in the manner of a browser's `localStorage`.
pub trait LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, anyhow::Error>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), anyhow::Error>;

    fn remove_item(&mut self, key: &str) -> Result<(), anyhow::Error>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read `{key}`")),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        let path = self.path(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).with_context(|| format!("Failed to write `{key}`"))?;
        fs::rename(&staging, &path).with_context(|| format!("Failed to replace `{key}`"))
    }

    fn remove_item(&mut self, key: &str) -> Result<(), anyhow::Error> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove `{key}`")),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), anyhow::Error> {
        self.items.remove(key);
        Ok(())
    }
}

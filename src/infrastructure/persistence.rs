use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Key under which the bearer token is persisted.
pub const ID_TOKEN_KEY: &str = "idToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid token store format - {0}")]
    Format(#[from] serde_json::Error),
}

/// Persisted key-value storage for session secrets.
///
/// Backed by a JSON object on disk when opened from a path, or purely in
/// memory. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    path: Option<PathBuf>,
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl TokenStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str::<BTreeMap<String, String>>(&content)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path: Some(path),
            entries: Rc::new(RefCell::new(entries)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value.into());
        self.persist()
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let removed = self.entries.borrow_mut().remove(key);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// The token to send as `Authorization: Bearer`, if one is stored.
    pub fn bearer_token(&self) -> Option<String> {
        self.get(ID_TOKEN_KEY).filter(|token| !token.trim().is_empty())
    }

    pub fn store_tokens(&self, id_token: &str, refresh_token: Option<&str>) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.borrow_mut();
            entries.insert(ID_TOKEN_KEY.to_string(), id_token.to_string());
            if let Some(refresh) = refresh_token {
                entries.insert(REFRESH_TOKEN_KEY.to_string(), refresh.to_string());
            }
        }
        self.persist()
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.entries.borrow_mut().clear();
        self.persist()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&*self.entries.borrow())?;
        fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }
}

//! Sharded JSON-file document store.
//!
//! Each document lives in its own directory:
//!
//! ```text
//! <data_dir>/<collection>/<s1>/<s2>/<id>/document.json
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the id (see
//! [`RecordId::sharded_dir`]). Writes go to a sibling temporary file and are renamed into place,
//! so a reader never observes a half-written document. All collections opened from one
//! [`JsonFileStore`] share a single lock that serialises read-modify-write cycles.

use super::{ensure_unique, not_found, Collection, Document, Mutation};
use crate::constants::DOCUMENT_FILENAME;
use crate::error::{CoreError, CoreResult};
use crate::ids::RecordId;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Root of an on-disk document store.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Opens the store at `root`, creating the directory if needed.
    pub fn open(root: &Path) -> CoreResult<Self> {
        fs::create_dir_all(root).map_err(|source| CoreError::StorageIo {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn collection<T: Document>(&self) -> JsonFileCollection<T> {
        JsonFileCollection {
            dir: self.root.join(T::COLLECTION),
            lock: Arc::clone(&self.lock),
            _doc: PhantomData,
        }
    }
}

/// One collection directory inside a [`JsonFileStore`].
#[derive(Debug)]
pub struct JsonFileCollection<T> {
    dir: PathBuf,
    lock: Arc<Mutex<()>>,
    _doc: PhantomData<fn() -> T>,
}

impl<T: Document> JsonFileCollection<T> {
    fn guard(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| CoreError::Internal("document store lock poisoned".into()))
    }

    fn document_path(&self, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.dir).join(DOCUMENT_FILENAME)
    }

    fn read(&self, path: &Path) -> CoreResult<T> {
        let contents = fs::read_to_string(path).map_err(|source| CoreError::StorageIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut deserializer = serde_json::Deserializer::from_str(&contents);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            let field = err.path().to_string();
            let field = if field.is_empty() || field == "." {
                "<root>".to_string()
            } else {
                field
            };
            CoreError::StorageSchema {
                path: format!("{} ({field})", path.display()),
                message: err.into_inner().to_string(),
            }
        })
    }

    fn read_if_exists(&self, id: &RecordId) -> CoreResult<Option<T>> {
        let path = self.document_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        self.read(&path).map(Some)
    }

    fn write(&self, doc: &T) -> CoreResult<()> {
        let path = self.document_path(&doc.id());
        let dir = path
            .parent()
            .ok_or_else(|| CoreError::Internal(format!("no parent for {}", path.display())))?;
        fs::create_dir_all(dir).map_err(|source| CoreError::StorageIo {
            path: dir.to_path_buf(),
            source,
        })?;

        let bytes = serde_json::to_vec_pretty(doc).map_err(CoreError::StorageSerialization)?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, bytes).map_err(|source| CoreError::StorageIo {
            path: temp.clone(),
            source,
        })?;
        fs::rename(&temp, &path).map_err(|source| CoreError::StorageIo {
            path: path.clone(),
            source,
        })
    }

    /// Walks `<dir>/<s1>/<s2>/<id>/document.json`, skipping anything that does not parse.
    fn scan_unlocked(&self) -> Vec<T> {
        let mut docs = Vec::new();

        let s1_iter = match fs::read_dir(&self.dir) {
            Ok(it) => it,
            Err(_) => return docs,
        };
        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }
            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }
                let id_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };
                for id_ent in id_iter.flatten() {
                    let doc_path = id_ent.path().join(DOCUMENT_FILENAME);
                    if !doc_path.is_file() {
                        continue;
                    }
                    match self.read(&doc_path) {
                        Ok(doc) => docs.push(doc),
                        Err(e) => {
                            tracing::warn!(
                                collection = T::COLLECTION,
                                path = %doc_path.display(),
                                error = %e,
                                "skipping unreadable document"
                            );
                        }
                    }
                }
            }
        }

        docs
    }
}

impl<T: Document> Collection<T> for JsonFileCollection<T> {
    fn insert(&self, doc: T) -> CoreResult<T> {
        let _guard = self.guard()?;
        if self.document_path(&doc.id()).exists() {
            return Err(CoreError::Conflict(format!(
                "{} {} already exists",
                T::LABEL,
                doc.id()
            )));
        }
        ensure_unique(&doc, &self.scan_unlocked())?;
        self.write(&doc)?;
        Ok(doc)
    }

    fn get(&self, id: &RecordId) -> CoreResult<Option<T>> {
        let _guard = self.guard()?;
        self.read_if_exists(id)
    }

    fn scan(&self) -> CoreResult<Vec<T>> {
        let _guard = self.guard()?;
        Ok(self.scan_unlocked())
    }

    fn update(&self, id: &RecordId, mutation: Mutation<'_, T>) -> CoreResult<T> {
        let _guard = self.guard()?;
        let mut working = self.read_if_exists(id)?.ok_or_else(|| not_found::<T>(id))?;
        mutation(&mut working)?;
        ensure_unique(&working, &self.scan_unlocked())?;
        self.write(&working)?;
        Ok(working)
    }

    fn remove(&self, id: &RecordId) -> CoreResult<bool> {
        let _guard = self.guard()?;
        let dir = id.sharded_dir(&self.dir);
        if !dir.join(DOCUMENT_FILENAME).is_file() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(|source| CoreError::StorageIo { path: dir, source })?;
        Ok(true)
    }
}

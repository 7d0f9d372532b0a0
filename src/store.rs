//! Document store behind the admin surface.
//!
//! Documents are schemaless JSON objects with a store-assigned id, grouped
//! into a fixed set of collections. [`MemoryStore`] keeps them in memory and
//! [`JsonFileStore`] persists them to a single JSON file after every write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no document `{id}` in `{collection}`")]
    NotFound { collection: Collection, id: String },
    #[error("unknown collection `{0}`")]
    UnknownCollection(String),
    #[error("document does not match its record type: {0}")]
    InvalidDocument(#[source] serde_json::Error),
    #[error("reading or writing {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store file {path:?} is not valid JSON")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Blog,
    News,
    Forum,
    Admins,
    Users,
    ContactMessages,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Blog,
        Collection::News,
        Collection::Forum,
        Collection::Admins,
        Collection::Users,
        Collection::ContactMessages,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Blog => "blog",
            Collection::News => "news",
            Collection::Forum => "forum",
            Collection::Admins => "admins",
            Collection::Users => "users",
            Collection::ContactMessages => "contact-messages",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| StoreError::UnknownCollection(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

pub trait DocumentStore: Send + Sync {
    /// Store `fields` under a fresh id.
    fn create(&self, collection: Collection, fields: Fields) -> Result<Document, StoreError>;
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;
    /// All documents of `collection`, ordered by id.
    fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;
    /// Merge `fields` into an existing document.
    fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<Document, StoreError>;
    /// `Ok(false)` when there was nothing to delete.
    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;

    /// Delete several documents, returning how many existed.
    fn delete_batch(&self, collection: Collection, ids: &[String]) -> Result<usize, StoreError> {
        let mut deleted = 0;
        for id in ids {
            if self.delete(collection, id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

type Collections = BTreeMap<Collection, BTreeMap<String, Fields>>;

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn document(id: &str, fields: &Fields) -> Document {
    Document {
        id: id.to_owned(),
        fields: fields.clone(),
    }
}

fn create_in(data: &mut Collections, collection: Collection, mut fields: Fields) -> Document {
    fields.remove("id");
    let id = new_id();
    data.entry(collection).or_default().insert(id.clone(), fields.clone());
    Document { id, fields }
}

fn update_in(data: &mut Collections, collection: Collection, id: &str, fields: Fields) -> Result<Document, StoreError> {
    let existing = data
        .get_mut(&collection)
        .and_then(|docs| docs.get_mut(id))
        .ok_or_else(|| StoreError::NotFound {
            collection,
            id: id.to_owned(),
        })?;

    existing.extend(fields.into_iter().filter(|(key, _)| key != "id"));
    Ok(document(id, existing))
}

fn delete_in(data: &mut Collections, collection: Collection, id: &str) -> bool {
    data.get_mut(&collection)
        .map(|docs| docs.remove(id).is_some())
        .unwrap_or(false)
}

fn get_in(data: &Collections, collection: Collection, id: &str) -> Option<Document> {
    data.get(&collection)
        .and_then(|docs| docs.get(id))
        .map(|fields| document(id, fields))
}

fn list_in(data: &Collections, collection: Collection) -> Vec<Document> {
    data.get(&collection)
        .map(|docs| docs.iter().map(|(id, fields)| document(id, fields)).collect())
        .unwrap_or_default()
}

fn lock(data: &Mutex<Collections>) -> Result<MutexGuard<'_, Collections>, StoreError> {
    data.lock()
        .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn create(&self, collection: Collection, fields: Fields) -> Result<Document, StoreError> {
        Ok(create_in(&mut *lock(&self.data)?, collection, fields))
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(get_in(&*lock(&self.data)?, collection, id))
    }

    fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        Ok(list_in(&*lock(&self.data)?, collection))
    }

    fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<Document, StoreError> {
        update_in(&mut *lock(&self.data)?, collection, id, fields)
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        Ok(delete_in(&mut *lock(&self.data)?, collection, id))
    }
}

/// A store kept in one JSON file, rewritten after every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<Collections>,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let data = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
                path: path.to_owned(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.to_owned(),
                source,
            })?
        } else {
            log::info!("Creating store at {:?}", path);
            Collections::new()
        };

        Ok(Self {
            path: path.to_owned(),
            data: Mutex::new(data),
        })
    }

    fn save(&self, data: &Collections) -> Result<(), StoreError> {
        let io = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let json = serde_json::to_vec_pretty(data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // Readers only ever see a complete file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io)?;
        std::fs::rename(&tmp, &self.path).map_err(io)?;
        log::debug!("Saved store {:?}", self.path);
        Ok(())
    }

    /// Apply `change` to a copy of the data and keep it only once it is on disk.
    fn commit<T>(&self, change: impl FnOnce(&mut Collections) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut data = lock(&self.data)?;
        let mut next = data.clone();
        let result = change(&mut next)?;

        if next != *data {
            self.save(&next)?;
            *data = next;
        }
        Ok(result)
    }
}

impl DocumentStore for JsonFileStore {
    fn create(&self, collection: Collection, fields: Fields) -> Result<Document, StoreError> {
        self.commit(|data| Ok(create_in(data, collection, fields)))
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(get_in(&*lock(&self.data)?, collection, id))
    }

    fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        Ok(list_in(&*lock(&self.data)?, collection))
    }

    fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<Document, StoreError> {
        self.commit(|data| update_in(data, collection, id, fields))
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        self.commit(|data| Ok(delete_in(data, collection, id)))
    }

    fn delete_batch(&self, collection: Collection, ids: &[String]) -> Result<usize, StoreError> {
        self.commit(|data| Ok(ids.iter().filter(|id| delete_in(data, collection, id)).count()))
    }
}

/// A typed view of the documents in one collection.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn to_fields(&self) -> Result<Fields, StoreError> {
        match serde_json::to_value(self).map_err(StoreError::InvalidDocument)? {
            Value::Object(fields) => Ok(fields),
            other => Err(StoreError::InvalidDocument(<serde_json::Error as serde::ser::Error>::custom(format!(
                "expected an object, got {}",
                other
            )))),
        }
    }

    fn from_document(doc: &Document) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(doc.fields.clone())).map_err(StoreError::InvalidDocument)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumTopic {
    pub title: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub locked: bool,
}

impl Record for ForumTopic {
    const COLLECTION: Collection = Collection::Forum;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogStatsEntry {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub pdf_downloads: u64,
    pub published_at: Option<DateTime<Utc>>,
}

impl Record for BlogStatsEntry {
    const COLLECTION: Collection = Collection::Blog;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

impl Record for ContactMessage {
    const COLLECTION: Collection = Collection::ContactMessages;
}

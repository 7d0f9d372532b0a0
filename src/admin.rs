//! Admin operations on the document store, and the duplicate cleanup job.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::{AccessError, Permission, Principal, RoleTable};
use crate::content::parse_date;
use crate::store::{
    BlogStatsEntry, Collection, ContactMessage, Document, DocumentStore, Fields, ForumTopic, Record, StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("journal {path:?}")]
    Journal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct AdminService<'a> {
    store: &'a dyn DocumentStore,
    roles: &'a RoleTable,
}

impl<'a> AdminService<'a> {
    pub fn new(store: &'a dyn DocumentStore, roles: &'a RoleTable) -> Self {
        Self { store, roles }
    }

    pub fn create_post(&self, principal: &Principal, fields: Fields) -> Result<Document, AdminError> {
        self.roles.require(principal, Permission::ManageContent)?;
        let title = fields.get("title").and_then(Value::as_str).map(str::trim).unwrap_or("");
        if title.is_empty() {
            return Err(AdminError::Invalid("a post needs a title".into()));
        }

        let doc = self.store.create(Collection::Blog, fields)?;
        log::info!("{} created post {}", principal.email, doc.id);
        Ok(doc)
    }

    pub fn update_post(&self, principal: &Principal, id: &str, fields: Fields) -> Result<Document, AdminError> {
        self.roles.require(principal, Permission::ManageContent)?;
        Ok(self.store.update(Collection::Blog, id, fields)?)
    }

    pub fn delete_post(&self, principal: &Principal, id: &str) -> Result<bool, AdminError> {
        self.roles.require(principal, Permission::ManageContent)?;
        let deleted = self.store.delete(Collection::Blog, id)?;
        log::info!("{} deleted post {} (existed: {})", principal.email, id, deleted);
        Ok(deleted)
    }

    /// Public contact form; no principal needed.
    pub fn record_contact_message(&self, message: &ContactMessage) -> Result<Document, AdminError> {
        if !message.email.contains('@') {
            return Err(AdminError::Invalid(format!("not an email address: {}", message.email)));
        }
        if message.message.trim().is_empty() {
            return Err(AdminError::Invalid("empty message".into()));
        }

        Ok(self.store.create(ContactMessage::COLLECTION, message.to_fields()?)?)
    }

    pub fn contact_messages(&self, principal: &Principal) -> Result<Vec<(String, ContactMessage)>, AdminError> {
        self.roles.require(principal, Permission::ViewStats)?;
        let mut messages = typed::<ContactMessage>(self.store)?;
        messages.sort_by(|(_, a), (_, b)| b.received_at.cmp(&a.received_at));
        Ok(messages)
    }

    /// Blog statistics, most viewed first.
    pub fn blog_stats(&self, principal: &Principal) -> Result<Vec<BlogStatsEntry>, AdminError> {
        self.roles.require(principal, Permission::ViewStats)?;
        let mut stats: Vec<BlogStatsEntry> = typed::<BlogStatsEntry>(self.store)?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect();
        stats.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.title.cmp(&b.title)));
        Ok(stats)
    }

    pub fn forum_topics(&self, principal: &Principal) -> Result<Vec<(String, ForumTopic)>, AdminError> {
        self.roles.require(principal, Permission::ManageContent)?;
        typed::<ForumTopic>(self.store)
    }

    pub fn lock_topic(&self, principal: &Principal, id: &str) -> Result<Document, AdminError> {
        self.roles.require(principal, Permission::ManageContent)?;
        let mut fields = Fields::new();
        fields.insert("locked".into(), Value::Bool(true));
        Ok(self.store.update(Collection::Forum, id, fields)?)
    }

    /// Record `email` in the `admins` collection.
    pub fn grant_admin(&self, principal: &Principal, email: &str) -> Result<Document, AdminError> {
        self.roles.require(principal, Permission::ManageUsers)?;
        let mut fields = Fields::new();
        fields.insert("email".into(), Value::String(email.trim().to_lowercase()));
        fields.insert("grantedBy".into(), Value::String(principal.email.clone()));
        fields.insert("grantedAt".into(), Value::String(Utc::now().to_rfc3339()));
        Ok(self.store.create(Collection::Admins, fields)?)
    }

    pub fn users(&self, principal: &Principal) -> Result<Vec<Document>, AdminError> {
        self.roles.require(principal, Permission::ManageUsers)?;
        Ok(self.store.list(Collection::Users)?)
    }

    pub fn remove_duplicate_posts(
        &self,
        principal: &Principal,
        options: &DedupeOptions,
    ) -> Result<DedupeReport, AdminError> {
        self.roles.require(principal, Permission::ManageContent)?;
        remove_duplicates(self.store, Collection::Blog, options)
    }
}

/// Documents of `R`'s collection that parse as `R`; others are logged and skipped.
fn typed<R: Record>(store: &dyn DocumentStore) -> Result<Vec<(String, R)>, AdminError> {
    Ok(store
        .list(R::COLLECTION)?
        .iter()
        .filter_map(|doc| match R::from_document(doc) {
            Ok(record) => Some((doc.id.clone(), record)),
            Err(err) => {
                log::warn!("Skipping {} document {}: {}", R::COLLECTION, doc.id, err);
                None
            }
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct DedupeOptions {
    pub batch_size: usize,
    /// Extra attempts per batch after the first failure.
    pub retries: usize,
    pub journal: Option<PathBuf>,
    pub dry_run: bool,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            batch_size: 20,
            retries: 3,
            journal: None,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub title: String,
    pub keep: String,
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupeReport {
    pub groups: Vec<DuplicateGroup>,
    /// Deleted by this run.
    pub deleted: usize,
    /// Already recorded as deleted by an earlier, interrupted run.
    pub resumed: usize,
}

fn published_at(doc: &Document) -> Option<DateTime<Utc>> {
    doc.str_field("publishedAt").and_then(parse_date)
}

/// Group documents by title. Each group keeps its earliest `publishedAt`
/// (undated documents sort last, ties go to the lowest id).
pub fn find_duplicates(docs: &[Document]) -> Vec<DuplicateGroup> {
    let mut by_title: BTreeMap<&str, Vec<&Document>> = BTreeMap::new();
    for doc in docs {
        match doc.str_field("title").map(str::trim) {
            Some(title) if !title.is_empty() => by_title.entry(title).or_default().push(doc),
            _ => log::debug!("Document {} has no title", doc.id),
        }
    }

    by_title
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|(title, mut group)| {
            group.sort_by_key(|doc| (published_at(doc).is_none(), published_at(doc), doc.id.clone()));
            DuplicateGroup {
                title: title.to_owned(),
                keep: group[0].id.clone(),
                remove: group[1..].iter().map(|doc| doc.id.clone()).collect(),
            }
        })
        .collect()
}

/// Ids already deleted by earlier runs.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Journal {
    deleted: BTreeSet<String>,
}

impl Journal {
    fn load(path: &Path) -> Result<Self, AdminError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| AdminError::Journal {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|err| AdminError::Journal {
            path: path.to_owned(),
            source: err.into(),
        })
    }

    fn save(&self, path: &Path) -> Result<(), AdminError> {
        let journal_error = |source: std::io::Error| AdminError::Journal {
            path: path.to_owned(),
            source,
        };

        let json = serde_json::to_vec_pretty(self).map_err(|err| journal_error(err.into()))?;
        std::fs::write(path, json).map_err(journal_error)
    }
}

fn delete_with_retries(
    store: &dyn DocumentStore,
    collection: Collection,
    batch: &[String],
    retries: usize,
) -> Result<usize, StoreError> {
    let mut attempt = 0;
    loop {
        match store.delete_batch(collection, batch) {
            Ok(deleted) => return Ok(deleted),
            Err(err) if attempt < retries => {
                attempt += 1;
                log::warn!("Batch delete failed ({}), retry {} of {}", err, attempt, retries);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Delete every duplicate in `collection`, batch by batch.
///
/// Duplicates are always recomputed from the store, so an interrupted run
/// picks up where it stopped. With a journal, the ids each batch actually
/// removed are recorded before the next batch starts.
pub fn remove_duplicates(
    store: &dyn DocumentStore,
    collection: Collection,
    options: &DedupeOptions,
) -> Result<DedupeReport, AdminError> {
    if options.batch_size == 0 {
        return Err(AdminError::Invalid("batch size must be at least 1".into()));
    }

    let docs = store.list(collection)?;
    let groups = find_duplicates(&docs);
    let mut journal = match &options.journal {
        Some(path) => Journal::load(path)?,
        None => Journal::default(),
    };

    let present: BTreeSet<&str> = docs.iter().map(|doc| doc.id.as_str()).collect();
    let resumed = journal.deleted.iter().filter(|id| !present.contains(id.as_str())).count();
    let pending: Vec<String> = groups.iter().flat_map(|group| group.remove.iter().cloned()).collect();
    for id in pending.iter().filter(|id| journal.deleted.contains(*id)) {
        log::warn!("`{}` is journaled as deleted but still in {}, deleting again", id, collection);
    }

    log::info!(
        "{} duplicate groups in {}, {} documents to delete",
        groups.len(),
        collection,
        pending.len()
    );

    let mut report = DedupeReport {
        groups,
        deleted: 0,
        resumed,
    };
    if options.dry_run {
        return Ok(report);
    }

    for batch in pending.chunks(options.batch_size) {
        report.deleted += delete_with_retries(store, collection, batch, options.retries)?;

        if let Some(path) = &options.journal {
            for id in batch {
                if store.get(collection, id)?.is_none() {
                    journal.deleted.insert(id.clone());
                } else {
                    log::warn!("`{}` survived its batch delete, leaving it for the next run", id);
                }
            }
            journal.save(path)?;
        }
    }

    log::info!("Deleted {} duplicates", report.deleted);
    Ok(report)
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::access::Role;
    use crate::store::test::fields;
    use crate::store::{JsonFileStore, MemoryStore};

    fn admin() -> (RoleTable, Principal) {
        let mut roles = RoleTable::default();
        roles.grant("chief@example.com", [Role::Admin]);
        (roles, Principal::new("chief@example.com"))
    }

    fn post(store: &dyn DocumentStore, title: &str, published: &str) -> String {
        store
            .create(Collection::Blog, fields(json!({"title": title, "publishedAt": published})))
            .unwrap()
            .id
    }

    #[test]
    fn keeps_the_earliest_copy() {
        let store = MemoryStore::new();
        let (roles, chief) = admin();
        let t2 = post(&store, "Test Article", "2024-02-01T00:00:00Z");
        let t1 = post(&store, "Test Article", "2024-01-01T00:00:00Z");
        let t3 = post(&store, "Test Article", "2024-03-01T00:00:00Z");
        let other = post(&store, "Another", "2024-01-01");

        let report = AdminService::new(&store, &roles)
            .remove_duplicate_posts(&chief, &DedupeOptions::default())
            .unwrap();

        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].keep, t1);
        assert_eq!(report.deleted, 2);

        let left: BTreeSet<String> = store.list(Collection::Blog).unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(left, BTreeSet::from([t1, other]));
        assert!(store.get(Collection::Blog, &t2).unwrap().is_none());
        assert!(store.get(Collection::Blog, &t3).unwrap().is_none());
    }

    #[test]
    fn ties_and_undated() {
        let docs = vec![
            Document { id: "b".into(), fields: fields(json!({"title": "Same", "publishedAt": "2024-01-01"})) },
            Document { id: "a".into(), fields: fields(json!({"title": "Same", "publishedAt": "2024-01-01"})) },
            Document { id: "0".into(), fields: fields(json!({"title": "Same"})) },
        ];

        let groups = find_duplicates(&docs);
        assert_eq!(groups[0].keep, "a");
        assert_eq!(groups[0].remove, vec!["b".to_string(), "0".to_string()]);
    }

    /// Fails every `delete_batch` call whose number is in `fail_on`.
    struct FlakyStore {
        inner: MemoryStore,
        calls: AtomicUsize,
        fail_on: Vec<usize>,
    }

    impl DocumentStore for FlakyStore {
        fn create(&self, collection: Collection, fields: Fields) -> Result<Document, StoreError> {
            self.inner.create(collection, fields)
        }
        fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
            self.inner.get(collection, id)
        }
        fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
            self.inner.list(collection)
        }
        fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<Document, StoreError> {
            self.inner.update(collection, id, fields)
        }
        fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
            self.inner.delete(collection, id)
        }
        fn delete_batch(&self, collection: Collection, ids: &[String]) -> Result<usize, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on.contains(&call) {
                return Err(StoreError::Unavailable(format!("call {}", call)));
            }
            self.inner.delete_batch(collection, ids)
        }
    }

    fn flaky(fail_on: Vec<usize>) -> FlakyStore {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            calls: AtomicUsize::new(0),
            fail_on,
        };
        for day in 1..=5 {
            post(&store, "Repeated", &format!("2024-01-0{}", day));
        }
        store
    }

    #[test]
    fn retries_failed_batches() {
        let store = flaky(vec![1, 2]);
        let options = DedupeOptions {
            batch_size: 2,
            retries: 2,
            ..Default::default()
        };

        let report = remove_duplicates(&store, Collection::Blog, &options).unwrap();
        assert_eq!(report.deleted, 4);
        assert_eq!(store.list(Collection::Blog).unwrap().len(), 1);
    }

    #[test]
    fn resumes_from_journal() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("dedupe.json");
        let options = DedupeOptions {
            batch_size: 2,
            retries: 0,
            journal: Some(journal.clone()),
            dry_run: false,
        };

        // First batch succeeds, second fails without retries.
        let store = flaky(vec![2]);
        assert!(remove_duplicates(&store, Collection::Blog, &options).is_err());
        assert_eq!(store.list(Collection::Blog).unwrap().len(), 3);
        assert!(journal.exists());

        let report = remove_duplicates(&store, Collection::Blog, &options).unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(store.list(Collection::Blog).unwrap().len(), 1);
    }

    #[test]
    fn failed_saves_are_not_journaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let journal = dir.path().join("dedupe.json");
        let options = DedupeOptions {
            batch_size: 20,
            retries: 2,
            journal: Some(journal.clone()),
            dry_run: false,
        };

        let store = JsonFileStore::open(&path).unwrap();
        post(&store, "Test Article", "2024-01-01");
        post(&store, "Test Article", "2024-01-02");
        post(&store, "Test Article", "2024-01-03");

        // Every save fails while a directory sits where the store writes its temporary file.
        let blocker = dir.path().join("store.json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        assert!(remove_duplicates(&store, Collection::Blog, &options).is_err());
        assert_eq!(store.list(Collection::Blog).unwrap().len(), 3);
        assert_eq!(JsonFileStore::open(&path).unwrap().list(Collection::Blog).unwrap().len(), 3);

        std::fs::remove_dir(&blocker).unwrap();
        let report = remove_duplicates(&store, Collection::Blog, &options).unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(report.resumed, 0);
        assert_eq!(JsonFileStore::open(&path).unwrap().list(Collection::Blog).unwrap().len(), 1);
    }

    #[test]
    fn stale_journal_entries_are_deleted_again() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("dedupe.json");
        let store = flaky(vec![]);
        let groups = find_duplicates(&store.list(Collection::Blog).unwrap());

        let stale = Journal {
            deleted: groups[0].remove.iter().cloned().collect(),
        };
        stale.save(&journal).unwrap();

        let options = DedupeOptions {
            journal: Some(journal),
            ..Default::default()
        };
        let report = remove_duplicates(&store, Collection::Blog, &options).unwrap();
        assert_eq!(report.deleted, 4);
        assert_eq!(report.resumed, 0);
        assert_eq!(store.list(Collection::Blog).unwrap().len(), 1);
    }

    #[test]
    fn dry_run_deletes_nothing() {
        let store = flaky(vec![]);
        let options = DedupeOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = remove_duplicates(&store, Collection::Blog, &options).unwrap();
        assert_eq!(report.groups[0].remove.len(), 4);
        assert_eq!(report.deleted, 0);
        assert_eq!(store.list(Collection::Blog).unwrap().len(), 5);
    }

    #[test]
    fn permissions() {
        let store = MemoryStore::new();
        let mut roles = RoleTable::default();
        roles.grant("writer@example.com", [Role::Editor]);
        let service = AdminService::new(&store, &roles);
        let writer = Principal::new("writer@example.com");
        let stranger = Principal::new("stranger@example.com");

        let doc = service.create_post(&writer, fields(json!({"title": "Draft"}))).unwrap();
        assert!(matches!(
            service.delete_post(&stranger, &doc.id),
            Err(AdminError::Access(AccessError::Forbidden { .. }))
        ));
        assert!(matches!(service.grant_admin(&writer, "x@example.com"), Err(AdminError::Access(_))));
        assert!(matches!(service.create_post(&writer, Fields::new()), Err(AdminError::Invalid(_))));

        assert!(service.delete_post(&writer, &doc.id).unwrap());
        assert!(!service.delete_post(&writer, &doc.id).unwrap());
    }

    #[test]
    fn contact_messages_and_stats() {
        let store = MemoryStore::new();
        let (roles, chief) = admin();
        let service = AdminService::new(&store, &roles);

        let message = ContactMessage {
            name: "Dana".into(),
            email: "dana@example.com".into(),
            subject: "Hi".into(),
            message: "Loved the ECG series".into(),
            received_at: Utc::now(),
        };
        service.record_contact_message(&message).unwrap();
        assert!(service
            .record_contact_message(&ContactMessage { email: "nope".into(), ..message.clone() })
            .is_err());
        assert_eq!(service.contact_messages(&chief).unwrap()[0].1, message);

        store
            .create(Collection::Blog, fields(json!({"slug": "a", "title": "A", "views": 3})))
            .unwrap();
        store
            .create(Collection::Blog, fields(json!({"slug": "b", "title": "B", "views": 10})))
            .unwrap();
        let stats = service.blog_stats(&chief).unwrap();
        assert_eq!(stats.iter().map(|s| s.slug.as_str()).collect::<Vec<_>>(), vec!["b", "a"]);
    }
}

//! Asset and log records stored as YAML files in the project

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

use super::catalogue::Catalogue;
use super::reference::ReferenceSets;
use super::StoreError;
use crate::core::identity::{RecordId, RecordKind};
use crate::core::project::Project;
use crate::import::remote::{
    AssetInput, AssetLogInput, AssetService, CacheInvalidator, LogStatus, ReferenceSource,
    RemoteError,
};

/// A stored asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: String,

    pub asset_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalogue_item_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_date: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_code: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,

    pub created: DateTime<Utc>,

    pub updated: DateTime<Utc>,

    pub author: String,
}

impl AssetRecord {
    /// Apply an update: supplied fields overwrite, blank ones keep what is stored
    fn merge(&mut self, input: &AssetInput, updated: DateTime<Utc>, author: &str) {
        fn overwrite(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        self.asset_number.clone_from(&input.asset_number);
        overwrite(&mut self.catalogue_item_code, &input.catalogue_item_code);
        overwrite(&mut self.serial_number, &input.serial_number);
        overwrite(&mut self.installation_date, &input.installation_date);
        overwrite(&mut self.store_code, &input.store_code);
        if !input.notes.is_empty() {
            self.notes.clone_from(&input.notes);
        }
        self.properties
            .extend(input.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.updated = updated;
        self.author = author.to_string();
    }
}

/// A log entry attached to an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    pub asset_id: String,
    pub comment: String,
    pub status: LogStatus,
    pub created: DateTime<Utc>,
    pub author: String,
}

/// Uniqueness index over stored assets.
///
/// Entries are reserved before a record file is written and released again if
/// the write fails, so the lock is never held across file I/O.
#[derive(Debug, Default)]
struct Index {
    /// asset number -> id
    numbers: HashMap<String, String>,
    /// id -> asset number
    assets: HashMap<String, String>,
}

impl Index {
    fn insert(&mut self, id: &str, asset_number: &str) {
        self.numbers.insert(asset_number.to_string(), id.to_string());
        self.assets.insert(id.to_string(), asset_number.to_string());
    }

    fn remove(&mut self, id: &str, asset_number: &str) {
        self.assets.remove(id);
        self.release_number(id, asset_number);
    }

    /// Drop a number only while it still points at `id`
    fn release_number(&mut self, id: &str, asset_number: &str) {
        if self.numbers.get(asset_number).map(String::as_str) == Some(id) {
            self.numbers.remove(asset_number);
        }
    }
}

/// Registry backed by `assets/` and `logs/` in a project
#[derive(Debug)]
pub struct LocalRegistry {
    project: Project,
    author: String,
    index: Mutex<Index>,
    listing: RwLock<Option<Arc<Vec<AssetRecord>>>>,
}

impl LocalRegistry {
    /// Open the registry, indexing every stored asset.
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn open(project: &Project, author: impl Into<String>) -> Result<Self, StoreError> {
        let mut index = Index::default();
        for record in read_assets(project) {
            index.insert(&record.id, &record.asset_number);
        }
        tracing::debug!(assets = index.assets.len(), "opened asset registry");

        Ok(Self {
            project: project.clone(),
            author: author.into(),
            index: Mutex::new(index),
            listing: RwLock::new(None),
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// All stored assets ordered by asset number.
    ///
    /// Served from a cached listing until [`CacheInvalidator::invalidate`]
    /// is called.
    pub fn list_assets(&self) -> Arc<Vec<AssetRecord>> {
        let guard = self.listing.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = guard.as_ref() {
            return Arc::clone(cached);
        }
        drop(guard);

        let mut records = read_assets(&self.project);
        records.sort_by(|a, b| a.asset_number.cmp(&b.asset_number));
        let listing = Arc::new(records);
        *self.listing.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&listing));
        listing
    }

    /// Log entries for one asset, oldest first
    pub fn logs_for(&self, asset_id: &str) -> Vec<LogRecord> {
        let mut logs: Vec<LogRecord> = self
            .project
            .iter_record_files(RecordKind::Log)
            .filter_map(|path| read_record::<LogRecord>(&path))
            .filter(|log| log.asset_id == asset_id)
            .collect();
        logs.sort_by_key(|log| log.created);
        logs
    }

    async fn create(&self, input: &AssetInput) -> Result<String, StoreError> {
        let path = self.record_file(RecordKind::Asset, &input.id)?;

        {
            let mut index = self.index.lock().await;
            if index.assets.contains_key(&input.id) {
                return Err(StoreError::RecordAlreadyExists(input.id.clone()));
            }
            if index.numbers.contains_key(&input.asset_number) {
                return Err(StoreError::AssetNumberAlreadyExists(input.asset_number.clone()));
            }
            index.insert(&input.id, &input.asset_number);
        }

        let now = Utc::now();
        let record = self.asset_record(input, now);
        if let Err(e) = write_yaml(&path, &record).await {
            self.index.lock().await.remove(&input.id, &input.asset_number);
            return Err(e);
        }

        tracing::debug!(id = %record.id, asset_number = %record.asset_number, "created asset");
        Ok(record.id)
    }

    async fn update(&self, input: &AssetInput) -> Result<String, StoreError> {
        let path = self
            .record_file(RecordKind::Asset, &input.id)
            .map_err(|_| StoreError::RecordNotFound(input.id.clone()))?;

        // The old number stays reserved until the new record is on disk
        let previous_number = {
            let mut index = self.index.lock().await;
            let previous_number = index
                .assets
                .get(&input.id)
                .cloned()
                .ok_or_else(|| StoreError::RecordNotFound(input.id.clone()))?;
            if let Some(owner) = index.numbers.get(&input.asset_number) {
                if owner != &input.id {
                    return Err(StoreError::AssetNumberAlreadyExists(input.asset_number.clone()));
                }
            }
            index
                .numbers
                .insert(input.asset_number.clone(), input.id.clone());
            previous_number
        };

        let now = Utc::now();
        let record = match read_record_async::<AssetRecord>(&path).await {
            Some(mut existing) => {
                existing.merge(input, now, &self.author);
                existing
            }
            None => self.asset_record(input, now),
        };

        let written = write_yaml(&path, &record).await;
        let mut index = self.index.lock().await;
        if let Err(e) = written {
            if input.asset_number != previous_number {
                index.release_number(&input.id, &input.asset_number);
            }
            return Err(e);
        }
        if input.asset_number != previous_number {
            index.release_number(&input.id, &previous_number);
        }
        index.insert(&record.id, &record.asset_number);
        drop(index);

        tracing::debug!(id = %record.id, asset_number = %record.asset_number, "updated asset");
        Ok(record.id)
    }

    async fn write_log(&self, input: &AssetLogInput) -> Result<(), StoreError> {
        if !self.index.lock().await.assets.contains_key(&input.asset_id) {
            return Err(StoreError::RecordNotFound(input.asset_id.clone()));
        }

        let path = self.record_file(RecordKind::Log, &input.id)?;
        let record = LogRecord {
            id: input.id.clone(),
            asset_id: input.asset_id.clone(),
            comment: input.comment.clone(),
            status: input.status,
            created: Utc::now(),
            author: self.author.clone(),
        };
        write_yaml(&path, &record).await
    }

    fn asset_record(&self, input: &AssetInput, now: DateTime<Utc>) -> AssetRecord {
        AssetRecord {
            id: input.id.clone(),
            asset_number: input.asset_number.clone(),
            catalogue_item_code: input.catalogue_item_code.clone(),
            serial_number: input.serial_number.clone(),
            installation_date: input.installation_date.clone(),
            notes: input.notes.clone(),
            store_code: input.store_code.clone(),
            properties: input.properties.clone(),
            created: now,
            updated: now,
            author: self.author.clone(),
        }
    }

    /// Path for a record id; ids that are not ours never touch the filesystem
    fn record_file(&self, kind: RecordKind, id: &str) -> Result<PathBuf, StoreError> {
        match RecordId::parse(id) {
            Ok(parsed) if parsed.kind() == kind => Ok(self.project.record_path(kind, id)),
            _ => Err(StoreError::InvalidId(id.to_string())),
        }
    }

    fn reference_sets(&self) -> Result<ReferenceSets, RemoteError> {
        ReferenceSets::load(&self.project).map_err(RemoteError::from)
    }
}

#[async_trait]
impl AssetService for LocalRegistry {
    async fn create_asset(&self, input: &AssetInput) -> Result<String, RemoteError> {
        self.create(input).await.map_err(RemoteError::from)
    }

    async fn update_asset(&self, input: &AssetInput) -> Result<String, RemoteError> {
        self.update(input).await.map_err(RemoteError::from)
    }

    async fn insert_log(&self, input: &AssetLogInput) -> Result<(), RemoteError> {
        self.write_log(input).await.map_err(RemoteError::from)
    }
}

#[async_trait]
impl ReferenceSource for LocalRegistry {
    async fn catalogue_codes(&self) -> Result<Vec<String>, RemoteError> {
        Catalogue::load(&self.project)
            .map(|catalogue| catalogue.codes())
            .map_err(RemoteError::from)
    }

    async fn store_codes(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.reference_sets()?.store_codes())
    }

    async fn asset_classes(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.reference_sets()?.asset_classes)
    }

    async fn asset_categories(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.reference_sets()?.asset_categories)
    }

    async fn asset_types(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.reference_sets()?.asset_types)
    }
}

impl CacheInvalidator for LocalRegistry {
    fn invalidate(&self) {
        *self.listing.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::trace!("asset listing invalidated");
    }
}

fn parse_record<T: for<'de> Deserialize<'de> + 'static>(path: &Path, content: &str) -> Option<T> {
    match serde_yml::from_str(content) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record");
            None
        }
    }
}

fn read_record<T: for<'de> Deserialize<'de> + 'static>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_record(path, &content)
}

async fn read_record_async<T: for<'de> Deserialize<'de> + 'static>(path: &Path) -> Option<T> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    parse_record(path, &content)
}

fn read_assets(project: &Project) -> Vec<AssetRecord> {
    project
        .iter_record_files(RecordKind::Asset)
        .filter_map(|path| read_record::<AssetRecord>(&path))
        .collect()
}

async fn write_yaml<T: Serialize>(path: &Path, record: &T) -> Result<(), StoreError> {
    let yaml = serde_yml::to_string(record).map_err(|e| StoreError::serialize(path, e))?;
    tokio::fs::write(path, yaml)
        .await
        .map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::normalizer::{Normalizer, ReferenceData, RowNormalizer};
    use crate::import::parser::RowParser;
    use crate::import::progress::ProgressTracker;
    use crate::import::row::ImportRow;
    use crate::import::session::{ImportSession, Phase};
    use crate::import::submitter::{AssetWriter, BatchSubmitter};
    use crate::store::catalogue::CatalogueItem;
    use crate::store::reference::StoreEntry;
    use futures::future::join_all;
    use tempfile::{tempdir, TempDir};
    use tokio_util::sync::CancellationToken;

    fn setup() -> (TempDir, Project) {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let mut catalogue = Catalogue::default();
        catalogue
            .add(CatalogueItem {
                code: "FR-100".into(),
                name: "Fridge".into(),
                ..Default::default()
            })
            .unwrap();
        catalogue.save(&project).unwrap();
        (tmp, project)
    }

    fn input(asset_number: &str) -> AssetInput {
        AssetInput {
            id: RecordId::new(RecordKind::Asset).to_string(),
            asset_number: asset_number.to_string(),
            catalogue_item_code: Some("FR-100".into()),
            serial_number: None,
            installation_date: Some("2024-02-01".into()),
            notes: String::new(),
            store_code: None,
            properties: BTreeMap::new(),
        }
    }

    fn stored(project: &Project, id: &str) -> AssetRecord {
        let path = project.record_path(RecordKind::Asset, id);
        serde_yml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn code(err: RemoteError) -> String {
        match err {
            RemoteError::Structured { code, .. } => code,
            other => panic!("expected structured error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_writes_record_file() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();

        let asset = input("A-1");
        let id = registry.create_asset(&asset).await.unwrap();
        assert_eq!(id, asset.id);

        let stored = stored(&project, &id);
        assert_eq!(stored.asset_number, "A-1");
        assert_eq!(stored.author, "tester");
        assert_eq!(stored.created, stored.updated);
    }

    #[tokio::test]
    async fn test_duplicate_asset_number_rejected_across_reopen() {
        let (_tmp, project) = setup();
        {
            let registry = LocalRegistry::open(&project, "tester").unwrap();
            registry.create_asset(&input("A-1")).await.unwrap();
        }

        let registry = LocalRegistry::open(&project, "tester").unwrap();
        let err = registry.create_asset(&input("A-1")).await.unwrap_err();
        assert_eq!(code(err), "AssetNumberAlreadyExists");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        let first = input("A-1");
        registry.create_asset(&first).await.unwrap();

        let mut again = input("A-2");
        again.id = first.id.clone();
        let err = registry.create_asset(&again).await.unwrap_err();
        assert_eq!(code(err), "RecordAlreadyExists");
    }

    #[tokio::test]
    async fn test_foreign_id_rejected_without_touching_disk() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        let mut asset = input("A-1");
        asset.id = "../escape".into();
        assert_eq!(code(registry.create_asset(&asset).await.unwrap_err()), "InvalidId");
        assert_eq!(code(registry.update_asset(&asset).await.unwrap_err()), "RecordNotFound");
    }

    #[tokio::test]
    async fn test_update_keeps_created_and_allows_own_number() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        let mut asset = input("A-1");
        registry.create_asset(&asset).await.unwrap();
        let created = registry.list_assets()[0].created;

        asset.notes = "moved to bay 2".into();
        registry.update_asset(&asset).await.unwrap();
        registry.invalidate();

        let listing = registry.list_assets();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].notes, "moved to bay 2");
        assert_eq!(listing[0].created, created);
        assert!(listing[0].updated >= created);
    }

    #[tokio::test]
    async fn test_update_keeps_fields_left_blank() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        let mut asset = input("A-1");
        asset.serial_number = Some("SN-1".into());
        asset.notes = "keep".into();
        asset.store_code = Some("ST-1".into());
        asset.properties.insert("volume".into(), "40".into());
        registry.create_asset(&asset).await.unwrap();
        let created = stored(&project, &asset.id).created;

        let update = AssetInput {
            id: asset.id.clone(),
            asset_number: "A-1".into(),
            catalogue_item_code: None,
            serial_number: None,
            installation_date: None,
            notes: String::new(),
            store_code: None,
            properties: BTreeMap::from([("energy_source".to_string(), "Solar".to_string())]),
        };
        registry.update_asset(&update).await.unwrap();

        let record = stored(&project, &asset.id);
        assert_eq!(record.serial_number.as_deref(), Some("SN-1"));
        assert_eq!(record.notes, "keep");
        assert_eq!(record.installation_date.as_deref(), Some("2024-02-01"));
        assert_eq!(record.catalogue_item_code.as_deref(), Some("FR-100"));
        assert_eq!(record.store_code.as_deref(), Some("ST-1"));
        assert_eq!(record.properties["volume"], "40");
        assert_eq!(record.properties["energy_source"], "Solar");
        assert_eq!(record.created, created);
    }

    #[tokio::test]
    async fn test_update_overwrites_supplied_fields() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        let mut asset = input("A-1");
        asset.serial_number = Some("SN-1".into());
        registry.create_asset(&asset).await.unwrap();

        asset.serial_number = Some("SN-2".into());
        asset.installation_date = Some("2025-01-01".into());
        registry.update_asset(&asset).await.unwrap();

        let record = stored(&project, &asset.id);
        assert_eq!(record.serial_number.as_deref(), Some("SN-2"));
        assert_eq!(record.installation_date.as_deref(), Some("2025-01-01"));
    }

    #[tokio::test]
    async fn test_parallel_creates_share_the_registry() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();

        let distinct: Vec<AssetInput> = (1..=20).map(|n| input(&format!("A-{n}"))).collect();
        let results = join_all(distinct.iter().map(|a| registry.create_asset(a))).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(project.iter_record_files(RecordKind::Asset).count(), 20);

        let clashing: Vec<AssetInput> = (0..5).map(|_| input("B-1")).collect();
        let results = join_all(clashing.iter().map(|a| registry.create_asset(a))).await;
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .into_iter()
            .filter_map(Result::err)
            .all(|err| code(err) == "AssetNumberAlreadyExists"));
    }

    #[tokio::test]
    async fn test_failed_write_releases_reservation() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        let assets_dir = project.record_dir(RecordKind::Asset);
        std::fs::remove_dir_all(&assets_dir).unwrap();

        let first = input("A-1");
        let err = registry.create_asset(&first).await.unwrap_err();
        assert!(matches!(err, RemoteError::Unstructured(_)));

        std::fs::create_dir_all(&assets_dir).unwrap();
        registry.create_asset(&first).await.unwrap();
    }

    #[tokio::test]
    async fn test_reference_sets_from_project() {
        let (_tmp, project) = setup();
        let mut sets = ReferenceSets::load(&project).unwrap();
        sets.add_store(StoreEntry {
            code: "ST-1".into(),
            name: "Central".into(),
        })
        .unwrap();
        sets.save(&project).unwrap();

        let registry = LocalRegistry::open(&project, "tester").unwrap();
        assert_eq!(registry.store_codes().await.unwrap(), vec!["ST-1"]);
        assert!(registry
            .asset_types()
            .await
            .unwrap()
            .contains(&"Cold box".to_string()));
    }

    #[tokio::test]
    async fn test_update_renumbering_onto_other_asset_rejected() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        registry.create_asset(&input("A-1")).await.unwrap();
        let mut second = input("A-2");
        registry.create_asset(&second).await.unwrap();

        second.asset_number = "A-1".into();
        assert_eq!(
            code(registry.update_asset(&second).await.unwrap_err()),
            "AssetNumberAlreadyExists"
        );

        // Renumbering frees the old number
        second.asset_number = "A-3".into();
        registry.update_asset(&second).await.unwrap();
        registry.create_asset(&input("A-2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_unknown_record() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        let err = registry.update_asset(&input("A-1")).await.unwrap_err();
        assert_eq!(code(err), "RecordNotFound");
    }

    #[tokio::test]
    async fn test_log_requires_existing_asset() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        let asset = input("A-1");

        let log = AssetLogInput {
            id: RecordId::new(RecordKind::Log).to_string(),
            asset_id: asset.id.clone(),
            comment: "Created".into(),
            status: LogStatus::Functioning,
        };
        assert_eq!(code(registry.insert_log(&log).await.unwrap_err()), "RecordNotFound");

        registry.create_asset(&asset).await.unwrap();
        registry.insert_log(&log).await.unwrap();
        let logs = registry.logs_for(&asset.id);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].comment, "Created");
    }

    #[tokio::test]
    async fn test_listing_cached_until_invalidated() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        assert!(registry.list_assets().is_empty());

        registry.create_asset(&input("A-1")).await.unwrap();
        assert!(registry.list_assets().is_empty());

        registry.invalidate();
        assert_eq!(registry.list_assets().len(), 1);
    }

    #[tokio::test]
    async fn test_catalogue_codes_from_project() {
        let (_tmp, project) = setup();
        let registry = LocalRegistry::open(&project, "tester").unwrap();
        assert_eq!(registry.catalogue_codes().await.unwrap(), vec!["FR-100"]);
    }

    #[tokio::test]
    async fn test_csv_to_registry_with_duplicate_numbers() {
        let (_tmp, project) = setup();
        let registry = Arc::new(LocalRegistry::open(&project, "tester").unwrap());
        registry.create_asset(&input("A-4")).await.unwrap();
        registry.create_asset(&input("A-7")).await.unwrap();

        let mut csv =
            String::from("id,assetNumber,catalogueItemCode,serialNumber,installationDate,notes\n");
        for n in 1..=10 {
            csv.push_str(&format!(",A-{n},FR-100,,,\n"));
        }

        let reference = ReferenceData::new(registry.catalogue_codes().await.unwrap());
        let chunks = RowParser::new(64)
            .from_reader(csv.as_bytes(), Path::new("assets.csv"))
            .unwrap();
        let rows = Normalizer::new(&reference, &[]).normalize_chunks(chunks).unwrap();

        let mut session = ImportSession::new();
        session.load(rows).unwrap();
        let batch = session.begin_import().unwrap();

        let writer = Arc::new(AssetWriter::new(registry.clone()));
        let submitter = BatchSubmitter::<ImportRow>::new(writer)
            .with_wave_size(3)
            .with_invalidator(registry.clone());
        let mut progress = ProgressTracker::new(batch.len());
        let report = submitter.drain(batch, &mut progress, &CancellationToken::new()).await;
        let outcome = session.complete(report).unwrap();

        assert_eq!(outcome.imported(), 8);
        assert_eq!(outcome.failed(), 2);
        assert_eq!(session.phase(), Phase::Review);
        let failed: Vec<&str> = session.rows().iter().map(|r| r.asset_number.as_str()).collect();
        assert_eq!(failed, vec!["A-4", "A-7"]);
        assert!(session
            .rows()
            .iter()
            .all(|r| r.error_message == "AssetNumberAlreadyExists"));

        assert_eq!(registry.list_assets().len(), 10);
        assert_eq!(project.iter_record_files(RecordKind::Log).count(), 8);
    }
}

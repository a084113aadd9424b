use super::{seed, Backend};
use crate::error::{Error, Result};
use crate::model::{Actor, Worksheet, WorksheetDraft, WorksheetPatch, ADMIN_ROLE};
use crate::query::SortSpec;
use crate::store::{self, Store};
use crate::upload::{self, FilePayload, UploadedFile};
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Slot of the durable store holding the full catalog snapshot.
pub const STORAGE_KEY: &str = "math-worksheets-data";

/// Artificial per-operation delay emulating a network round trip, so a UI
/// developed against the demo backend shows its loading states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub me: Duration,
    pub list: Duration,
    pub create: Duration,
    pub update: Duration,
    pub upload: Duration,
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            me: Duration::from_millis(200),
            list: Duration::from_millis(400),
            create: Duration::from_millis(400),
            update: Duration::from_millis(200),
            upload: Duration::from_millis(300),
        }
    }
}

impl Latency {
    pub fn none() -> Self {
        Self {
            me: Duration::ZERO,
            list: Duration::ZERO,
            create: Duration::ZERO,
            update: Duration::ZERO,
            upload: Duration::ZERO,
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Deserialize)]
struct Snapshot {
    #[serde(default)]
    worksheets: Option<Vec<serde_json::Value>>,
}

/// The actor every demo session runs as.
pub fn demo_admin() -> Actor {
    Actor {
        id: "demo-admin".into(),
        name: Some("Demo Admin".into()),
        email: None,
        role: ADMIN_ROLE.into(),
    }
}

/// Offline backend: the whole catalog lives in memory and every mutation
/// writes a full snapshot back to a durable store slot.
///
/// Uploaded files are not stored anywhere, they come back as `data:` urls
/// embedding the bytes. That is enough to demo the upload form, it is not an
/// object store.
///
/// The snapshot write is not coordinated between processes sharing the same
/// store; the last writer wins.
pub struct DemoBackend<S: Store> {
    store: S,
    worksheets: Mutex<Vec<Worksheet>>,
    latency: Latency,
    actor: Option<Actor>,
}

impl<S> DemoBackend<S>
where
    S: Store,
{
    /// Loads the catalog from the store, seeding the example worksheets on
    /// first use.
    pub async fn new(store: S, latency: Latency) -> Result<Self> {
        let worksheets = hydrate(&store).await?;
        debug!(
            "demo backend loaded {} worksheets from {}",
            worksheets.len(),
            store.url()
        );

        Ok(Self {
            store,
            worksheets: Mutex::new(worksheets),
            latency,
            actor: Some(demo_admin()),
        })
    }

    /// Replaces the session actor, `None` makes every session anonymous.
    pub fn with_actor(mut self, actor: Option<Actor>) -> Self {
        self.actor = actor;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

async fn hydrate<S: Store>(store: &S) -> Result<Vec<Worksheet>> {
    let data = match store.get(STORAGE_KEY).await {
        Ok(data) => data,
        Err(store::Error::KeyNotFound) => {
            info!("no worksheets found in {}, seeding examples", store.url());
            let seeded = seed::worksheets();
            persist(store, &seeded).await?;
            return Ok(seeded);
        }
        Err(err) => return Err(err.into()),
    };

    match serde_json::from_slice::<Snapshot>(&data) {
        Ok(Snapshot {
            worksheets: Some(entries),
        }) => Ok(entries.into_iter().enumerate().filter_map(record).collect()),
        Ok(Snapshot { worksheets: None }) => Ok(seed::worksheets()),
        Err(err) => {
            warn!("failed to parse stored worksheets, resetting: {}", err);
            store.delete(STORAGE_KEY).await?;
            Ok(seed::worksheets())
        }
    }
}

/// Converts one snapshot entry, a malformed entry is dropped and the rest of
/// the catalog is kept.
fn record((idx, entry): (usize, serde_json::Value)) -> Option<Worksheet> {
    match serde_json::from_value(entry) {
        Ok(worksheet) => Some(worksheet),
        Err(err) => {
            warn!("dropping malformed stored worksheet #{}: {}", idx, err);
            None
        }
    }
}

async fn persist<S: Store>(store: &S, worksheets: &[Worksheet]) -> Result<()> {
    let snapshot = serde_json::to_vec(&serde_json::json!({ "worksheets": worksheets }))
        .map_err(|err| Error::Backend(format!("failed to encode worksheets: {}", err)))?;

    store.set(STORAGE_KEY, &snapshot).await?;
    Ok(())
}

#[async_trait::async_trait]
impl<S> Backend for DemoBackend<S>
where
    S: Store,
{
    async fn me(&self) -> Option<Actor> {
        pause(self.latency.me).await;
        self.actor.clone()
    }

    async fn list(&self, sort: &SortSpec) -> Result<Vec<Worksheet>> {
        pause(self.latency.list).await;
        let mut records = self.worksheets.lock().await.clone();
        sort.sort(&mut records);
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Worksheet> {
        pause(self.latency.list).await;
        self.worksheets
            .lock()
            .await
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| Error::worksheet_not_found(id))
    }

    async fn create(&self, draft: WorksheetDraft) -> Result<Worksheet> {
        let new = draft.validate()?;
        pause(self.latency.create).await;

        let mut worksheets = self.worksheets.lock().await;
        let id = loop {
            let id = format!("worksheet-{}", Uuid::new_v4());
            if !worksheets.iter().any(|w| w.id == id) {
                break id;
            }
        };
        let worksheet = new.into_worksheet(id, Utc::now());

        // commit to memory only once the snapshot is durable
        let mut next = worksheets.clone();
        next.push(worksheet.clone());
        persist(&self.store, &next).await?;
        *worksheets = next;

        debug!("created worksheet {}", worksheet.id);
        Ok(worksheet)
    }

    async fn update(&self, id: &str, patch: WorksheetPatch) -> Result<Worksheet> {
        let patch = patch.normalized()?;
        pause(self.latency.update).await;

        let mut worksheets = self.worksheets.lock().await;
        let idx = worksheets
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| Error::worksheet_not_found(id))?;

        patch.check_against(&worksheets[idx])?;

        let mut next = worksheets.clone();
        patch.apply(&mut next[idx]);
        let updated = next[idx].clone();
        persist(&self.store, &next).await?;
        *worksheets = next;

        Ok(updated)
    }

    async fn upload_file(&self, file: FilePayload) -> Result<UploadedFile> {
        file.ensure_present()?;
        pause(self.latency.upload).await;

        Ok(UploadedFile {
            file_url: upload::data_url(&file),
        })
    }

    fn describe(&self) -> String {
        format!("demo backend ({})", self.store.url())
    }
}

use crate::backend::{self, Backend};
use crate::config::BackendConfig;
use crate::error::Result;
use crate::model::{Actor, Worksheet, WorksheetDraft, WorksheetPatch};
use crate::query::{CatalogStats, Filter, SortSpec};
use crate::upload::{FilePayload, UploadedFile};
use std::sync::Arc;

/// Facade the UI and the CLI talk to. It groups the backend capabilities the
/// same way the web client does (`auth`, `worksheets`, `integrations`) and
/// adds the flows built on top of them.
///
/// Cloning is cheap, clones share the same backend.
#[derive(Clone)]
pub struct CatalogClient {
    backend: Arc<dyn Backend>,
}

/// A worksheet submitted through the upload form or the CLI, together with
/// the files that still need to be stored.
#[derive(Clone, Debug)]
pub struct Submission {
    pub draft: WorksheetDraft,
    pub file: FilePayload,
    pub preview: Option<FilePayload>,
}

impl CatalogClient {
    pub fn new<B: Backend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_boxed(backend: Box<dyn Backend>) -> Self {
        Self {
            backend: Arc::from(backend),
        }
    }

    pub async fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        let backend = backend::make(config).await?;
        info!("using {}", backend.describe());

        Ok(Self::from_boxed(backend))
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth {
            backend: &*self.backend,
        }
    }

    pub fn worksheets(&self) -> Worksheets<'_> {
        Worksheets {
            backend: &*self.backend,
        }
    }

    pub fn integrations(&self) -> Integrations<'_> {
        Integrations {
            backend: &*self.backend,
        }
    }

    /// Sorted listing restricted to the filter's category and difficulty.
    pub async fn browse(&self, filter: &Filter, sort: &SortSpec) -> Result<Vec<Worksheet>> {
        let records = self.backend.list(sort).await?;
        Ok(filter.apply(records))
    }

    pub async fn stats(&self) -> Result<CatalogStats> {
        let records = self.backend.list(&SortSpec::default()).await?;
        Ok(CatalogStats::collect(&records))
    }

    /// Stores the worksheet files and creates its record.
    ///
    /// The metadata is checked before anything is uploaded. If the insert
    /// fails after the uploads went through, the stored files are left
    /// behind unreferenced.
    pub async fn publish(&self, submission: Submission) -> Result<Worksheet> {
        let Submission {
            mut draft,
            file,
            preview,
        } = submission;

        draft.validate_metadata()?;

        let uploaded = self.backend.upload_file(file).await?;
        draft.file_url = Some(uploaded.file_url);

        if let Some(preview) = preview {
            let uploaded = self.backend.upload_file(preview).await?;
            draft.preview_image_url = Some(uploaded.file_url);
        }

        draft.download_count = Some(0);
        let created = self.backend.create(draft).await?;
        info!("published worksheet {} '{}'", created.id, created.title);

        Ok(created)
    }

    /// Bumps the download counter of a worksheet and returns the updated
    /// record. Two concurrent calls may count once.
    pub async fn record_download(&self, id: &str) -> Result<Worksheet> {
        let current = self.backend.get(id).await?;
        let patch = WorksheetPatch::download_count(current.download_count.saturating_add(1));

        self.backend.update(id, patch).await
    }
}

pub struct Auth<'a> {
    backend: &'a dyn Backend,
}

impl Auth<'_> {
    pub async fn me(&self) -> Option<Actor> {
        self.backend.me().await
    }
}

pub struct Worksheets<'a> {
    backend: &'a dyn Backend,
}

impl Worksheets<'_> {
    /// Lists every worksheet ordered by a sort key such as `-created_date`.
    pub async fn list(&self, sort: &str) -> Result<Vec<Worksheet>> {
        let sort: SortSpec = sort.parse()?;
        self.backend.list(&sort).await
    }

    pub async fn list_sorted(&self, sort: &SortSpec) -> Result<Vec<Worksheet>> {
        self.backend.list(sort).await
    }

    pub async fn get(&self, id: &str) -> Result<Worksheet> {
        self.backend.get(id).await
    }

    pub async fn create(&self, draft: WorksheetDraft) -> Result<Worksheet> {
        self.backend.create(draft).await
    }

    pub async fn update(&self, id: &str, patch: WorksheetPatch) -> Result<Worksheet> {
        self.backend.update(id, patch).await
    }
}

pub struct Integrations<'a> {
    backend: &'a dyn Backend,
}

impl Integrations<'_> {
    pub async fn upload_file(&self, file: FilePayload) -> Result<UploadedFile> {
        self.backend.upload_file(file).await
    }
}

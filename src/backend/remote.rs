use super::Backend;
use crate::config::{RemoteConfig, DEFAULT_BUCKET, DEFAULT_TABLE};
use crate::error::{Error, Result};
use crate::model::{Actor, Worksheet, WorksheetDraft, WorksheetPatch};
use crate::query::{SortField, SortSpec};
use crate::upload::{self, FilePayload, UploadedFile};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// postgres `invalid_text_representation`, raised when an id filter does not
/// fit the id column type
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

#[derive(Debug, Clone)]
pub struct RemoteOptions {
    /// project base url, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// service role key, sent on every request
    pub api_key: String,
    pub bucket: String,
    pub table: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl RemoteOptions {
    pub fn new<U: Into<String>, K: Into<String>>(url: U, api_key: K) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            bucket: DEFAULT_BUCKET.into(),
            table: DEFAULT_TABLE.into(),
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&RemoteConfig> for RemoteOptions {
    fn from(cfg: &RemoteConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            api_key: cfg.service_key.clone(),
            bucket: cfg.bucket.clone(),
            table: cfg.table.clone(),
            access_token: cfg.access_token.clone(),
            timeout: Duration::from_secs(cfg.timeout_seconds),
        }
    }
}

/// A failed round trip to the hosted service.
#[derive(Debug)]
struct Fault {
    code: Option<String>,
    message: String,
}

impl Fault {
    fn network(err: reqwest::Error) -> Self {
        Self {
            code: None,
            message: err.to_string(),
        }
    }

    fn decode<E: std::fmt::Display>(err: E) -> Self {
        Self {
            code: None,
            message: format!("invalid response: {}", err),
        }
    }

    /// Extracts the service's own message from an error body, falling back to
    /// the raw body and then to the status line.
    fn parse(status: StatusCode, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Body {
            code: Option<serde_json::Value>,
            message: Option<String>,
            msg: Option<String>,
            error_description: Option<String>,
            error: Option<serde_json::Value>,
        }

        let parsed = serde_json::from_str::<Body>(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|b| b.code.as_ref())
            .map(|c| match c {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        let message = parsed.and_then(|b| {
            b.message
                .or(b.msg)
                .or(b.error_description)
                .or_else(|| b.error.and_then(|e| e.as_str().map(String::from)))
        });

        let message = match message {
            Some(m) if !m.trim().is_empty() => m,
            _ if !body.trim().is_empty() => body.trim().to_string(),
            _ => status.to_string(),
        };

        Self { code, message }
    }

    fn invalid_input(&self) -> bool {
        self.code.as_deref() == Some(INVALID_TEXT_REPRESENTATION)
    }

    fn backend(self, action: &str) -> Error {
        Error::Backend(format!("Database {} failed: {}", action, self.message))
    }

    fn upload(self) -> Error {
        Error::Upload(format!("Storage upload failed: {}", self.message))
    }
}

async fn check(response: Response) -> std::result::Result<Response, Fault> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Fault::parse(status, &body))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RowId {
    Number(i64),
    Text(String),
}

/// A row of the worksheets table as the REST interface returns it.
#[derive(Deserialize)]
struct WorksheetRow {
    id: RowId,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    difficulty: Option<String>,
    file_url: Option<String>,
    preview_image_url: Option<String>,
    download_count: Option<i64>,
    topics: Option<Vec<String>>,
    pages: Option<i64>,
    created_at: String,
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    // `timestamp without time zone` columns come back without an offset
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}

impl WorksheetRow {
    fn into_worksheet(self) -> std::result::Result<Worksheet, Fault> {
        let row = self;

        let created_date = parse_timestamp(&row.created_at).ok_or_else(|| {
            Fault::decode(format!("invalid created_at '{}'", row.created_at))
        })?;

        Ok(Worksheet {
            id: match row.id {
                RowId::Number(n) => n.to_string(),
                RowId::Text(s) => s,
            },
            title: row.title.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            category: row.category.unwrap_or_default(),
            difficulty: row.difficulty.unwrap_or_default(),
            file_url: row.file_url.unwrap_or_default(),
            preview_image_url: row.preview_image_url.filter(|u| !u.is_empty()),
            download_count: row
                .download_count
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0),
            topics: row
                .topics
                .unwrap_or_default()
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .collect(),
            pages: row
                .pages
                .and_then(|p| u32::try_from(p).ok())
                .filter(|p| *p > 0),
            created_date,
        })
    }
}

/// Table column a sort field maps to.
fn column(field: SortField) -> &'static str {
    match field {
        SortField::CreatedDate => "created_at",
        other => other.name(),
    }
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
    role: Option<String>,
    #[serde(default)]
    app_metadata: UserMetadata,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Default, Deserialize)]
struct UserMetadata {
    role: Option<String>,
    name: Option<String>,
    full_name: Option<String>,
}

impl AuthUser {
    fn into_actor(self) -> Actor {
        Actor {
            id: self.id,
            name: self.user_metadata.full_name.or(self.user_metadata.name),
            email: self.email,
            role: self
                .app_metadata
                .role
                .or(self.role)
                .unwrap_or_else(|| "authenticated".into()),
        }
    }
}

/// Backend talking to a hosted BaaS project: rows through its PostgREST
/// interface, files through its storage api with public read urls.
#[derive(Clone)]
pub struct RemoteBackend {
    client: Client,
    opts: RemoteOptions,
}

impl RemoteBackend {
    pub fn new(mut opts: RemoteOptions) -> Result<Self> {
        if opts.url.trim().is_empty() || opts.api_key.trim().is_empty() {
            return Err(Error::Validation(
                "Missing Supabase credentials: url and service key are required".into(),
            ));
        }
        opts.url = opts.url.trim().trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(opts.timeout)
            .build()
            .map_err(|err| Error::Backend(format!("failed to build http client: {}", err)))?;

        Ok(Self { client, opts })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.opts.url, self.opts.table)
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.opts.url, self.opts.bucket, key
        )
    }

    /// Public read url of a stored object.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.opts.url, self.opts.bucket, key
        )
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.opts.api_key)
            .bearer_auth(&self.opts.api_key)
    }

    async fn rows(&self, req: RequestBuilder) -> std::result::Result<Vec<Worksheet>, Fault> {
        let response = self.authorized(req).send().await.map_err(Fault::network)?;
        let response = check(response).await?;
        let rows: Vec<WorksheetRow> = response.json().await.map_err(Fault::decode)?;

        rows.into_iter().map(WorksheetRow::into_worksheet).collect()
    }

    /// Rows matching `id`. An id that cannot exist in the column matches
    /// nothing.
    async fn rows_by_id(
        &self,
        req: RequestBuilder,
        action: &str,
    ) -> Result<Vec<Worksheet>> {
        match self.rows(req).await {
            Ok(rows) => Ok(rows),
            Err(fault) if fault.invalid_input() => Ok(Vec::new()),
            Err(fault) => Err(fault.backend(action)),
        }
    }
}

#[async_trait::async_trait]
impl Backend for RemoteBackend {
    async fn me(&self) -> Option<Actor> {
        let token = self.opts.access_token.as_deref()?;

        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.opts.url))
            .header("apikey", &self.opts.api_key)
            .bearer_auth(token)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!("failed to resolve session user: {}", err);
                return None;
            }
        };

        let response = match check(response).await {
            Ok(response) => response,
            Err(fault) => {
                debug!("no active session: {}", fault.message);
                return None;
            }
        };

        match response.json::<AuthUser>().await {
            Ok(user) => Some(user.into_actor()),
            Err(err) => {
                warn!("unexpected session user payload: {}", err);
                None
            }
        }
    }

    async fn list(&self, sort: &SortSpec) -> Result<Vec<Worksheet>> {
        let order = format!(
            "{}.{}",
            column(sort.field),
            if sort.is_descending() { "desc" } else { "asc" }
        );
        let req = self
            .client
            .get(self.table_url())
            .query(&[("select", "*"), ("order", order.as_str())]);

        let mut records = self.rows(req).await.map_err(|f| f.backend("select"))?;
        // the database collation may order text differently
        sort.sort(&mut records);

        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Worksheet> {
        let filter = format!("eq.{}", id);
        let req = self
            .client
            .get(self.table_url())
            .query(&[("select", "*"), ("id", filter.as_str())]);

        self.rows_by_id(req, "select")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::worksheet_not_found(id))
    }

    async fn create(&self, draft: WorksheetDraft) -> Result<Worksheet> {
        let new = draft.validate()?;
        let req = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .json(&[&new]);

        let created = self
            .rows(req)
            .await
            .map_err(|f| f.backend("insert"))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Backend("Database insert failed: no row returned".into()))?;

        debug!("inserted worksheet {}", created.id);
        Ok(created)
    }

    async fn update(&self, id: &str, patch: WorksheetPatch) -> Result<Worksheet> {
        let patch = patch.normalized()?;
        if patch.is_empty() {
            return self.get(id).await;
        }
        if patch.download_count.is_some() {
            patch.check_against(&self.get(id).await?)?;
        }

        let filter = format!("eq.{}", id);
        let req = self
            .client
            .patch(self.table_url())
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=representation")
            .json(&patch);

        self.rows_by_id(req, "update")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::worksheet_not_found(id))
    }

    async fn upload_file(&self, file: FilePayload) -> Result<UploadedFile> {
        file.ensure_present()?;

        let key = upload::object_key(&file);
        let req = self
            .client
            .post(self.object_url(&key))
            .header(CONTENT_TYPE, file.mime())
            .header("x-upsert", "false")
            .body(file.bytes.clone());

        let response = self
            .authorized(req)
            .send()
            .await
            .map_err(|err| Fault::network(err).upload())?;
        check(response).await.map_err(Fault::upload)?;

        info!(
            "uploaded {} ({} bytes) as {}/{}",
            file.name,
            file.bytes.len(),
            self.opts.bucket,
            key
        );

        Ok(UploadedFile {
            file_url: self.public_url(&key),
        })
    }

    fn describe(&self) -> String {
        format!("remote backend ({}, table {})", self.opts.url, self.opts.table)
    }
}

use super::{Category, Difficulty, Worksheet};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A worksheet record as submitted for creation. `id` and `created_date` are
/// never accepted from the caller, the backend assigns both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorksheetDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub file_url: Option<String>,
    pub preview_image_url: Option<String>,
    pub download_count: Option<u64>,
    pub topics: Vec<String>,
    pub pages: Option<u32>,
}

/// A draft that passed validation and normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct NewWorksheet {
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub file_url: String,
    pub preview_image_url: Option<String>,
    pub download_count: u64,
    pub topics: Vec<String>,
    pub pages: Option<u32>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    present(value)
        .map(String::from)
        .ok_or_else(|| Error::Validation(format!("Missing required fields: {}", name)))
}

fn check_category(value: &str) -> Result<()> {
    value.parse::<Category>().map(|_| ()).map_err(|_| {
        let allowed: Vec<&str> = Category::ALL.iter().map(Category::label).collect();
        Error::Validation(format!(
            "Invalid category '{}', expected one of: {}",
            value,
            allowed.join(", ")
        ))
    })
}

fn check_difficulty(value: &str) -> Result<()> {
    value.parse::<Difficulty>().map(|_| ()).map_err(|_| {
        let allowed: Vec<&str> = Difficulty::ALL.iter().map(Difficulty::label).collect();
        Error::Validation(format!(
            "Invalid difficulty '{}', expected one of: {}",
            value,
            allowed.join(", ")
        ))
    })
}

fn check_pages(pages: Option<u32>) -> Result<()> {
    match pages {
        Some(0) => Err(Error::Validation(
            "pages must be a positive integer".to_string(),
        )),
        _ => Ok(()),
    }
}

fn normalize_topics(topics: &[String]) -> Vec<String> {
    topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Splits a comma separated topic list as typed in a form or on the command line.
pub fn parse_topics(topics: &str) -> Vec<String> {
    let parts: Vec<String> = topics.split(',').map(String::from).collect();
    normalize_topics(&parts)
}

impl WorksheetDraft {
    pub fn new<S: Into<String>>(title: S, description: S, category: S, difficulty: S) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            category: Some(category.into()),
            difficulty: Some(difficulty.into()),
            ..Default::default()
        }
    }

    pub fn with_file_url<S: Into<String>>(mut self, url: S) -> Self {
        self.file_url = Some(url.into());
        self
    }

    pub fn with_preview_image_url<S: Into<String>>(mut self, url: S) -> Self {
        self.preview_image_url = Some(url.into());
        self
    }

    pub fn with_topics<I, T>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Checks every field except `file_url`, so an upload flow can reject bad
    /// metadata before it stores any file.
    pub fn validate_metadata(&self) -> Result<()> {
        self.check(false)
    }

    pub(crate) fn validate(&self) -> Result<NewWorksheet> {
        self.check(true)?;

        Ok(NewWorksheet {
            title: required(&self.title, "title")?,
            description: required(&self.description, "description")?,
            category: required(&self.category, "category")?,
            difficulty: required(&self.difficulty, "difficulty")?,
            file_url: required(&self.file_url, "file_url")?,
            preview_image_url: present(&self.preview_image_url).map(String::from),
            download_count: self.download_count.unwrap_or(0),
            topics: normalize_topics(&self.topics),
            pages: self.pages,
        })
    }

    fn check(&self, require_file: bool) -> Result<()> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
            ("difficulty", &self.difficulty),
        ] {
            if present(value).is_none() {
                missing.push(name);
            }
        }
        if require_file && present(&self.file_url).is_none() {
            missing.push("file_url");
        }

        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        if let Some(category) = present(&self.category) {
            check_category(category)?;
        }
        if let Some(difficulty) = present(&self.difficulty) {
            check_difficulty(difficulty)?;
        }
        check_pages(self.pages)
    }
}

impl NewWorksheet {
    pub fn into_worksheet(self, id: String, created_date: DateTime<Utc>) -> Worksheet {
        Worksheet {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            difficulty: self.difficulty,
            file_url: self.file_url,
            preview_image_url: self.preview_image_url,
            download_count: self.download_count,
            topics: self.topics,
            pages: self.pages,
            created_date,
        }
    }
}

/// Keeps an explicit `null` apart from an absent key: absent stays `None`
/// (through `#[serde(default)]`), `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of a worksheet. Absent fields are left untouched, there is
/// no version token so concurrent patches are last-write-wins per field.
///
/// The optional record fields take a second level of `Option`: `Some(None)`
/// clears the field and serializes as an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorksheetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub preview_image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub pages: Option<Option<u32>>,
}

impl WorksheetPatch {
    pub fn download_count(count: u64) -> Self {
        Self {
            download_count: Some(count),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns the patch with its text fields trimmed and topics cleaned, or a
    /// validation error if a present field would break a record invariant.
    /// A blank preview url clears the preview.
    pub(crate) fn normalized(&self) -> Result<WorksheetPatch> {
        let text = |value: &Option<String>, name: &str| -> Result<Option<String>> {
            match value {
                None => Ok(None),
                Some(_) => match present(value) {
                    Some(v) => Ok(Some(v.to_string())),
                    None => Err(Error::Validation(format!("{} must not be empty", name))),
                },
            }
        };

        let patch = WorksheetPatch {
            title: text(&self.title, "title")?,
            description: text(&self.description, "description")?,
            category: text(&self.category, "category")?,
            difficulty: text(&self.difficulty, "difficulty")?,
            file_url: text(&self.file_url, "file_url")?,
            preview_image_url: self
                .preview_image_url
                .as_ref()
                .map(|url| present(url).map(String::from)),
            download_count: self.download_count,
            topics: self.topics.as_deref().map(normalize_topics),
            pages: self.pages,
        };

        if let Some(category) = &patch.category {
            check_category(category)?;
        }
        if let Some(difficulty) = &patch.difficulty {
            check_difficulty(difficulty)?;
        }
        check_pages(patch.pages.flatten())?;

        Ok(patch)
    }

    /// Rejects a patch that would lower the download count of `current`,
    /// the count only ever grows.
    pub fn check_against(&self, current: &Worksheet) -> Result<()> {
        match self.download_count {
            Some(count) if count < current.download_count => Err(Error::Validation(format!(
                "download_count cannot decrease (current {}, got {})",
                current.download_count, count
            ))),
            _ => Ok(()),
        }
    }

    /// Shallow merge onto an existing record.
    pub fn apply(&self, worksheet: &mut Worksheet) {
        if let Some(title) = &self.title {
            worksheet.title = title.clone();
        }
        if let Some(description) = &self.description {
            worksheet.description = description.clone();
        }
        if let Some(category) = &self.category {
            worksheet.category = category.clone();
        }
        if let Some(difficulty) = &self.difficulty {
            worksheet.difficulty = difficulty.clone();
        }
        if let Some(file_url) = &self.file_url {
            worksheet.file_url = file_url.clone();
        }
        if let Some(preview) = &self.preview_image_url {
            worksheet.preview_image_url = preview.clone();
        }
        if let Some(count) = self.download_count {
            worksheet.download_count = count;
        }
        if let Some(topics) = &self.topics {
            worksheet.topics = topics.clone();
        }
        if let Some(pages) = self.pages {
            worksheet.pages = pages;
        }
    }
}

use crate::error::{Error, Result};
use crate::model::Worksheet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Filter value that disables a filter dimension.
pub const ALL: &str = "all";

const DESCENDING_MARKER: char = '-';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Description,
    Category,
    Difficulty,
    FileUrl,
    DownloadCount,
    Pages,
    CreatedDate,
}

impl SortField {
    pub fn name(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Description => "description",
            SortField::Category => "category",
            SortField::Difficulty => "difficulty",
            SortField::FileUrl => "file_url",
            SortField::DownloadCount => "download_count",
            SortField::Pages => "pages",
            SortField::CreatedDate => "created_date",
        }
    }

    fn compare(&self, a: &Worksheet, b: &Worksheet) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Description => a.description.cmp(&b.description),
            SortField::Category => a.category.cmp(&b.category),
            SortField::Difficulty => a.difficulty.cmp(&b.difficulty),
            SortField::FileUrl => a.file_url.cmp(&b.file_url),
            SortField::DownloadCount => a.download_count.cmp(&b.download_count),
            // records without a page count sort before any counted one
            SortField::Pages => a.pages.cmp(&b.pages),
            SortField::CreatedDate => a.created_date.cmp(&b.created_date),
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let field = match s {
            "id" => SortField::Id,
            "title" => SortField::Title,
            "description" => SortField::Description,
            "category" => SortField::Category,
            "difficulty" => SortField::Difficulty,
            "file_url" => SortField::FileUrl,
            "download_count" => SortField::DownloadCount,
            "pages" => SortField::Pages,
            "created_date" => SortField::CreatedDate,
            _ => {
                return Err(Error::Validation(format!(
                    "Unknown sort field '{}'",
                    s
                )))
            }
        };

        Ok(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A sort key as written by callers: a field name, optionally prefixed with
/// `-` for descending order. The default is newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: Direction,
}

impl SortSpec {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Descending,
        }
    }

    pub fn is_descending(&self) -> bool {
        self.direction == Direction::Descending
    }

    pub fn compare(&self, a: &Worksheet, b: &Worksheet) -> Ordering {
        let ord = self.field.compare(a, b);
        match self.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }

    /// Orders records in place. Records with equal keys keep no guaranteed
    /// relative order.
    pub fn sort(&self, records: &mut [Worksheet]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec::descending(SortField::CreatedDate)
    }
}

impl FromStr for SortSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(SortSpec::default());
        }

        match s.strip_prefix(DESCENDING_MARKER) {
            Some(field) => Ok(SortSpec::descending(field.parse()?)),
            None => Ok(SortSpec::ascending(s.parse()?)),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_descending() {
            write!(f, "{}", DESCENDING_MARKER)?;
        }
        f.write_str(self.field.name())
    }
}

/// Client-side category/difficulty filter. `None` (or the value `all`) on a
/// dimension keeps every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

fn dimension(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.is_empty() && *v != ALL)
        .map(String::from)
}

impl Filter {
    pub fn new(category: Option<&str>, difficulty: Option<&str>) -> Self {
        Self {
            category: dimension(category),
            difficulty: dimension(difficulty),
        }
    }

    pub fn matches(&self, worksheet: &Worksheet) -> bool {
        let category = match &self.category {
            Some(c) => worksheet.category == *c,
            None => true,
        };
        let difficulty = match &self.difficulty {
            Some(d) => worksheet.difficulty == *d,
            None => true,
        };

        category && difficulty
    }

    pub fn apply(&self, records: Vec<Worksheet>) -> Vec<Worksheet> {
        records.into_iter().filter(|w| self.matches(w)).collect()
    }
}

/// Totals shown on the catalog landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub worksheets: usize,
    pub downloads: u64,
}

impl CatalogStats {
    pub fn collect(records: &[Worksheet]) -> Self {
        Self {
            worksheets: records.len(),
            downloads: records.iter().map(|w| w.download_count).sum(),
        }
    }
}

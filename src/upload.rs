use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_EXTENSION: &str = "bin";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file handed to `upload_file`: its original name (used for the
/// extension), an optional declared content type, and the bytes.
#[derive(Clone, Debug)]
pub struct FilePayload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Result of a stored upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_url: String,
}

impl FilePayload {
    pub fn new<S: Into<String>, B: Into<Bytes>>(name: S, bytes: B) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            Error::Upload(format!("Failed to read file '{}': {}", path.display(), err))
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(name, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase extension of the original file name, `bin` when it has none.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }

    /// Declared content type, or one guessed from the extension.
    pub fn mime(&self) -> String {
        if let Some(content_type) = self.content_type.as_deref().filter(|c| !c.is_empty()) {
            return content_type.to_string();
        }

        mime_guess::from_ext(&self.extension())
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string()
    }

    /// Rejects payloads that carry nothing to store.
    pub(crate) fn ensure_present(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Upload("No file provided".to_string()));
        }

        Ok(())
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Storage key for a new object: `<unix millis>-<random base36>.<ext>`. The
/// time and random parts make a collision negligible without asking the
/// store whether the key is taken.
pub fn object_key(payload: &FilePayload) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let fragment: u64 = rand::thread_rng().gen();

    format!("{}-{}.{}", millis, base36(fragment), payload.extension())
}

/// Embeds the payload in a self-contained `data:` url. Used by the demo
/// backend in place of an object store.
pub fn data_url(payload: &FilePayload) -> String {
    format!("data:{};base64,{}", payload.mime(), BASE64.encode(&payload.bytes))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_base36() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn extension_and_mime() {
        let pdf = FilePayload::new("Algebra.PDF", "x");
        assert_eq!(pdf.extension(), "pdf");
        assert_eq!(pdf.mime(), "application/pdf");

        let png = FilePayload::new("preview.png", "x");
        assert_eq!(png.mime(), "image/png");

        let bare = FilePayload::new("README", "x");
        assert_eq!(bare.extension(), DEFAULT_EXTENSION);
        assert_eq!(bare.mime(), DEFAULT_CONTENT_TYPE);

        let declared = FilePayload::new("README", "x").with_content_type("text/plain");
        assert_eq!(declared.mime(), "text/plain");
    }

    #[test]
    fn object_keys_keep_extension_and_never_repeat() {
        let payload = FilePayload::new("worksheet.pdf", "%PDF-1.4");
        let mut keys = HashSet::new();
        for _ in 0..1000 {
            let key = object_key(&payload);
            assert!(key.ends_with(".pdf"), "{}", key);
            let (millis, _) = key.split_once('-').unwrap();
            assert!(millis.parse::<i64>().is_ok());
            assert!(keys.insert(key));
        }
    }

    #[test]
    fn data_url_embeds_bytes() {
        let payload = FilePayload::new("a.txt", "hi");
        assert_eq!(data_url(&payload), "data:text/plain;base64,aGk=");
    }

    #[test]
    fn empty_payload_is_rejected() {
        let err = FilePayload::new("a.pdf", Vec::new()).ensure_present().unwrap_err();
        assert_eq!(err.to_string(), "No file provided");
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.pdf");
        tokio::fs::write(&path, b"%PDF").await.unwrap();

        let payload = FilePayload::from_path(&path).await.unwrap();
        assert_eq!(payload.name, "sheet.pdf");
        assert_eq!(&payload.bytes[..], b"%PDF");

        let err = FilePayload::from_path(dir.path().join("missing.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Upload);
    }
}

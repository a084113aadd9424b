use super::{check_key, Error, Result, Store};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

pub const SCHEME: &str = "dir";

/// DirStore keeps every key as a single file under a root directory, which
/// makes it survive process restarts. Writes go through a temporary file and a
/// rename so a crash never leaves a half written blob behind.
#[derive(Clone, Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub async fn make<U: AsRef<str>>(url: &U) -> Result<DirStore> {
        let u = url::Url::parse(url.as_ref())?;
        if u.scheme() != SCHEME {
            return Err(Error::InvalidScheme(u.scheme().into(), SCHEME.into()));
        }

        DirStore::new(u.path()).await
    }

    pub async fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait::async_trait]
impl Store for DirStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path(key)?;

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::KeyNotFound);
            }
            Err(err) => {
                return Err(Error::IO(err));
            }
        };

        Ok(data)
    }

    async fn set(&self, key: &str, blob: &[u8]) -> Result<()> {
        let path = self.path(key)?;
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, blob).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path(key)?;
        match fs::remove_file(&path).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::IO(err)),
        }
    }

    fn url(&self) -> String {
        format!("{}://{}", SCHEME, self.root.display())
    }
}

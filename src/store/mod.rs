pub mod dir;
pub mod memory;

pub use dir::DirStore;
pub use memory::MemStore;

/// Builds a store from its url, `dir:///path/to/root` or `memory://`.
pub async fn make<U: AsRef<str>>(u: U) -> Result<Stores> {
    let parsed = url::Url::parse(u.as_ref())?;

    match parsed.scheme() {
        dir::SCHEME => Ok(Stores::Dir(dir::DirStore::make(&u).await?)),
        memory::SCHEME => Ok(Stores::Memory(memory::MemStore::new())),
        _ => Err(Error::UnknownStore(parsed.scheme().into())),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("key not found")]
    KeyNotFound,
    #[error("invalid key")]
    InvalidKey,

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("unknown store type '{0}'")]
    UnknownStore(String),
    #[error("invalid schema '{0}' expected '{1}'")]
    InvalidScheme(String, String),

    #[error("unknown store error {0:#}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The store trait defines a simple (low level) key/value store interface to
/// set/get blobs under a named slot. Every `set` replaces the whole blob, the
/// store has no notion of partial writes.
#[async_trait::async_trait]
pub trait Store: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    async fn set(&self, key: &str, blob: &[u8]) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    fn url(&self) -> String;
}

/// keys end up as file names, so only a conservative alphabet is allowed
pub(crate) fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !key.starts_with('.');

    if !valid {
        return Err(Error::InvalidKey);
    }

    Ok(())
}

pub enum Stores {
    Dir(dir::DirStore),
    Memory(memory::MemStore),
}

#[async_trait::async_trait]
impl Store for Stores {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        match self {
            self::Stores::Dir(dir_store) => dir_store.get(key).await,
            self::Stores::Memory(mem_store) => mem_store.get(key).await,
        }
    }
    async fn set(&self, key: &str, blob: &[u8]) -> Result<()> {
        match self {
            self::Stores::Dir(dir_store) => dir_store.set(key, blob).await,
            self::Stores::Memory(mem_store) => mem_store.set(key, blob).await,
        }
    }
    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            self::Stores::Dir(dir_store) => dir_store.delete(key).await,
            self::Stores::Memory(mem_store) => mem_store.delete(key).await,
        }
    }
    fn url(&self) -> String {
        match self {
            self::Stores::Dir(dir_store) => dir_store.url(),
            self::Stores::Memory(mem_store) => mem_store.url(),
        }
    }
}

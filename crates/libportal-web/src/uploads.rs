use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Clone, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub directory: PathBuf,
    pub url_prefix: String,
    pub max_bytes: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Only JPG, PNG, GIF and WEBP images can be uploaded ({0:?} given)")]
    UnsupportedType(String),
    #[error("The image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("refusing to touch stored file {0:?}")]
    InvalidName(String),
    #[error("upload directory io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Problems with the submitted file itself rather than with storage.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::UnsupportedType(_) | Error::TooLarge { .. })
    }
}

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct UploadDir {
    directory: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl UploadDir {
    pub fn new(config: &Config) -> Self {
        Self {
            directory: config.directory.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_owned(),
            max_bytes: config.max_bytes,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn ensure_exists(&self) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(Into::into)
    }

    /// Stores `file` as `<prefix>_<uuid>.<ext>` and returns the stored name.
    #[tracing::instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn save(&self, prefix: &str, file: &UploadedFile) -> Result<String, Error> {
        let extension = image_extension(&file.file_name)?;
        if file.bytes.len() > self.max_bytes {
            return Err(Error::TooLarge {
                size: file.bytes.len(),
                limit: self.max_bytes,
            });
        }
        let stored_name = format!("{prefix}_{}.{extension}", uuid::Uuid::new_v4().simple());
        tokio::fs::write(self.directory.join(&stored_name), &file.bytes).await?;
        tracing::debug!(stored_name, "stored upload");
        Ok(stored_name)
    }

    /// Deletes a stored file. A file that is already gone is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, stored_name: &str) -> Result<bool, Error> {
        if !is_plain_file_name(stored_name) {
            return Err(Error::InvalidName(stored_name.to_owned()));
        }
        match tokio::fs::remove_file(self.directory.join(stored_name)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Removal that only logs on failure, for cleanup after the database has moved on.
    pub async fn discard(&self, stored_name: &str) {
        if let Err(err) = self.remove(stored_name).await {
            tracing::warn!("removing stored file {stored_name:?}: {err}");
        }
    }

    pub fn url_for(&self, stored_name: &str) -> String {
        format!("{}/{stored_name}", self.url_prefix)
    }
}

fn image_extension(file_name: &str) -> Result<String, Error> {
    Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|extension| IMAGE_EXTENSIONS.contains(&extension.as_str()))
        .ok_or_else(|| Error::UnsupportedType(file_name.to_owned()))
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: Option<String>,
}

/// Continuation point of a truncated version listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionMarker {
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionPage {
    pub versions: Vec<ObjectVersion>,
    /// Present only when the listing was truncated.
    pub next: Option<VersionMarker>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectStoreError {
    #[error("could not list versions in bucket {bucket}: {message}")]
    List { bucket: String, message: String },
    #[error("could not delete objects from bucket {bucket}: {message}")]
    Delete { bucket: String, message: String },
}

pub trait VersionedObjectStore {
    fn list_versions(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&VersionMarker>,
    ) -> Result<VersionPage, ObjectStoreError>;

    fn delete_versions(
        &self,
        bucket: &str,
        versions: &[ObjectVersion],
    ) -> Result<(), ObjectStoreError>;
}

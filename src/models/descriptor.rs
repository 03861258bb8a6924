//! Represents one object observed while listing a bucket.

/// A single entry of a bucket listing.
///
/// Carries just enough to classify the object without fetching it again:
/// the path-like name, its size in bytes, and the CRC32 checksum the store
/// reports for its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Path-like object name, unique within its bucket.
    pub name: String,

    /// Content size in bytes.
    pub size: u64,

    /// CRC32 checksum of the content, used as the content fingerprint.
    pub fingerprint: u32,
}

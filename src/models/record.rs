//! Represents one object as recorded in the fingerprint index.

use crate::models::descriptor::ObjectDescriptor;
use sqlx::FromRow;

/// A durable metadata row for an object seen in the source bucket.
///
/// `name` is the primary key of the index table; a record is written once and
/// never updated or deleted. `section` and `prefix` are derived from the name
/// and serve as coarse partition labels for offline queries.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ObjectRecord {
    /// Object name, primary key.
    pub name: String,

    /// First path segment of the name.
    pub section: String,

    /// Directory portion of the name, `.` when the name has none.
    pub prefix: String,

    /// Content size in bytes.
    pub size: i64,

    /// CRC32 content fingerprint.
    pub fingerprint: u32,
}

impl ObjectRecord {
    pub fn from_descriptor(descriptor: &ObjectDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            section: section_of(&descriptor.name).to_string(),
            prefix: prefix_of(&descriptor.name).to_string(),
            size: descriptor.size as i64,
            fingerprint: descriptor.fingerprint,
        }
    }
}

/// First `/`-separated segment of an object name.
fn section_of(name: &str) -> &str {
    name.split('/').next().unwrap_or(name)
}

/// Directory portion of an object name, `.` for bare names.
fn prefix_of(name: &str) -> &str {
    match name.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir,
        _ => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ObjectDescriptor {
        ObjectDescriptor {
            name: name.to_string(),
            size: 42,
            fingerprint: 111,
        }
    }

    #[test]
    fn derives_section_and_prefix_from_nested_name() {
        let record = ObjectRecord::from_descriptor(&descriptor("A/1/1_1.jpg"));
        assert_eq!(record.section, "A");
        assert_eq!(record.prefix, "A/1");
        assert_eq!(record.size, 42);
        assert_eq!(record.fingerprint, 111);
    }

    #[test]
    fn bare_name_is_its_own_section_with_dot_prefix() {
        let record = ObjectRecord::from_descriptor(&descriptor("photo.jpg"));
        assert_eq!(record.section, "photo.jpg");
        assert_eq!(record.prefix, ".");
    }
}

//! Photo upload value object.
//!
//! Models an uploaded image file as an explicit value instead of an
//! opaque framework "file" object: original name, raw bytes, and the
//! storage key derived from the name.

use crate::config::is_allowed_image;

/// An uploaded photo file.
#[derive(Clone)]
pub struct PhotoUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

// Keep multi-megabyte byte buffers out of debug output
impl std::fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("name", &self.name)
            .field("bytes", &format!("{} bytes", self.bytes.len()))
            .finish()
    }
}

impl PhotoUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Derive the storage key from the upload's filename.
    ///
    /// Path components are stripped and every character outside
    /// `[A-Za-z0-9._-]` becomes an underscore, so the key is always safe
    /// to join below the content area root. An empty result means the
    /// name had no usable characters and the upload must be rejected.
    pub fn derived_key(&self) -> String {
        let base = self
            .name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();

        let key: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        key.trim_matches(['.', '_']).to_string()
    }

    /// Check the derived key is usable and carries an accepted extension.
    pub fn is_valid_image(&self) -> bool {
        let key = self.derived_key();
        !key.is_empty() && is_allowed_image(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filename_kept() {
        let upload = PhotoUpload::new("sesame_1.png", vec![1, 2, 3]);
        assert_eq!(upload.derived_key(), "sesame_1.png");
        assert!(upload.is_valid_image());
    }

    #[test]
    fn test_path_components_stripped() {
        let upload = PhotoUpload::new("../../etc/passwd.png", vec![1]);
        assert_eq!(upload.derived_key(), "passwd.png");

        let upload = PhotoUpload::new("C:\\Users\\me\\pic.jpg", vec![1]);
        assert_eq!(upload.derived_key(), "pic.jpg");
    }

    #[test]
    fn test_unsafe_characters_replaced() {
        let upload = PhotoUpload::new("my photo (1).jpeg", vec![1]);
        assert_eq!(upload.derived_key(), "my_photo__1_.jpeg");
    }

    #[test]
    fn test_disallowed_extension_rejected() {
        let upload = PhotoUpload::new("script.sh", vec![1]);
        assert!(!upload.is_valid_image());
    }

    #[test]
    fn test_degenerate_names_rejected() {
        assert!(!PhotoUpload::new("", vec![1]).is_valid_image());
        assert!(!PhotoUpload::new("...", vec![1]).is_valid_image());
        assert!(!PhotoUpload::new("çé", vec![1]).is_valid_image());
    }
}

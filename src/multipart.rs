//! Single-file `multipart/form-data` forms for attachment upload.
//!
//! The upload endpoint takes exactly one part named `file`. A `Form` is
//! consumed when the request is sent, so each upload path tried gets a fresh
//! one built from the same bytes.

use crate::{Error, Result};
use reqwest::multipart::{Form, Part};

/// Form field name the upload endpoint reads
pub const FILE_FIELD: &str = "file";

/// Build a form holding `data` as the `file` part.
///
/// # Errors
///
/// [`Error::InvalidConfiguration`] if `mime_type` is not a valid MIME type.
pub fn attachment_form(filename: &str, mime_type: &str, data: &[u8]) -> Result<Form> {
    let part = Part::bytes(data.to_vec())
        .file_name(filename.to_string())
        .mime_str(mime_type)
        .map_err(|e| Error::config(format!("invalid MIME type {:?}: {}", mime_type, e)))?;

    Ok(Form::new().part(FILE_FIELD, part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_boundary_per_form() {
        let a = attachment_form("a.txt", "text/plain", b"a").unwrap();
        let b = attachment_form("a.txt", "text/plain", b"a").unwrap();
        assert!(!a.boundary().is_empty());
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn test_invalid_mime_type_rejected() {
        let result = attachment_form("a.bin", "not a mime type", b"");
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }
}

// Input validation for admission requests

use crate::error::{AppError, Result};

const MAX_OWNER_ID_LEN: usize = 128;
const MAX_ITEM_ID_LEN: usize = 64;
const MAX_FINGERPRINT_LEN: usize = 64;

pub fn validate_owner_id(owner_id: &str) -> Result<()> {
    if owner_id.trim().is_empty() {
        return Err(AppError::Validation("owner_id cannot be empty".to_string()));
    }
    if owner_id.len() > MAX_OWNER_ID_LEN {
        return Err(AppError::Validation(format!(
            "owner_id too long (max {} chars)",
            MAX_OWNER_ID_LEN
        )));
    }
    Ok(())
}

pub fn validate_item_id(queue_item_id: &str) -> Result<()> {
    if queue_item_id.trim().is_empty() {
        return Err(AppError::Validation(
            "queue_item_id cannot be empty".to_string(),
        ));
    }
    if queue_item_id.len() > MAX_ITEM_ID_LEN {
        return Err(AppError::Validation(format!(
            "queue_item_id too long (max {} chars)",
            MAX_ITEM_ID_LEN
        )));
    }
    Ok(())
}

pub fn validate_fingerprint(fingerprint: &str) -> Result<()> {
    if fingerprint.trim().is_empty() {
        return Err(AppError::Validation("fingerprint cannot be empty".to_string()));
    }
    if fingerprint.len() > MAX_FINGERPRINT_LEN {
        return Err(AppError::Validation(format!(
            "fingerprint too long (max {} chars)",
            MAX_FINGERPRINT_LEN
        )));
    }
    Ok(())
}

/// A generation needs something to generate from
pub fn validate_submission(title: &str, content: &str) -> Result<()> {
    if title.trim().is_empty() && content.trim().is_empty() {
        return Err(AppError::Validation(
            "title and content cannot both be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_id_empty() {
        let result = validate_owner_id("   ");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_owner_id_too_long() {
        let result = validate_owner_id(&"u".repeat(129));
        assert!(result.unwrap_err().to_string().contains("too long"));
    }

    #[test]
    fn test_item_id_empty() {
        assert!(validate_item_id("").is_err());
        assert!(validate_item_id("q-1").is_ok());
    }

    #[test]
    fn test_fingerprint_bounds() {
        assert!(validate_fingerprint("").is_err());
        assert!(validate_fingerprint(&"f".repeat(65)).is_err());
        assert!(validate_fingerprint("6f1c2b7e-94d3-5a51-8e0f-5c7a3d29b184").is_ok());
    }

    #[test]
    fn test_submission_requires_text() {
        assert!(validate_submission("", " ").is_err());
        assert!(validate_submission("Title only", "").is_ok());
        assert!(validate_submission("", "Body only").is_ok());
    }
}

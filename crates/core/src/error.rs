#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Validate that an opaque entity id (character, book) is a non-empty string.
///
/// `label` names the entity in the error message, e.g. `"Character"`.
pub fn validate_entity_id(id: &str, label: &str) -> Result<(), CoreError> {
    if id.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "{label} ID must be a non-empty string"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

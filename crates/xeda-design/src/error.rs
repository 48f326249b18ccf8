/// One design validation failure: `(location, message, kind)`.
///
/// Grounded on `original_source/src/xeda/design.py`'s `DesignValidationError`,
/// which carries a list of `(location, msg, type)` triples.
pub type DesignErrorEntry = (String, String, Option<String>);

#[derive(Debug, Clone, thiserror::Error)]
#[error("DesignValidationError: {} error(s) validating design{}", errors.len(), design_name.as_ref().map(|n| format!(" '{n}'")).unwrap_or_default())]
pub struct DesignValidationError {
    pub errors: Vec<DesignErrorEntry>,
    pub design_name: Option<String>,
    pub file: Option<String>,
}

impl DesignValidationError {
    pub fn new(errors: Vec<DesignErrorEntry>) -> Self {
        Self {
            errors,
            design_name: None,
            file: None,
        }
    }

    pub fn single(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![(location.into(), message.into(), None)])
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

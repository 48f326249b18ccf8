use std::fmt;

/// One validation failure: `(dotted_location, message, context, kind)`.
///
/// Grounded on `original_source/src/xeda/flow/flow.py`'s `FlowSettingsError`,
/// which carries a list of `(location, message, context, type)` tuples
/// rather than failing on the first error.
pub type SettingsErrorEntry = (Option<String>, Option<String>, Option<String>, Option<String>);

/// All validation errors accumulated for a single Settings model.
#[derive(Debug, Clone, thiserror::Error)]
pub struct SettingsValidationError {
    pub model_name: String,
    pub errors: Vec<SettingsErrorEntry>,
}

impl SettingsValidationError {
    pub fn new(model_name: impl Into<String>, errors: Vec<SettingsErrorEntry>) -> Self {
        Self {
            model_name: model_name.into(),
            errors,
        }
    }

    pub fn single(
        model_name: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            model_name,
            vec![(Some(location.into()), Some(message.into()), None, None)],
        )
    }
}

impl fmt::Display for SettingsValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "SettingsValidationError: {} error{} validating {}:",
            self.errors.len(),
            if self.errors.len() == 1 { "" } else { "s" },
            self.model_name
        )?;
        for (loc, msg, ctx, kind) in &self.errors {
            if let Some(loc) = loc {
                writeln!(f, "{loc}:")?;
            }
            if let Some(msg) = msg {
                writeln!(f, "   {msg}")?;
            }
            if let Some(kind) = kind {
                writeln!(f, "   kind: {kind}")?;
            }
            if let Some(ctx) = ctx {
                writeln!(f, "   context: {ctx}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OverrideParseError {
    #[error("malformed override '{0}': expected key=value")]
    MissingEquals(String),
    #[error("empty key in override '{0}'")]
    EmptyKey(String),
}

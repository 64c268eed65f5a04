//! Board template configuration: the form builder, the lifecycle rules
//! (create / update / delete / duplicate) and the per-post checks a
//! template implies.

pub mod builder;
pub mod input;
pub mod lifecycle;
pub mod post_rules;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("{}", .0.join(" "))]
    Invalid(Vec<String>),
    #[error("storage error: {0}")]
    Storage(String),
}

impl TemplateError {
    /// Messages suitable for a form error list.
    pub fn messages(&self) -> Vec<String> {
        match self {
            TemplateError::Invalid(errors) => errors.clone(),
            TemplateError::Storage(_) => vec!["The template could not be saved.".to_string()],
        }
    }
}

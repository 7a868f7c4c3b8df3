//! Brace-expression rendering.
//!
//! `{{ ... }}` and `{% ... %}` templates belong to a richer expression
//! language that hostexec does not implement itself. Rendering of that
//! dialect goes through [`ExpressionRenderer`]; the default implementation is
//! backed by minijinja.

use minijinja::{Environment, Value};
use thiserror::Error;

use crate::vars::Variables;

/// Errors raised by an expression renderer
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template error: {0}")]
    Render(#[from] minijinja::Error),

    #[error("template renderer failed: {0}")]
    Renderer(String),
}

/// Result type for template rendering
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Renderer for the brace-expression dialect.
pub trait ExpressionRenderer: Send + Sync {
    /// Render `text` against `scope`.
    fn render(&self, text: &str, scope: &Variables) -> TemplateResult<String>;
}

/// Does `text` contain brace-expression syntax?
pub fn has_expression(text: &str) -> bool {
    text.contains("{{") || text.contains("{%")
}

/// [`ExpressionRenderer`] backed by minijinja.
#[derive(Debug)]
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniJinjaRenderer {
    /// Create a renderer that keeps trailing newlines.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// The underlying environment, for registering filters and globals.
    pub fn env_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl ExpressionRenderer for MiniJinjaRenderer {
    fn render(&self, text: &str, scope: &Variables) -> TemplateResult<String> {
        let context: Value = scope
            .iter()
            .map(|(k, v)| (k.clone(), yaml_to_value(v)))
            .collect();
        Ok(self.env.render_str(text, context)?)
    }
}

/// Convert a YAML value to a minijinja value
fn yaml_to_value(yaml: &serde_yaml::Value) -> Value {
    match yaml {
        serde_yaml::Value::Null => Value::from(()),
        serde_yaml::Value::Bool(b) => Value::from(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                Value::from(n.as_f64().unwrap_or_default())
            }
        }
        serde_yaml::Value::String(s) => Value::from(s.as_str()),
        serde_yaml::Value::Sequence(seq) => {
            Value::from(seq.iter().map(yaml_to_value).collect::<Vec<_>>())
        }
        serde_yaml::Value::Mapping(map) => map
            .iter()
            .filter_map(|(k, v)| k.as_str().map(|key| (key.to_string(), yaml_to_value(v))))
            .collect(),
        serde_yaml::Value::Tagged(tagged) => yaml_to_value(&tagged.value),
    }
}

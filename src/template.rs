//! Manifest template rendering.
//!
//! Manifests may interpolate values from their own `vars` block using
//! `{{ var }}` syntax. The whole document text is rendered before the final
//! parse, so any string field can carry a template expression.

use indexmap::IndexMap;
use minijinja::{Environment, UndefinedBehavior};

use crate::error::Result;

/// Renders a manifest document with the given variables.
///
/// Undefined variables are hard errors so that a typo in a manifest fails
/// the parse instead of producing an empty string.
pub fn render(source: &str, vars: &IndexMap<String, serde_yaml::Value>) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    let ctx = minijinja::Value::from_serialize(vars);
    Ok(env.render_str(source, ctx)?)
}

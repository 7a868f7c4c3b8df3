//! Variable mappings for hostexec.
//!
//! Host and group variables, template scopes and the documents emitted by
//! dynamic inventory programs all share one representation: an ordered map
//! from string keys to arbitrary YAML values.

use indexmap::IndexMap;

/// A variable mapping (host vars, group vars, template scope).
pub type Variables = IndexMap<String, serde_yaml::Value>;

/// Merge `overlay` into `base`; keys in `overlay` win.
pub fn merge_into(base: &mut Variables, overlay: &Variables) {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
}

/// Render a value in its natural string form for substitution into a
/// command line.
///
/// Strings are inserted verbatim, scalars use their usual textual form and
/// `null` becomes the empty string. Sequences and mappings are rendered as
/// compact JSON.
pub fn display_value(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Tagged(tagged) => display_value(&tagged.value),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| {
                serde_yaml::to_string(value)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_default()
            })
        }
    }
}

/// Convert a JSON document into a variable mapping.
///
/// Dynamic inventory programs speak JSON; everything downstream works on
/// YAML values, so the conversion happens once at the boundary.
pub fn from_json_object(
    object: serde_json::Map<String, serde_json::Value>,
) -> Result<Variables, serde_yaml::Error> {
    object
        .into_iter()
        .map(|(key, value)| Ok((key, serde_yaml::to_value(value)?)))
        .collect()
}

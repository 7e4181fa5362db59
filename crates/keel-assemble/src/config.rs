use serde_json::{Map, Value};

use keel_engine::{Subsystem, Warning};

use crate::error::AssembleError;

/// Starting point for the assembled configuration: a JSON object the caller
/// seeds with whatever their bootloader expects by default.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigTemplate {
    root: Map<String, Value>,
}

impl ConfigTemplate {
    pub fn new(root: Value) -> Result<Self, AssembleError> {
        match root {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(AssembleError::TemplateNotAnObject),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self, AssembleError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AssembleError::MalformedTemplate(e.to_string()))?;
        Self::new(value)
    }

    pub(crate) fn into_root(self) -> Map<String, Value> {
        self.root
    }
}

/// The assembled configuration. Keys are sorted on serialization, so equal
/// documents always render to equal bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    root: Map<String, Value>,
}

impl ConfigDocument {
    pub(crate) fn new(root: Map<String, Value>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Value at a dotted key path, if present.
    pub fn get(&self, key_path: &str) -> Option<&Value> {
        let mut segs = key_path.split('.');
        let mut cur = self.root.get(segs.next()?)?;
        for seg in segs {
            cur = cur.as_object()?.get(seg)?;
        }
        Some(cur)
    }

    pub fn to_json_pretty(&self) -> String {
        // Maps serialize in key order; failure is impossible for plain JSON.
        serde_json::to_string_pretty(&Value::Object(self.root.clone()))
            .unwrap_or_else(|_| String::from("{}"))
    }
}

/// Set one dotted key path, creating intermediate objects. Last write wins;
/// replacing an existing different value or a non-object intermediate is
/// reported as a collision warning, never an error.
pub(crate) fn set_path(
    root: &mut Map<String, Value>,
    key_path: &str,
    value: Value,
    warnings: &mut Vec<Warning>,
) {
    let segs: Vec<&str> = key_path.split('.').collect();
    if segs.iter().any(|s| s.is_empty()) {
        warnings.push(Warning {
            subsystem: Subsystem::Assembly,
            subject: key_path.to_owned(),
            message: "invalid key path; override skipped".to_owned(),
        });
        return;
    }

    let mut cursor = root;
    for seg in &segs[..segs.len() - 1] {
        let slot = cursor
            .entry((*seg).to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            warnings.push(Warning {
                subsystem: Subsystem::Assembly,
                subject: key_path.to_owned(),
                message: "intermediate key held a scalar; replaced with an object".to_owned(),
            });
            *slot = Value::Object(Map::new());
        }
        cursor = match slot {
            Value::Object(next) => next,
            _ => unreachable!(),
        };
    }

    let leaf = segs[segs.len() - 1];
    if let Some(old) = cursor.get(leaf) {
        if *old != value {
            warnings.push(Warning {
                subsystem: Subsystem::Assembly,
                subject: key_path.to_owned(),
                message: format!("overriding existing value {old} (last write wins)"),
            });
        }
    }
    cursor.insert(leaf.to_owned(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(root: Map<String, Value>) -> ConfigDocument {
        ConfigDocument::new(root)
    }

    #[test]
    fn set_path_creates_intermediate_objects() {
        let mut root = Map::new();
        let mut warnings = Vec::new();
        set_path(&mut root, "Kernel.Quirks.PanicNoKextDump", json!(true), &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(
            doc(root).get("Kernel.Quirks.PanicNoKextDump"),
            Some(&json!(true))
        );
    }

    #[test]
    fn last_write_wins_with_a_collision_warning() {
        let mut root = Map::new();
        let mut warnings = Vec::new();
        set_path(&mut root, "Boot.Timeout", json!(5), &mut warnings);
        set_path(&mut root, "Boot.Timeout", json!(5), &mut warnings);
        assert!(warnings.is_empty(), "equal rewrites are not collisions");
        set_path(&mut root, "Boot.Timeout", json!(0), &mut warnings);
        assert_eq!(warnings.len(), 1);
        assert_eq!(doc(root).get("Boot.Timeout"), Some(&json!(0)));
    }

    #[test]
    fn scalar_intermediate_is_replaced_and_reported() {
        let mut root = Map::new();
        let mut warnings = Vec::new();
        set_path(&mut root, "Kernel", json!("oops"), &mut warnings);
        set_path(&mut root, "Kernel.Quirks.A", json!(1), &mut warnings);
        assert_eq!(warnings.len(), 1);
        assert_eq!(doc(root).get("Kernel.Quirks.A"), Some(&json!(1)));
    }

    #[test]
    fn template_root_must_be_an_object() {
        assert_eq!(
            ConfigTemplate::new(json!([1, 2])),
            Err(AssembleError::TemplateNotAnObject)
        );
        assert!(ConfigTemplate::from_json("{\"Boot\":{}}").is_ok());
    }
}

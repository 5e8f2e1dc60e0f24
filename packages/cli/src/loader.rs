use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::debug;
use xedit_editor::{EditorConfig, EditorSession};
use xedit_model::NodeId;
use xedit_schema::Schema;

/// Read a JSON docSpec. No file means the permissive default schema.
pub fn load_schema(path: Option<&Path>) -> Result<Schema> {
    let Some(path) = path else {
        return Ok(Schema::default());
    };
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read spec {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in spec {}", path.display()))?;
    debug!(spec = %path.display(), "Loaded docSpec");
    Ok(Schema::from_json(&value))
}

/// Open an XML file for editing. Unparsable input is an error here rather
/// than a placeholder document.
pub fn open_session(file: &Path, schema: Schema, config: EditorConfig) -> Result<EditorSession> {
    let xml = std::fs::read_to_string(file).with_context(|| format!("Cannot read {}", file.display()))?;
    EditorSession::from_xml(&xml, schema, config).with_context(|| format!("Cannot parse {}", file.display()))
}

/// Follow element child indices down from the root
pub fn resolve_path(session: &EditorSession, path: &[usize]) -> Result<NodeId> {
    let view = session.view();
    let mut current = view.root();
    for (depth, &index) in path.iter().enumerate() {
        current = current
            .child_elements()
            .nth(index)
            .ok_or_else(|| anyhow!("No element at {:?}", &path[..=depth]))?;
    }
    Ok(current.id())
}

/// The `index`-th text child of an element
pub fn resolve_text(session: &EditorSession, element: NodeId, index: usize) -> Result<NodeId> {
    let tree = session.view().tree();
    tree.children(element)
        .iter()
        .copied()
        .filter(|c| tree.is_text(*c))
        .nth(index)
        .ok_or_else(|| anyhow!("No text node {} under element", index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(xml: &str) -> EditorSession {
        EditorSession::from_xml(xml, Schema::default(), EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_resolve_path() {
        let session = session("<a><b/><c><d/></c></a>");
        let root = session.view().root_id();
        assert_eq!(resolve_path(&session, &[]).unwrap(), root);

        let d = resolve_path(&session, &[1, 0]).unwrap();
        assert_eq!(session.view().tree().element(d).unwrap().name(), "d");
        assert!(resolve_path(&session, &[2]).is_err());
    }

    #[test]
    fn test_resolve_text() {
        let session = session("<a>x<b/></a>");
        let root = session.view().root_id();
        let text = resolve_text(&session, root, 0).unwrap();
        assert_eq!(session.view().tree().value(text), Some("x"));
        assert!(resolve_text(&session, root, 1).is_err());
    }

    #[test]
    fn test_missing_spec_is_default_schema() {
        assert!(load_schema(None).is_ok());
        assert!(load_schema(Some(Path::new("/nonexistent/spec.json"))).is_err());
    }
}

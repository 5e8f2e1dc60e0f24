use crate::config::Config;
use crate::loader::{load_schema, open_session, resolve_path, resolve_text};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use xedit_editor::{EditorSession, Outcome, TextSelection};

#[derive(Debug, Args)]
pub struct EditArgs {
    /// XML file to edit
    pub file: PathBuf,

    /// JSON docSpec (overrides config)
    #[arg(short, long)]
    pub spec: Option<PathBuf>,

    /// JSON list of edit steps
    #[arg(long)]
    pub script: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fail when a step is declined
    #[arg(long)]
    pub strict: bool,
}

/// One step of an edit script. Elements are addressed by child-element
/// indices from the root; `[]` is the root itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EditStep {
    DeleteElement { path: Vec<usize> },
    DeleteAttribute { path: Vec<usize>, name: String },
    NewAttribute { path: Vec<usize>, name: String, #[serde(default)] value: String },
    SetAttribute { path: Vec<usize>, name: String, value: String },
    /// `text` counts the element's text children
    SetText { path: Vec<usize>, #[serde(default)] text: usize, value: String },
    NewElementChild { path: Vec<usize>, xml: String },
    NewElementBefore { path: Vec<usize>, xml: String },
    NewElementAfter { path: Vec<usize>, xml: String },
    Replace { path: Vec<usize>, xml: String },
    Wrap {
        path: Vec<usize>,
        #[serde(default)]
        text: usize,
        from: usize,
        till: usize,
        template: String,
        #[serde(default = "default_placeholder")]
        placeholder: String,
    },
    Unwrap { path: Vec<usize> },
    DuplicateElement { path: Vec<usize> },
    MoveElementUp { path: Vec<usize> },
    MoveElementDown { path: Vec<usize> },
    MergeWithPrevious { path: Vec<usize> },
    MergeWithNext { path: Vec<usize> },
    DeleteEponymousSiblings { path: Vec<usize> },
}

fn default_placeholder() -> String {
    "$".to_string()
}

impl EditStep {
    pub fn name(&self) -> &'static str {
        match self {
            EditStep::DeleteElement { .. } => "deleteElement",
            EditStep::DeleteAttribute { .. } => "deleteAttribute",
            EditStep::NewAttribute { .. } => "newAttribute",
            EditStep::SetAttribute { .. } => "setAttribute",
            EditStep::SetText { .. } => "setText",
            EditStep::NewElementChild { .. } => "newElementChild",
            EditStep::NewElementBefore { .. } => "newElementBefore",
            EditStep::NewElementAfter { .. } => "newElementAfter",
            EditStep::Replace { .. } => "replace",
            EditStep::Wrap { .. } => "wrap",
            EditStep::Unwrap { .. } => "unwrap",
            EditStep::DuplicateElement { .. } => "duplicateElement",
            EditStep::MoveElementUp { .. } => "moveElementUp",
            EditStep::MoveElementDown { .. } => "moveElementDown",
            EditStep::MergeWithPrevious { .. } => "mergeWithPrevious",
            EditStep::MergeWithNext { .. } => "mergeWithNext",
            EditStep::DeleteEponymousSiblings { .. } => "deleteEponymousSiblings",
        }
    }

    /// Run the step against a session
    pub fn apply(&self, session: &mut EditorSession) -> Result<Outcome> {
        let outcome = match self {
            EditStep::DeleteElement { path } => session.delete_element(resolve_path(session, path)?),
            EditStep::DeleteAttribute { path, name } => {
                let element = resolve_path(session, path)?;
                match attribute(session, element, name) {
                    Some(at) => session.delete_attribute(at),
                    None => Outcome::Declined,
                }
            }
            EditStep::NewAttribute { path, name, value } => {
                let element = resolve_path(session, path)?;
                let outcome = session.new_attribute(element, name, value);
                session.cancel_bubble();
                outcome
            }
            EditStep::SetAttribute { path, name, value } => {
                let element = resolve_path(session, path)?;
                match attribute(session, element, name) {
                    Some(at) => session.set_attribute_value(at, value),
                    None => session.new_attribute(element, name, value),
                }
            }
            EditStep::SetText { path, text, value } => {
                let element = resolve_path(session, path)?;
                session.set_text_value(resolve_text(session, element, *text)?, value)
            }
            EditStep::NewElementChild { path, xml } => session.new_element_child(resolve_path(session, path)?, xml),
            EditStep::NewElementBefore { path, xml } => session.new_element_before(resolve_path(session, path)?, xml),
            EditStep::NewElementAfter { path, xml } => session.new_element_after(resolve_path(session, path)?, xml),
            EditStep::Replace { path, xml } => session.replace_with_xml(resolve_path(session, path)?, xml),
            EditStep::Wrap {
                path,
                text,
                from,
                till,
                template,
                placeholder,
            } => {
                let element = resolve_path(session, path)?;
                let text = resolve_text(session, element, *text)?;
                session.wrap(TextSelection::within(text, *from, *till), template, placeholder)
            }
            EditStep::Unwrap { path } => session.unwrap(resolve_path(session, path)?),
            EditStep::DuplicateElement { path } => session.duplicate_element(resolve_path(session, path)?),
            EditStep::MoveElementUp { path } => session.move_element_up(resolve_path(session, path)?),
            EditStep::MoveElementDown { path } => session.move_element_down(resolve_path(session, path)?),
            EditStep::MergeWithPrevious { path } => session.merge_with_previous(resolve_path(session, path)?),
            EditStep::MergeWithNext { path } => session.merge_with_next(resolve_path(session, path)?),
            EditStep::DeleteEponymousSiblings { path } => {
                session.delete_eponymous_siblings(resolve_path(session, path)?)
            }
        };
        Ok(outcome)
    }
}

fn attribute(session: &EditorSession, element: xedit_model::NodeId, name: &str) -> Option<xedit_model::NodeId> {
    session
        .view()
        .tree()
        .element(element)
        .and_then(|el| el.attribute(name))
        .map(|at| at.id())
}

/// Apply an edit script to a document
pub fn edit(args: EditArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let schema = load_schema(config.spec_path(cwd, args.spec.as_ref()).as_deref())?;
    let mut session = open_session(&args.file, schema, config.editor)?;

    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Cannot read script {}", args.script.display()))?;
    let steps: Vec<EditStep> =
        serde_json::from_str(&script).with_context(|| format!("Invalid script {}", args.script.display()))?;

    let declined = run_script(&mut session, &steps)?;
    for index in &declined {
        eprintln!("{} step {} ({}) declined", "⚠".yellow(), index, steps[*index].name());
    }
    if args.strict && !declined.is_empty() {
        anyhow::bail!("{} of {} steps declined", declined.len(), steps.len());
    }

    let xml = session.to_xml();
    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", xml)).with_context(|| format!("Cannot write {}", path.display()))?;
            println!("{} {}", "Wrote".green().bold(), path.display());
        }
        None => println!("{}", xml),
    }
    Ok(())
}

/// Apply every step in order. Returns the indices of declined steps.
pub fn run_script(session: &mut EditorSession, steps: &[EditStep]) -> Result<Vec<usize>> {
    let mut declined = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        let outcome = step.apply(session).with_context(|| format!("Step {} ({})", index, step.name()))?;
        info!(step = index, op = step.name(), applied = outcome.is_applied(), "Applied step");
        if !outcome.is_applied() {
            declined.push(index);
        }
    }
    Ok(declined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xedit_editor::EditorConfig;
    use xedit_schema::Schema;

    fn session(xml: &str) -> EditorSession {
        EditorSession::from_xml(xml, Schema::default(), EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_script() {
        let json = r#"[
            { "op": "mergeWithNext", "path": [0, 1] },
            { "op": "newAttribute", "path": [], "name": "id" },
            { "op": "wrap", "path": [2], "from": 0, "till": 3, "template": "<b>$</b>" }
        ]"#;
        let steps: Vec<EditStep> = serde_json::from_str(json).unwrap();
        assert_eq!(steps[0], EditStep::MergeWithNext { path: vec![0, 1] });
        assert_eq!(
            steps[1],
            EditStep::NewAttribute {
                path: vec![],
                name: "id".into(),
                value: String::new()
            }
        );
        match &steps[2] {
            EditStep::Wrap { text, placeholder, .. } => {
                assert_eq!(*text, 0);
                assert_eq!(placeholder, "$");
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_run_script() {
        let mut session = session("<a><b x='1'/><b y='2'/><c/></a>");
        let steps = vec![
            EditStep::MergeWithNext { path: vec![0] },
            EditStep::SetAttribute {
                path: vec![0],
                name: "x".into(),
                value: "3".into(),
            },
            EditStep::NewElementChild {
                path: vec![1],
                xml: "<d/>".into(),
            },
            EditStep::Unwrap { path: vec![9] },
        ];
        assert!(run_script(&mut session, &steps[..3]).unwrap().is_empty());
        assert_eq!(session.to_xml(), "<a><b y='2' x='3'/><c><d/></c></a>");
        assert!(run_script(&mut session, &steps[3..]).is_err());
    }

    #[test]
    fn test_declined_steps_are_reported() {
        let mut session = session("<a><b/></a>");
        let steps = vec![
            EditStep::MergeWithPrevious { path: vec![0] },
            EditStep::DeleteElement { path: vec![0] },
        ];
        assert_eq!(run_script(&mut session, &steps).unwrap(), vec![0]);
        assert_eq!(session.to_xml(), "<a/>");
    }
}

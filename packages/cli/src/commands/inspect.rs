use crate::config::Config;
use crate::loader::{load_schema, open_session};
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use xedit_editor::{units, Focus, View};
use xedit_schema::Mode;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Nerd,
    Laic,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Nerd => Mode::Nerd,
            ModeArg::Laic => Mode::Laic,
        }
    }
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// XML file to read
    pub file: PathBuf,

    /// JSON docSpec (overrides config)
    #[arg(short, long)]
    pub spec: Option<PathBuf>,

    /// Display mode (overrides config)
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,
}

/// Print the keyboard traversal order of a document and its warnings
pub fn inspect(args: InspectArgs, cwd: &str) -> Result<()> {
    let mut config = Config::load(cwd)?;
    if let Some(mode) = args.mode {
        config.editor.mode = mode.into();
    }
    let schema = load_schema(config.spec_path(cwd, args.spec.as_ref()).as_deref())?;
    let mode = config.editor.mode;
    let session = open_session(&args.file, schema, config.editor)?;

    println!("{} {} ({:?} mode)", "Inspecting".green().bold(), args.file.display(), mode);
    println!();
    for unit in units(session.view(), mode) {
        println!("   {}", describe(session.view(), unit));
    }

    let warnings = session.warnings();
    if !warnings.is_empty() {
        println!();
        println!("   {} {}", "Warnings:".yellow(), warnings.len());
        for warning in warnings.iter() {
            println!("     {} {}", "⚠".yellow(), warning.text);
        }
    }
    Ok(())
}

/// One line per focusable unit
pub fn describe(view: &View, unit: Focus) -> String {
    let tree = view.tree();
    let state = view.state(unit.node()).cloned().unwrap_or_default();
    let name = || match tree.element(unit.node()) {
        Some(el) if state.display_name.is_empty() => el.element_name().to_string(),
        Some(_) => state.display_name.clone(),
        None => tree.attribute(unit.node()).map(|a| a.name().to_string()).unwrap_or_default(),
    };
    match unit {
        Focus::OpeningTag(_) => match &state.caption {
            Some(caption) => format!("<{}> {}", name(), caption),
            None => format!("<{}>", name()),
        },
        Focus::ClosingTag(_) => format!("</{}>", name()),
        Focus::AttributeName(_) => format!("@{}", name()),
        Focus::AttributeValue(id) => {
            let value = tree.value(id).unwrap_or_default();
            format!("@{}={:?}", name(), state.display_value.as_deref().unwrap_or(value))
        }
        Focus::Text { id, token } => {
            let value = tree.value(id).unwrap_or_default();
            let word = xedit_editor::view::text_tokens(value)
                .get(token)
                .map(|&(start, end)| value.chars().skip(start).take(end - start).collect::<String>())
                .unwrap_or_default();
            format!("{:?}", word)
        }
        Focus::ChildrenCollapsed(_) => format!("[{}]", state.collapsoid),
        Focus::Rollouter(_) => "+".to_string(),
    }
}

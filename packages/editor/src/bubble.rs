//! # Editor Bubble
//!
//! What opens when the user clicks or presses Enter on a unit: a menu of
//! actions, an asker for a value, or the list of warnings on a node.

use std::rc::Rc;
use xedit_model::NodeRef;
use xedit_schema::{text_by_lang, Asker, EditAction, MenuAction};

use crate::focus::{Focus, KeyEvent};

#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub caption: String,
    pub action: EditAction,
    pub icon: Option<String>,
    pub key_caption: Option<String>,
    /// Sub-menu shown unfolded
    pub expanded: bool,
    pub submenu: Vec<MenuEntry>,
}

#[derive(Debug, Clone)]
pub enum BubbleContent {
    Menu(Vec<MenuEntry>),
    Asker { asker: Asker, value: String },
    Warnings(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Bubble {
    pub target: Focus,
    pub content: BubbleContent,
}

impl Bubble {
    pub fn menu(target: Focus, entries: Vec<MenuEntry>) -> Self {
        Self {
            target,
            content: BubbleContent::Menu(entries),
        }
    }

    pub fn asker(target: Focus, asker: Asker, value: impl Into<String>) -> Self {
        Self {
            target,
            content: BubbleContent::Asker {
                asker,
                value: value.into(),
            },
        }
    }

    pub fn warnings(target: Focus, warnings: Vec<String>) -> Self {
        Self {
            target,
            content: BubbleContent::Warnings(warnings),
        }
    }

    /// Menu entries, empty for other kinds of bubble
    pub fn entries(&self) -> &[MenuEntry] {
        match &self.content {
            BubbleContent::Menu(entries) => entries,
            _ => &[],
        }
    }
}

/// The visible part of a menu for `node`.
///
/// Hidden items are dropped; an item with a sub-menu only shows when some
/// of its sub-items do.
pub fn build_menu(items: &[Rc<MenuAction>], node: NodeRef<'_>, lang: &str) -> Vec<MenuEntry> {
    items
        .iter()
        .filter(|item| !item.is_hidden(node))
        .filter_map(|item| {
            let submenu = build_menu(&item.menu, node, lang);
            if item.has_submenu() && submenu.is_empty() {
                return None;
            }
            Some(MenuEntry {
                caption: text_by_lang(&(item.caption)(node), lang),
                action: item.action.clone(),
                icon: item.icon.clone(),
                key_caption: item.key_caption.clone(),
                expanded: (item.expanded)(node),
                submenu,
            })
        })
        .collect()
}

/// First visible item, searching sub-menus too, whose key trigger matches
pub fn find_key_action(items: &[Rc<MenuAction>], node: NodeRef<'_>, event: &KeyEvent) -> Option<EditAction> {
    for item in items.iter().filter(|item| !item.is_hidden(node)) {
        let matches = item
            .key_trigger
            .as_ref()
            .map(|chord| chord.matches(event.key.name(), event.ctrl, event.shift, event.alt))
            .unwrap_or(false);
        if matches {
            return Some(item.action.clone());
        }
        if let Some(action) = find_key_action(&item.menu, node, event) {
            return Some(action);
        }
    }
    None
}

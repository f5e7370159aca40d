use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::error::MenuError;

/// Callback run when an `Invoke` item is activated.
pub type Callback = Rc<dyn Fn() -> anyhow::Result<()>>;

pub const DEFAULT_ANCHOR: &str = "▾";

#[derive(Clone)]
pub enum ItemAction {
    Navigate { href: String, target: Option<String> },
    Invoke(Callback),
}

impl fmt::Debug for ItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemAction::Navigate { href, target } => f
                .debug_struct("Navigate")
                .field("href", href)
                .field("target", target)
                .finish(),
            ItemAction::Invoke(_) => f.write_str("Invoke(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MenuItem {
    pub name: String,
    pub action: ItemAction,
    pub visible: bool,
}

impl MenuItem {
    pub fn invoke(name: impl Into<String>, f: impl Fn() -> anyhow::Result<()> + 'static) -> Self {
        MenuItem {
            name: name.into(),
            action: ItemAction::Invoke(Rc::new(f)),
            visible: true,
        }
    }

    pub fn link(name: impl Into<String>, href: impl Into<String>) -> Self {
        MenuItem {
            name: name.into(),
            action: ItemAction::Navigate { href: href.into(), target: None },
            visible: true,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        if let ItemAction::Navigate { target: t, .. } = &mut self.action {
            *t = Some(target.into());
        }
        self
    }

    /// Hide the item when `hidden` holds. Mirrors how callers phrase
    /// visibility ("owner only", "signed in only").
    pub fn hide_if(mut self, hidden: bool) -> Self {
        self.visible = !hidden;
        self
    }

    pub fn is_link(&self) -> bool {
        matches!(self.action, ItemAction::Navigate { .. })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Align {
    Left,
    #[default]
    Right,
}

/// Validated caller input for one menu.
#[derive(Clone, Debug)]
pub struct MenuProps {
    items: Vec<MenuItem>,
    aria_label: String,
    pub align: Align,
    pub anchor: Option<String>,
}

impl MenuProps {
    pub fn new(items: Vec<MenuItem>, aria_label: impl Into<String>) -> Result<Self, MenuError> {
        let aria_label = aria_label.into();
        if aria_label.trim().is_empty() {
            return Err(MenuError::MissingLabel);
        }
        validate_items(&items)?;
        Ok(MenuProps {
            items,
            aria_label,
            align: Align::default(),
            anchor: None,
        })
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn aria_label(&self) -> &str {
        &self.aria_label
    }

    pub fn anchor_text(&self) -> &str {
        self.anchor.as_deref().unwrap_or(DEFAULT_ANCHOR)
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn set_items(&mut self, items: Vec<MenuItem>) -> Result<(), MenuError> {
        validate_items(&items)?;
        self.items = items;
        Ok(())
    }

    /// The traversal sequence: invisible items dropped, order kept.
    pub fn visible_items(&self) -> Vec<&MenuItem> {
        self.items.iter().filter(|item| item.visible).collect()
    }

    pub fn visible_len(&self) -> usize {
        self.items.iter().filter(|item| item.visible).count()
    }

    /// Resolve a position in the traversal sequence to its item.
    pub fn visible_item(&self, index: usize) -> Option<&MenuItem> {
        self.items.iter().filter(|item| item.visible).nth(index)
    }
}

fn validate_items(items: &[MenuItem]) -> Result<(), MenuError> {
    if items.is_empty() {
        return Err(MenuError::NoItems);
    }
    let mut seen = HashSet::new();
    for (i, item) in items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(MenuError::BlankItemName(i));
        }
        if !seen.insert(item.name.as_str()) {
            return Err(MenuError::DuplicateItemName(item.name.clone()));
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    MenuItem,
}

/// What the renderer needs for one row of an open list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedItem {
    pub index: usize,
    pub name: String,
    pub role: Role,
    pub selected: bool,
    pub link: bool,
}

pub fn rendered_items(props: &MenuProps, active: Option<usize>) -> Vec<RenderedItem> {
    props
        .visible_items()
        .into_iter()
        .enumerate()
        .map(|(index, item)| RenderedItem {
            index,
            name: item.name.clone(),
            role: Role::MenuItem,
            selected: active == Some(index),
            link: item.is_link(),
        })
        .collect()
}

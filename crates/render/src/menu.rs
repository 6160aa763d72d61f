//! Paged inline menus for folder listings and search results.

use crate::callback::{CallbackAction, search_token};
use crate::format::{format_size, icon_for, truncate_label};
use crate::locale::{Language, Localizer, MessageKey};
use drivebot_drive::RemoteEntry;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// What a menu is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuContext {
    Folder(FolderView),
    /// Results for `query`; page buttons carry `token` instead of the query.
    Search { query: String, token: String },
}
impl MenuContext {
    pub fn search(query: impl Into<String>) -> Self {
        let query = query.into();
        let token = search_token(&query);
        Self::Search { query, token }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderView {
    pub id: String,
    pub name: String,
    /// Breadcrumb from the root, already joined.
    pub path: String,
    /// Known parent, if any. Without one there is no Back button.
    pub parent_id: Option<String>,
    pub root_id: String,
}
impl FolderView {
    pub fn is_root(&self) -> bool {
        self.id == self.root_id
    }
}

/// A single button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub label: String,
    pub action: CallbackAction,
}
impl Control {
    fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self { label: label.into(), action }
    }
}

/// Transport-independent menu: a Markdown title and rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub title: String,
    pub rows: Vec<Vec<Control>>,
}
impl Menu {
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.rows.iter().flatten()
    }
}

#[derive(Debug, Clone)]
pub struct MenuRenderer {
    localizer: Arc<Localizer>,
    page_size: usize,
}

impl MenuRenderer {
    pub fn new(localizer: Arc<Localizer>, page_size: usize) -> Self {
        Self {
            localizer,
            page_size: page_size.max(1),
        }
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self, entries: usize) -> usize {
        entries.div_ceil(self.page_size)
    }

    /// Builds page `page` (zero-based) of `entries`. A page past the end is
    /// rendered as empty rather than rejected.
    pub fn render(&self, entries: &[RemoteEntry], context: &MenuContext, page: usize, language: Language) -> Menu {
        let total = self.total_pages(entries.len());
        let mut title = match context {
            MenuContext::Search { query, .. } => self.localizer.text(
                language,
                MessageKey::SearchHeader,
                upon::value! { query: query.as_str(), count: entries.len() as u64 },
            ),
            MenuContext::Folder(folder) => {
                let name = if folder.is_root() {
                    let home = self.localizer.get(language, MessageKey::Home);
                    home.strip_prefix("🏠 ").map(str::to_string).unwrap_or(home)
                } else {
                    folder.name.clone()
                };
                self.localizer.text(
                    language,
                    MessageKey::BrowserHeader,
                    upon::value! { name: name, path: folder.path.as_str(), page: page.saturating_add(1) as u64, total: total as u64 },
                )
            },
        };

        let start = page.saturating_mul(self.page_size);
        let visible: Vec<&RemoteEntry> = entries.iter().skip(start).take(self.page_size).collect();
        if visible.is_empty() {
            title.push_str(&self.localizer.get(language, MessageKey::EmptyFolder));
        }

        let mut rows: Vec<Vec<Control>> = visible.into_iter().map(|entry| vec![entry_control(entry)]).collect();
        let nav = self.navigation(context, page, total, language);
        if !nav.is_empty() {
            rows.push(nav);
        }
        Menu { title, rows }
    }

    fn navigation(&self, context: &MenuContext, page: usize, total: usize, language: Language) -> Vec<Control> {
        let text = |key| self.localizer.get(language, key);
        let mut nav = Vec::new();
        if let MenuContext::Folder(folder) = context
            && !folder.is_root()
        {
            if let Some(parent) = &folder.parent_id {
                nav.push(Control::new(text(MessageKey::Back), CallbackAction::Open(parent.clone())));
            }
            nav.push(Control::new(text(MessageKey::Home), CallbackAction::Open(folder.root_id.clone())));
        }

        if total > 1 {
            let goto = |page| match context {
                MenuContext::Folder(folder) => CallbackAction::Page {
                    folder_id: folder.id.clone(),
                    page,
                },
                MenuContext::Search { token, .. } => CallbackAction::SearchPage { token: token.clone(), page },
            };
            if page > 0 {
                nav.push(Control::new(text(MessageKey::Prev), goto(page - 1)));
            }
            let indicator = self.localizer.text(
                language,
                MessageKey::PageIndicator,
                upon::value! { page: page.saturating_add(1) as u64, total: total as u64 },
            );
            nav.push(Control::new(indicator, CallbackAction::Ignore));
            if page + 1 < total {
                nav.push(Control::new(text(MessageKey::Next), goto(page + 1)));
            }
        }
        nav
    }
}

/// Folder names are shown whole; file names are shortened to leave room
/// for the size.
fn entry_control(entry: &RemoteEntry) -> Control {
    let icon = icon_for(&entry.mime_type, &entry.name);
    if entry.is_folder() {
        Control::new(format!("{icon} {}", entry.name), CallbackAction::Open(entry.id.clone()))
    } else {
        Control::new(
            format!("{icon} {} ({})", truncate_label(&entry.name), format_size(entry.size)),
            CallbackAction::Download(entry.id.clone()),
        )
    }
}

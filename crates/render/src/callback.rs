//! Button payloads.
//!
//! Every inline button carries a short `|`-separated string naming what
//! pressing it should do. [`CallbackAction`] is the typed form; `Display`
//! produces the wire form and `FromStr` parses it back.
//!
//! Telegram caps a payload at [`CALLBACK_DATA_MAX_BYTES`]. Folder and file
//! ids fit comfortably; free-text search queries do not, so search pages
//! refer to their query through a fixed-width [`search_token`].

use crate::error::{Error, ErrorKind};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::str::FromStr;

/// Longest payload Telegram accepts on an inline button.
pub const CALLBACK_DATA_MAX_BYTES: usize = 64;

/// Short stable key for a search query: 16 lowercase hex digits, whatever
/// the length or script of the query.
pub fn search_token(query: &str) -> String {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Show the contents of a folder.
    Open(String),
    /// Deliver a file.
    Download(String),
    /// Show another page of a folder listing.
    Page { folder_id: String, page: usize },
    /// Show another page of cached search results, by [`search_token`].
    SearchPage { token: String, page: usize },
    /// Decorative button (the page indicator).
    Ignore,
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(id) => write!(f, "OPEN|{id}"),
            Self::Download(id) => write!(f, "DL|{id}"),
            Self::Page { folder_id, page } => write!(f, "PAGE|{folder_id}|{page}"),
            Self::SearchPage { token, page } => write!(f, "SPAGE|{token}|{page}"),
            Self::Ignore => f.write_str("IGNORE"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::from(ErrorKind::Callback(s.to_string()));
        if s == "IGNORE" {
            return Ok(Self::Ignore);
        }
        let (tag, rest) = s.split_once('|').ok_or_else(invalid)?;
        let action = match tag {
            "OPEN" if !rest.is_empty() => Self::Open(rest.to_string()),
            "DL" if !rest.is_empty() => Self::Download(rest.to_string()),
            "PAGE" | "SPAGE" => {
                let (target, page) = rest.rsplit_once('|').ok_or_else(invalid)?;
                let page = page.parse().map_err(|_| invalid())?;
                if target.is_empty() {
                    return Err(invalid());
                }
                let target = target.to_string();
                if tag == "PAGE" {
                    Self::Page { folder_id: target, page }
                } else {
                    Self::SearchPage { token: target, page }
                }
            },
            _ => return Err(invalid()),
        };
        Ok(action)
    }
}

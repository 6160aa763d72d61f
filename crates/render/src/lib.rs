//! Everything the bot shows to users: formatted sizes and dates, progress
//! bars, localized messages, paged menus and the button payload codec.
//!
//! Nothing in this crate talks to the network. [`Menu`] is independent of the
//! messaging platform; the binary converts it into an inline keyboard.

mod callback;
pub mod error;
mod format;
mod locale;
mod menu;

pub use crate::callback::{CALLBACK_DATA_MAX_BYTES, CallbackAction, search_token};
pub use crate::format::{LABEL_MAX_CHARS, format_date, format_size, icon_for, progress_bar, truncate_label};
pub use crate::locale::{Language, Localizer, MessageKey, source};
pub use crate::menu::{Control, DEFAULT_PAGE_SIZE, FolderView, Menu, MenuContext, MenuRenderer};

//! Calendar directory types

use serde::{Deserialize, Serialize};

/// One source calendar as listed in the directory.
///
/// Replaced wholesale on every successful directory refresh and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarRef {
    pub id: String,
    pub display_name: String,
    pub is_primary: bool,
}

impl CalendarRef {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into(), is_primary: false }
    }

    /// Mark this calendar as the account's primary calendar.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Case-insensitive containment match against the display name.
    pub fn name_contains(&self, needle: &str) -> bool {
        self.display_name.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// One page of the calendar directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryPage {
    pub entries: Vec<CalendarRef>,
    /// Version token for the listing, sent back on the next conditional fetch.
    pub change_token: Option<String>,
    /// Present when more pages follow.
    pub next_page_token: Option<String>,
}

/// Outcome of a conditional directory fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryFetch {
    /// The listing has not changed since the supplied change token.
    NotModified,
    Page(DirectoryPage),
}

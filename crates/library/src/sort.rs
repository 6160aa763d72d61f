//! Human ordering of names: `"Chapter 2"` before `"Chapter 10"`.

use drivebot_drive::RemoteEntry;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Lowercased run of non-digits.
    Text(String),
    /// Run of ASCII digits without leading zeros, so any length compares.
    Number(String),
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Text(_), Self::Number(_)) => Ordering::Less,
            (Self::Number(_), Self::Text(_)) => Ordering::Greater,
        }
    }
}
impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key splitting a name into alternating text and number runs.
///
/// Every key starts with a (possibly empty) text run, so runs at the same
/// position are always of the same kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey(Vec<Segment>);

pub fn natural_key(name: &str) -> NaturalKey {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut digits = String::new();
    for c in name.chars() {
        if c.is_ascii_digit() {
            if digits.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            digits.push(c);
        } else {
            if !digits.is_empty() {
                segments.push(number(std::mem::take(&mut digits)));
            }
            text.extend(c.to_lowercase());
        }
    }
    if digits.is_empty() {
        segments.push(Segment::Text(text));
    } else {
        segments.push(number(digits));
    }
    NaturalKey(segments)
}

fn number(digits: String) -> Segment {
    let trimmed = digits.trim_start_matches('0');
    Segment::Number(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
}

/// Folders first, then files, each group in natural order.
pub fn sort_entries(entries: &mut [RemoteEntry]) {
    entries.sort_by_cached_key(|entry| (!entry.is_folder(), natural_key(&entry.name)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivebot_drive::{EntryKind, mime};
    use rstest::rstest;

    #[rstest]
    #[case("Chapter 2", "Chapter 10")]
    #[case("a", "B")]
    #[case("file9", "file10")]
    #[case("1", "a")]
    #[case("", "a")]
    #[case("x 99999999999999999999998", "x 99999999999999999999999")]
    #[case("v1.2", "v1.10")]
    fn test_natural_order(#[case] lesser: &str, #[case] greater: &str) {
        assert!(natural_key(lesser) < natural_key(greater), "{lesser} < {greater}");
    }

    #[test]
    fn test_leading_zeros_and_case_compare_equal() {
        assert_eq!(natural_key("Part 007"), natural_key("part 7"));
        assert_eq!(natural_key("000"), natural_key("0"));
    }

    fn entry(name: &str, kind: EntryKind) -> RemoteEntry {
        let mime_type = if kind == EntryKind::Folder { mime::FOLDER } else { mime::PDF };
        RemoteEntry {
            id: name.to_string(),
            name: name.to_string(),
            kind,
            mime_type: mime_type.to_string(),
            size: None,
            parent_id: None,
        }
    }

    #[test]
    fn test_folders_first_then_files() {
        let mut entries = vec![
            entry("Lecture 10.pdf", EntryKind::File),
            entry("Unit 10", EntryKind::Folder),
            entry("lecture 2.pdf", EntryKind::File),
            entry("Unit 2", EntryKind::Folder),
            entry("Answers.pdf", EntryKind::File),
        ];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Unit 2", "Unit 10", "Answers.pdf", "lecture 2.pdf", "Lecture 10.pdf"]);
    }
}

//! Small presentational formatters.
//!
//! None of these fail: input that cannot be formatted degrades to an empty
//! string, a placeholder, or the raw input.

use drivebot_drive::mime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
/// Labels longer than this many characters are shortened.
pub const LABEL_MAX_CHARS: usize = 35;
const LABEL_KEEP_CHARS: usize = 32;
const BAR_SEGMENTS: u8 = 10;

/// Human-readable size with one decimal place. Unknown and zero sizes
/// render as nothing.
///
/// ```
/// use drivebot_render::format_size;
/// assert_eq!(format_size(Some(1536 * 1024)), "1.5 MB");
/// assert_eq!(format_size(Some(0)), "");
/// assert_eq!(format_size(None), "");
/// ```
pub fn format_size(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes.filter(|&bytes| bytes > 0) else {
        return String::new();
    };
    // Integer unit selection; floating-point logarithms misplace exact powers.
    let mut unit = 0;
    while unit + 1 < SIZE_UNITS.len() && bytes >= 1u64 << (10 * (unit + 1)) {
        unit += 1;
    }
    let value = bytes as f64 / (1u64 << (10 * unit)) as f64;
    format!("{:.1} {}", (value * 10.0).round() / 10.0, SIZE_UNITS[unit])
}

/// `YYYY-MM-DD` for an RFC 3339 timestamp; the raw input when it does not
/// parse, and `"Unknown"` when there is none.
pub fn format_date(timestamp: Option<&str>) -> String {
    let Some(raw) = timestamp else {
        return "Unknown".to_string();
    };
    match OffsetDateTime::parse(raw, &Rfc3339) {
        Ok(dt) => format!("{:04}-{:02}-{:02}", dt.year(), u8::from(dt.month()), dt.day()),
        Err(_) => raw.to_string(),
    }
}

/// Ten-segment bar, one filled segment per whole ten percent.
pub fn progress_bar(percent: u8) -> String {
    let filled = percent.min(100) / 10;
    let mut bar = "⬛".repeat(usize::from(filled));
    bar.push_str(&"⬜".repeat(usize::from(BAR_SEGMENTS - filled)));
    bar
}

/// Shortens long names for button labels, cutting on character boundaries.
pub fn truncate_label(name: &str) -> String {
    if name.chars().count() <= LABEL_MAX_CHARS {
        return name.to_string();
    }
    let kept: String = name.chars().take(LABEL_KEEP_CHARS).collect();
    format!("{kept}...")
}

/// Emoji shown in front of an entry, chosen by mime type then by name.
pub fn icon_for(mime_type: &str, name: &str) -> &'static str {
    let name = name.to_lowercase();
    if mime_type == mime::FOLDER {
        "📁"
    } else if mime_type.contains("pdf") {
        "📕"
    } else if mime_type.contains("image") {
        "🖼️"
    } else if mime_type.contains("video") {
        "🎬"
    } else if mime_type.contains("audio") {
        "🎵"
    } else if mime_type.contains("presentation") || name.contains("ppt") {
        "🟧"
    } else if mime_type.contains("sheet") || name.contains("xls") {
        "📊"
    } else if mime_type.contains("document") || name.contains("word") {
        "📝"
    } else if mime_type.contains("zip") || name.contains("rar") {
        "📦"
    } else {
        "📄"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "")]
    #[case(Some(0), "")]
    #[case(Some(1), "1.0 B")]
    #[case(Some(512), "512.0 B")]
    #[case(Some(1023), "1023.0 B")]
    #[case(Some(1024), "1.0 KB")]
    #[case(Some(1536), "1.5 KB")]
    #[case(Some(99 * 1024 * 1024), "99.0 MB")]
    #[case(Some(5 * 1024 * 1024 * 1024), "5.0 GB")]
    #[case(Some(3 * 1024_u64.pow(5)), "3072.0 TB")]
    fn test_format_size(#[case] bytes: Option<u64>, #[case] expected: &str) {
        assert_eq!(format_size(bytes), expected);
    }

    #[rstest]
    #[case(Some("2024-03-09T10:15:00.000Z"), "2024-03-09")]
    #[case(Some("2023-12-31T23:59:59+02:00"), "2023-12-31")]
    #[case(Some("last tuesday"), "last tuesday")]
    #[case(None, "Unknown")]
    fn test_format_date(#[case] input: Option<&str>, #[case] expected: &str) {
        assert_eq!(format_date(input), expected);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(9, 0)]
    #[case(10, 1)]
    #[case(55, 5)]
    #[case(99, 9)]
    #[case(100, 10)]
    #[case(250, 10)]
    fn test_progress_bar(#[case] percent: u8, #[case] filled: usize) {
        let bar = progress_bar(percent);
        assert_eq!(bar.chars().count(), 10);
        assert_eq!(bar.chars().filter(|c| *c == '⬛').count(), filled);
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Short.pdf"), "Short.pdf");
        let exact: String = "x".repeat(35);
        assert_eq!(truncate_label(&exact), exact);
        let long = "Lecture 01 - Introduction to Kinematics.pdf";
        assert_eq!(truncate_label(long), "Lecture 01 - Introduction to Kin...");
        let arabic = "محاضرة ".repeat(10);
        assert_eq!(truncate_label(&arabic).chars().count(), 35);
    }

    #[rstest]
    #[case("application/vnd.google-apps.folder", "Unit 1", "📁")]
    #[case("application/pdf", "notes.pdf", "📕")]
    #[case("video/mp4", "lecture.mp4", "🎬")]
    #[case("application/octet-stream", "slides.pptx", "🟧")]
    #[case("application/vnd.google-apps.document", "Summary", "📝")]
    #[case("application/zip", "bundle.zip", "📦")]
    #[case("text/plain", "readme.txt", "📄")]
    fn test_icon_for(#[case] mime_type: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(icon_for(mime_type, name), expected);
    }
}

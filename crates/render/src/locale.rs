//! Localized message templates.
//!
//! Every user-visible string lives in [`source`], keyed by [`Language`] and
//! [`MessageKey`]. Templates use [upon] syntax and are compiled once by
//! [`Localizer::new`]. Two formatters are registered for interpolating
//! untrusted names into Telegram's legacy Markdown:
//!
//! - **`md`** backslash-escapes `_`, `*`, `[` and `` ` ``.
//! - **`code`** replaces backticks, which cannot be escaped inside a code span.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::HashMap;
use std::fmt::Write;
use upon::{Engine, Template, Value, fmt as upon_fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Arabic,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Arabic];

    /// Matches the primary subtag of a BCP 47 tag (`"ar-EG"` is Arabic).
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "en" => Some(Self::English),
            "ar" => Some(Self::Arabic),
            _ => None,
        }
    }

    /// Like [`from_code`](Self::from_code) but falls back to `default` for
    /// unsupported or missing tags.
    pub fn resolve(code: Option<&str>, default: Language) -> Self {
        code.and_then(Self::from_code).unwrap_or(default)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Arabic => "ar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Welcome,
    ErrorDrive,
    SearchUsage,
    Searching,
    NoResults,
    SearchHeader,
    BrowserHeader,
    EmptyFolder,
    Back,
    Home,
    Prev,
    Next,
    PageIndicator,
    Starting,
    Fetching,
    ErrorFetch,
    FileTooLarge,
    Downloading,
    ErrorInit,
    Uploading,
    Caption,
    UploadFailed,
    CommandHome,
    CommandSearch,
}

impl MessageKey {
    pub const ALL: [MessageKey; 24] = [
        MessageKey::Welcome,
        MessageKey::ErrorDrive,
        MessageKey::SearchUsage,
        MessageKey::Searching,
        MessageKey::NoResults,
        MessageKey::SearchHeader,
        MessageKey::BrowserHeader,
        MessageKey::EmptyFolder,
        MessageKey::Back,
        MessageKey::Home,
        MessageKey::Prev,
        MessageKey::Next,
        MessageKey::PageIndicator,
        MessageKey::Starting,
        MessageKey::Fetching,
        MessageKey::ErrorFetch,
        MessageKey::FileTooLarge,
        MessageKey::Downloading,
        MessageKey::ErrorInit,
        MessageKey::Uploading,
        MessageKey::Caption,
        MessageKey::UploadFailed,
        MessageKey::CommandHome,
        MessageKey::CommandSearch,
    ];
}

/// Template source for `key` in `language`, if that language defines it.
pub fn source(language: Language, key: MessageKey) -> Option<&'static str> {
    use MessageKey as K;
    let text = match (language, key) {
        (Language::English, key) => match key {
            K::Welcome => "🌟 **Welcome to Perfection In Physics** 🌟",
            K::ErrorDrive => "❌ Error: Could not connect to Google Drive.",
            K::SearchUsage => {
                "ℹ️ **Search Usage:**\nType `/search` followed by the file name.\nExample: `/search Chapter 1`"
            },
            K::Searching => "🔍 Searching for: `'{{ query | code }}'`...",
            K::NoResults => "❌ No results found.",
            K::SearchHeader => "🔍 **Search Results**\n`Query: {{ query | code }}`\n\nFound: {{ count }} files",
            K::BrowserHeader => "📂 **{{ name | md }}**\n`{{ path | code }}`\n\nPage {{ page }} of {{ total }}",
            K::EmptyFolder => "\n\n❌ _This folder is empty._",
            K::Back => "🔙 Back",
            K::Home => "🏠 Home",
            K::Prev => "⬅️ Prev",
            K::Next => "Next ➡️",
            K::PageIndicator => "📄 {{ page }}/{{ total }}",
            K::Starting => "⬇️ Starting Request...",
            K::Fetching => "⏳ **Fetching Info...**",
            K::ErrorFetch => "❌ Error fetching info: {{ message | md }}",
            K::FileTooLarge => "⚠️ **File too large (>100MB).**\n\n🔗 [Click to Open in Drive]({{ link }})",
            K::Downloading => "📥 **Downloading from Drive...**\n`{{ name | code }}`\n{{ bar }} {{ percent }}%",
            K::ErrorInit => "❌ Init Error: {{ message | md }}",
            K::Uploading => "📤 **Uploading to Telegram...**\n`{{ name | code }}`\n{{ bar }} {{ percent }}%",
            K::Caption => {
                "📄 **{{ name | md }}**\n💾 Size: {{ size }}\n📅 Date: {{ date }}\n🤖 _Perfection In Physics Bot_"
            },
            K::UploadFailed => "⚠️ **Upload Failed.**\n\n🔗 [Click to Open in Drive]({{ link }})",
            K::CommandHome => "🏠 Home",
            K::CommandSearch => "🔍 Search Files",
        },
        (Language::Arabic, key) => match key {
            K::Welcome => "🌟 **مرحبًا بك في Perfection In Physics** 🌟",
            K::ErrorDrive => "❌ خطأ: تعذر الاتصال بجوجل درايف.",
            K::SearchUsage => {
                "ℹ️ **طريقة البحث:**\nاكتب `/search` متبوعة باسم الملف.\nمثال: `/search الفصل الأول`"
            },
            K::Searching => "🔍 جاري البحث عن: `'{{ query | code }}'`...",
            K::NoResults => "❌ لم يتم العثور على نتائج.",
            K::SearchHeader => {
                "🔍 **نتائج البحث**\n`الاستعلام: {{ query | code }}`\n\nتم العثور على: {{ count }} ملفات"
            },
            K::BrowserHeader => "📂 **{{ name | md }}**\n`{{ path | code }}`\n\nصفحة {{ page }} من {{ total }}",
            K::EmptyFolder => "\n\n❌ _هذا المجلد فارغ._",
            K::Back => "🔙 رجوع",
            K::Home => "🏠 الرئيسية",
            K::Prev => "⬅️ السابق",
            K::Next => "التالي ➡️",
            K::PageIndicator => "📄 {{ page }}/{{ total }}",
            K::Starting => "⬇️ جاري بدء الطلب...",
            K::Fetching => "⏳ **جاري جلب المعلومات...**",
            K::ErrorFetch => "❌ خطأ في جلب المعلومات: {{ message | md }}",
            K::FileTooLarge => "⚠️ **الملف كبير جدًا (>100MB).**\n\n🔗 [اضغط هنا للفتح في درايف]({{ link }})",
            K::Downloading => "📥 **جاري التنزيل من درايف...**\n`{{ name | code }}`\n{{ bar }} {{ percent }}%",
            K::ErrorInit => "❌ خطأ في البدء: {{ message | md }}",
            K::Uploading => "📤 **جاري الرفع إلى تيليجرام...**\n`{{ name | code }}`\n{{ bar }} {{ percent }}%",
            K::Caption => {
                "📄 **{{ name | md }}**\n💾 الحجم: {{ size }}\n📅 التاريخ: {{ date }}\n🤖 _Perfection In Physics Bot_"
            },
            K::UploadFailed => "⚠️ **فشل الرفع.**\n\n🔗 [اضغط هنا للفتح في درايف]({{ link }})",
            // Command descriptions are registered once for everyone.
            K::CommandHome | K::CommandSearch => return None,
        },
    };
    Some(text)
}

/// Compiled message templates for every supported language.
pub struct Localizer {
    engine: Engine<'static>,
    templates: HashMap<(Language, MessageKey), Template<'static>>,
    fallback: Language,
}

impl std::fmt::Debug for Localizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Localizer")
            .field("templates", &self.templates.len())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl Localizer {
    /// Compiles every template, failing on the first syntax error.
    pub fn new(fallback: Language) -> Result<Self> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let mut templates = HashMap::new();
        for language in Language::ALL {
            for key in MessageKey::ALL {
                let Some(text) = source(language, key) else {
                    continue;
                };
                let template = engine
                    .compile(text)
                    .or_raise(|| ErrorKind::Template(format!("{key:?} ({})", language.code())))?;
                templates.insert((language, key), template);
            }
        }
        Ok(Self { engine, templates, fallback })
    }

    pub fn fallback(&self) -> Language {
        self.fallback
    }

    /// Renders `key` without any variables.
    pub fn get(&self, language: Language, key: MessageKey) -> String {
        self.text(language, key, Value::Map(Default::default()))
    }

    /// Renders `key` for `language`, falling back to the default language
    /// when `language` lacks it. Never fails: a template that cannot be
    /// rendered yields its raw source.
    pub fn text(&self, language: Language, key: MessageKey, vars: Value) -> String {
        let (language, template) = match self.templates.get(&(language, key)) {
            Some(template) => (language, template),
            None => match self.templates.get(&(self.fallback, key)) {
                Some(template) => (self.fallback, template),
                None => {
                    tracing::warn!(?key, "No template in any language");
                    return String::new();
                },
            },
        };
        match template.render(&self.engine, vars).to_string() {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(?key, language = language.code(), error = %err, "Failed to render message");
                source(language, key).unwrap_or_default().to_string()
            },
        }
    }
}

mod addons {
    use super::*;

    /// Characters with meaning in Telegram's legacy Markdown.
    const MARKDOWN_SPECIAL: [char; 4] = ['_', '*', '[', '`'];

    pub(super) fn escape_markdown(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if MARKDOWN_SPECIAL.contains(&c) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    fn md_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => write!(f, "{}", escape_markdown(s))?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    fn code_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => write!(f, "{}", s.replace('`', "'"))?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    pub(super) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("md", md_formatter);
        engine.add_formatter("code", code_formatter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn localizer() -> Localizer {
        Localizer::new(Language::English).unwrap()
    }

    #[rstest]
    #[case(Some("en"), Language::English)]
    #[case(Some("en-US"), Language::English)]
    #[case(Some("ar"), Language::Arabic)]
    #[case(Some("ar-EG"), Language::Arabic)]
    #[case(Some("AR_sa"), Language::Arabic)]
    #[case(Some("fr-FR"), Language::English)]
    #[case(Some(""), Language::English)]
    #[case(None, Language::English)]
    fn test_resolve(#[case] code: Option<&str>, #[case] expected: Language) {
        assert_eq!(Language::resolve(code, Language::English), expected);
    }

    #[test]
    fn test_every_english_key_is_defined() {
        for key in MessageKey::ALL {
            assert!(source(Language::English, key).is_some(), "{key:?}");
        }
    }

    #[test]
    fn test_all_templates_compile() {
        let localizer = localizer();
        assert_eq!(localizer.templates.len(), MessageKey::ALL.len() * 2 - 2);
    }

    #[test]
    fn test_renders_named_placeholders() {
        let text = localizer().text(
            Language::English,
            MessageKey::BrowserHeader,
            upon::value! { name: "Unit 1", path: "Root » Unit 1", page: 2u64, total: 3u64 },
        );
        assert_eq!(text, "📂 **Unit 1**\n`Root » Unit 1`\n\nPage 2 of 3");
    }

    #[test]
    fn test_arabic_table() {
        let text = localizer().text(Language::Arabic, MessageKey::PageIndicator, upon::value! { page: 1u64, total: 4u64 });
        assert_eq!(text, "📄 1/4");
        assert_eq!(localizer().get(Language::Arabic, MessageKey::Back), "🔙 رجوع");
    }

    #[test]
    fn test_missing_key_falls_back_to_english() {
        assert_eq!(localizer().get(Language::Arabic, MessageKey::CommandSearch), "🔍 Search Files");
    }

    #[test]
    fn test_names_are_escaped() {
        let localizer = localizer();
        let caption = localizer.text(
            Language::English,
            MessageKey::Caption,
            upon::value! { name: "my_notes*v2.pdf", size: "1.0 KB", date: "2024-01-01" },
        );
        assert!(caption.starts_with("📄 **my\\_notes\\*v2.pdf**"));
        let status = localizer.text(
            Language::English,
            MessageKey::Downloading,
            upon::value! { name: "a`b", bar: "⬜", percent: 0u64 },
        );
        assert!(status.contains("`a'b`"));
    }

    #[test]
    fn test_missing_variable_yields_raw_template() {
        let text = localizer().get(Language::English, MessageKey::ErrorFetch);
        assert_eq!(text, source(Language::English, MessageKey::ErrorFetch).unwrap());
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(addons::escape_markdown("[a]_b"), "\\[a]\\_b");
        assert_eq!(addons::escape_markdown("plain"), "plain");
    }
}

// Sentence templates - per-language label -> sentence tables
//
// Resolution order for (label, language):
// 1. the requested language's table
// 2. the default language's table
// 3. the raw label itself

use std::collections::BTreeMap;

/// language code -> (gesture label -> sentence)
pub type TemplateTables = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone)]
pub struct SentenceTemplates {
    default_language: String,
    tables: TemplateTables,
}

impl SentenceTemplates {
    pub fn new(default_language: impl Into<String>, tables: TemplateTables) -> Self {
        Self {
            default_language: default_language.into(),
            tables,
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    fn lookup(&self, label: &str, language: &str) -> Option<&str> {
        self.tables
            .get(language)
            .and_then(|table| table.get(label))
            .map(String::as_str)
    }

    /// Sentence for `label` in `language`, with fallback
    pub fn resolve(&self, label: &str, language: &str) -> String {
        self.lookup(label, language)
            .or_else(|| self.lookup(label, &self.default_language))
            .unwrap_or(label)
            .to_string()
    }
}

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(label, sentence)| (label.to_string(), sentence.to_string()))
        .collect()
}

/// Built-in sentences for the default rule vocabulary
pub fn default_tables() -> TemplateTables {
    let mut tables = TemplateTables::new();
    tables.insert(
        "en".to_string(),
        table(&[
            ("HELLO", "Hello, I am Yash."),
            ("I", "I am here."),
            ("YASH", "My name is Yash."),
            ("WE", "We are here together."),
            ("TEAM_FSOCIETY", "And we are Team Fsociety."),
        ]),
    );
    tables.insert(
        "hi".to_string(),
        table(&[
            ("HELLO", "नमस्ते, मैं यश हूँ।"),
            ("YASH", "मेरा नाम यश है।"),
            ("TEAM_FSOCIETY", "और हम टीम एफ-सोसाइटी हैं।"),
        ]),
    );
    tables.insert(
        "mr".to_string(),
        table(&[
            ("HELLO", "नमस्कार, मी यश आहे."),
            ("YASH", "माझे नाव यश आहे."),
            ("TEAM_FSOCIETY", "आणि आम्ही टीम एफ-सोसायटी आहोत."),
        ]),
    );
    tables
}

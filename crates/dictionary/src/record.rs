use serde::{Deserialize, Serialize};

/// Rendered in place of a field the dictionary does not know.
const MISSING_FIELD: &str = "-";

/// One dictionary entry for a single character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRecord {
    /// Unicode scalar value of the character.
    pub unicode: u32,
    pub character: String,
    /// Korean reading with its gloss (훈음), e.g. `가운데 중`.
    #[serde(default)]
    pub hangul: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub radical: Option<String>,
    #[serde(default)]
    pub strokes: Option<u32>,
    #[serde(default)]
    pub mandarin: Option<String>,
    #[serde(default)]
    pub cantonese: Option<String>,
    #[serde(default)]
    pub japanese_on: Option<String>,
    #[serde(default)]
    pub japanese_kun: Option<String>,
}

impl DictionaryRecord {
    /// Record with only the identifying fields set.
    #[must_use]
    pub fn new(character: char) -> Self {
        Self {
            unicode: u32::from(character),
            character: character.to_string(),
            hangul: None,
            meaning: None,
            radical: None,
            strokes: None,
            mandarin: None,
            cantonese: None,
            japanese_on: None,
            japanese_kun: None,
        }
    }

    /// Named values for message formatting. Absent fields render as `-`.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| MISSING_FIELD.to_string());
        vec![
            ("character", self.character.clone()),
            ("code", format_code_point(self.unicode)),
            ("hangul", text(&self.hangul)),
            ("meaning", text(&self.meaning)),
            ("radical", text(&self.radical)),
            (
                "strokes",
                self.strokes
                    .map_or_else(|| MISSING_FIELD.to_string(), |n| n.to_string()),
            ),
            ("mandarin", text(&self.mandarin)),
            ("cantonese", text(&self.cantonese)),
            ("japanese_on", text(&self.japanese_on)),
            ("japanese_kun", text(&self.japanese_kun)),
        ]
    }
}

/// `U+XXXX` notation, at least four upper-case hex digits.
#[must_use]
pub fn format_code_point(code_point: u32) -> String {
    format!("U+{code_point:04X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_point_notation_pads_to_four_digits() {
        assert_eq!(format_code_point(0x4E2D), "U+4E2D");
        assert_eq!(format_code_point(0x41), "U+0041");
        assert_eq!(format_code_point(0x20000), "U+20000");
    }

    #[test]
    fn fields_fill_missing_values() {
        let mut record = DictionaryRecord::new('中');
        record.hangul = Some("가운데 중".into());
        record.strokes = Some(4);

        let fields = record.fields();
        let get = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("character"), Some("中"));
        assert_eq!(get("code"), Some("U+4E2D"));
        assert_eq!(get("hangul"), Some("가운데 중"));
        assert_eq!(get("strokes"), Some("4"));
        assert_eq!(get("mandarin"), Some("-"));
    }
}

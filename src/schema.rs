//! Schema data model.
//!
//! A schema is the single source of truth for a character sheet: typed stats,
//! layout sections, conditional dice expressions and replacement rules. It is
//! held wholesale in memory, mutated by replace-and-revalidate, and serialized
//! to and from a JSON document (`{config, stats[], sections[], integrations?}`)
//! that round-trips losslessly.

use crate::error::FormulaEditError;
use crate::id::{SectionId, StatId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The locale key used as the fallback for every localized text.
pub const DEFAULT_LOCALE: &str = "default";

/// A localized text value: a map from locale key to translated string.
///
/// The `"default"` locale is the fallback and the only one the validator
/// requires to be present.
///
/// # Examples
///
/// ```rust
/// use sheetforge::LocalizedText;
///
/// let mut name = LocalizedText::new();
/// name.set("default", "Strength");
/// name.set("pt-BR", "Força");
///
/// assert_eq!(name.default_text(), Some("Strength"));
/// assert_eq!(name.get("pt-BR"), Some("Força"));
/// // Unknown locales fall back to the default.
/// assert_eq!(name.get("fr"), Some("Strength"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Create an empty localized text.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a localized text with only the default locale set.
    pub fn from_default(text: &str) -> Self {
        let mut t = Self::new();
        t.set(DEFAULT_LOCALE, text);
        t
    }

    /// Set the text for a locale.
    pub fn set(&mut self, locale: &str, text: &str) {
        self.0.insert(locale.to_string(), text.to_string());
    }

    /// Get the default-locale text, if present.
    pub fn default_text(&self) -> Option<&str> {
        self.0.get(DEFAULT_LOCALE).map(String::as_str)
    }

    /// Get the text for a locale, falling back to the default locale.
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0
            .get(locale)
            .map(String::as_str)
            .or_else(|| self.default_text())
    }
}

/// Top-level schema configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Stable identifier of the schema document.
    #[serde(default)]
    pub id: String,

    /// Localized display name of the schema.
    #[serde(default)]
    pub name: LocalizedText,
}

/// A single option of an enum stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumOption {
    /// Numeric value of the option, unique within one option list.
    pub value: i64,

    /// Localized option label.
    pub name: LocalizedText,

    /// Optional emoji shown next to the label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// The option set of an enum stat: an inline ordered list, or a reference
/// to another enum stat whose option list is reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumOptions {
    /// An inline, ordered option list (at most [`MAX_ENUM_OPTIONS`] entries).
    Inline(Vec<EnumOption>),

    /// The id of another enum stat whose option list is borrowed.
    Reference(StatId),
}

/// Maximum number of options an inline enum option list may carry.
pub const MAX_ENUM_OPTIONS: usize = 25;

/// Comparison operator of a dice condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<=")]
    LessEq,
    #[serde(rename = ">=")]
    GreaterEq,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
}

/// The guard of a conditional dice entry.
///
/// Both operands are free text and may themselves contain reference tokens;
/// they are substituted before the comparison is evaluated at roll time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiceCondition {
    pub value1: String,
    pub operator: CompareOp,
    pub value2: String,
}

/// One entry of a stat's ordered dice list.
///
/// Dice lists are evaluated first-match: the first entry whose condition
/// holds (or the first unconditional entry) is the one that applies. By
/// convention the last entry is unconditional, but this is not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dice {
    /// The dice expression, e.g. `"1d20 + <stat:3:value>"`.
    pub expression: String,

    /// Optional guard; an entry without one always matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<DiceCondition>,
}

/// A dice substitution rule.
///
/// Declares that `key`, when it appears inside a dice expression, may be
/// substituted at roll time by any stat in `options`. Including `key` itself
/// in `options` means "no substitution" is offered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    pub key: StatId,
    pub options: Vec<StatId>,
}

/// The type-specific part of a stat, tagged on `"type"` in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StatKind {
    /// A stored number, optionally bounded.
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },

    /// A choice from an option list.
    Enum { options: EnumOptions },

    /// A stored true/false flag.
    Boolean,

    /// A stored free-text value, optionally length-bounded.
    String {
        #[serde(
            rename = "minLength",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        min_length: Option<u32>,
        #[serde(
            rename = "maxLength",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        max_length: Option<u32>,
    },

    /// A value defined by a formula over other stats.
    Calculated { formula: String },
}

impl StatKind {
    /// Short lowercase name of the variant, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            StatKind::Numeric { .. } => "numeric",
            StatKind::Enum { .. } => "enum",
            StatKind::Boolean => "boolean",
            StatKind::String { .. } => "string",
            StatKind::Calculated { .. } => "calculated",
        }
    }
}

/// A stat: one typed entry of the character sheet.
///
/// # Examples
///
/// ```rust
/// use sheetforge::{LocalizedText, Stat, StatId, StatKind};
///
/// let strength = Stat {
///     id: StatId::new(1),
///     name: LocalizedText::from_default("Strength"),
///     emoji: Some("💪".to_string()),
///     sections: vec![],
///     kind: StatKind::Numeric { min: Some(0), max: Some(20) },
///     dices: vec![],
///     replacements: vec![],
/// };
/// assert_eq!(strength.kind.type_name(), "numeric");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub id: StatId,
    pub name: LocalizedText,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,

    /// Sections in which the stat is editable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SectionId>,

    #[serde(flatten)]
    pub kind: StatKind,

    /// Ordered conditional dice expressions. Not carried by string stats.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dices: Vec<Dice>,

    /// Substitution rules for the dice expressions above.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replacements: Vec<Replacement>,
}

impl Stat {
    /// The formula, if this is a calculated stat.
    pub fn formula(&self) -> Option<&str> {
        match &self.kind {
            StatKind::Calculated { formula } => Some(formula),
            _ => None,
        }
    }
}

/// How a section preview is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewType {
    String,
    Img,
}

/// The preview block of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionPreview {
    #[serde(rename = "type")]
    pub kind: PreviewType,

    /// Localized preview text (or image URL for `img` previews). May contain
    /// reference tokens, resolved by the template resolver for display.
    pub content: LocalizedText,
}

/// A layout section of the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub name: LocalizedText,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,

    pub preview: SectionPreview,

    /// Other sections reachable from this one as sub-pages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub view_pages: Vec<SectionId>,
}

/// A full schema snapshot: the persisted document.
///
/// # Examples
///
/// ```rust
/// use sheetforge::Schema;
///
/// let schema: Schema = serde_json::from_str(
///     r#"{"config": {"id": "ca", "name": {"default": "Arcanum"}}, "stats": [], "sections": []}"#,
/// ).unwrap();
/// assert_eq!(schema.config.id, "ca");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub config: Config,

    #[serde(default)]
    pub stats: Vec<Stat>,

    #[serde(default)]
    pub sections: Vec<Section>,

    /// Opaque integration settings; preserved verbatim across round-trips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<serde_json::Value>,
}

impl Schema {
    /// Look up a stat by id.
    pub fn stat(&self, id: StatId) -> Option<&Stat> {
        self.stats.iter().find(|s| s.id == id)
    }

    /// Look up a section by id.
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// The inline option list of an enum stat, resolving one level of
    /// "reference another enum" indirection.
    ///
    /// Returns `None` if the stat does not exist, is not an enum, or the
    /// reference does not land on an enum with an inline list.
    pub fn enum_options(&self, id: StatId) -> Option<&[EnumOption]> {
        match &self.stat(id)?.kind {
            StatKind::Enum {
                options: EnumOptions::Inline(list),
            } => Some(list),
            StatKind::Enum {
                options: EnumOptions::Reference(other),
            } => match &self.stat(*other)?.kind {
                StatKind::Enum {
                    options: EnumOptions::Inline(list),
                } => Some(list),
                // Indirection resolves one level only.
                _ => None,
            },
            _ => None,
        }
    }

    /// Replace the formula of a calculated stat, refusing edits that would
    /// introduce a dependency cycle.
    ///
    /// The check runs against the *proposed* formula before anything is
    /// written; on error the schema is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sheetforge::{LocalizedText, Schema, Stat, StatId, StatKind};
    ///
    /// let mut schema = Schema::default();
    /// schema.stats.push(Stat {
    ///     id: StatId::new(5),
    ///     name: LocalizedText::from_default("Initiative"),
    ///     emoji: None,
    ///     sections: vec![],
    ///     kind: StatKind::Calculated { formula: "10".to_string() },
    ///     dices: vec![],
    ///     replacements: vec![],
    /// });
    ///
    /// // A self-referential formula is refused, the old one stays.
    /// let err = schema.try_set_formula(StatId::new(5), "<stat:5:value> + 1");
    /// assert!(err.is_err());
    /// assert_eq!(schema.stat(StatId::new(5)).unwrap().formula(), Some("10"));
    /// ```
    pub fn try_set_formula(
        &mut self,
        id: StatId,
        formula: &str,
    ) -> Result<(), FormulaEditError> {
        let stat = self
            .stats
            .iter()
            .find(|s| s.id == id)
            .ok_or(FormulaEditError::UnknownStat(id))?;
        if !matches!(stat.kind, StatKind::Calculated { .. }) {
            return Err(FormulaEditError::NotCalculated(id));
        }
        if crate::graph::has_cycle(id, formula, &self.stats) {
            return Err(FormulaEditError::WouldCycle(id));
        }
        // Re-find mutably; the immutable borrow above has ended.
        for stat in &mut self.stats {
            if stat.id == id {
                stat.kind = StatKind::Calculated {
                    formula: formula.to_string(),
                };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(id: u32, name: &str) -> Stat {
        Stat {
            id: StatId::new(id),
            name: LocalizedText::from_default(name),
            emoji: None,
            sections: vec![],
            kind: StatKind::Numeric {
                min: None,
                max: None,
            },
            dices: vec![],
            replacements: vec![],
        }
    }

    #[test]
    fn test_localized_text_fallback() {
        let mut t = LocalizedText::new();
        t.set("default", "Hit Points");
        t.set("pt-BR", "Pontos de Vida");

        assert_eq!(t.get("pt-BR"), Some("Pontos de Vida"));
        assert_eq!(t.get("de"), Some("Hit Points"));
        assert_eq!(LocalizedText::new().get("de"), None);
    }

    #[test]
    fn test_stat_kind_tagged_serialization() {
        let stat = numeric(1, "STR");
        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json["type"], "numeric");
        assert_eq!(json["id"], 1);

        let back: Stat = serde_json::from_value(json).unwrap();
        assert_eq!(back, stat);
    }

    #[test]
    fn test_enum_options_untagged() {
        // Inline list
        let inline: EnumOptions = serde_json::from_str(
            r#"[{"value": 1, "name": {"default": "Elf"}}]"#,
        )
        .unwrap();
        assert!(matches!(inline, EnumOptions::Inline(ref l) if l.len() == 1));

        // Reference to another enum stat
        let reference: EnumOptions = serde_json::from_str("3").unwrap();
        assert_eq!(reference, EnumOptions::Reference(StatId::new(3)));
    }

    #[test]
    fn test_compare_op_symbols() {
        assert_eq!(serde_json::to_string(&CompareOp::LessEq).unwrap(), r#""<=""#);
        let op: CompareOp = serde_json::from_str(r#""!=""#).unwrap();
        assert_eq!(op, CompareOp::NotEq);
    }

    #[test]
    fn test_enum_options_one_level_indirection() {
        let mut schema = Schema::default();
        let mut race = numeric(1, "Race");
        race.kind = StatKind::Enum {
            options: EnumOptions::Inline(vec![EnumOption {
                value: 0,
                name: LocalizedText::from_default("Human"),
                emoji: None,
            }]),
        };
        let mut origin = numeric(2, "Origin");
        origin.kind = StatKind::Enum {
            options: EnumOptions::Reference(StatId::new(1)),
        };
        let mut twice_removed = numeric(3, "Twice removed");
        twice_removed.kind = StatKind::Enum {
            options: EnumOptions::Reference(StatId::new(2)),
        };
        schema.stats = vec![race, origin, twice_removed];

        assert_eq!(schema.enum_options(StatId::new(1)).unwrap().len(), 1);
        assert_eq!(schema.enum_options(StatId::new(2)).unwrap().len(), 1);
        // Chained references do not resolve transitively.
        assert!(schema.enum_options(StatId::new(3)).is_none());
    }

    #[test]
    fn test_try_set_formula_rejects_unknown_stat() {
        let mut schema = Schema::default();
        let err = schema.try_set_formula(StatId::new(9), "1 + 1");
        assert!(matches!(err, Err(FormulaEditError::UnknownStat(_))));
    }

    #[test]
    fn test_try_set_formula_rejects_non_calculated() {
        let mut schema = Schema::default();
        schema.stats.push(numeric(1, "STR"));
        let err = schema.try_set_formula(StatId::new(1), "1 + 1");
        assert!(matches!(err, Err(FormulaEditError::NotCalculated(_))));
    }

    #[test]
    fn test_schema_round_trip() {
        let doc = r#"{
            "config": {"id": "ca", "name": {"default": "Arcanum"}},
            "stats": [
                {"id": 1, "name": {"default": "Strength"}, "type": "numeric", "min": 0, "max": 20},
                {"id": 2, "name": {"default": "Bio"}, "type": "string", "maxLength": 200}
            ],
            "sections": [
                {"id": 1, "name": {"default": "Combat"},
                 "preview": {"type": "string", "content": {"default": "STR <stat:1:value>"}}}
            ]
        }"#;
        let schema: Schema = serde_json::from_str(doc).unwrap();
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }
}

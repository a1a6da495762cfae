//! Legacy-format importer.
//!
//! The older sheet builder persisted one JSON document *per locale*, each
//! holding a flat list of "commands" instead of typed stats. This module is
//! the one-shot, non-interactive batch transform into the current schema
//! shape: locale codes are remapped through a table, and the stat type is
//! inferred from which fields a command carries (`enum` → enum stat,
//! `dices` or `canHoldValue` → numeric stat, otherwise string).
//!
//! There is no partial-failure recovery: any malformed document aborts the
//! whole run with an error and nothing is produced.

use crate::id::StatId;
use crate::schema::{
    Config, Dice, EnumOption, EnumOptions, LocalizedText, Schema, Stat, StatKind, DEFAULT_LOCALE,
};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Why a legacy import run was aborted.
#[derive(Debug, Error)]
pub enum LegacyImportError {
    /// A document did not match the legacy shape.
    #[error("document {index} is malformed: {source}")]
    Document {
        index: usize,
        source: serde_json::Error,
    },

    /// Two documents disagree on what a command is.
    #[error("command {id} is a {first} stat in one document and a {second} stat in another")]
    TypeConflict {
        id: StatId,
        first: &'static str,
        second: &'static str,
    },

    /// No document was given.
    #[error("no legacy documents to import")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct LegacyDocument {
    locale: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    commands: Vec<LegacyCommand>,
}

#[derive(Debug, Deserialize)]
struct LegacyCommand {
    id: u32,
    name: String,
    #[serde(default)]
    emoji: Option<String>,
    #[serde(rename = "canHoldValue", default)]
    can_hold_value: bool,
    #[serde(default)]
    min: Option<i64>,
    #[serde(default)]
    max: Option<i64>,
    #[serde(rename = "enum", default)]
    enum_options: Option<Vec<LegacyOption>>,
    #[serde(default)]
    dices: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyOption {
    value: i64,
    name: String,
}

impl LegacyCommand {
    /// Whether the command carries structural fields, as opposed to being a
    /// translation-only `{id, name}` entry from a non-first document.
    fn has_structure(&self) -> bool {
        self.enum_options.is_some() || !self.dices.is_empty() || self.can_hold_value
    }

    fn inferred_kind(&self) -> &'static str {
        if self.enum_options.is_some() {
            "enum"
        } else if !self.dices.is_empty() || self.can_hold_value {
            "numeric"
        } else {
            "string"
        }
    }
}

/// One-shot importer for the legacy per-locale document set.
///
/// The first document defines each command's structure (type, bounds,
/// option values, dice expressions); every document contributes localized
/// names for its locale.
///
/// # Examples
///
/// ```rust
/// use sheetforge::legacy::LegacyImporter;
///
/// let docs = vec![
///     serde_json::json!({
///         "locale": "en-US",
///         "title": "Chronicles of Arcanum",
///         "commands": [
///             {"id": 1, "name": "Strength", "canHoldValue": true, "min": 0, "max": 20}
///         ]
///     }),
///     serde_json::json!({
///         "locale": "pt-BR",
///         "commands": [{"id": 1, "name": "Força"}]
///     }),
/// ];
///
/// let mut importer = LegacyImporter::new("arcanum");
/// importer.map_locale("en-US", "default");
/// importer.map_locale("pt-BR", "pt-BR");
///
/// let schema = importer.import(&docs).unwrap();
/// assert_eq!(schema.stats.len(), 1);
/// assert_eq!(schema.stats[0].name.default_text(), Some("Strength"));
/// assert!(sheetforge::validate(&schema).is_empty());
/// ```
pub struct LegacyImporter {
    config_id: String,
    locale_map: HashMap<String, String>,
}

impl LegacyImporter {
    /// Create an importer producing a schema with the given config id.
    ///
    /// Without remapping entries, the first document's locale becomes the
    /// default locale and the rest keep their code verbatim.
    pub fn new(config_id: &str) -> Self {
        Self {
            config_id: config_id.to_string(),
            locale_map: HashMap::new(),
        }
    }

    /// Remap a legacy locale code to a current one.
    pub fn map_locale(&mut self, from: &str, to: &str) {
        self.locale_map.insert(from.to_string(), to.to_string());
    }

    fn target_locale<'a>(&'a self, legacy: &'a str, is_first: bool) -> &'a str {
        match self.locale_map.get(legacy) {
            Some(mapped) => mapped,
            None if is_first => DEFAULT_LOCALE,
            None => legacy,
        }
    }

    /// Run the import. Aborts on the first malformed document.
    pub fn import(&self, docs: &[serde_json::Value]) -> Result<Schema, LegacyImportError> {
        if docs.is_empty() {
            return Err(LegacyImportError::Empty);
        }

        let mut parsed = Vec::with_capacity(docs.len());
        for (index, doc) in docs.iter().enumerate() {
            let doc: LegacyDocument = serde_json::from_value(doc.clone())
                .map_err(|source| LegacyImportError::Document { index, source })?;
            parsed.push(doc);
        }

        let mut config = Config {
            id: self.config_id.clone(),
            name: LocalizedText::new(),
        };
        // Insertion order of first appearance is the stat order.
        let mut order: Vec<StatId> = Vec::new();
        let mut stats: HashMap<StatId, Stat> = HashMap::new();

        for (index, doc) in parsed.iter().enumerate() {
            let locale = self.target_locale(&doc.locale, index == 0);
            if let Some(title) = &doc.title {
                config.name.set(locale, title);
            }

            for command in &doc.commands {
                let id = StatId::new(command.id);
                match stats.get_mut(&id) {
                    None => {
                        order.push(id);
                        stats.insert(id, build_stat(command, locale));
                    }
                    Some(existing) => {
                        // A bare `{id, name}` command is a translation; only
                        // commands with structural fields can conflict.
                        if command.has_structure()
                            && existing.kind.type_name() != command.inferred_kind()
                        {
                            return Err(LegacyImportError::TypeConflict {
                                id,
                                first: existing.kind.type_name(),
                                second: command.inferred_kind(),
                            });
                        }
                        existing.name.set(locale, &command.name);
                        localize_options(existing, command, locale);
                    }
                }
            }
        }

        Ok(Schema {
            config,
            stats: order
                .into_iter()
                .filter_map(|id| stats.remove(&id))
                .collect(),
            sections: Vec::new(),
            integrations: None,
        })
    }
}

fn build_stat(command: &LegacyCommand, locale: &str) -> Stat {
    let mut name = LocalizedText::new();
    name.set(locale, &command.name);
    // The structural locale also seeds the default, so a schema built from
    // non-default locales still validates.
    if name.default_text().is_none() {
        name.set(DEFAULT_LOCALE, &command.name);
    }

    let kind = if let Some(options) = &command.enum_options {
        StatKind::Enum {
            options: EnumOptions::Inline(
                options
                    .iter()
                    .map(|option| {
                        let mut option_name = LocalizedText::new();
                        option_name.set(locale, &option.name);
                        if option_name.default_text().is_none() {
                            option_name.set(DEFAULT_LOCALE, &option.name);
                        }
                        EnumOption {
                            value: option.value,
                            name: option_name,
                            emoji: None,
                        }
                    })
                    .collect(),
            ),
        }
    } else if !command.dices.is_empty() || command.can_hold_value {
        StatKind::Numeric {
            min: command.min,
            max: command.max,
        }
    } else {
        StatKind::String {
            min_length: None,
            max_length: None,
        }
    };

    Stat {
        id: StatId::new(command.id),
        name,
        emoji: command.emoji.clone(),
        sections: vec![],
        kind,
        dices: command
            .dices
            .iter()
            .map(|expression| Dice {
                expression: expression.clone(),
                condition: None,
            })
            .collect(),
        replacements: vec![],
    }
}

/// Add a later document's option labels to an already-built enum stat.
/// Options are matched by value; unknown values are ignored.
fn localize_options(stat: &mut Stat, command: &LegacyCommand, locale: &str) {
    let Some(legacy_options) = &command.enum_options else {
        return;
    };
    if let StatKind::Enum {
        options: EnumOptions::Inline(options),
    } = &mut stat.kind
    {
        for legacy in legacy_options {
            if let Some(option) = options.iter_mut().find(|o| o.value == legacy.value) {
                option.name.set(locale, &legacy.name);
            }
        }
    }
}

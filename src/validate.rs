//! Schema validator.
//!
//! `validate` re-derives everything from a schema snapshot: it rebuilds the
//! formula dependency graph, runs cycle detection, and aggregates every
//! structural, referential and type finding into one flat report. It is a
//! pure, total function: it never panics, never stops at the first error,
//! and yields findings in a stable order (config, stats in index order,
//! sections in index order).

use crate::error::{ErrorKind, ValidationError};
use crate::graph::{formula_dependencies, has_cycle, DependencyGraph};
use crate::id::StatId;
use crate::replacement;
use crate::schema::{EnumOptions, Schema, StatKind, MAX_ENUM_OPTIONS};
use std::collections::HashMap;

/// Render a cycle path the way it reads in an error message.
fn format_cycle_path(path: &[StatId]) -> String {
    path.iter()
        .map(|id| format!("stat {id}"))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Validate a schema snapshot.
///
/// # Examples
///
/// ```rust
/// use sheetforge::{validate, Schema};
///
/// let schema: Schema = serde_json::from_str(
///     r#"{"config": {"id": "ca", "name": {"default": "Arcanum"}}, "stats": [], "sections": []}"#,
/// ).unwrap();
/// assert!(validate(&schema).is_empty());
///
/// let empty = Schema::default();
/// assert!(!validate(&empty).is_empty()); // config.id and config.name.default missing
/// ```
pub fn validate(schema: &Schema) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    check_config(schema, &mut errors);
    check_duplicate_stat_ids(schema, &mut errors);

    // One whole-graph pass so circular-dependency messages can name the
    // full path, not just the stat the error hangs on.
    let cycle_path = DependencyGraph::from_stats(&schema.stats).find_cycle();

    for (idx, stat) in schema.stats.iter().enumerate() {
        check_stat(schema, idx, cycle_path.as_deref(), &mut errors);
        errors.extend(replacement::check(stat, &schema.stats, &format!("stats[{idx}]")));
    }

    check_duplicate_section_ids(schema, &mut errors);
    for idx in 0..schema.sections.len() {
        check_section(schema, idx, &mut errors);
    }

    errors
}

fn check_config(schema: &Schema, errors: &mut Vec<ValidationError>) {
    if schema.config.id.is_empty() {
        errors.push(ValidationError::new(
            ErrorKind::Structural,
            "config.id",
            "schema id is missing",
        ));
    }
    match schema.config.name.default_text() {
        Some(name) if !name.is_empty() => {}
        _ => errors.push(ValidationError::new(
            ErrorKind::Structural,
            "config.name.default",
            "schema name has no default-locale text",
        )),
    }
}

fn check_duplicate_stat_ids(schema: &Schema, errors: &mut Vec<ValidationError>) {
    let mut positions: HashMap<StatId, Vec<usize>> = HashMap::new();
    for (idx, stat) in schema.stats.iter().enumerate() {
        positions.entry(stat.id).or_default().push(idx);
    }
    // One error per duplicated id, ordered by first occurrence.
    let mut duplicated: Vec<(usize, StatId, Vec<usize>)> = positions
        .into_iter()
        .filter(|(_, at)| at.len() > 1)
        .map(|(id, at)| (at[0], id, at))
        .collect();
    duplicated.sort_by_key(|(first, _, _)| *first);
    for (_, id, at) in duplicated {
        let indices = at
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        errors.push(ValidationError::new(
            ErrorKind::DuplicateId,
            "stats",
            format!("stat id {id} appears at indices {indices}"),
        ));
    }
}

fn check_stat(
    schema: &Schema,
    idx: usize,
    cycle_path: Option<&[StatId]>,
    errors: &mut Vec<ValidationError>,
) {
    let stat = &schema.stats[idx];
    let path = format!("stats[{idx}]");

    match stat.name.default_text() {
        Some(name) if !name.is_empty() => {}
        _ => errors.push(ValidationError::new(
            ErrorKind::Structural,
            format!("{path}.name.default"),
            "stat has no default-locale name",
        )),
    }

    match &stat.kind {
        StatKind::Numeric {
            min: Some(min),
            max: Some(max),
        } if min > max => {
            errors.push(ValidationError::new(
                ErrorKind::Range,
                path.clone(),
                format!("min ({min}) is greater than max ({max})"),
            ));
        }
        StatKind::Numeric { .. } | StatKind::Boolean | StatKind::String { .. } => {}

        StatKind::Enum {
            options: EnumOptions::Inline(options),
        } => {
            if options.len() > MAX_ENUM_OPTIONS {
                errors.push(ValidationError::new(
                    ErrorKind::OptionLimitExceeded,
                    format!("{path}.options"),
                    format!(
                        "enum has {} options, the limit is {MAX_ENUM_OPTIONS}",
                        options.len()
                    ),
                ));
            }
            let mut value_positions: HashMap<i64, Vec<usize>> = HashMap::new();
            for (opt_idx, option) in options.iter().enumerate() {
                value_positions.entry(option.value).or_default().push(opt_idx);
                match option.name.default_text() {
                    Some(name) if !name.is_empty() => {}
                    _ => errors.push(ValidationError::new(
                        ErrorKind::Structural,
                        format!("{path}.options[{opt_idx}].name.default"),
                        "enum option has no default-locale name",
                    )),
                }
            }
            let mut duplicated: Vec<(usize, i64, Vec<usize>)> = value_positions
                .into_iter()
                .filter(|(_, at)| at.len() > 1)
                .map(|(value, at)| (at[0], value, at))
                .collect();
            duplicated.sort_by_key(|(first, _, _)| *first);
            for (_, value, at) in duplicated {
                let indices = at
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                errors.push(ValidationError::new(
                    ErrorKind::DuplicateOptionValue,
                    format!("{path}.options"),
                    format!("option value {value} appears at indices {indices}"),
                ));
            }
        }

        StatKind::Enum {
            options: EnumOptions::Reference(other),
        } => match schema.stat(*other) {
            None => errors.push(ValidationError::new(
                ErrorKind::UnresolvedReference,
                format!("{path}.options"),
                format!("referenced enum stat {other} does not exist"),
            )),
            Some(target) if !matches!(target.kind, StatKind::Enum { .. }) => {
                errors.push(ValidationError::new(
                    ErrorKind::TypeMismatch,
                    format!("{path}.options"),
                    format!(
                        "stat {other} is a {} stat, not an enum",
                        target.kind.type_name()
                    ),
                ));
            }
            Some(_) => {}
        },

        StatKind::Calculated { formula } => {
            check_formula(schema, idx, formula, cycle_path, errors);
        }
    }
}

fn check_formula(
    schema: &Schema,
    idx: usize,
    formula: &str,
    cycle_path: Option<&[StatId]>,
    errors: &mut Vec<ValidationError>,
) {
    let stat = &schema.stats[idx];
    let path = format!("stats[{idx}].formula");

    if formula.trim().is_empty() {
        errors.push(ValidationError::new(
            ErrorKind::Structural,
            path.clone(),
            "calculated stat has an empty formula",
        ));
        return;
    }

    if has_cycle(stat.id, formula, &schema.stats) {
        let message = match cycle_path {
            Some(cycle) if cycle.contains(&stat.id) => {
                format!("circular dependency: {}", format_cycle_path(cycle))
            }
            _ => "formula depends on itself, directly or indirectly".to_string(),
        };
        errors.push(ValidationError::new(
            ErrorKind::CircularDependency,
            path.clone(),
            message,
        ));
    }

    for dep in formula_dependencies(formula) {
        match schema.stat(dep) {
            None => errors.push(ValidationError::new(
                ErrorKind::UnresolvedReference,
                path.clone(),
                format!("formula references stat {dep}, which does not exist"),
            )),
            Some(target) if matches!(target.kind, StatKind::String { .. }) => {
                errors.push(ValidationError::new(
                    ErrorKind::TypeMismatch,
                    path.clone(),
                    format!("formula references stat {dep}, which is a string stat"),
                ));
            }
            Some(_) => {}
        }
    }
}

fn check_duplicate_section_ids(schema: &Schema, errors: &mut Vec<ValidationError>) {
    let mut positions: HashMap<u32, Vec<usize>> = HashMap::new();
    for (idx, section) in schema.sections.iter().enumerate() {
        positions.entry(section.id.get()).or_default().push(idx);
    }
    let mut duplicated: Vec<(usize, u32, Vec<usize>)> = positions
        .into_iter()
        .filter(|(_, at)| at.len() > 1)
        .map(|(id, at)| (at[0], id, at))
        .collect();
    duplicated.sort_by_key(|(first, _, _)| *first);
    for (_, id, at) in duplicated {
        let indices = at
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        errors.push(ValidationError::new(
            ErrorKind::DuplicateId,
            "sections",
            format!("section id {id} appears at indices {indices}"),
        ));
    }
}

fn check_section(schema: &Schema, idx: usize, errors: &mut Vec<ValidationError>) {
    let section = &schema.sections[idx];
    let path = format!("sections[{idx}]");

    match section.name.default_text() {
        Some(name) if !name.is_empty() => {}
        _ => errors.push(ValidationError::new(
            ErrorKind::Structural,
            format!("{path}.name.default"),
            "section has no default-locale name",
        )),
    }

    if section.preview.content.default_text().is_none() {
        errors.push(ValidationError::new(
            ErrorKind::Structural,
            format!("{path}.preview.content.default"),
            "section preview has no default-locale content",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        Config, EnumOption, LocalizedText, PreviewType, Section, SectionPreview, Stat,
    };
    use crate::SectionId;

    fn base_schema() -> Schema {
        Schema {
            config: Config {
                id: "ca".to_string(),
                name: LocalizedText::from_default("Arcanum"),
            },
            stats: vec![],
            sections: vec![],
            integrations: None,
        }
    }

    fn stat(id: u32, kind: StatKind) -> Stat {
        Stat {
            id: StatId::new(id),
            name: LocalizedText::from_default(&format!("Stat {id}")),
            emoji: None,
            sections: vec![],
            kind,
            dices: vec![],
            replacements: vec![],
        }
    }

    fn option(value: i64, name: &str) -> EnumOption {
        EnumOption {
            value,
            name: LocalizedText::from_default(name),
            emoji: None,
        }
    }

    fn of_kind(errors: &[ValidationError], kind: ErrorKind) -> Vec<&ValidationError> {
        errors.iter().filter(|e| e.kind == kind).collect()
    }

    #[test]
    fn test_empty_schema_reports_config_errors() {
        let errors = validate(&Schema::default());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, "config.id");
        assert_eq!(errors[1].path, "config.name.default");
    }

    #[test]
    fn test_valid_schema_is_clean() {
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Numeric {
                min: Some(0),
                max: Some(20),
            },
        ));
        schema.stats.push(stat(
            2,
            StatKind::Calculated {
                formula: "<stat:1:value> * 2".to_string(),
            },
        ));
        assert!(validate(&schema).is_empty());
    }

    #[test]
    fn test_duplicate_stat_id_is_one_error_naming_both_indices() {
        let mut schema = base_schema();
        schema.stats.push(stat(4, StatKind::Boolean));
        schema.stats.push(stat(
            4,
            StatKind::Numeric {
                min: None,
                max: None,
            },
        ));

        let errors = validate(&schema);
        let dups = of_kind(&errors, ErrorKind::DuplicateId);
        assert_eq!(dups.len(), 1);
        assert!(dups[0].message.contains("0, 1"));
    }

    #[test]
    fn test_numeric_min_greater_than_max() {
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Numeric {
                min: Some(10),
                max: Some(5),
            },
        ));

        let errors = validate(&schema);
        let ranges = of_kind(&errors, ErrorKind::Range);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].path, "stats[0]");
    }

    #[test]
    fn test_numeric_single_bound_is_fine() {
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Numeric {
                min: Some(10),
                max: None,
            },
        ));
        assert!(validate(&schema).is_empty());
    }

    #[test]
    fn test_enum_option_limit() {
        let options: Vec<EnumOption> =
            (0..26).map(|i| option(i, &format!("Option {i}"))).collect();
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Enum {
                options: EnumOptions::Inline(options),
            },
        ));

        let errors = validate(&schema);
        assert_eq!(of_kind(&errors, ErrorKind::OptionLimitExceeded).len(), 1);
    }

    #[test]
    fn test_enum_duplicate_option_value() {
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Enum {
                options: EnumOptions::Inline(vec![
                    option(1, "Elf"),
                    option(2, "Dwarf"),
                    option(1, "Half-elf"),
                ]),
            },
        ));

        let errors = validate(&schema);
        let dups = of_kind(&errors, ErrorKind::DuplicateOptionValue);
        assert_eq!(dups.len(), 1);
        assert!(dups[0].message.contains("0, 2"));
    }

    #[test]
    fn test_enum_reference_to_missing_stat() {
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Enum {
                options: EnumOptions::Reference(StatId::new(9)),
            },
        ));

        let errors = validate(&schema);
        assert_eq!(of_kind(&errors, ErrorKind::UnresolvedReference).len(), 1);
    }

    #[test]
    fn test_enum_reference_to_non_enum() {
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Enum {
                options: EnumOptions::Reference(StatId::new(2)),
            },
        ));
        schema.stats.push(stat(2, StatKind::Boolean));

        let errors = validate(&schema);
        assert_eq!(of_kind(&errors, ErrorKind::TypeMismatch).len(), 1);
    }

    #[test]
    fn test_empty_formula() {
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Calculated {
                formula: "  ".to_string(),
            },
        ));

        let errors = validate(&schema);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Structural);
        assert_eq!(errors[0].path, "stats[0].formula");
    }

    #[test]
    fn test_formula_cycle_reported_with_path() {
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Calculated {
                formula: "<stat:2:value>".to_string(),
            },
        ));
        schema.stats.push(stat(
            2,
            StatKind::Calculated {
                formula: "<stat:1:value>".to_string(),
            },
        ));

        let errors = validate(&schema);
        let cycles = of_kind(&errors, ErrorKind::CircularDependency);
        // Both participants are flagged.
        assert_eq!(cycles.len(), 2);
        assert!(cycles[0].message.contains("stat 1"));
        assert!(cycles[0].message.contains("stat 2"));
    }

    #[test]
    fn test_formula_reference_to_missing_and_string_stat() {
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Calculated {
                formula: "<stat:2:value> + <stat:99:value>".to_string(),
            },
        ));
        schema.stats.push(stat(
            2,
            StatKind::String {
                min_length: None,
                max_length: None,
            },
        ));

        let errors = validate(&schema);
        assert_eq!(of_kind(&errors, ErrorKind::TypeMismatch).len(), 1);
        assert_eq!(of_kind(&errors, ErrorKind::UnresolvedReference).len(), 1);
    }

    #[test]
    fn test_all_errors_reported_in_one_pass() {
        // Range error, duplicate id, and a missing name in one schema.
        let mut schema = base_schema();
        schema.stats.push(stat(
            1,
            StatKind::Numeric {
                min: Some(10),
                max: Some(5),
            },
        ));
        let mut unnamed = stat(1, StatKind::Boolean);
        unnamed.name = LocalizedText::new();
        schema.stats.push(unnamed);

        let errors = validate(&schema);
        assert_eq!(of_kind(&errors, ErrorKind::DuplicateId).len(), 1);
        assert_eq!(of_kind(&errors, ErrorKind::Range).len(), 1);
        assert_eq!(of_kind(&errors, ErrorKind::Structural).len(), 1);
    }

    #[test]
    fn test_section_checks() {
        let mut schema = base_schema();
        schema.sections.push(Section {
            id: SectionId::new(1),
            name: LocalizedText::new(),
            emoji: None,
            preview: SectionPreview {
                kind: PreviewType::String,
                content: LocalizedText::new(),
            },
            view_pages: vec![],
        });
        schema.sections.push(Section {
            id: SectionId::new(1),
            name: LocalizedText::from_default("Combat"),
            emoji: None,
            preview: SectionPreview {
                kind: PreviewType::String,
                content: LocalizedText::from_default("<stat:1:name>"),
            },
            view_pages: vec![],
        });

        let errors = validate(&schema);
        assert_eq!(of_kind(&errors, ErrorKind::DuplicateId).len(), 1);
        // Missing section name and missing preview content.
        assert_eq!(of_kind(&errors, ErrorKind::Structural).len(), 2);
    }

    #[test]
    fn test_validation_order_is_stable() {
        let mut schema = Schema::default();
        schema.stats.push(stat(
            1,
            StatKind::Numeric {
                min: Some(2),
                max: Some(1),
            },
        ));
        let first = validate(&schema);
        let second = validate(&schema);
        assert_eq!(first, second);
    }
}

//! Replacement consistency checking.
//!
//! A replacement rule lets one stat stand in for another when a dice
//! expression is rolled. The configuration surface has to stay consistent
//! with what a roll can actually consume: only stats that a dice list
//! really references may be replacement keys, and only value-bearing
//! (non-string) stats may be offered as options.

use crate::error::{ErrorKind, ValidationError};
use crate::id::StatId;
use crate::schema::{Dice, Stat, StatKind};
use crate::token::{Lexer, StatProperty, Token};
use std::collections::HashSet;

/// The stat ids a dice list actually reads.
///
/// Scans every expression and both condition operands for
/// `<stat:ID:value>` tokens. Each id is returned at most once, in
/// first-occurrence order.
///
/// # Examples
///
/// ```rust
/// use sheetforge::replacement::dice_usage;
/// use sheetforge::{Dice, StatId};
///
/// let dices = vec![Dice {
///     expression: "1d20 + <stat:3:value>".to_string(),
///     condition: None,
/// }];
/// assert_eq!(dice_usage(&dices), vec![StatId::new(3)]);
/// ```
pub fn dice_usage(dices: &[Dice]) -> Vec<StatId> {
    let mut seen = HashSet::new();
    let mut used = Vec::new();
    let mut scan = |text: &str| {
        for (token, _) in Lexer::new(text) {
            if let Token::StatRef {
                id,
                property: StatProperty::Value,
            } = token
            {
                if seen.insert(id) {
                    used.push(id);
                }
            }
        }
    };
    for dice in dices {
        scan(&dice.expression);
        if let Some(condition) = &dice.condition {
            scan(&condition.value1);
            scan(&condition.value2);
        }
    }
    used
}

/// The stat ids a given stat may configure as replacement keys.
///
/// Exactly the usage set of its dice list: replacing a stat no roll reads
/// would be dead configuration.
pub fn key_candidates(stat: &Stat) -> Vec<StatId> {
    dice_usage(&stat.dices)
}

/// The stats that may be offered as replacement options.
///
/// Every stat whose value can feed a roll, which excludes string stats.
pub fn option_candidates(stats: &[Stat]) -> Vec<StatId> {
    stats
        .iter()
        .filter(|s| !matches!(s.kind, StatKind::String { .. }))
        .map(|s| s.id)
        .collect()
}

/// Validate one stat's replacement rules against its dice usage.
///
/// `path` is the error-path prefix of the stat, e.g. `stats[2]`. Findings
/// are appended in rule order; the check never short-circuits.
pub fn check(stat: &Stat, all_stats: &[Stat], path: &str) -> Vec<ValidationError> {
    let usage: HashSet<StatId> = dice_usage(&stat.dices).into_iter().collect();
    let mut errors = Vec::new();

    for (idx, replacement) in stat.replacements.iter().enumerate() {
        let rule_path = format!("{path}.replacements[{idx}]");

        if !usage.contains(&replacement.key) {
            errors.push(ValidationError::new(
                ErrorKind::UnresolvedReference,
                format!("{rule_path}.key"),
                format!(
                    "stat {} is not referenced by any dice expression of this stat",
                    replacement.key
                ),
            ));
        }

        for (opt_idx, option) in replacement.options.iter().enumerate() {
            let option_path = format!("{rule_path}.options[{opt_idx}]");
            match all_stats.iter().find(|s| s.id == *option) {
                None => errors.push(ValidationError::new(
                    ErrorKind::UnresolvedReference,
                    option_path,
                    format!("stat {option} does not exist"),
                )),
                Some(target) if matches!(target.kind, StatKind::String { .. }) => {
                    errors.push(ValidationError::new(
                        ErrorKind::TypeMismatch,
                        option_path,
                        format!("stat {option} is a string stat and cannot feed a roll"),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    errors
}

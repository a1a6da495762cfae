//! Template resolver.
//!
//! Turns token-bearing text into a display string by substituting every
//! token with a representative value against the current schema. Resolution
//! is a single left-to-right pass over the lexer's segments and is total:
//! an unknown id, a dangling enum reference or a collaborator failure
//! degrades to a bracketed diagnostic inside the output, never an error.
//!
//! Arithmetic evaluation and dice rolling are external collaborators behind
//! the [`ExpressionEvaluator`] and [`DiceRoller`] traits. The resolver only
//! prepares their input: nested `<stat:ID:value>` tokens inside `math`/`dice`
//! payloads are substituted with numeric samples before the whole payload is
//! delegated.

use crate::error::{EvalError, RollError};
use crate::id::{SectionId, StatId};
use crate::schema::{Schema, StatKind, DEFAULT_LOCALE};
use crate::token::{segments, SectionProperty, Segment, StatProperty, Token};

/// Successful result of the external dice roller.
#[derive(Debug, Clone, PartialEq)]
pub struct RollOutput {
    /// Human-readable roll summary, e.g. `"1d20 + 3 = [14] + 3 = 17"`.
    pub output: String,
}

/// External arithmetic evaluator collaborator.
///
/// Receives an expression whose stat references have already been replaced
/// by numeric literals. The engine never evaluates math itself.
///
/// Implemented for plain closures, which is the common way to plug an
/// evaluator in:
///
/// ```rust
/// use sheetforge::resolve::ExpressionEvaluator;
/// use sheetforge::EvalError;
///
/// let eval = |expr: &str| {
///     expr.trim().parse::<f64>().map_err(|e| EvalError::new(e.to_string()))
/// };
/// assert_eq!(eval.evaluate("42"), Ok(42.0));
/// ```
pub trait ExpressionEvaluator {
    fn evaluate(&self, expr: &str) -> Result<f64, EvalError>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str) -> Result<f64, EvalError>,
{
    fn evaluate(&self, expr: &str) -> Result<f64, EvalError> {
        self(expr)
    }
}

/// External dice roller collaborator.
///
/// Receives a dice expression with numeric substitutions already applied
/// and produces a textual roll summary. Implemented for plain closures.
pub trait DiceRoller {
    fn roll(&self, expr: &str) -> Result<RollOutput, RollError>;
}

impl<F> DiceRoller for F
where
    F: Fn(&str) -> Result<RollOutput, RollError>,
{
    fn roll(&self, expr: &str) -> Result<RollOutput, RollError> {
        self(expr)
    }
}

/// Resolves tokens in free text against a schema snapshot.
///
/// # Examples
///
/// ```rust
/// use sheetforge::resolve::{RollOutput, TemplateResolver};
/// use sheetforge::{EvalError, RollError, Schema};
///
/// let schema: Schema = serde_json::from_str(r#"{
///     "config": {"id": "ca", "name": {"default": "Arcanum"}},
///     "stats": [{"id": 1, "name": {"default": "Strength"}, "type": "numeric", "min": 3}],
///     "sections": []
/// }"#).unwrap();
///
/// let eval = |expr: &str| -> Result<f64, EvalError> {
///     Ok(5.0) // stands in for a real evaluator
/// };
/// let roll = |_: &str| -> Result<RollOutput, RollError> {
///     Err(RollError::new("no roller"))
/// };
///
/// let resolver = TemplateResolver::new(&schema, &eval, &roll);
/// assert_eq!(resolver.resolve("<stat:1:name>: <stat:1:value>"), "Strength: 3");
/// assert_eq!(resolver.resolve("<math:<stat:1:value> + 2>"), "5");
/// ```
pub struct TemplateResolver<'a, E, R> {
    schema: &'a Schema,
    evaluator: &'a E,
    roller: &'a R,
    locale: &'a str,
}

impl<'a, E, R> TemplateResolver<'a, E, R>
where
    E: ExpressionEvaluator,
    R: DiceRoller,
{
    /// Create a resolver rendering in the default locale.
    pub fn new(schema: &'a Schema, evaluator: &'a E, roller: &'a R) -> Self {
        Self {
            schema,
            evaluator,
            roller,
            locale: DEFAULT_LOCALE,
        }
    }

    /// Render in a specific locale, falling back to the default locale.
    pub fn with_locale(mut self, locale: &'a str) -> Self {
        self.locale = locale;
        self
    }

    /// Resolve every token in `text`, leaving literal runs untouched.
    pub fn resolve(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for segment in segments(text) {
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Token { token, .. } => out.push_str(&self.resolve_token(&token)),
            }
        }
        out
    }

    fn resolve_token(&self, token: &Token) -> String {
        match token {
            Token::StatRef { id, property } => self.resolve_stat(*id, *property),
            Token::SectionRef { id, property } => self.resolve_section(*id, *property),
            Token::MathExpr { raw } => self.resolve_math(raw),
            Token::DiceExpr { raw } => self.resolve_dice(raw),
        }
    }

    fn resolve_stat(&self, id: StatId, property: StatProperty) -> String {
        let Some(stat) = self.schema.stat(id) else {
            return format!("[stat {id} not found]");
        };
        match property {
            StatProperty::Name => stat
                .name
                .get(self.locale)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Stat {id}")),
            StatProperty::Emoji => stat.emoji.clone().unwrap_or_default(),
            StatProperty::Value => match &stat.kind {
                StatKind::Numeric { min, .. } => min.unwrap_or(0).to_string(),
                StatKind::Boolean => "false".to_string(),
                StatKind::Enum { .. } => match self
                    .schema
                    .enum_options(id)
                    .and_then(|options| options.first())
                {
                    Some(option) => option
                        .name
                        .get(self.locale)
                        .map(str::to_string)
                        .unwrap_or_else(|| option.value.to_string()),
                    None => format!("[stat {id} options not found]"),
                },
                // Never expanded recursively during preview.
                StatKind::Calculated { .. } => "(calculated)".to_string(),
                StatKind::String { .. } => format!("[stat {id} has no sample value]"),
            },
        }
    }

    fn resolve_section(&self, id: SectionId, property: SectionProperty) -> String {
        let Some(section) = self.schema.section(id) else {
            return format!("[section {id} not found]");
        };
        match property {
            SectionProperty::Name => section
                .name
                .get(self.locale)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Section {id}")),
            SectionProperty::Emoji => section.emoji.clone().unwrap_or_default(),
        }
    }

    fn resolve_math(&self, raw: &str) -> String {
        let substituted = self.substitute_numeric(raw);
        match self.evaluator.evaluate(&substituted) {
            Ok(value) => format_number(value),
            Err(err) => format!("[math error: {err}]"),
        }
    }

    fn resolve_dice(&self, raw: &str) -> String {
        let substituted = self.substitute_numeric(raw);
        match self.roller.roll(&substituted) {
            Ok(roll) => roll.output,
            Err(err) => format!("[dice error: {err}]"),
        }
    }

    /// Replace every nested `<stat:ID:value>` token with a numeric sample,
    /// leaving everything else as source text. The result is what gets
    /// handed to the evaluator or roller.
    fn substitute_numeric(&self, payload: &str) -> String {
        let mut out = String::with_capacity(payload.len());
        for segment in segments(payload) {
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Token {
                    token:
                        Token::StatRef {
                            id,
                            property: StatProperty::Value,
                        },
                    ..
                } => out.push_str(&self.numeric_sample(id)),
                Segment::Token { span, .. } => out.push_str(&payload[span.start..span.end]),
            }
        }
        out
    }

    /// The deterministic sample of a stat's value in arithmetic position.
    fn numeric_sample(&self, id: StatId) -> String {
        let Some(stat) = self.schema.stat(id) else {
            return format!("[stat {id} not found]");
        };
        match &stat.kind {
            StatKind::Numeric { min, .. } => min.unwrap_or(0).to_string(),
            StatKind::Boolean => "0".to_string(),
            StatKind::Enum { .. } => match self
                .schema
                .enum_options(id)
                .and_then(|options| options.first())
            {
                Some(option) => option.value.to_string(),
                None => format!("[stat {id} options not found]"),
            },
            // Placeholder; previews never evaluate calculated stats.
            StatKind::Calculated { .. } => "0".to_string(),
            StatKind::String { .. } => format!("[stat {id} has no sample value]"),
        }
    }
}

/// Render an evaluator result without a trailing `.0` for whole numbers.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

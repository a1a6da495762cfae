//! # sheetforge - Character-Sheet Schema Engine
//!
//! An expression/reference engine for declarative tabletop-RPG character
//! sheets. A schema describes typed stats and layout sections; free text,
//! formulas and dice expressions cross-reference them through a small token
//! grammar:
//!
//! ```text
//! <stat:ID:name|value|emoji>   <section:ID:name|emoji>
//! <math:EXPR>                  <dice:EXPR>
//! ```
//!
//! ## Core Components
//!
//! - **Token lexer**: extracts tokens and literal runs from free text;
//!   malformed tokens are literal text, never errors
//! - **Dependency graph**: maps each calculated stat to the stats its
//!   formula reads, via `<stat:ID:value>` references
//! - **Cycle detector**: rejects self-referential schemas, including
//!   proposed formula edits before they are committed
//! - **Validator**: one pure pass over a schema snapshot, aggregating every
//!   structural, referential and type finding
//! - **Template resolver**: substitutes tokens with deterministic sample
//!   values for preview, delegating `math`/`dice` payloads to external
//!   collaborators
//! - **Replacement checker**: keeps dice substitution rules consistent with
//!   what the dice expressions actually reference
//!
//! Arithmetic evaluation and dice rolling are *not* implemented here; they
//! sit behind the [`ExpressionEvaluator`] and [`DiceRoller`] traits.
//!
//! ## Example
//!
//! ```rust
//! use sheetforge::{validate, Schema, StatId};
//!
//! let schema: Schema = serde_json::from_str(r#"{
//!     "config": {"id": "arcanum", "name": {"default": "Chronicles of Arcanum"}},
//!     "stats": [
//!         {"id": 1, "name": {"default": "Strength"}, "type": "numeric", "min": 3, "max": 18},
//!         {"id": 2, "name": {"default": "Attack"}, "type": "calculated",
//!          "formula": "<stat:1:value> * 2"}
//!     ],
//!     "sections": []
//! }"#).unwrap();
//!
//! assert!(validate(&schema).is_empty());
//! assert_eq!(
//!     sheetforge::graph::formula_dependencies("<stat:1:value> * 2"),
//!     vec![StatId::new(1)]
//! );
//! ```
//!
//! ## Modules
//!
//! - [`id`] - Stat and section identifier types
//! - [`schema`] - The schema data model and its JSON document shape
//! - [`token`] - Token lexer with explicit span tracking
//! - [`graph`] - Formula dependency extraction and cycle detection
//! - [`validate`] - The aggregating schema validator
//! - [`resolve`] - Template resolver and collaborator traits
//! - [`replacement`] - Dice replacement consistency checking
//! - [`legacy`] - One-shot importer for the older per-locale format
//! - [`error`] - Error types

pub mod error;
pub mod graph;
pub mod id;
pub mod legacy;
pub mod replacement;
pub mod resolve;
pub mod schema;
pub mod token;
pub mod validate;

// Re-export main types for convenience
pub use error::{ErrorKind, EvalError, FormulaEditError, RollError, ValidationError};
pub use id::{SectionId, StatId};
pub use resolve::{DiceRoller, ExpressionEvaluator, RollOutput, TemplateResolver};
pub use schema::{
    CompareOp, Config, Dice, DiceCondition, EnumOption, EnumOptions, LocalizedText, PreviewType,
    Replacement, Schema, Section, SectionPreview, Stat, StatKind,
};
pub use validate::validate;

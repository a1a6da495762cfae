//! Token lexer.
//!
//! Free-text fields (formulas, dice expressions, previews) embed references
//! as delimited tokens: `<stat:3:value>`, `<section:1:name>`, `<math:…>`,
//! `<dice:…>`. The lexer turns a text into a left-to-right sequence of
//! `(Token, Span)` pairs with explicit byte spans, so callers can also
//! recover the literal runs between tokens. It is pure, restartable, and
//! never fails: anything malformed or unterminated is literal text.
//!
//! The lexer is shared by the dependency graph builder (which only looks at
//! `stat:*:value` references) and by the template resolver (which
//! substitutes every token kind).

use crate::id::{SectionId, StatId};

/// The property selected by a stat reference token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatProperty {
    Name,
    Value,
    Emoji,
}

impl StatProperty {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "value" => Some(Self::Value),
            "emoji" => Some(Self::Emoji),
            _ => None,
        }
    }
}

/// The property selected by a section reference token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionProperty {
    Name,
    Emoji,
}

impl SectionProperty {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "emoji" => Some(Self::Emoji),
            _ => None,
        }
    }
}

/// A parsed reference token.
///
/// `math` and `dice` payloads are opaque at this level: they may contain
/// nested stat references, but the outer lexer treats the body as a raw run
/// of characters up to the closing `>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `<stat:ID:name|value|emoji>`
    StatRef { id: StatId, property: StatProperty },

    /// `<section:ID:name|emoji>`
    SectionRef {
        id: SectionId,
        property: SectionProperty,
    },

    /// `<math:EXPR>` — any chars except `>`.
    MathExpr { raw: String },

    /// `<dice:EXPR>` — any chars except `>`.
    DiceExpr { raw: String },
}

/// A half-open byte range `[start, end)` into the source text, spanning a
/// whole token including its delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Iterator over the tokens of a text.
///
/// # Examples
///
/// ```rust
/// use sheetforge::token::{Lexer, StatProperty, Token};
/// use sheetforge::StatId;
///
/// let mut lexer = Lexer::new("STR is <stat:1:value>!");
/// let (token, span) = lexer.next().unwrap();
/// assert_eq!(
///     token,
///     Token::StatRef { id: StatId::new(1), property: StatProperty::Value }
/// );
/// assert_eq!(&"STR is <stat:1:value>!"[span.start..span.end], "<stat:1:value>");
/// assert!(lexer.next().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `text`, positioned at the start.
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl Iterator for Lexer<'_> {
    type Item = (Token, Span);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let rel = self.text[self.pos..].find('<')?;
            let start = self.pos + rel;
            match parse_token_at(self.text, start) {
                Some((token, end)) => {
                    self.pos = end;
                    return Some((token, Span { start, end }));
                }
                None => {
                    // Not a token; the '<' is literal text. Resume one byte
                    // later so an overlapping token can still be found.
                    self.pos = start + 1;
                }
            }
        }
        None
    }
}

/// Try to parse one token whose `<` sits at byte offset `start`.
/// Returns the token and the byte offset just past the closing `>`.
fn parse_token_at(text: &str, start: usize) -> Option<(Token, usize)> {
    let rest = &text[start + 1..];
    if let Some(body) = rest.strip_prefix("stat:") {
        let (id, property, len) = parse_reference(body)?;
        let property = StatProperty::parse(property)?;
        return Some((
            Token::StatRef {
                id: StatId::new(id),
                property,
            },
            start + 1 + "stat:".len() + len,
        ));
    }
    if let Some(body) = rest.strip_prefix("section:") {
        let (id, property, len) = parse_reference(body)?;
        let property = SectionProperty::parse(property)?;
        return Some((
            Token::SectionRef {
                id: SectionId::new(id),
                property,
            },
            start + 1 + "section:".len() + len,
        ));
    }
    if let Some(body) = rest.strip_prefix("math:") {
        let (raw, len) = parse_opaque(body)?;
        return Some((
            Token::MathExpr {
                raw: raw.to_string(),
            },
            start + 1 + "math:".len() + len,
        ));
    }
    if let Some(body) = rest.strip_prefix("dice:") {
        let (raw, len) = parse_opaque(body)?;
        return Some((
            Token::DiceExpr {
                raw: raw.to_string(),
            },
            start + 1 + "dice:".len() + len,
        ));
    }
    None
}

/// Parse `ID:PROPERTY>` from the start of `body`. Returns the id, the
/// property text, and the number of bytes consumed (including the `>`).
fn parse_reference(body: &str) -> Option<(u32, &str, usize)> {
    let colon = body.find(':')?;
    let close = body.find('>')?;
    if close < colon {
        return None;
    }
    let id: u32 = body[..colon].parse().ok()?;
    let property = &body[colon + 1..close];
    Some((id, property, close + 1))
}

/// Parse `EXPR>` from the start of `body`.
///
/// The payload is opaque except that complete nested tokens may appear
/// inside it: `<math:<stat:1:value> + 2>` closes at the final `>`. Angle
/// brackets are matched by depth; an unmatched `<` leaves the whole token
/// unterminated, hence literal.
fn parse_opaque(body: &str) -> Option<(&str, usize)> {
    let mut depth = 0usize;
    for (i, b) in body.bytes().enumerate() {
        match b {
            b'<' => depth += 1,
            b'>' if depth == 0 => return Some((&body[..i], i + 1)),
            b'>' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// One piece of a text: either a literal run or a token.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Token { token: Token, span: Span },
}

/// Iterator over literal runs and tokens, covering the input exactly.
///
/// Concatenating every literal together with the source slice of every token
/// span reproduces the original text byte for byte.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    lexer: Lexer<'a>,
    cursor: usize,
    pending: Option<(Token, Span)>,
    done: bool,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((token, span)) = self.pending.take() {
            self.cursor = span.end;
            return Some(Segment::Token { token, span });
        }
        if self.done {
            return None;
        }
        match self.lexer.next() {
            Some((token, span)) => {
                if span.start > self.cursor {
                    let literal = &self.text[self.cursor..span.start];
                    self.pending = Some((token, span));
                    Some(Segment::Literal(literal))
                } else {
                    self.cursor = span.end;
                    Some(Segment::Token { token, span })
                }
            }
            None => {
                self.done = true;
                if self.cursor < self.text.len() {
                    Some(Segment::Literal(&self.text[self.cursor..]))
                } else {
                    None
                }
            }
        }
    }
}

/// Split a text into literal runs and tokens.
///
/// # Examples
///
/// ```rust
/// use sheetforge::token::{segments, Segment};
///
/// let pieces: Vec<_> = segments("roll <dice:1d20> now").collect();
/// assert_eq!(pieces.len(), 3);
/// assert_eq!(pieces[0], Segment::Literal("roll "));
/// assert_eq!(pieces[2], Segment::Literal(" now"));
/// ```
pub fn segments(text: &str) -> Segments<'_> {
    Segments {
        text,
        lexer: Lexer::new(text),
        cursor: 0,
        pending: None,
        done: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(text: &str) -> Vec<Token> {
        Lexer::new(text).map(|(t, _)| t).collect()
    }

    #[test]
    fn test_stat_reference_tokens() {
        let tokens = all_tokens("<stat:1:name> <stat:2:value> <stat:3:emoji>");
        assert_eq!(
            tokens,
            vec![
                Token::StatRef {
                    id: StatId::new(1),
                    property: StatProperty::Name
                },
                Token::StatRef {
                    id: StatId::new(2),
                    property: StatProperty::Value
                },
                Token::StatRef {
                    id: StatId::new(3),
                    property: StatProperty::Emoji
                },
            ]
        );
    }

    #[test]
    fn test_section_reference_tokens() {
        let tokens = all_tokens("<section:4:name><section:4:emoji>");
        assert_eq!(
            tokens,
            vec![
                Token::SectionRef {
                    id: SectionId::new(4),
                    property: SectionProperty::Name
                },
                Token::SectionRef {
                    id: SectionId::new(4),
                    property: SectionProperty::Emoji
                },
            ]
        );
    }

    #[test]
    fn test_section_has_no_value_property() {
        assert!(all_tokens("<section:4:value>").is_empty());
    }

    #[test]
    fn test_math_and_dice_payloads_are_opaque() {
        let tokens = all_tokens("<math:1 + 2 * 3> and <dice:2d6 + 1>");
        assert_eq!(
            tokens,
            vec![
                Token::MathExpr {
                    raw: "1 + 2 * 3".to_string()
                },
                Token::DiceExpr {
                    raw: "2d6 + 1".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_malformed_tokens_are_literal() {
        assert!(all_tokens("<stat:abc:value>").is_empty());
        assert!(all_tokens("<stat:1:unknown>").is_empty());
        assert!(all_tokens("<stat:1:value").is_empty()); // unterminated
        assert!(all_tokens("< stat:1:value>").is_empty());
        assert!(all_tokens("1 < 2 and 3 > 2").is_empty());
    }

    #[test]
    fn test_literal_angle_before_real_token() {
        // The stray '<' must not swallow the following token.
        let tokens = all_tokens("a < b <stat:1:value>");
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_spans_are_non_overlapping_and_ordered() {
        let text = "x<stat:1:value>y<dice:1d4>z";
        let spans: Vec<Span> = Lexer::new(text).map(|(_, s)| s).collect();
        assert_eq!(spans.len(), 2);
        assert!(spans[0].end <= spans[1].start);
        assert_eq!(&text[spans[0].start..spans[0].end], "<stat:1:value>");
        assert_eq!(&text[spans[1].start..spans[1].end], "<dice:1d4>");
    }

    #[test]
    fn test_lexer_is_restartable() {
        let text = "<stat:1:value>";
        let first: Vec<_> = Lexer::new(text).collect();
        let second: Vec<_> = Lexer::new(text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_segments_reconstruct_input() {
        let text = "STR <stat:1:value>, roll <dice:1d20 + <stat:1:value>> done";
        let mut rebuilt = String::new();
        for segment in segments(text) {
            match segment {
                Segment::Literal(lit) => rebuilt.push_str(lit),
                Segment::Token { span, .. } => rebuilt.push_str(&text[span.start..span.end]),
            }
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_segments_of_plain_text() {
        let pieces: Vec<_> = segments("no tokens here").collect();
        assert_eq!(pieces, vec![Segment::Literal("no tokens here")]);
    }

    #[test]
    fn test_empty_opaque_payload() {
        let tokens = all_tokens("<math:>");
        assert_eq!(
            tokens,
            vec![Token::MathExpr {
                raw: String::new()
            }]
        );
    }

    #[test]
    fn test_nested_token_inside_math_payload() {
        let tokens = all_tokens("<math:<stat:1:value> + 2>");
        assert_eq!(
            tokens,
            vec![Token::MathExpr {
                raw: "<stat:1:value> + 2".to_string()
            }]
        );
    }

    #[test]
    fn test_unmatched_angle_in_payload_is_literal() {
        // The lone '<' never finds its '>', so no token is produced.
        assert!(all_tokens("<math:1 < 2>").is_empty());
    }

    #[test]
    fn test_unicode_literals_around_tokens() {
        let text = "força 💪 <stat:1:value> ✓";
        let pieces: Vec<_> = segments(text).collect();
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], Segment::Literal("força 💪 "));
    }
}

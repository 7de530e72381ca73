//! Program text
//!
//! A program is a whitespace-separated list of words. Integers push
//! fixnums, `t` pushes boolean true, `f` pushes the false/empty value, and
//! anything else must name a primitive.

use cellvm_core::{Cell, Context, Primitive, StackResult, UnknownPrimitive};

/// One executable word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    Literal(Cell),
    Primitive(Primitive),
}

impl Word {
    pub fn execute(self, ctx: &mut Context) -> StackResult<()> {
        match self {
            Word::Literal(cell) => ctx.push(cell),
            Word::Primitive(prim) => prim.execute(ctx),
        }
    }
}

/// Error parsing program text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Unknown(UnknownPrimitive),
    /// An integer outside the fixnum range
    OutOfRange(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Unknown(e) => write!(f, "{}", e),
            ParseError::OutOfRange(word) => write!(f, "integer '{}' does not fit in a fixnum", word),
        }
    }
}

impl std::error::Error for ParseError {}

fn parse_word(word: &str) -> Result<Word, ParseError> {
    match word {
        "t" => return Ok(Word::Literal(Cell::boolean(true))),
        "f" => return Ok(Word::Literal(Cell::f())),
        _ => {}
    }
    let digits = word.strip_prefix(['-', '+']).unwrap_or(word);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return word
            .parse::<i64>()
            .ok()
            .and_then(Cell::try_fixnum)
            .map(Word::Literal)
            .ok_or_else(|| ParseError::OutOfRange(word.to_string()));
    }
    word.parse::<Primitive>()
        .map(Word::Primitive)
        .map_err(ParseError::Unknown)
}

/// Parse every word of every source fragment, in order
pub fn parse<'a>(sources: impl IntoIterator<Item = &'a str>) -> Result<Vec<Word>, ParseError> {
    sources
        .into_iter()
        .flat_map(str::split_whitespace)
        .map(parse_word)
        .collect()
}

/// Run words in order, recovering and returning on the first fault
pub fn run(ctx: &mut Context, words: &[Word]) -> StackResult<()> {
    for (index, word) in words.iter().enumerate() {
        tracing::trace!(index, ?word, "execute");
        if let Err(fault) = word.execute(ctx) {
            ctx.recover(&fault);
            return Err(fault);
        }
    }
    Ok(())
}

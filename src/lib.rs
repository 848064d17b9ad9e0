//! A declarative pattern language for describing the on-disk layout of
//! binary files.
//!
//! A schema names regions of a byte source with built-in scalar types,
//! structs, unions, enums, bitfields, arrays, pointers, and conditional
//! members. Applying the schema yields a tree of [`Pattern`] nodes — named,
//! offset-bearing regions labeled by type and endianness — that a hex
//! viewer can color and label.
//!
//! ```
//! use bytepat::{Engine, PatternValue, SliceByteSource};
//!
//! let data = [0xDE, 0xAD, 0xBE, 0xEF];
//! let source = SliceByteSource::new(&data);
//! let patterns = Engine::new().run("u32 magic @ 0x00;", &source).unwrap();
//!
//! assert_eq!(patterns[0].name, "magic");
//! assert_eq!(patterns[0].size, 4);
//! assert_eq!(patterns[0].value, PatternValue::Unsigned(0xEFBEADDE));
//! ```

pub mod error;
pub mod eval;
pub mod lexer;
pub mod name;
pub mod parser;

pub use error::{Error, EvaluateError, LexerError, ParseError};
pub use eval::byte_source::{ByteSource, SliceByteSource};
pub use eval::functions::{Arity, FnContext, FIND_SEQUENCE_NOT_FOUND};
pub use eval::pattern::{Pattern, PatternValue};
pub use eval::{promote, Evaluator};
pub use lexer::token::{Literal, Token, TokenKind, ValueType};
pub use lexer::Lexer;
pub use name::{Name, StringInterner};
pub use parser::ast::{Endianness, Stmt};
pub use parser::Parser;

/// Ties the three stages together: one call lexes, parses, and evaluates a
/// schema against a byte source.
pub struct Engine {
    default_endian: Endianness,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            default_endian: Endianness::Little,
        }
    }

    pub fn with_default_endian(default_endian: Endianness) -> Self {
        Self { default_endian }
    }

    /// Lex and parse a schema. The returned interner resolves the identifier
    /// handles embedded in the AST.
    pub fn parse(&self, source: &str) -> Result<(Vec<Stmt>, StringInterner), Error> {
        let mut interner = StringInterner::new();
        let tokens = Lexer::new(source, &mut interner).tokenize()?;
        let ast = Parser::new(&tokens, &mut interner).parse()?;
        Ok((ast, interner))
    }

    /// Apply a schema to a byte source, producing the pattern tree or the
    /// first error.
    pub fn run(&self, source: &str, data: &dyn ByteSource) -> Result<Vec<Pattern>, Error> {
        let (ast, interner) = self.parse(source)?;
        let mut evaluator = Evaluator::with_interner(data, self.default_endian, interner);
        Ok(evaluator.evaluate(&ast)?)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

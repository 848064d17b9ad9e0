// Hand-written lexer for the pattern language.

pub mod token;

use crate::error::LexerError;
use crate::name::StringInterner;
use token::{Keyword, Literal, Operator, Separator, Token, TokenKind, ValueType};

/// Converts source text into a token sequence terminated by an
/// end-of-program separator. Stateless between invocations; the first
/// invalid construct aborts the pass with a line-numbered error.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    interner: &'a mut StringInterner,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, interner: &'a mut StringInterner) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            interner,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            if self.pos >= self.bytes.len() || self.bytes[self.pos] == 0x00 {
                break;
            }
            tokens.push(self.next_token()?);
        }

        tokens.push(Token::new(
            TokenKind::Separator(Separator::EndOfProgram),
            self.line,
        ));
        Ok(tokens)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            if self.bytes[self.pos] == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    fn peek_two(&self) -> Option<&str> {
        self.source.get(self.pos..self.pos + 2)
    }

    fn next_token(&mut self) -> Result<Token, LexerError> {
        let line = self.line;
        let b = self.bytes[self.pos];

        // Two-character operators and separators take priority over their
        // one-character prefixes.
        if let Some(pair) = self.peek_two() {
            let kind = match pair {
                "==" => Some(TokenKind::Operator(Operator::BoolEquals)),
                "!=" => Some(TokenKind::Operator(Operator::BoolNotEquals)),
                ">=" => Some(TokenKind::Operator(Operator::BoolGreaterThanOrEquals)),
                "<=" => Some(TokenKind::Operator(Operator::BoolLessThanOrEquals)),
                "&&" => Some(TokenKind::Operator(Operator::BoolAnd)),
                "||" => Some(TokenKind::Operator(Operator::BoolOr)),
                "^^" => Some(TokenKind::Operator(Operator::BoolXor)),
                "<<" => Some(TokenKind::Operator(Operator::ShiftLeft)),
                ">>" => Some(TokenKind::Operator(Operator::ShiftRight)),
                "::" => Some(TokenKind::Separator(Separator::ScopeResolution)),
                _ => None,
            };
            if let Some(kind) = kind {
                self.pos += 2;
                return Ok(Token::new(kind, line));
            }
        }

        let single = match b {
            b';' => Some(TokenKind::Separator(Separator::EndOfExpression)),
            b'(' => Some(TokenKind::Separator(Separator::RoundBracketOpen)),
            b')' => Some(TokenKind::Separator(Separator::RoundBracketClose)),
            b'{' => Some(TokenKind::Separator(Separator::CurlyBracketOpen)),
            b'}' => Some(TokenKind::Separator(Separator::CurlyBracketClose)),
            b'[' => Some(TokenKind::Separator(Separator::SquareBracketOpen)),
            b']' => Some(TokenKind::Separator(Separator::SquareBracketClose)),
            b',' => Some(TokenKind::Separator(Separator::Comma)),
            b'.' => Some(TokenKind::Separator(Separator::Dot)),
            b'@' => Some(TokenKind::Operator(Operator::AtDeclaration)),
            b'=' => Some(TokenKind::Operator(Operator::Assignment)),
            b':' => Some(TokenKind::Operator(Operator::Inherit)),
            b'+' => Some(TokenKind::Operator(Operator::Plus)),
            b'-' => Some(TokenKind::Operator(Operator::Minus)),
            b'*' => Some(TokenKind::Operator(Operator::Star)),
            b'/' => Some(TokenKind::Operator(Operator::Slash)),
            b'>' => Some(TokenKind::Operator(Operator::BoolGreaterThan)),
            b'<' => Some(TokenKind::Operator(Operator::BoolLessThan)),
            b'!' => Some(TokenKind::Operator(Operator::BoolNot)),
            b'|' => Some(TokenKind::Operator(Operator::BitOr)),
            b'&' => Some(TokenKind::Operator(Operator::BitAnd)),
            b'^' => Some(TokenKind::Operator(Operator::BitXor)),
            b'~' => Some(TokenKind::Operator(Operator::BitNot)),
            b'?' => Some(TokenKind::Operator(Operator::TernaryConditional)),
            _ => None,
        };
        if let Some(kind) = single {
            self.pos += 1;
            return Ok(Token::new(kind, line));
        }

        if b == b'\'' {
            return self.lex_char_literal();
        }

        if b.is_ascii_alphabetic() {
            return Ok(self.lex_identifier());
        }

        if b.is_ascii_digit() {
            return self.lex_integer_literal();
        }

        Err(LexerError::new("unknown token", line))
    }

    /// Character literal: 'X', '\\' or '\''. Only those two escapes are
    /// admitted; raw newlines and carriage returns are rejected.
    fn lex_char_literal(&mut self) -> Result<Token, LexerError> {
        let line = self.line;
        self.pos += 1;

        if self.pos >= self.bytes.len() {
            return Err(LexerError::new("invalid character literal", line));
        }

        let character = if self.bytes[self.pos] == b'\\' {
            self.pos += 1;
            if self.pos >= self.bytes.len() {
                return Err(LexerError::new("invalid character literal", line));
            }
            let escaped = self.bytes[self.pos];
            if escaped != b'\\' && escaped != b'\'' {
                return Err(LexerError::new("invalid escape sequence", line));
            }
            escaped
        } else {
            let c = self.bytes[self.pos];
            if c == b'\'' || c == b'\n' || c == b'\r' {
                return Err(LexerError::new("invalid character literal", line));
            }
            c
        };
        self.pos += 1;

        if self.pos >= self.bytes.len() || self.bytes[self.pos] != b'\'' {
            return Err(LexerError::new(
                "missing terminating ' after character literal",
                line,
            ));
        }
        self.pos += 1;

        Ok(Token::new(
            TokenKind::Integer(Literal::Char(character)),
            line,
        ))
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric() || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];

        let kind = if let Some(keyword) = Keyword::from_str(text) {
            TokenKind::Keyword(keyword)
        } else if let Some(value_type) = ValueType::from_str(text) {
            TokenKind::ValueType(value_type)
        } else {
            TokenKind::Ident(self.interner.intern(text))
        };

        Token::new(kind, self.line)
    }

    fn lex_integer_literal(&mut self) -> Result<Token, LexerError> {
        let line = self.line;
        let length = self.bytes[self.pos..]
            .iter()
            .take_while(|&&b| {
                matches!(b, b'0'..=b'9' | b'A'..=b'F' | b'a'..=b'f' | b'.' | b'x' | b'U' | b'L')
            })
            .count();
        let text = &self.source[self.pos..self.pos + length];

        let literal = parse_integer_literal(text)
            .ok_or_else(|| LexerError::new("invalid integer literal", line))?;
        self.pos += length;

        Ok(Token::new(TokenKind::Integer(literal), line))
    }
}

/// Parse a numeric literal per the suffix and base rules of the language.
///
/// Case-sensitive width suffixes are stripped before base parsing:
/// `U` selects u32, `UL` u64, `ULL` u128, `L` s64, `LL` s128. Without a
/// width suffix, `0x` selects base 16, `0b` base 2, an embedded `.` base-10
/// floating point (`double` by default, `F` forces `float`, `D` forces
/// `double`), anything else base-10 signed 32-bit.
///
/// Accumulation happens in 128-bit unsigned and narrows to the declared
/// width by cast; overflow wraps silently.
pub fn parse_integer_literal(text: &str) -> Option<Literal> {
    let mut ty: Option<ValueType> = None;
    let mut num = text;

    // Width suffixes, longest match first.
    if let Some(stripped) = num.strip_suffix("ULL") {
        ty = Some(ValueType::U128);
        num = stripped;
    } else if let Some(stripped) = num.strip_suffix("UL") {
        ty = Some(ValueType::U64);
        num = stripped;
    } else if let Some(stripped) = num.strip_suffix("LL") {
        ty = Some(ValueType::S128);
        num = stripped;
    } else if let Some(stripped) = num.strip_suffix('L') {
        ty = Some(ValueType::S64);
        num = stripped;
    } else if let Some(stripped) = num.strip_suffix('U') {
        ty = Some(ValueType::U32);
        num = stripped;
    } else if !num.starts_with("0x") && !num.starts_with("0b") {
        // F/D are hex digits, so floating-point suffixes only exist in
        // base 10.
        if let Some(stripped) = num.strip_suffix('F') {
            ty = Some(ValueType::Float);
            num = stripped;
        } else if let Some(stripped) = num.strip_suffix('D') {
            ty = Some(ValueType::Double);
            num = stripped;
        }
    }

    let (digits, base) = if let Some(hex) = num.strip_prefix("0x") {
        if ty.is_some_and(|t| t.is_float()) {
            return None;
        }
        (hex, 16)
    } else if let Some(bin) = num.strip_prefix("0b") {
        if ty.is_some_and(|t| t.is_float()) {
            return None;
        }
        (bin, 2)
    } else if num.contains('.') || ty.is_some_and(|t| t.is_float()) {
        return parse_float_literal(num, ty);
    } else {
        (num, 10)
    };

    if digits.is_empty() {
        return None;
    }

    let mut value: u128 = 0;
    for c in digits.chars() {
        let digit = c.to_digit(base)?;
        value = value.wrapping_mul(base as u128).wrapping_add(digit as u128);
    }

    Some(Literal::wrap(ty.unwrap_or(ValueType::S32), value))
}

fn parse_float_literal(num: &str, ty: Option<ValueType>) -> Option<Literal> {
    let ty = ty.unwrap_or(ValueType::Double);
    if !ty.is_float() {
        // A width-suffixed literal with a decimal point, e.g. "1.5U".
        return None;
    }

    if num.chars().filter(|&c| c == '.').count() > 1
        || num.ends_with('.')
        || num.chars().any(|c| !c.is_ascii_digit() && c != '.')
        || num.is_empty()
    {
        return None;
    }

    let value: f64 = num.parse().ok()?;
    Some(Literal::from_f64(ty, value))
}

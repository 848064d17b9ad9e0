// Recursive-descent parser for the pattern language.

pub mod ast;

use rustc_hash::FxHashSet;

use crate::error::ParseError;
use crate::lexer::token::{Keyword, Literal, Operator, Separator, Token, TokenKind, ValueType};
use crate::name::{Name, StringInterner};
use ast::{Endianness, Expr, ExprKind, Stmt, StmtKind, Type, TypeDef, TypeDefKind, TypeKind};

/// Parses the token stream into an ordered list of top-level statements:
/// type definitions and variable / array / pointer placements.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    types: FxHashSet<Name>,
    interner: &'a mut StringInterner,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], interner: &'a mut StringInterner) -> Self {
        Self {
            tokens,
            pos: 0,
            types: FxHashSet::default(),
            interner,
        }
    }

    pub fn parse(mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut program = Vec::new();
        while !self.eat_separator(Separator::EndOfProgram) {
            program.push(self.parse_statement()?);
        }
        if program.is_empty() {
            return Err(ParseError::new("program is empty", self.line()));
        }
        Ok(program)
    }

    // ---- token cursor helpers ----

    fn current(&self) -> &Token {
        // The lexer always terminates the stream with EndOfProgram.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn line(&self) -> u32 {
        self.current().line
    }

    fn bump(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line())
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.current().kind == TokenKind::Keyword(keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_operator(&mut self, op: Operator) -> bool {
        if self.current().kind == TokenKind::Operator(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_separator(&mut self, sep: Separator) -> bool {
        if self.current().kind == TokenKind::Separator(sep) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn check_separator(&self, sep: Separator) -> bool {
        self.current().kind == TokenKind::Separator(sep)
    }

    fn at_end(&self) -> bool {
        self.check_separator(Separator::EndOfProgram)
    }

    fn expect_operator(&mut self, op: Operator, message: &str) -> Result<(), ParseError> {
        if self.eat_operator(op) {
            Ok(())
        } else {
            Err(self.err(message))
        }
    }

    fn expect_separator(&mut self, sep: Separator, message: &str) -> Result<(), ParseError> {
        if self.eat_separator(sep) {
            Ok(())
        } else {
            Err(self.err(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<Name, ParseError> {
        match self.current().kind {
            TokenKind::Ident(name) => {
                self.bump();
                Ok(name)
            }
            _ => Err(self.err(message)),
        }
    }

    fn eat_endian(&mut self) -> Option<Endianness> {
        if self.eat_keyword(Keyword::BigEndian) {
            Some(Endianness::Big)
        } else if self.eat_keyword(Keyword::LittleEndian) {
            Some(Endianness::Little)
        } else {
            None
        }
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        let stmt = if self.eat_keyword(Keyword::Using) {
            self.parse_using(line)?
        } else if self.eat_keyword(Keyword::Struct) {
            self.parse_struct(line)?
        } else if self.eat_keyword(Keyword::Union) {
            self.parse_union(line)?
        } else if self.eat_keyword(Keyword::Enum) {
            self.parse_enum(line)?
        } else if self.eat_keyword(Keyword::Bitfield) {
            self.parse_bitfield(line)?
        } else {
            self.parse_placement(line)?
        };

        self.expect_separator(
            Separator::EndOfExpression,
            "missing ';' at end of expression",
        )?;

        if let StmtKind::TypeDef(ref def) = stmt.kind {
            self.types.insert(def.name);
        }
        Ok(stmt)
    }

    // using Name = [be|le] <type>
    fn parse_using(&mut self, line: u32) -> Result<Stmt, ParseError> {
        let name = self.expect_ident("expected type name after 'using'")?;
        self.expect_operator(Operator::Assignment, "expected '=' in using declaration")?;
        let ty = self.parse_type()?;
        Ok(Stmt {
            kind: StmtKind::TypeDef(TypeDef {
                name,
                kind: TypeDefKind::Alias(ty),
                line,
            }),
            line,
        })
    }

    // [be|le] <Identifier|builtin>
    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let line = self.line();
        let endian = self.eat_endian();
        match self.current().kind {
            TokenKind::ValueType(vt) => {
                self.bump();
                Ok(Type {
                    kind: TypeKind::Builtin(vt),
                    endian,
                    line,
                })
            }
            TokenKind::Ident(name) => {
                if !self.types.contains(&name) {
                    return Err(ParseError::new(
                        format!("unknown type name '{}'", self.interner.resolve(name)),
                        line,
                    ));
                }
                self.bump();
                Ok(Type {
                    kind: TypeKind::Named(name),
                    endian,
                    line,
                })
            }
            ref other => Err(ParseError::new(format!("expected type, found {}", other), line)),
        }
    }

    // struct Name { <members> }
    fn parse_struct(&mut self, line: u32) -> Result<Stmt, ParseError> {
        let name = self.expect_ident("expected struct name")?;
        let members = self.parse_member_block()?;
        Ok(Stmt {
            kind: StmtKind::TypeDef(TypeDef {
                name,
                kind: TypeDefKind::Struct { members },
                line,
            }),
            line,
        })
    }

    // union Name { <members> }
    fn parse_union(&mut self, line: u32) -> Result<Stmt, ParseError> {
        let name = self.expect_ident("expected union name")?;
        let members = self.parse_member_block()?;
        Ok(Stmt {
            kind: StmtKind::TypeDef(TypeDef {
                name,
                kind: TypeDefKind::Union { members },
                line,
            }),
            line,
        })
    }

    fn parse_member_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_separator(Separator::CurlyBracketOpen, "expected '{'")?;
        let mut members = Vec::new();
        while !self.eat_separator(Separator::CurlyBracketClose) {
            if self.at_end() {
                return Err(self.err("unexpected end of program"));
            }
            members.push(self.parse_member()?);
        }
        Ok(members)
    }

    // enum Name : [be|le] <integer builtin> { A = expr, B, ... }
    fn parse_enum(&mut self, line: u32) -> Result<Stmt, ParseError> {
        let name = self.expect_ident("expected enum name")?;
        self.expect_operator(Operator::Inherit, "expected ':' before enum underlying type")?;
        // The qualifier position is accepted here; the override itself
        // belongs on the placement.
        let _ = self.eat_endian();
        let underlying = match self.current().kind {
            TokenKind::ValueType(vt) if vt.is_integer() => {
                self.bump();
                vt
            }
            _ => return Err(self.err("invalid enum underlying type")),
        };

        self.expect_separator(Separator::CurlyBracketOpen, "expected '{'")?;
        let mut entries: Vec<(Name, Expr)> = Vec::new();
        while !self.eat_separator(Separator::CurlyBracketClose) {
            if self.at_end() {
                return Err(self.err("unexpected end of program"));
            }
            let entry_line = self.line();
            let entry_name = self.expect_ident("invalid enum entry")?;
            let value = if self.eat_operator(Operator::Assignment) {
                self.parse_expression()?
            } else if let Some((_, previous)) = entries.last() {
                // Implicit entry: previous value plus one.
                Expr {
                    kind: ExprKind::Binary {
                        op: Operator::Plus,
                        lhs: Box::new(previous.clone()),
                        rhs: Box::new(Expr {
                            kind: ExprKind::Literal(Literal::S32(1)),
                            line: entry_line,
                        }),
                    },
                    line: entry_line,
                }
            } else {
                Expr {
                    kind: ExprKind::Literal(Literal::wrap(underlying, 0)),
                    line: entry_line,
                }
            };
            entries.push((entry_name, value));

            if !self.eat_separator(Separator::Comma) {
                if self.eat_separator(Separator::CurlyBracketClose) {
                    break;
                }
                return Err(self.err("missing ',' between enum entries"));
            }
        }

        Ok(Stmt {
            kind: StmtKind::TypeDef(TypeDef {
                name,
                kind: TypeDefKind::Enum {
                    underlying,
                    entries,
                },
                line,
            }),
            line,
        })
    }

    // bitfield Name { field : expr; ... }
    fn parse_bitfield(&mut self, line: u32) -> Result<Stmt, ParseError> {
        let name = self.expect_ident("expected bitfield name")?;
        self.expect_separator(Separator::CurlyBracketOpen, "expected '{'")?;
        let mut entries = Vec::new();
        while !self.eat_separator(Separator::CurlyBracketClose) {
            if self.at_end() {
                return Err(self.err("unexpected end of program"));
            }
            let field = self.expect_ident("invalid bitfield entry")?;
            self.expect_operator(Operator::Inherit, "expected ':' before bitfield entry size")?;
            let width = self.parse_expression()?;
            self.expect_separator(
                Separator::EndOfExpression,
                "missing ';' at end of expression",
            )?;
            entries.push((field, width));
        }
        Ok(Stmt {
            kind: StmtKind::TypeDef(TypeDef {
                name,
                kind: TypeDefKind::Bitfield { entries },
                line,
            }),
            line,
        })
    }

    // ---- placements (top level, with '@') ----

    fn parse_placement(&mut self, line: u32) -> Result<Stmt, ParseError> {
        let ty = self.parse_type()?;

        if self.eat_operator(Operator::Star) {
            // <type> *name : <size type> @ expr
            let name = self.expect_ident("expected variable name")?;
            self.expect_operator(Operator::Inherit, "expected ':' before pointer size type")?;
            let size_ty = self.parse_pointer_size_type()?;
            self.expect_operator(Operator::AtDeclaration, "expected placement instruction")?;
            let offset = self.parse_expression()?;
            return Ok(Stmt {
                kind: StmtKind::Pointer {
                    name,
                    ty,
                    size_ty,
                    offset: Some(offset),
                },
                line,
            });
        }

        let name = self.expect_ident("expected variable name")?;
        if self.eat_separator(Separator::SquareBracketOpen) {
            // <type> name[expr] @ expr
            let size = self.parse_expression()?;
            self.expect_separator(
                Separator::SquareBracketClose,
                "expected closing ']' at end of array declaration",
            )?;
            self.expect_operator(Operator::AtDeclaration, "expected placement instruction")?;
            let offset = self.parse_expression()?;
            Ok(Stmt {
                kind: StmtKind::Array {
                    name: Some(name),
                    ty,
                    size,
                    offset: Some(offset),
                },
                line,
            })
        } else {
            // <type> name @ expr
            self.expect_operator(Operator::AtDeclaration, "expected placement instruction")?;
            let offset = self.parse_expression()?;
            Ok(Stmt {
                kind: StmtKind::Variable {
                    name,
                    ty,
                    offset: Some(offset),
                },
                line,
            })
        }
    }

    fn parse_pointer_size_type(&mut self) -> Result<Type, ParseError> {
        let line = self.line();
        let endian = self.eat_endian();
        match self.current().kind {
            TokenKind::ValueType(vt) if vt.is_unsigned() => {
                self.bump();
                Ok(Type {
                    kind: TypeKind::Builtin(vt),
                    endian,
                    line,
                })
            }
            _ => Err(self.err("expected unsigned builtin type as pointer size")),
        }
    }

    // ---- members (inside struct/union bodies, no '@') ----

    fn parse_member(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();

        // Conditionals carry no trailing ';'.
        if self.eat_keyword(Keyword::If) {
            return self.parse_conditional(line);
        }

        // padding[expr];
        if self.current().kind == TokenKind::ValueType(ValueType::Padding)
            && self.peek_next().kind == TokenKind::Separator(Separator::SquareBracketOpen)
        {
            self.bump();
            self.bump();
            let size = self.parse_expression()?;
            self.expect_separator(
                Separator::SquareBracketClose,
                "expected closing ']' at end of array declaration",
            )?;
            self.expect_separator(
                Separator::EndOfExpression,
                "missing ';' at end of expression",
            )?;
            return Ok(Stmt {
                kind: StmtKind::Array {
                    name: None,
                    ty: Type {
                        kind: TypeKind::Builtin(ValueType::Padding),
                        endian: None,
                        line,
                    },
                    size,
                    offset: None,
                },
                line,
            });
        }

        let ty = self.parse_type()?;
        let kind = if self.eat_operator(Operator::Star) {
            let name = self.expect_ident("expected variable name")?;
            self.expect_operator(Operator::Inherit, "expected ':' before pointer size type")?;
            let size_ty = self.parse_pointer_size_type()?;
            StmtKind::Pointer {
                name,
                ty,
                size_ty,
                offset: None,
            }
        } else {
            let name = self.expect_ident("expected variable name")?;
            if self.eat_separator(Separator::SquareBracketOpen) {
                let size = self.parse_expression()?;
                self.expect_separator(
                    Separator::SquareBracketClose,
                    "expected closing ']' at end of array declaration",
                )?;
                StmtKind::Array {
                    name: Some(name),
                    ty,
                    size,
                    offset: None,
                }
            } else {
                StmtKind::Variable {
                    name,
                    ty,
                    offset: None,
                }
            }
        };

        self.expect_separator(
            Separator::EndOfExpression,
            "missing ';' at end of expression",
        )?;
        Ok(Stmt { kind, line })
    }

    // if (expr) <member | { members }> [else <member | { members }>]
    fn parse_conditional(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.expect_separator(Separator::RoundBracketOpen, "expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect_separator(Separator::RoundBracketClose, "expected ')' after condition")?;

        let true_body = self.parse_conditional_body()?;
        let false_body = if self.eat_keyword(Keyword::Else) {
            self.parse_conditional_body()?
        } else {
            Vec::new()
        };

        Ok(Stmt {
            kind: StmtKind::Conditional {
                condition,
                true_body,
                false_body,
            },
            line,
        })
    }

    fn parse_conditional_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();
        if self.eat_separator(Separator::CurlyBracketOpen) {
            while !self.eat_separator(Separator::CurlyBracketClose) {
                if self.at_end() {
                    return Err(self.err("unexpected end of program"));
                }
                body.push(self.parse_member()?);
            }
        } else {
            body.push(self.parse_member()?);
        }
        Ok(body)
    }

    // ---- expressions ----

    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_binary(0)?;
        while self.eat_operator(Operator::TernaryConditional) {
            let line = node.line;
            let then_expr = self.parse_binary(0)?;
            self.expect_operator(Operator::Inherit, "expected ':' in ternary expression")?;
            let else_expr = self.parse_binary(0)?;
            node = Expr {
                kind: ExprKind::Ternary {
                    cond: Box::new(node),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                line,
            };
        }
        Ok(node)
    }

    /// Left-associative binary levels, loosest binding first.
    const BINARY_LEVELS: [&'static [Operator]; 11] = [
        &[Operator::BoolOr],
        &[Operator::BoolXor],
        &[Operator::BoolAnd],
        &[Operator::BitOr],
        &[Operator::BitXor],
        &[Operator::BitAnd],
        &[Operator::BoolEquals, Operator::BoolNotEquals],
        &[
            Operator::BoolGreaterThan,
            Operator::BoolLessThan,
            Operator::BoolGreaterThanOrEquals,
            Operator::BoolLessThanOrEquals,
        ],
        &[Operator::ShiftLeft, Operator::ShiftRight],
        &[Operator::Plus, Operator::Minus],
        &[Operator::Star, Operator::Slash],
    ];

    fn parse_binary(&mut self, level: usize) -> Result<Expr, ParseError> {
        if level >= Self::BINARY_LEVELS.len() {
            return self.parse_unary();
        }

        let mut node = self.parse_binary(level + 1)?;
        loop {
            let op = match self.current().kind {
                TokenKind::Operator(op) if Self::BINARY_LEVELS[level].contains(&op) => op,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_binary(level + 1)?;
            let line = node.line;
            node = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(node),
                    rhs: Box::new(rhs),
                },
                line,
            };
        }
        Ok(node)
    }

    // <+|-|!|~> factor, encoded as a binary node with a zero left operand
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        for op in [
            Operator::Plus,
            Operator::Minus,
            Operator::BoolNot,
            Operator::BitNot,
        ] {
            if self.eat_operator(op) {
                let operand = self.parse_factor()?;
                return Ok(Expr {
                    kind: ExprKind::Binary {
                        op,
                        lhs: Box::new(Expr {
                            kind: ExprKind::Literal(Literal::S32(0)),
                            line,
                        }),
                        rhs: Box::new(operand),
                    },
                    line,
                });
            }
        }
        self.parse_factor()
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.current().kind {
            TokenKind::Integer(literal) => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Literal(literal),
                    line,
                })
            }
            TokenKind::Separator(Separator::RoundBracketOpen) => {
                self.bump();
                let node = self.parse_expression()?;
                self.expect_separator(
                    Separator::RoundBracketClose,
                    "expected closing parenthesis",
                )?;
                Ok(node)
            }
            TokenKind::Ident(name) => {
                self.bump();
                if self.eat_separator(Separator::ScopeResolution) {
                    let mut path = vec![name];
                    loop {
                        path.push(self.expect_ident("expected member name")?);
                        if !self.eat_separator(Separator::ScopeResolution) {
                            break;
                        }
                    }
                    Ok(Expr {
                        kind: ExprKind::ScopePath(path),
                        line,
                    })
                } else if self.eat_separator(Separator::RoundBracketOpen) {
                    self.parse_call_args(name, line)
                } else {
                    let mut path = vec![name];
                    while self.eat_separator(Separator::Dot) {
                        path.push(self.expect_ident("expected member name")?);
                    }
                    Ok(Expr {
                        kind: ExprKind::RValue(path),
                        line,
                    })
                }
            }
            ref other => Err(ParseError::new(
                format!("expected integer or parenthesis, found {}", other),
                line,
            )),
        }
    }

    fn parse_call_args(&mut self, name: Name, line: u32) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        if !self.eat_separator(Separator::RoundBracketClose) {
            loop {
                args.push(self.parse_expression()?);
                if self.eat_separator(Separator::RoundBracketClose) {
                    break;
                }
                self.expect_separator(Separator::Comma, "missing ',' between parameters")?;
                if self.check_separator(Separator::RoundBracketClose) {
                    return Err(self.err("unexpected ',' at end of function parameter list"));
                }
            }
        }
        Ok(Expr {
            kind: ExprKind::Call { name, args },
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> (Vec<Stmt>, StringInterner) {
        let mut interner = StringInterner::new();
        let tokens = Lexer::new(source, &mut interner)
            .tokenize()
            .expect("lexing failed");
        let ast = Parser::new(&tokens, &mut interner)
            .parse()
            .expect("parsing failed");
        (ast, interner)
    }

    fn parse_err(source: &str) -> ParseError {
        let mut interner = StringInterner::new();
        let tokens = Lexer::new(source, &mut interner)
            .tokenize()
            .expect("lexing failed");
        Parser::new(&tokens, &mut interner)
            .parse()
            .expect_err("expected a parse error")
    }

    #[test]
    fn variable_placement() {
        let (ast, mut interner) = parse("u32 magic @ 0x00;");
        assert_eq!(ast.len(), 1);
        match &ast[0].kind {
            StmtKind::Variable { name, ty, offset } => {
                assert_eq!(*name, interner.intern("magic"));
                assert!(matches!(ty.kind, TypeKind::Builtin(ValueType::U32)));
                assert!(offset.is_some());
            }
            other => panic!("expected variable placement, got {:?}", other),
        }
    }

    #[test]
    fn struct_definition_and_placement() {
        let (ast, _) = parse("struct Header { u32 magic; u16 version; }; Header h @ 0;");
        assert_eq!(ast.len(), 2);
        match &ast[0].kind {
            StmtKind::TypeDef(def) => match &def.kind {
                TypeDefKind::Struct { members } => assert_eq!(members.len(), 2),
                other => panic!("expected struct, got {:?}", other),
            },
            other => panic!("expected type definition, got {:?}", other),
        }
        assert!(matches!(
            &ast[1].kind,
            StmtKind::Variable {
                ty: Type {
                    kind: TypeKind::Named(_),
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let err = parse_err("Mystery m @ 0;");
        assert_eq!(err.message, "unknown type name 'Mystery'");
    }

    #[test]
    fn using_alias_with_endian() {
        let (ast, _) = parse("using Word = be u16; Word w @ 0;");
        match &ast[0].kind {
            StmtKind::TypeDef(def) => match &def.kind {
                TypeDefKind::Alias(ty) => {
                    assert!(matches!(ty.kind, TypeKind::Builtin(ValueType::U16)));
                    assert_eq!(ty.endian, Some(Endianness::Big));
                }
                other => panic!("expected alias, got {:?}", other),
            },
            other => panic!("expected type definition, got {:?}", other),
        }
    }

    #[test]
    fn enum_entries_auto_increment() {
        let (ast, _) = parse("enum E : u8 { A, B, C = 10, D }; E e @ 0;");
        match &ast[0].kind {
            StmtKind::TypeDef(def) => match &def.kind {
                TypeDefKind::Enum {
                    underlying,
                    entries,
                } => {
                    assert_eq!(*underlying, ValueType::U8);
                    assert_eq!(entries.len(), 4);
                    // A is the underlying type's zero
                    assert!(matches!(
                        entries[0].1.kind,
                        ExprKind::Literal(Literal::U8(0))
                    ));
                    // B is A + 1
                    assert!(matches!(
                        entries[1].1.kind,
                        ExprKind::Binary {
                            op: Operator::Plus,
                            ..
                        }
                    ));
                    // C is explicit
                    assert!(matches!(
                        entries[2].1.kind,
                        ExprKind::Literal(Literal::S32(10))
                    ));
                }
                other => panic!("expected enum, got {:?}", other),
            },
            other => panic!("expected type definition, got {:?}", other),
        }
    }

    #[test]
    fn bitfield_definition() {
        let (ast, _) = parse("bitfield Flags { a : 3; b : 5; }; Flags f @ 0;");
        match &ast[0].kind {
            StmtKind::TypeDef(def) => match &def.kind {
                TypeDefKind::Bitfield { entries } => assert_eq!(entries.len(), 2),
                other => panic!("expected bitfield, got {:?}", other),
            },
            other => panic!("expected type definition, got {:?}", other),
        }
    }

    #[test]
    fn pointer_placement() {
        let (ast, _) = parse("u8 *ptr : u32 @ 0x00;");
        match &ast[0].kind {
            StmtKind::Pointer { ty, size_ty, .. } => {
                assert!(matches!(ty.kind, TypeKind::Builtin(ValueType::U8)));
                assert!(matches!(size_ty.kind, TypeKind::Builtin(ValueType::U32)));
            }
            other => panic!("expected pointer placement, got {:?}", other),
        }
    }

    #[test]
    fn pointer_size_must_be_unsigned() {
        let err = parse_err("u8 *ptr : s32 @ 0x00;");
        assert_eq!(err.message, "expected unsigned builtin type as pointer size");
    }

    #[test]
    fn padding_member() {
        let (ast, _) = parse("struct S { u8 a; padding[3]; u8 b; }; S s @ 0;");
        match &ast[0].kind {
            StmtKind::TypeDef(def) => match &def.kind {
                TypeDefKind::Struct { members } => {
                    assert!(matches!(
                        &members[1].kind,
                        StmtKind::Array {
                            name: None,
                            ty: Type {
                                kind: TypeKind::Builtin(ValueType::Padding),
                                ..
                            },
                            ..
                        }
                    ));
                }
                other => panic!("expected struct, got {:?}", other),
            },
            other => panic!("expected type definition, got {:?}", other),
        }
    }

    #[test]
    fn conditional_member_with_else() {
        let (ast, _) = parse(
            "struct S { u8 tag; if (tag == 1) { u16 a; } else { u32 b; } }; S s @ 0;",
        );
        match &ast[0].kind {
            StmtKind::TypeDef(def) => match &def.kind {
                TypeDefKind::Struct { members } => {
                    assert_eq!(members.len(), 2);
                    match &members[1].kind {
                        StmtKind::Conditional {
                            true_body,
                            false_body,
                            ..
                        } => {
                            assert_eq!(true_body.len(), 1);
                            assert_eq!(false_body.len(), 1);
                        }
                        other => panic!("expected conditional, got {:?}", other),
                    }
                }
                other => panic!("expected struct, got {:?}", other),
            },
            other => panic!("expected type definition, got {:?}", other),
        }
    }

    #[test]
    fn precedence_multiplication_binds_tighter() {
        // 1 + 2 * 3 must parse as 1 + (2 * 3)
        let (ast, _) = parse("u8 x @ 1 + 2 * 3;");
        let offset = match &ast[0].kind {
            StmtKind::Variable { offset, .. } => offset.as_ref().unwrap(),
            other => panic!("expected variable, got {:?}", other),
        };
        match &offset.kind {
            ExprKind::Binary {
                op: Operator::Plus,
                rhs,
                ..
            } => {
                assert!(matches!(
                    rhs.kind,
                    ExprKind::Binary {
                        op: Operator::Star,
                        ..
                    }
                ));
            }
            other => panic!("expected '+' at the top, got {:?}", other),
        }
    }

    #[test]
    fn ternary_expression() {
        let (ast, _) = parse("u8 x @ 1 ? 2 : 3;");
        let offset = match &ast[0].kind {
            StmtKind::Variable { offset, .. } => offset.as_ref().unwrap(),
            other => panic!("expected variable, got {:?}", other),
        };
        assert!(matches!(offset.kind, ExprKind::Ternary { .. }));
    }

    #[test]
    fn scope_resolution_and_call_and_rvalue() {
        let (ast, _) = parse(
            "enum E : u8 { A }; struct S { u8 tag; if (E::A == readUnsigned(0, 1)) u8 x; }; S s @ 0;",
        );
        match &ast[1].kind {
            StmtKind::TypeDef(def) => match &def.kind {
                TypeDefKind::Struct { members } => match &members[1].kind {
                    StmtKind::Conditional { condition, .. } => match &condition.kind {
                        ExprKind::Binary { lhs, rhs, .. } => {
                            assert!(matches!(lhs.kind, ExprKind::ScopePath(_)));
                            assert!(matches!(rhs.kind, ExprKind::Call { .. }));
                        }
                        other => panic!("expected comparison, got {:?}", other),
                    },
                    other => panic!("expected conditional, got {:?}", other),
                },
                other => panic!("expected struct, got {:?}", other),
            },
            other => panic!("expected type definition, got {:?}", other),
        }
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let err = parse_err("u8 x @ 0");
        assert_eq!(err.message, "missing ';' at end of expression");
    }

    #[test]
    fn empty_program_is_an_error() {
        let err = parse_err("");
        assert_eq!(err.message, "program is empty");
    }

    #[test]
    fn trailing_comma_in_call_is_rejected() {
        let err = parse_err("u8 x @ readUnsigned(0, 1,);");
        assert_eq!(err.message, "unexpected ',' at end of function parameter list");
    }
}

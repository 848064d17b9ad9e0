// Evaluator: walks the AST against a byte source, maintains the byte
// cursor and endianness state, and materializes the pattern tree.

pub mod byte_source;
pub mod functions;
pub mod pattern;

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::EvaluateError;
use crate::lexer::token::{Literal, Operator, ValueType};
use crate::name::{Name, StringInterner};
use crate::parser::ast::{
    Endianness, Expr, ExprKind, Stmt, StmtKind, Type, TypeDef, TypeDefKind, TypeKind,
};
use byte_source::ByteSource;
use functions::{Arity, FnContext, Function};
use pattern::{Pattern, PatternValue, PALETTE};

/// Pick the result type of a binary operation: the first type of the ladder
/// that either operand has, else s32.
pub fn promote(left: ValueType, right: ValueType) -> ValueType {
    const LADDER: [ValueType; 13] = [
        ValueType::Double,
        ValueType::Float,
        ValueType::U128,
        ValueType::S128,
        ValueType::U64,
        ValueType::S64,
        ValueType::U32,
        ValueType::S32,
        ValueType::U16,
        ValueType::S16,
        ValueType::U8,
        ValueType::S8,
        ValueType::Char,
    ];
    LADDER
        .into_iter()
        .find(|ty| left == *ty || right == *ty)
        .unwrap_or(ValueType::S32)
}

/// Assemble an unsigned value from raw bytes in the given byte order.
pub(crate) fn unsigned_from_bytes(bytes: &[u8], endian: Endianness) -> u128 {
    let mut value: u128 = 0;
    match endian {
        Endianness::Little => {
            for &b in bytes.iter().rev() {
                value = (value << 8) | b as u128;
            }
        }
        Endianness::Big => {
            for &b in bytes {
                value = (value << 8) | b as u128;
            }
        }
    }
    value
}

/// Assemble a sign-extended value from raw bytes in the given byte order.
pub(crate) fn signed_from_bytes(bytes: &[u8], endian: Endianness) -> i128 {
    sign_extend(unsigned_from_bytes(bytes, endian), bytes.len() as u64)
}

fn sign_extend(value: u128, size_bytes: u64) -> i128 {
    if size_bytes >= 16 {
        return value as i128;
    }
    let bits = size_bytes * 8;
    let sign_bit = 1u128 << (bits - 1);
    if value & sign_bit != 0 {
        (value | !((1u128 << bits) - 1)) as i128
    } else {
        value as i128
    }
}

fn width_mask(size_bytes: u64) -> u128 {
    if size_bytes >= 16 {
        u128::MAX
    } else {
        (1u128 << (size_bytes * 8)) - 1
    }
}

/// Unsigned literal of the width matching a byte count of 1, 2, 4, 8 or 16.
pub(crate) fn width_literal_unsigned(size: u64, value: u128) -> Literal {
    match size {
        1 => Literal::U8(value as u8),
        2 => Literal::U16(value as u16),
        4 => Literal::U32(value as u32),
        8 => Literal::U64(value as u64),
        _ => Literal::U128(value),
    }
}

/// Signed literal of the width matching a byte count of 1, 2, 4, 8 or 16.
pub(crate) fn width_literal_signed(size: u64, value: u128) -> Literal {
    match size {
        1 => Literal::S8(value as u8 as i8),
        2 => Literal::S16(value as u16 as i16),
        4 => Literal::S32(value as u32 as i32),
        8 => Literal::S64(value as u64 as i64),
        _ => Literal::S128(value as i128),
    }
}

/// Evaluates an AST against a byte source. One evaluation is one
/// synchronous call; the evaluator only reads the source and does not
/// retain it past the call.
pub struct Evaluator<'a> {
    data: &'a dyn ByteSource,
    pub interner: StringInterner,
    type_env: FxHashMap<Name, Rc<TypeDef>>,
    functions: FxHashMap<Name, Function>,
    member_stack: Vec<Vec<Pattern>>,
    cursor: u64,
    current_endian: Option<Endianness>,
    default_endian: Endianness,
    color_index: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(data: &'a dyn ByteSource, default_endian: Endianness) -> Self {
        Self::with_interner(data, default_endian, StringInterner::new())
    }

    /// Build an evaluator that shares the interner the lexer and parser
    /// populated, so identifier handles stay valid across the stages.
    pub fn with_interner(
        data: &'a dyn ByteSource,
        default_endian: Endianness,
        mut interner: StringInterner,
    ) -> Self {
        let mut functions = FxHashMap::default();
        functions::register_defaults(&mut functions, &mut interner);
        Self {
            data,
            interner,
            type_env: FxHashMap::default(),
            functions,
            member_stack: Vec::new(),
            cursor: 0,
            current_endian: None,
            default_endian,
            color_index: 0,
        }
    }

    /// Register an additional function callable from schema expressions.
    pub fn register_function(
        &mut self,
        name: &str,
        arity: Arity,
        handler: impl Fn(&FnContext<'_>, &[Literal]) -> Result<Literal, String> + 'static,
    ) {
        let key = self.interner.intern(name);
        self.functions.insert(
            key,
            Function {
                arity,
                handler: Box::new(handler),
            },
        );
    }

    /// Byte offset the next auto-placed variable would start at.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Walk the top-level statements in order. Type definitions populate the
    /// type environment; placements append to the result list.
    pub fn evaluate(&mut self, ast: &[Stmt]) -> Result<Vec<Pattern>, EvaluateError> {
        let mut patterns = Vec::new();
        for stmt in ast {
            self.current_endian = None;
            match &stmt.kind {
                StmtKind::TypeDef(def) => {
                    self.type_env.insert(def.name, Rc::new(def.clone()));
                }
                StmtKind::Variable { name, ty, offset } => {
                    patterns.push(self.evaluate_variable(*name, ty, offset.as_ref(), stmt.line)?);
                }
                StmtKind::Array {
                    name,
                    ty,
                    size,
                    offset,
                } => {
                    patterns.push(self.evaluate_array(
                        *name,
                        ty,
                        size,
                        offset.as_ref(),
                        stmt.line,
                    )?);
                }
                StmtKind::Pointer {
                    name,
                    ty,
                    size_ty,
                    offset,
                } => {
                    patterns.push(self.evaluate_pointer(
                        *name,
                        ty,
                        size_ty,
                        offset.as_ref(),
                        stmt.line,
                    )?);
                }
                StmtKind::Conditional { .. } => {
                    return Err(EvaluateError::new(
                        "conditional statements are only valid inside struct or union bodies",
                        stmt.line,
                    ));
                }
            }
        }
        Ok(patterns)
    }

    // ---- expression evaluation ----

    pub fn evaluate_operand(&mut self, expr: &Expr) -> Result<Literal, EvaluateError> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(*literal),
            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.evaluate_operand(lhs)?;
                let right = self.evaluate_operand(rhs)?;
                self.evaluate_operator(&left, &right, *op, expr.line)
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let condition = self.evaluate_operand(cond)?;
                if condition.is_nonzero() {
                    self.evaluate_operand(then_expr)
                } else {
                    self.evaluate_operand(else_expr)
                }
            }
            ExprKind::RValue(path) => self.evaluate_rvalue(path, expr.line),
            ExprKind::ScopePath(path) => self.evaluate_scope_resolution(path, expr.line),
            ExprKind::Call { name, args } => self.evaluate_function_call(*name, args, expr.line),
        }
    }

    /// Combine two typed literals into a new typed literal. Arithmetic
    /// happens at the promoted type's signedness; integer overflow wraps,
    /// division by zero yields zero, shifts of 128 bits or more yield zero.
    fn evaluate_operator(
        &self,
        left: &Literal,
        right: &Literal,
        op: Operator,
        line: u32,
    ) -> Result<Literal, EvaluateError> {
        if op.is_bitwise()
            && (left.value_type().is_float() || right.value_type().is_float())
        {
            return Err(EvaluateError::new(
                "bitwise operations on floating point numbers are forbidden",
                line,
            ));
        }

        let result_type = promote(left.value_type(), right.value_type());

        if result_type.is_float() {
            let l = left.to_f64();
            let r = right.to_f64();
            let value = match op {
                Operator::Plus => l + r,
                Operator::Minus => l - r,
                Operator::Star => l * r,
                Operator::Slash => l / r,
                Operator::BoolEquals => (l == r) as u8 as f64,
                Operator::BoolNotEquals => (l != r) as u8 as f64,
                Operator::BoolGreaterThan => (l > r) as u8 as f64,
                Operator::BoolLessThan => (l < r) as u8 as f64,
                Operator::BoolGreaterThanOrEquals => (l >= r) as u8 as f64,
                Operator::BoolLessThanOrEquals => (l <= r) as u8 as f64,
                Operator::BoolAnd => (l != 0.0 && r != 0.0) as u8 as f64,
                Operator::BoolOr => (l != 0.0 || r != 0.0) as u8 as f64,
                Operator::BoolXor => ((l != 0.0) != (r != 0.0)) as u8 as f64,
                Operator::BoolNot => (r == 0.0) as u8 as f64,
                _ => {
                    return Err(EvaluateError::new(
                        "invalid operator used in mathematical expression",
                        line,
                    ))
                }
            };
            return Ok(Literal::from_f64(result_type, value));
        }

        if result_type.is_signed() {
            let l = left.to_i128();
            let r = right.to_i128();
            let value: i128 = match op {
                Operator::Plus => l.wrapping_add(r),
                Operator::Minus => l.wrapping_sub(r),
                Operator::Star => l.wrapping_mul(r),
                Operator::Slash => l.checked_div(r).unwrap_or(0),
                Operator::ShiftLeft => {
                    if (0..128).contains(&r) {
                        l.wrapping_shl(r as u32)
                    } else {
                        0
                    }
                }
                Operator::ShiftRight => {
                    if (0..128).contains(&r) {
                        l.wrapping_shr(r as u32)
                    } else {
                        0
                    }
                }
                Operator::BitAnd => l & r,
                Operator::BitOr => l | r,
                Operator::BitXor => l ^ r,
                Operator::BitNot => !r,
                Operator::BoolEquals => (l == r) as i128,
                Operator::BoolNotEquals => (l != r) as i128,
                Operator::BoolGreaterThan => (l > r) as i128,
                Operator::BoolLessThan => (l < r) as i128,
                Operator::BoolGreaterThanOrEquals => (l >= r) as i128,
                Operator::BoolLessThanOrEquals => (l <= r) as i128,
                Operator::BoolAnd => (l != 0 && r != 0) as i128,
                Operator::BoolOr => (l != 0 || r != 0) as i128,
                Operator::BoolXor => ((l != 0) != (r != 0)) as i128,
                Operator::BoolNot => (r == 0) as i128,
                _ => {
                    return Err(EvaluateError::new(
                        "invalid operator used in mathematical expression",
                        line,
                    ))
                }
            };
            return Ok(Literal::wrap(result_type, value as u128));
        }

        // Unsigned and char arithmetic.
        let l = left.to_u128();
        let r = right.to_u128();
        let value: u128 = match op {
            Operator::Plus => l.wrapping_add(r),
            Operator::Minus => l.wrapping_sub(r),
            Operator::Star => l.wrapping_mul(r),
            Operator::Slash => l.checked_div(r).unwrap_or(0),
            Operator::ShiftLeft => {
                if r < 128 {
                    l.wrapping_shl(r as u32)
                } else {
                    0
                }
            }
            Operator::ShiftRight => {
                if r < 128 {
                    l.wrapping_shr(r as u32)
                } else {
                    0
                }
            }
            Operator::BitAnd => l & r,
            Operator::BitOr => l | r,
            Operator::BitXor => l ^ r,
            Operator::BitNot => !r,
            Operator::BoolEquals => (l == r) as u128,
            Operator::BoolNotEquals => (l != r) as u128,
            Operator::BoolGreaterThan => (l > r) as u128,
            Operator::BoolLessThan => (l < r) as u128,
            Operator::BoolGreaterThanOrEquals => (l >= r) as u128,
            Operator::BoolLessThanOrEquals => (l <= r) as u128,
            Operator::BoolAnd => (l != 0 && r != 0) as u128,
            Operator::BoolOr => (l != 0 || r != 0) as u128,
            Operator::BoolXor => ((l != 0) != (r != 0)) as u128,
            Operator::BoolNot => (r == 0) as u128,
            _ => {
                return Err(EvaluateError::new(
                    "invalid operator used in mathematical expression",
                    line,
                ))
            }
        };
        Ok(Literal::wrap(result_type, value))
    }

    /// Resolve a dotted identifier path against the current nest of
    /// struct/union member lists, then read the scalar it lands on.
    fn evaluate_rvalue(&self, path: &[Name], line: u32) -> Result<Literal, EvaluateError> {
        let mut members: &[Pattern] = match self.member_stack.last() {
            Some(top) => top,
            None => {
                return Err(EvaluateError::new(
                    "no enclosing scope to resolve identifier",
                    line,
                ))
            }
        };

        let mut current: Option<&Pattern> = None;
        for &ident in path {
            if let Some(pattern) = current {
                match pattern.value {
                    PatternValue::Struct | PatternValue::Union => members = &pattern.children,
                    _ => {
                        return Err(EvaluateError::new(
                            "tried to access member of a non-struct/union type",
                            line,
                        ))
                    }
                }
            }
            let target = self.interner.resolve(ident);
            current = members.iter().find(|member| member.name == target);
            if current.is_none() {
                return Err(EvaluateError::new(
                    format!("could not find identifier '{}'", target),
                    line,
                ));
            }
        }

        match current {
            Some(pattern) => self.read_scalar(pattern, line),
            None => Err(EvaluateError::new("empty r-value path", line)),
        }
    }

    /// Read `pattern.size` bytes at the pattern's offset and wrap them in a
    /// literal of the matching value type, swapped to the current endianness.
    fn read_scalar(&self, pattern: &Pattern, line: u32) -> Result<Literal, EvaluateError> {
        let endian = self.effective_endian();
        match pattern.value {
            PatternValue::Unsigned(_) | PatternValue::Enum { .. } => {
                if !matches!(pattern.size, 1 | 2 | 4 | 8 | 16) {
                    return Err(EvaluateError::new("invalid r-value size", line));
                }
                let bytes = self.read_bytes(pattern.offset, pattern.size, line)?;
                Ok(width_literal_unsigned(
                    pattern.size,
                    unsigned_from_bytes(&bytes, endian),
                ))
            }
            PatternValue::Signed(_) => {
                if !matches!(pattern.size, 1 | 2 | 4 | 8 | 16) {
                    return Err(EvaluateError::new("invalid r-value size", line));
                }
                let bytes = self.read_bytes(pattern.offset, pattern.size, line)?;
                Ok(width_literal_signed(
                    pattern.size,
                    unsigned_from_bytes(&bytes, endian),
                ))
            }
            PatternValue::Character(_) => {
                let bytes = self.read_bytes(pattern.offset, 1, line)?;
                Ok(Literal::Char(bytes[0]))
            }
            PatternValue::Float(_) => {
                let bytes = self.read_bytes(pattern.offset, pattern.size, line)?;
                let raw = unsigned_from_bytes(&bytes, endian);
                match pattern.size {
                    4 => Ok(Literal::Float(f32::from_bits(raw as u32))),
                    8 => Ok(Literal::Double(f64::from_bits(raw as u64))),
                    _ => Err(EvaluateError::new("invalid r-value size", line)),
                }
            }
            _ => Err(EvaluateError::new(
                "tried to use non-scalar value in numeric expression",
                line,
            )),
        }
    }

    /// `Type::Entry` — the first element must name a declared enum, the
    /// second one of its entries; the result is that entry's expression
    /// evaluated.
    fn evaluate_scope_resolution(
        &mut self,
        path: &[Name],
        line: u32,
    ) -> Result<Literal, EvaluateError> {
        let def = match path.first().and_then(|name| self.type_env.get(name)) {
            Some(def) => Rc::clone(def),
            None => return Err(EvaluateError::new("failed to find identifier", line)),
        };

        match &def.kind {
            TypeDefKind::Enum { entries, .. } if path.len() == 2 => {
                match entries.iter().find(|(name, _)| *name == path[1]) {
                    Some((_, expr)) => self.evaluate_operand(expr),
                    None => Err(EvaluateError::new("failed to find identifier", line)),
                }
            }
            _ => Err(EvaluateError::new("failed to find identifier", line)),
        }
    }

    fn evaluate_function_call(
        &mut self,
        name: Name,
        args: &[Expr],
        line: u32,
    ) -> Result<Literal, EvaluateError> {
        let mut params = Vec::with_capacity(args.len());
        for arg in args {
            params.push(self.evaluate_operand(arg)?);
        }

        let function = match self.functions.get(&name) {
            Some(function) => function,
            None => {
                return Err(EvaluateError::new(
                    format!("no function named '{}' found", self.interner.resolve(name)),
                    line,
                ))
            }
        };

        let display = self.interner.resolve(name);
        match function.arity {
            Arity::Unlimited => {}
            Arity::Exact(count) if params.len() != count => {
                return Err(EvaluateError::new(
                    format!(
                        "invalid number of parameters for function '{}', expected {}",
                        display, count
                    ),
                    line,
                ));
            }
            Arity::LessThan(count) if params.len() >= count => {
                return Err(EvaluateError::new(
                    format!(
                        "too many parameters for function '{}', expected fewer than {}",
                        display, count
                    ),
                    line,
                ));
            }
            Arity::MoreThan(count) if params.len() <= count => {
                return Err(EvaluateError::new(
                    format!(
                        "too few parameters for function '{}', expected more than {}",
                        display, count
                    ),
                    line,
                ));
            }
            _ => {}
        }

        let ctx = FnContext {
            data: self.data,
            endian: self.effective_endian(),
        };
        (function.handler)(&ctx, &params).map_err(|message| EvaluateError::new(message, line))
    }

    // ---- placement ----

    fn evaluate_placement_offset(
        &mut self,
        offset: Option<&Expr>,
        what: &str,
        line: u32,
    ) -> Result<(), EvaluateError> {
        if let Some(expr) = offset {
            let value = self.evaluate_operand(expr)?;
            if value.value_type().is_float() {
                return Err(EvaluateError::new(
                    format!("{} must be an integer value", what),
                    line,
                ));
            }
            self.cursor = value.to_u128() as u64;
        }
        Ok(())
    }

    fn evaluate_variable(
        &mut self,
        name: Name,
        ty: &Type,
        offset: Option<&Expr>,
        line: u32,
    ) -> Result<Pattern, EvaluateError> {
        self.evaluate_placement_offset(offset, "placement offset", line)?;
        if self.cursor >= self.data.actual_size() {
            return Err(EvaluateError::new(
                "cannot place variable past the end of the data",
                line,
            ));
        }

        let mut pattern = self.evaluate_type(ty)?;
        pattern.name = self.interner.resolve(name).to_string();
        pattern.endian = self.effective_endian();
        self.current_endian = None;
        Ok(pattern)
    }

    fn evaluate_type(&mut self, ty: &Type) -> Result<Pattern, EvaluateError> {
        // The outermost qualifier wins; an already-active override stays in
        // force for the whole nested placement.
        if self.current_endian.is_none() {
            self.current_endian = ty.endian;
        }

        match ty.kind {
            TypeKind::Builtin(vt) => self.evaluate_builtin(vt, ty.line),
            TypeKind::Named(name) => {
                let def = match self.type_env.get(&name) {
                    Some(def) => Rc::clone(def),
                    None => {
                        return Err(EvaluateError::new(
                            format!("unknown type name '{}'", self.interner.resolve(name)),
                            ty.line,
                        ))
                    }
                };
                let mut pattern = self.evaluate_typedef(&def)?;
                pattern.type_name = self.interner.resolve(name).to_string();
                Ok(pattern)
            }
        }
    }

    fn evaluate_typedef(&mut self, def: &TypeDef) -> Result<Pattern, EvaluateError> {
        match &def.kind {
            TypeDefKind::Alias(inner) => self.evaluate_type(inner),
            TypeDefKind::Struct { members } => self.evaluate_struct(members),
            TypeDefKind::Union { members } => self.evaluate_union(members),
            TypeDefKind::Enum {
                underlying,
                entries,
            } => self.evaluate_enum(*underlying, entries, def.line),
            TypeDefKind::Bitfield { entries } => self.evaluate_bitfield(entries, def.line),
        }
    }

    fn evaluate_builtin(&mut self, vt: ValueType, line: u32) -> Result<Pattern, EvaluateError> {
        if vt == ValueType::Padding {
            return Err(EvaluateError::new("invalid builtin type", line));
        }

        let size = vt.size();
        let offset = self.cursor;
        let endian = self.effective_endian();
        let bytes = self.read_bytes(offset, size, line)?;

        let value = if vt.is_unsigned() {
            PatternValue::Unsigned(unsigned_from_bytes(&bytes, endian))
        } else if vt.is_signed() {
            PatternValue::Signed(signed_from_bytes(&bytes, endian))
        } else if vt == ValueType::Char {
            PatternValue::Character(bytes[0] as char)
        } else if vt == ValueType::Float {
            PatternValue::Float(f32::from_bits(unsigned_from_bytes(&bytes, endian) as u32) as f64)
        } else {
            PatternValue::Float(f64::from_bits(unsigned_from_bytes(&bytes, endian) as u64))
        };

        self.cursor += size;

        let mut pattern = Pattern::new(vt.name(), offset, size, value);
        pattern.endian = endian;
        pattern.color = self.next_color();
        Ok(pattern)
    }

    /// Evaluate one struct/union member, inlining conditional bodies into
    /// the member stream. The endian override is saved and restored around
    /// each member so an enclosing override survives member-local ones.
    fn evaluate_member(&mut self, stmt: &Stmt) -> Result<Vec<Pattern>, EvaluateError> {
        let saved_endian = self.current_endian;

        let patterns = match &stmt.kind {
            StmtKind::Variable { name, ty, offset } => {
                vec![self.evaluate_variable(*name, ty, offset.as_ref(), stmt.line)?]
            }
            StmtKind::Array {
                name,
                ty,
                size,
                offset,
            } => vec![self.evaluate_array(*name, ty, size, offset.as_ref(), stmt.line)?],
            StmtKind::Pointer {
                name,
                ty,
                size_ty,
                offset,
            } => vec![self.evaluate_pointer(*name, ty, size_ty, offset.as_ref(), stmt.line)?],
            StmtKind::Conditional {
                condition,
                true_body,
                false_body,
            } => {
                let chosen = if self.evaluate_operand(condition)?.is_nonzero() {
                    true_body
                } else {
                    false_body
                };
                let mut patterns = Vec::new();
                for member in chosen {
                    patterns.extend(self.evaluate_member(member)?);
                }
                patterns
            }
            StmtKind::TypeDef(_) => {
                return Err(EvaluateError::new("invalid struct member", stmt.line))
            }
        };

        self.current_endian = saved_endian;
        Ok(patterns)
    }

    fn evaluate_struct(&mut self, members: &[Stmt]) -> Result<Pattern, EvaluateError> {
        let start = self.cursor;
        self.member_stack.push(Vec::new());

        let mut failure = None;
        for member in members {
            match self.evaluate_member(member) {
                Ok(patterns) => self.member_stack.last_mut().unwrap().extend(patterns),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let children = self.member_stack.pop().unwrap();
        if let Some(e) = failure {
            return Err(e);
        }

        let mut pattern = Pattern::new("", start, self.cursor - start, PatternValue::Struct)
            .with_children(children);
        pattern.endian = self.effective_endian();
        pattern.color = self.next_color();
        Ok(pattern)
    }

    fn evaluate_union(&mut self, members: &[Stmt]) -> Result<Pattern, EvaluateError> {
        let start = self.cursor;
        self.member_stack.push(Vec::new());

        // Every member starts over at the union's base offset; the union
        // spans the high-water mark.
        let mut end = start;
        let mut failure = None;
        for member in members {
            match self.evaluate_member(member) {
                Ok(patterns) => {
                    self.member_stack.last_mut().unwrap().extend(patterns);
                    end = end.max(self.cursor);
                    self.cursor = start;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let children = self.member_stack.pop().unwrap();
        if let Some(e) = failure {
            return Err(e);
        }
        self.cursor = end;

        let mut pattern =
            Pattern::new("", start, end - start, PatternValue::Union).with_children(children);
        pattern.endian = self.effective_endian();
        pattern.color = self.next_color();
        Ok(pattern)
    }

    fn evaluate_enum(
        &mut self,
        underlying: ValueType,
        entries: &[(Name, Expr)],
        line: u32,
    ) -> Result<Pattern, EvaluateError> {
        let mut entry_values = Vec::with_capacity(entries.len());
        for (name, expr) in entries {
            let value = self.evaluate_operand(expr)?;
            entry_values.push((value, self.interner.resolve(*name).to_string()));
        }

        let size = underlying.size();
        let offset = self.cursor;
        let endian = self.effective_endian();

        // The entry list is constant; when the underlying bytes are out of
        // range the enum is placed unresolved instead of failing.
        let readable = offset
            .checked_add(size)
            .map_or(false, |end| end <= self.data.actual_size());
        let (value, entry) = if readable {
            let bytes = self.read_bytes(offset, size, line)?;
            let raw = unsigned_from_bytes(&bytes, endian);
            let mask = width_mask(size);
            let matched = entry_values
                .iter()
                .find(|(literal, _)| literal.to_u128() & mask == raw)
                .map(|(_, name)| name.clone());
            (Some(raw), matched)
        } else {
            (None, None)
        };

        self.cursor += size;

        let mut pattern = Pattern::new(
            "",
            offset,
            size,
            PatternValue::Enum {
                value,
                entry,
                entries: entry_values,
            },
        );
        pattern.endian = endian;
        pattern.color = self.next_color();
        Ok(pattern)
    }

    fn evaluate_bitfield(
        &mut self,
        entries: &[(Name, Expr)],
        line: u32,
    ) -> Result<Pattern, EvaluateError> {
        let mut fields = Vec::with_capacity(entries.len());
        let mut total_bits: u64 = 0;
        for (name, expr) in entries {
            let value = self.evaluate_operand(expr)?;
            if value.value_type().is_float() {
                return Err(EvaluateError::new(
                    "bitfield entry size must be an integer value",
                    line,
                ));
            }
            let bits = value.to_i128();
            if !(1..=64).contains(&bits) {
                return Err(EvaluateError::new(
                    "bitfield entry must occupy between 1 and 64 bits",
                    line,
                ));
            }
            total_bits += bits as u64;
            fields.push((self.interner.resolve(*name).to_string(), bits as u64));
        }
        if total_bits > 64 {
            return Err(EvaluateError::new(
                "bitfield occupies more than 64 bits",
                line,
            ));
        }

        let size = total_bits / 8 + 1;
        let offset = self.cursor;
        self.cursor += size;

        let mut pattern = Pattern::new("", offset, size, PatternValue::Bitfield { fields });
        pattern.endian = self.effective_endian();
        pattern.color = self.next_color();
        Ok(pattern)
    }

    fn evaluate_array(
        &mut self,
        name: Option<Name>,
        ty: &Type,
        size: &Expr,
        offset: Option<&Expr>,
        line: u32,
    ) -> Result<Pattern, EvaluateError> {
        self.evaluate_placement_offset(offset, "placement offset", line)?;
        let start = self.cursor;

        let count_literal = self.evaluate_operand(size)?;
        if count_literal.value_type().is_float() {
            return Err(EvaluateError::new(
                "array size must be an integer value",
                line,
            ));
        }
        let count = count_literal.to_u128() as u64;

        // padding[N] consumes bytes without reading them.
        if matches!(ty.kind, TypeKind::Builtin(ValueType::Padding)) {
            self.cursor += count;
            let mut pattern = Pattern::new("padding", start, count, PatternValue::Padding);
            if let Some(name) = name {
                pattern.name = self.interner.resolve(name).to_string();
            }
            pattern.endian = self.effective_endian();
            pattern.color = self.next_color();
            self.current_endian = None;
            return Ok(pattern);
        }

        let mut entries: Vec<Pattern> = Vec::new();
        let mut color: Option<u32> = None;
        for index in 0..count {
            if self.cursor >= self.data.actual_size() {
                return Err(EvaluateError::new("array exceeds size of file", line));
            }

            let mut entry = self.evaluate_type(ty)?;
            entry.name = format!("[{}]", index);
            entry.endian = self.effective_endian();
            entry.color = *color.get_or_insert(entry.color);
            entries.push(entry);

            if self.cursor > self.data.actual_size() {
                return Err(EvaluateError::new("array exceeds size of file", line));
            }
        }

        let mut pattern = if entries.is_empty() {
            Pattern::new("padding", start, 0, PatternValue::Padding)
        } else if matches!(entries[0].value, PatternValue::Character(_)) {
            let bytes = self.read_bytes(start, self.cursor - start, line)?;
            let text: String = bytes.iter().map(|&b| b as char).collect();
            Pattern::new(
                format!("char[{}]", entries.len()),
                start,
                self.cursor - start,
                PatternValue::String(text),
            )
        } else {
            Pattern::new(
                format!("{}[{}]", entries[0].type_name, entries.len()),
                start,
                self.cursor - start,
                PatternValue::Array,
            )
            .with_children(entries)
        };

        if let Some(name) = name {
            pattern.name = self.interner.resolve(name).to_string();
        }
        pattern.endian = self.effective_endian();
        if let Some(color) = color {
            pattern.color = color;
        } else {
            pattern.color = self.next_color();
        }
        self.current_endian = None;
        Ok(pattern)
    }

    fn evaluate_pointer(
        &mut self,
        name: Name,
        ty: &Type,
        size_ty: &Type,
        offset: Option<&Expr>,
        line: u32,
    ) -> Result<Pattern, EvaluateError> {
        self.evaluate_placement_offset(offset, "pointer offset", line)?;
        let pointer_offset = self.cursor;

        let width = match size_ty.kind {
            TypeKind::Builtin(vt) if vt.is_integer() => vt.size(),
            _ => {
                return Err(EvaluateError::new(
                    "pointer size is not a builtin type",
                    line,
                ))
            }
        };
        if self.current_endian.is_none() {
            self.current_endian = size_ty.endian;
        }

        let bytes = self.read_bytes(pointer_offset, width, line)?;
        let address = unsigned_from_bytes(&bytes, self.effective_endian()) as u64;

        // Chase the pointer, lay out the pointee, then continue after the
        // pointer field itself.
        self.cursor = address;
        let pointee = self.evaluate_type(ty)?;
        self.cursor = pointer_offset + width;

        let mut pattern = Pattern::new(
            format!("{}*", pointee.type_name),
            pointer_offset,
            width,
            PatternValue::Pointer { address },
        );
        pattern.name = self.interner.resolve(name).to_string();
        pattern.endian = self.effective_endian();
        pattern.color = self.next_color();
        pattern.children.push(pointee);
        self.current_endian = None;
        Ok(pattern)
    }

    // ---- shared helpers ----

    fn effective_endian(&self) -> Endianness {
        self.current_endian.unwrap_or(self.default_endian)
    }

    fn next_color(&mut self) -> u32 {
        let color = PALETTE[self.color_index % PALETTE.len()];
        self.color_index += 1;
        color
    }

    /// Bounds-checked read; the raw trait read leaves out-of-range bytes
    /// unspecified, so the range is validated first.
    fn read_bytes(&self, offset: u64, len: u64, line: u32) -> Result<Vec<u8>, EvaluateError> {
        if offset
            .checked_add(len)
            .map_or(true, |end| end > self.data.actual_size())
        {
            return Err(EvaluateError::new(
                format!(
                    "read of {} bytes at offset {:#x} is past the end of the data",
                    len, offset
                ),
                line,
            ));
        }
        let mut buffer = vec![0u8; len as usize];
        self.data.read(offset, &mut buffer, len as usize);
        Ok(buffer)
    }
}

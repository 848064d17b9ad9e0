// Registered functions callable from schema expressions.

use rustc_hash::FxHashMap;

use super::byte_source::ByteSource;
use super::{unsigned_from_bytes, width_literal_signed, width_literal_unsigned};
use crate::lexer::token::Literal;
use crate::name::{Name, StringInterner};
use crate::parser::ast::Endianness;

/// Parameter-count rule checked after all arguments are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Unlimited,
    LessThan(usize),
    MoreThan(usize),
}

/// Context handed to function handlers: the byte source being evaluated and
/// the endianness in effect at the call site.
pub struct FnContext<'a> {
    pub data: &'a dyn ByteSource,
    pub endian: Endianness,
}

impl FnContext<'_> {
    /// Bounds-checked read. The raw trait read leaves out-of-range bytes
    /// unspecified, so the range is validated first.
    pub fn read_bytes(&self, offset: u64, len: u64) -> Result<Vec<u8>, String> {
        if offset
            .checked_add(len)
            .map_or(true, |end| end > self.data.actual_size())
        {
            return Err(format!(
                "read of {} bytes at offset {:#x} is past the end of the data",
                len, offset
            ));
        }
        let mut buffer = vec![0u8; len as usize];
        self.data.read(offset, &mut buffer, len as usize);
        Ok(buffer)
    }
}

pub type FunctionHandler = Box<dyn Fn(&FnContext<'_>, &[Literal]) -> Result<Literal, String>>;

/// A registered function: its arity rule and handler.
pub struct Function {
    pub arity: Arity,
    pub handler: FunctionHandler,
}

/// Offset returned by `findSequence` when the needle does not occur.
pub const FIND_SEQUENCE_NOT_FOUND: u64 = u64::MAX;

/// Register the built-in functions available to every schema.
pub(crate) fn register_defaults(
    functions: &mut FxHashMap<Name, Function>,
    interner: &mut StringInterner,
) {
    functions.insert(
        interner.intern("findSequence"),
        Function {
            arity: Arity::MoreThan(1),
            handler: Box::new(find_sequence),
        },
    );
    functions.insert(
        interner.intern("readUnsigned"),
        Function {
            arity: Arity::Exact(2),
            handler: Box::new(read_unsigned),
        },
    );
    functions.insert(
        interner.intern("readSigned"),
        Function {
            arity: Arity::Exact(2),
            handler: Box::new(read_signed),
        },
    );
}

/// findSequence(byte, byte, ...) — offset of the first occurrence of the
/// byte sequence, or `FIND_SEQUENCE_NOT_FOUND`.
fn find_sequence(ctx: &FnContext<'_>, params: &[Literal]) -> Result<Literal, String> {
    let needle: Vec<u8> = params.iter().map(|p| p.to_u128() as u8).collect();
    let haystack = ctx.read_bytes(0, ctx.data.actual_size())?;

    let offset = haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos as u64)
        .unwrap_or(FIND_SEQUENCE_NOT_FOUND);

    Ok(Literal::U64(offset))
}

/// readUnsigned(offset, size) — size must be 1, 2, 4, 8 or 16.
fn read_unsigned(ctx: &FnContext<'_>, params: &[Literal]) -> Result<Literal, String> {
    let (offset, size) = read_params(params)?;
    let bytes = ctx.read_bytes(offset, size)?;
    let value = unsigned_from_bytes(&bytes, ctx.endian);
    Ok(width_literal_unsigned(size, value))
}

/// readSigned(offset, size) — size must be 1, 2, 4, 8 or 16.
fn read_signed(ctx: &FnContext<'_>, params: &[Literal]) -> Result<Literal, String> {
    let (offset, size) = read_params(params)?;
    let bytes = ctx.read_bytes(offset, size)?;
    let value = unsigned_from_bytes(&bytes, ctx.endian);
    Ok(width_literal_signed(size, value))
}

fn read_params(params: &[Literal]) -> Result<(u64, u64), String> {
    let offset = params[0].to_u128() as u64;
    let size = params[1].to_u128() as u64;
    if !matches!(size, 1 | 2 | 4 | 8 | 16) {
        return Err(format!("invalid read size {}", size));
    }
    Ok((offset, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::byte_source::SliceByteSource;

    fn ctx<'a>(source: &'a SliceByteSource<'a>, endian: Endianness) -> FnContext<'a> {
        FnContext {
            data: source,
            endian,
        }
    }

    #[test]
    fn find_sequence_reports_first_match() {
        let data = [0x00, 0xAB, 0xCD, 0xAB, 0xCD];
        let source = SliceByteSource::new(&data);
        let result = find_sequence(
            &ctx(&source, Endianness::Little),
            &[Literal::U8(0xAB), Literal::U8(0xCD)],
        )
        .unwrap();
        assert_eq!(result, Literal::U64(1));
    }

    #[test]
    fn find_sequence_miss_returns_the_sentinel() {
        let data = [0x00, 0x01, 0x02];
        let source = SliceByteSource::new(&data);
        let result = find_sequence(
            &ctx(&source, Endianness::Little),
            &[Literal::U8(0xFF), Literal::U8(0xFE)],
        )
        .unwrap();
        assert_eq!(result, Literal::U64(FIND_SEQUENCE_NOT_FOUND));
    }

    #[test]
    fn read_unsigned_respects_endianness() {
        let data = [0x12, 0x34];
        let source = SliceByteSource::new(&data);
        let args = [Literal::S32(0), Literal::S32(2)];
        assert_eq!(
            read_unsigned(&ctx(&source, Endianness::Little), &args).unwrap(),
            Literal::U16(0x3412)
        );
        assert_eq!(
            read_unsigned(&ctx(&source, Endianness::Big), &args).unwrap(),
            Literal::U16(0x1234)
        );
    }

    #[test]
    fn read_signed_sign_extends() {
        let data = [0xFF];
        let source = SliceByteSource::new(&data);
        let result = read_signed(
            &ctx(&source, Endianness::Little),
            &[Literal::S32(0), Literal::S32(1)],
        )
        .unwrap();
        assert_eq!(result, Literal::S8(-1));
    }

    #[test]
    fn odd_read_sizes_are_rejected() {
        let data = [0u8; 8];
        let source = SliceByteSource::new(&data);
        let result = read_unsigned(
            &ctx(&source, Endianness::Little),
            &[Literal::S32(0), Literal::S32(3)],
        );
        assert_eq!(result.unwrap_err(), "invalid read size 3");
    }

    #[test]
    fn reads_past_the_end_fail() {
        let data = [0u8; 2];
        let source = SliceByteSource::new(&data);
        let result = read_unsigned(
            &ctx(&source, Endianness::Little),
            &[Literal::S32(1), Literal::S32(2)],
        );
        assert!(result.is_err());
    }
}

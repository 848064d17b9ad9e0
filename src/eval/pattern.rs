// Pattern tree: the evaluator's output describing decoded byte regions.

use crate::lexer::token::Literal;
use crate::parser::ast::Endianness;

/// Display colors assigned to patterns in rotation, RGBA.
pub(crate) const PALETTE: [u32; 8] = [
    0x50_89_C5_FF,
    0xC5_50_89_FF,
    0x89_C5_50_FF,
    0xC5_9A_50_FF,
    0x50_C5_9A_FF,
    0x9A_50_C5_FF,
    0xC5_C5_50_FF,
    0x50_C5_C5_FF,
];

/// An annotated region of the byte source. Each pattern owns its children
/// exclusively; traversal is top-down.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// Variable name; empty for unnamed regions (e.g. pointees).
    pub name: String,
    /// Type name, e.g. "u32", "Header", "u16[4]".
    pub type_name: String,
    /// Absolute byte offset.
    pub offset: u64,
    /// Byte size.
    pub size: u64,
    /// Byte order the region was (or would be) read with. Fixed at creation.
    pub endian: Endianness,
    /// Display color, RGBA.
    pub color: u32,
    /// Decoded value, if the variant carries one.
    pub value: PatternValue,
    /// Child patterns: struct/union members, array elements, the pointee.
    pub children: Vec<Pattern>,
}

/// The variant-specific payload of a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternValue {
    Unsigned(u128),
    Signed(i128),
    Float(f64),
    Character(char),
    /// Contiguous char array.
    String(String),
    /// Decoded underlying value plus the matching entry, when the bytes were
    /// readable and an entry matched.
    Enum {
        value: Option<u128>,
        entry: Option<String>,
        entries: Vec<(Literal, String)>,
    },
    /// Field layout only; bitfields read no bytes at placement.
    Bitfield { fields: Vec<(String, u64)> },
    Struct,
    Union,
    Array,
    /// Decoded target address; the pointee is the single child.
    Pointer { address: u64 },
    Padding,
}

impl Pattern {
    pub fn new(type_name: impl Into<String>, offset: u64, size: u64, value: PatternValue) -> Self {
        Self {
            name: String::new(),
            type_name: type_name.into(),
            offset,
            size,
            endian: Endianness::Little,
            color: 0,
            value,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Pattern>) -> Self {
        self.children = children;
        self
    }

    /// Whether an r-value path may terminate at this pattern.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self.value,
            PatternValue::Unsigned(_)
                | PatternValue::Signed(_)
                | PatternValue::Float(_)
                | PatternValue::Character(_)
                | PatternValue::Enum { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_construction() {
        let pattern = Pattern::new("u32", 0, 4, PatternValue::Unsigned(0xDEADBEEF));
        assert_eq!(pattern.type_name, "u32");
        assert_eq!(pattern.offset, 0);
        assert_eq!(pattern.size, 4);
        assert_eq!(pattern.value, PatternValue::Unsigned(0xDEADBEEF));
        assert!(pattern.children.is_empty());
    }

    #[test]
    fn scalar_classification() {
        assert!(Pattern::new("u8", 0, 1, PatternValue::Unsigned(0)).is_scalar());
        assert!(Pattern::new("s16", 0, 2, PatternValue::Signed(-5)).is_scalar());
        assert!(!Pattern::new("S", 0, 4, PatternValue::Struct).is_scalar());
        assert!(!Pattern::new("u8[0]", 0, 0, PatternValue::Padding).is_scalar());
    }

    #[test]
    fn children_are_owned() {
        let parent = Pattern::new("S", 0, 3, PatternValue::Struct).with_children(vec![
            Pattern::new("u8", 0, 1, PatternValue::Unsigned(1)),
            Pattern::new("u16", 1, 2, PatternValue::Unsigned(2)),
        ]);
        assert_eq!(parent.children.len(), 2);
        assert_eq!(parent.children[1].offset, 1);
    }
}

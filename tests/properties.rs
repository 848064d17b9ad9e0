// Property-based tests for the engine's layout and promotion invariants.
//
// Uses proptest with explicit configuration to keep run times stable.

use proptest::prelude::*;

use bytepat::{promote, Endianness, Engine, Pattern, PatternValue, SliceByteSource, ValueType};

/// The promotion ladder, highest rank first.
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

/// Scalar types usable as struct/union members, with their widths.
const SCALARS: [(&str, u64); 13] = [
    ("u8", 1),
    ("s8", 1),
    ("u16", 2),
    ("s16", 2),
    ("u32", 4),
    ("s32", 4),
    ("u64", 8),
    ("s64", 8),
    ("u128", 16),
    ("s128", 16),
    ("float", 4),
    ("double", 8),
    ("char", 1),
];

fn run(source: &str, data: &[u8]) -> Vec<Pattern> {
    let byte_source = SliceByteSource::new(data);
    Engine::new()
        .run(source, &byte_source)
        .expect("engine run failed")
}

fn member_list() -> impl Strategy<Value = Vec<(&'static str, u64)>> {
    prop::collection::vec(prop::sample::select(SCALARS.to_vec()), 1..=6)
}

fn assert_inside(pattern: &Pattern, len: u64) {
    assert!(
        pattern.offset + pattern.size <= len,
        "pattern '{}' [{}, {}) escapes the {}-byte source",
        pattern.name,
        pattern.offset,
        pattern.offset + pattern.size,
        len
    );
    for child in &pattern.children {
        assert_inside(child, len);
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    // The promoted type of any operand pair is the higher-ranked of the two.
    #[test]
    fn promotion_picks_the_higher_rank(left in 0usize..13, right in 0usize..13) {
        let expected = LADDER[left.min(right)];
        prop_assert_eq!(promote(LADDER[left], LADDER[right]), expected);
    }

    // A struct's size is the sum of its members' sizes and its members sit
    // at non-decreasing offsets; every pattern stays inside the source.
    #[test]
    fn struct_size_is_the_member_sum(members in member_list()) {
        let total: u64 = members.iter().map(|(_, size)| size).sum();
        let mut source = String::from("struct S { ");
        for (index, (ty, _)) in members.iter().enumerate() {
            source.push_str(&format!("{} m{}; ", ty, index));
        }
        source.push_str("}; S s @ 0;");

        let data = vec![0u8; total as usize];
        let patterns = run(&source, &data);

        let s = &patterns[0];
        prop_assert_eq!(s.size, total);
        prop_assert_eq!(s.children.len(), members.len());
        let mut expected_offset = 0;
        for (child, (_, size)) in s.children.iter().zip(&members) {
            prop_assert_eq!(child.offset, expected_offset);
            prop_assert_eq!(child.size, *size);
            expected_offset += size;
        }
        for pattern in &patterns {
            assert_inside(pattern, data.len() as u64);
        }
    }

    // A union's size is its largest member's size and every member starts
    // at the union's own offset.
    #[test]
    fn union_size_is_the_member_max(members in member_list()) {
        let largest: u64 = members.iter().map(|(_, size)| *size).max().unwrap();
        let mut source = String::from("union U { ");
        for (index, (ty, _)) in members.iter().enumerate() {
            source.push_str(&format!("{} m{}; ", ty, index));
        }
        source.push_str("}; U u @ 0;");

        let data = vec![0u8; largest as usize];
        let patterns = run(&source, &data);

        let u = &patterns[0];
        prop_assert_eq!(u.size, largest);
        for child in &u.children {
            prop_assert_eq!(child.offset, 0);
        }
        for pattern in &patterns {
            assert_inside(pattern, data.len() as u64);
        }
    }

    // An alias with a `be` qualifier reads big-endian; an unqualified
    // variable reads with the evaluator's default.
    #[test]
    fn endianness_composition(value in any::<u16>()) {
        let be_data = value.to_be_bytes();
        let patterns = run("using Word = be u16; Word w @ 0;", &be_data);
        prop_assert_eq!(&patterns[0].value, &PatternValue::Unsigned(value as u128));
        prop_assert_eq!(patterns[0].endian, Endianness::Big);

        let le_data = value.to_le_bytes();
        let patterns = run("u16 w @ 0;", &le_data);
        prop_assert_eq!(&patterns[0].value, &PatternValue::Unsigned(value as u128));
        prop_assert_eq!(patterns[0].endian, Endianness::Little);
    }

    // Bitfields keep every field in [1, 64] bits, bound the total at 64,
    // and span floor(total / 8) + 1 bytes.
    #[test]
    fn bitfield_sizing(widths in prop::collection::vec(1u64..=64, 1..=4)) {
        let total: u64 = widths.iter().sum();
        let mut source = String::from("bitfield B { ");
        for (index, width) in widths.iter().enumerate() {
            source.push_str(&format!("f{} : {}; ", index, width));
        }
        source.push_str("}; B b @ 0;");

        let byte_source_data = [0u8; 1];
        let byte_source = SliceByteSource::new(&byte_source_data);
        let result = Engine::new().run(&source, &byte_source);

        if total > 64 {
            prop_assert!(result.is_err());
        } else {
            let patterns = result.expect("bitfield evaluation failed");
            prop_assert_eq!(patterns[0].size, total / 8 + 1);
            match &patterns[0].value {
                PatternValue::Bitfield { fields } => {
                    prop_assert_eq!(fields.len(), widths.len());
                    for (field, width) in fields.iter().zip(&widths) {
                        prop_assert_eq!(field.1, *width);
                    }
                }
                other => panic!("expected a bitfield pattern, got {:?}", other),
            }
        }
    }
}

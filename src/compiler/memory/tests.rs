#[cfg(test)]
mod tests {
    use crate::{
        compiler::{
            config::{BitPacking, GeneratorConfig},
            semantics::{
                mangle::mangle,
                symbol_table::{ScopeTree, VarKind, Variable},
            },
        },
        project::model::ScopeModel,
    };

    use super::super::*;

    fn program(text: &str) -> ScopeTree {
        let model: ScopeModel = serde_yaml::from_str(text).unwrap();
        let mut tree = ScopeTree::from_model(&model).unwrap();
        mangle(&mut tree).unwrap();
        tree
    }

    fn address_of(tree: &ScopeTree, name: &str) -> u32 {
        tree.lookup(tree.root(), name).unwrap().address.unwrap()
    }

    const PROGRAM: &str = "
variables:
  - {name: A, type: fixed, initial: [5]}
  - {name: B, type: {bit: 8}, top: 2, initial: [1, 2, 3]}
  - {name: C, type: character, common: true, initial: ['HI']}
";

    #[test]
    fn test_partitions() {
        let mut tree = program(PROGRAM);
        let layout = layout(&mut tree, &GeneratorConfig::default()).unwrap();

        assert_eq!(layout.common_base, 0);
        assert_eq!(address_of(&tree, "C"), 0);
        assert_eq!(layout.non_common_base, 4);
        assert!(layout.has_common());

        // The identifier descriptor, its text, then the monitor 13 block.
        assert_eq!(layout.where_monitor_23, 4);
        assert_eq!(layout.where_monitor_13, 14);

        assert_eq!(address_of(&tree, "A"), 1186);
        assert_eq!(address_of(&tree, "B"), 1190);
        assert_eq!(layout.free_base, 1193);
        assert_eq!(layout.free_point, 1195);
        assert_eq!(layout.free_limit(), MEMORY_SIZE);
    }

    #[test]
    fn test_initial_values() {
        let mut tree = program(PROGRAM);
        let layout = layout(&mut tree, &GeneratorConfig::default()).unwrap();
        let image = &layout.image;

        assert_eq!(image.get_fixed(1186).unwrap(), 5);
        assert_eq!(&image.bytes()[1190..1193], &[1, 2, 3]);
        assert_eq!(image.get_fixed(0).unwrap(), (1 << 24) | 1193);
        assert_eq!(ebcdic::decode(&image.get_character(0).unwrap()), "HI");
        assert_eq!(
            ebcdic::decode(&image.get_character(layout.where_monitor_23).unwrap()),
            "XCOM-I"
        );
    }

    #[test]
    fn test_monitor_13_tables() {
        let mut tree = program("variables: []");
        let layout = layout(&mut tree, &GeneratorConfig::default()).unwrap();
        let image = &layout.image;
        let base = layout.where_monitor_13;
        let con = base + 24;

        assert_eq!(image.get_fixed(base).unwrap(), 0);
        assert_eq!(image.get_fixed(base + 4).unwrap(), con);
        assert_eq!(image.get_fixed(base + 12).unwrap(), con + 500);
        assert_eq!(image.get_fixed(base + 16).unwrap(), con + 1000);
        assert_eq!(image.get_fixed(con).unwrap(), (15 << 24) | (con + 100));
        assert_eq!(image.get_fixed(con + 4).unwrap(), (15 << 24) | (con + 116));

        let vals = con + 1000;
        assert_eq!(image.get_fixed(vals).unwrap(), (15 << 24) | (vals + 100));
        assert_eq!(image.get_fixed(vals + 4).unwrap(), 0);
        assert_eq!(image.get_fixed(vals + 32).unwrap(), (15 << 24) | (vals + 116));
        assert_eq!(image.get_fixed(vals + 48).unwrap(), (15 << 24) | (vals + 132));
        assert_eq!(layout.free_base, vals + 148);
    }

    #[test]
    fn test_memory_map() {
        let mut tree = program(PROGRAM);
        let layout = layout(&mut tree, &GeneratorConfig::default()).unwrap();
        let map = &layout.map;

        assert_eq!(map.len(), 4);
        assert_eq!(map.num_symbols(), 3);
        assert_eq!(map.max_symbol_length(), 1);
        assert_eq!(map.get(0).unwrap().datatype, MapDatatype::Character);
        assert_eq!(map.get(1190).unwrap().num_elements, 3);
        assert_eq!(map.get(1190).unwrap().bit_width, 8);
        assert_eq!(map.get(1193).unwrap().datatype, MapDatatype::EbcdicCodes);
        assert_eq!(map.get(1193).unwrap().mangled, "C");
        assert_eq!(map.by_symbol(), vec![1, 2, 0]);
    }

    #[test]
    fn test_procedure_locals_and_parameters() {
        let mut tree = program(
            "
variables:
  - name: P
    type:
      procedure:
        parameters: [X]
        scope:
          variables:
            - {name: X, type: fixed}
            - {name: Y, type: character}
  - {name: Z, type: fixed}
",
        );
        let layout = layout(&mut tree, &GeneratorConfig::default()).unwrap();
        let z = address_of(&tree, "Z");
        let names: Vec<&str> = layout
            .map
            .variables()
            .map(|(_, e)| e.mangled.as_str())
            .collect();
        assert_eq!(names, vec!["Z", "PxX", "PxY"]);
        assert_eq!(layout.map.get(z + 4).unwrap().mangled, "PxX");
        assert_eq!(layout.free_base, z + 12);
    }

    #[test]
    fn test_based_record() {
        let mut tree = program(
            "
variables:
  - name: R
    type:
      based:
        record:
          - {name: F, type: fixed}
          - {name: LONGNAME, type: {bit: 8}, top: 3}
  - {name: S, type: {based: {element: character}}}
",
        );
        let layout = layout(&mut tree, &GeneratorConfig::default()).unwrap();
        let r = layout.map.get(address_of(&tree, "R")).unwrap();
        assert_eq!(r.datatype, MapDatatype::Based);
        assert_eq!(r.fields.len(), 2);
        assert_eq!(r.fields[1].num_elements, 4);
        assert_eq!(r.record_size, 8);
        assert!(!r.is_bare_based());

        let s_address = address_of(&tree, "S");
        assert_eq!(s_address, address_of(&tree, "R") + 4);
        let s = layout.map.get(s_address).unwrap();
        assert!(s.is_bare_based());
        assert_eq!(s.record_size, 4);

        assert_eq!(layout.max_record_fields, 2);
        assert_eq!(layout.max_record_field_name, 8);
    }

    #[test]
    fn test_wide_bit_initial() {
        for (packing, last) in vec![(BitPacking::Shifted, 0x50), (BitPacking::Packed, 0x05)] {
            let mut tree = program("variables: [{name: W, type: {bit: 36}, initial: [5]}]");
            let config = GeneratorConfig {
                bit_packing: packing,
                ..GeneratorConfig::default()
            };
            let layout = layout(&mut tree, &config).unwrap();
            let w = address_of(&tree, "W");
            let limit = MEMORY_SIZE - 5;
            assert_eq!(layout.free_limit(), limit);
            assert_eq!(layout.image.get_fixed(w).unwrap(), (4 << 24) | limit);
            assert_eq!(
                &layout.image.bytes()[limit as usize..],
                &[0, 0, 0, 0, last]
            );
            assert_eq!(layout.image.get_bit(w, 36).unwrap(), vec![0, 0, 0, 0, 5]);
        }
    }

    #[test]
    fn test_text_initializer() {
        let mut tree = program("variables: [{name: A, type: fixed, initial: [' 12']}]");
        let result = layout(&mut tree, &GeneratorConfig::default()).unwrap();
        assert_eq!(result.image.get_fixed(address_of(&tree, "A")).unwrap(), 12);

        let mut tree = program("variables: [{name: A, type: fixed, initial: ['X']}]");
        let err = layout(&mut tree, &GeneratorConfig::default()).err().unwrap();
        assert_eq!(
            *err.get_inner(),
            LayoutError::InitializerNotInteger("A".into(), "X".into())
        );
    }

    #[test]
    fn test_layout_errors() {
        let long = "A".repeat(257);
        for (text, expected) in vec![
            (
                "variables: [{name: A, line: 3, type: fixed, initial: [1, 2]}]".to_string(),
                LayoutError::TooManyInitializers("A".into()),
            ),
            (
                "variables: [{name: B, type: {bit: 0}}]".to_string(),
                LayoutError::BitWidth("B".into(), 0),
            ),
            (
                "variables: [{name: B, type: {bit: 2049}}]".to_string(),
                LayoutError::BitWidth("B".into(), 2049),
            ),
            (
                format!("variables: [{{name: S, type: character, initial: ['{}']}}]", long),
                LayoutError::StringTooLong(257),
            ),
            (
                "variables: [{name: S, type: character, initial: ['\u{20AC}']}]".to_string(),
                LayoutError::Unencodable('\u{20AC}'),
            ),
            (
                "variables: [{name: P, type: {based: {element: fixed}}, initial: [1]}]"
                    .to_string(),
                LayoutError::InitialOnBased("P".into()),
            ),
        ] {
            let mut tree = program(&text);
            let err = layout(&mut tree, &GeneratorConfig::default()).err().unwrap();
            assert_eq!(*err.get_inner(), expected, "{}", text);
        }
    }

    #[test]
    fn test_error_line() {
        let mut tree = program("variables: [{name: A, line: 3, type: fixed, initial: [1, 2]}]");
        let err = layout(&mut tree, &GeneratorConfig::default()).err().unwrap();
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_character_round_trip() {
        let mut image = MemoryImage::new(BitPacking::Shifted);
        for len in vec![0, 1, 17, 255, 256] {
            let text = "Z".repeat(len);
            let at = image.allocate(4).unwrap();
            image.put_character(at, &text).unwrap();
            let data = image.get_character(at).unwrap();
            assert_eq!(data.len(), len);
            assert_eq!(ebcdic::decode(&data), text);
        }

        let at = image.allocate(4).unwrap();
        assert_eq!(
            image.put_character(at, &"Z".repeat(257)),
            Err(LayoutError::StringTooLong(257))
        );
    }

    #[test]
    fn test_wide_bit_is_allocated_once() {
        let mut image = MemoryImage::new(BitPacking::Packed);
        let at = image.allocate(4).unwrap();
        image.put_bit(at, 100, 1).unwrap();
        let limit = image.free_limit();
        assert_eq!(limit, MEMORY_SIZE - 13);

        image.put_bit(at, 100, 7).unwrap();
        assert_eq!(image.free_limit(), limit);
        assert_eq!(image.get_bit(at, 100).unwrap()[12], 7);

        assert_eq!(
            image.put_bit(at, 64, 1),
            Err(LayoutError::DescriptorMismatch {
                address: at,
                expected: 8,
                found: 13
            })
        );
    }

    #[test]
    fn test_narrow_bit_wraps() {
        let mut image = MemoryImage::new(BitPacking::Shifted);
        let at = image.allocate(4).unwrap();
        image.put_bit(at, 4, 0x1F).unwrap();
        assert_eq!(image.get_bit(at, 4).unwrap(), vec![0x0F]);

        image.put_bit(at, 24, -1).unwrap();
        assert_eq!(image.get_bit(at, 24).unwrap(), vec![0, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_memory_exhausted() {
        let mut image = MemoryImage::new(BitPacking::Packed);
        image.allocate(MEMORY_SIZE - 8).unwrap();
        let at = image.allocate(4).unwrap();
        assert_eq!(
            image.put_bit(at, 2048, 1),
            Err(LayoutError::OutOfMemory {
                cursor: MEMORY_SIZE - 4,
                limit: MEMORY_SIZE - 256,
            })
        );
    }

    /// The byte ranges `[start, end)` of the data that the descriptor at
    /// `address` points at, if it has been set.
    fn described(image: &MemoryImage, address: u32) -> Option<(u32, u32)> {
        let descriptor = image.get_fixed(address).unwrap();
        if descriptor == 0 {
            return None;
        }
        let start = descriptor & 0xFF_FFFF;
        Some((start, start + (descriptor >> 24) + 1))
    }

    #[test]
    fn test_allocations_are_disjoint() {
        let mut tree = program(
            "
variables:
  - {name: C, type: fixed, common: true, initial: [1]}
  - {name: CS, type: character, top: 1, common: true, initial: ['COMMON', 'DATA']}
  - {name: B, type: {bit: 8}, top: 2, initial: [1, 2, 3]}
  - {name: W, type: {bit: 40}, top: 1, initial: [7, 9]}
  - {name: R, type: {based: {record: [{name: F, type: fixed}, {name: G, type: {bit: 16}, top: 3}]}}}
  - name: P
    type:
      procedure:
        parameters: [X, S]
        scope:
          variables:
            - {name: X, type: fixed}
            - {name: S, type: character, initial: ['PARAM']}
            - {name: L, type: {bit: 100}, initial: [3]}
            - name: Q
              type:
                procedure:
                  parameters: [Y]
                  scope:
                    variables:
                      - {name: Y, type: {bit: 1}, top: 4}
                      - {name: T, type: character, initial: ['NESTED']}
  - {name: Z, type: fixed}
",
        );
        let layout = layout(&mut tree, &GeneratorConfig::default()).unwrap();
        let image = &layout.image;

        let mut ranges: Vec<(u32, u32, String)> = vec![];
        for id in tree.walk(tree.root()) {
            for var in tree.get(id).table().iter() {
                let address = match var.address {
                    Some(address) => address,
                    None => continue,
                };
                ranges.push((address, address + var.slot_size(), var.mangled.clone()));
                let wide = matches!(var.kind, VarKind::Bit(w) if w > 32);
                if var.kind == VarKind::Character || wide {
                    for i in 0..var.count() {
                        if let Some((start, end)) = described(image, address + 4 * i) {
                            ranges.push((start, end, format!("{}({}) data", var.mangled, i)));
                        }
                    }
                }
            }
        }
        let monitor_23 = layout.where_monitor_23;
        ranges.push((monitor_23, monitor_23 + 4, "MONITOR(23)".into()));
        let (start, end) = described(image, monitor_23).unwrap();
        ranges.push((start, end, "MONITOR(23) data".into()));
        let monitor_13 = layout.where_monitor_13;
        ranges.push((monitor_13, monitor_13 + 24, "MONITOR(13)".into()));

        // Every variable, including the nested procedures' parameters and
        // locals, was placed.
        assert_eq!(ranges.iter().filter(|r| !r.2.contains(" ")).count(), 13);

        ranges.sort();
        for pair in ranges.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.0 < a.1, "{} is empty", a.2);
            assert!(a.1 <= b.0, "{} overlaps {}", a.2, b.2);
        }

        // The wide BIT data lies above everything allocated upward.
        assert!(layout.free_point <= layout.free_limit());
        let wide_data = ranges
            .iter()
            .filter(|r| r.0 >= layout.free_limit())
            .count();
        assert_eq!(wide_data, 3);
        assert!(ranges.iter().all(|r| r.1 <= MEMORY_SIZE));
    }

    #[test]
    fn test_by_symbol_keeps_every_entry() {
        let mut map = MemoryMap::new();
        let mut var = Variable::new("I", VarKind::Fixed);
        for (address, mangled) in vec![(0, "PxI"), (4, "A"), (8, "PxI")] {
            var.mangled = mangled.into();
            map.insert(address, MapEntry::for_variable(&var).unwrap());
        }
        assert_eq!(map.by_symbol(), vec![1, 0, 2]);
    }

    #[test]
    fn test_ebcdic() {
        assert_eq!(ebcdic::encode("A1 "), Ok(vec![0xC1, 0xF1, 0x40]));
        assert_eq!(ebcdic::decode(&[0xC1, 0xF1, 0x40]), "A1 ");
        assert_eq!(ebcdic::encode("\u{20AC}"), Err('\u{20AC}'));
    }
}

use test_strategy::proptest;

use super::*;

fn addr(n: u32) -> Address {
    Address::try_from(n).expect("test data should be in range")
}

fn collect(builder: &mut TextRecordBuilder, items: &[(u32, Vec<u8>)]) -> Vec<TextRecord> {
    let mut records = Vec::new();
    for (address, data) in items {
        records.extend(builder.push(addr(*address), data));
    }
    records.extend(builder.finish());
    records
}

#[test]
fn test_record_formats() {
    assert_eq!(
        ObjectRecord::Header {
            name: SymbolName::from("COPY"),
            start: Address::ZERO,
            length: 0x1033,
        }
        .to_string(),
        "HCOPY  000000001033"
    );
    assert_eq!(
        ObjectRecord::Define(vec![
            (SymbolName::from("BUFFER"), addr(0x33)),
            (SymbolName::from("LENGTH"), addr(0x2D)),
        ])
        .to_string(),
        "DBUFFER000033LENGTH00002D"
    );
    assert_eq!(
        ObjectRecord::Reference(vec![SymbolName::from("RDREC"), SymbolName::from("WRREC")])
            .to_string(),
        "RRDREC WRREC "
    );
    assert_eq!(
        ObjectRecord::Text(TextRecord {
            start: addr(0x30),
            bytes: vec![0x45, 0x4F, 0x46],
        })
        .to_string(),
        "T00003003454F46"
    );
    assert_eq!(
        ObjectRecord::Modification(Modification {
            address: addr(0x28),
            half_bytes: 6,
            sign: Sign::Minus,
            symbol: SymbolName::from("BUFFER"),
        })
        .to_string(),
        "M00002806-BUFFER"
    );
    assert_eq!(ObjectRecord::End(Some(Address::ZERO)).to_string(), "E000000");
    assert_eq!(ObjectRecord::End(None).to_string(), "E");
}

#[test]
fn test_text_record_format_matches_object_record() {
    let record = TextRecord {
        start: addr(0x1036),
        bytes: vec![0xB4, 0x10, 0xB4, 0x00],
    };
    assert_eq!(record.to_string(), "T00103604B410B400");
    assert_eq!(ObjectRecord::Text(record.clone()).to_string(), record.to_string());
}

#[test]
fn test_module_orders_records_within_section() {
    let mut module = ObjectModule::new();
    module.add(0, ObjectRecord::End(None));
    module.add(
        0,
        ObjectRecord::Modification(Modification {
            address: addr(4),
            half_bytes: 5,
            sign: Sign::Plus,
            symbol: SymbolName::from("RDREC"),
        }),
    );
    module.add(
        0,
        ObjectRecord::Text(TextRecord {
            start: Address::ZERO,
            bytes: vec![0x4F, 0x00, 0x00],
        }),
    );
    module.add(0, ObjectRecord::Reference(vec![SymbolName::from("RDREC")]));
    module.add(
        0,
        ObjectRecord::Header {
            name: SymbolName::from("A"),
            start: Address::ZERO,
            length: 3,
        },
    );
    module.add(1, ObjectRecord::End(None));
    assert_eq!(
        module.to_string(),
        "HA     000000000003\nRRDREC \nT000000034F0000\nM00000405+RDREC\nE\nE\n"
    );
    let sections: Vec<usize> = module.records().map(|(index, _)| index).collect();
    assert_eq!(sections, vec![0, 0, 0, 0, 0, 1]);
    assert_eq!(module.section_count(), 2);
}

#[test]
fn test_text_record_fills_to_thirty_bytes() {
    let mut builder = TextRecordBuilder::new();
    let records = collect(
        &mut builder,
        &[(0, vec![0; 29]), (29, vec![1, 2, 3]), (32, vec![4])],
    );
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].start, Address::ZERO);
    assert_eq!(records[0].bytes.len(), 29);
    assert_eq!(records[1].start, addr(29));
    assert_eq!(records[1].bytes, vec![1, 2, 3, 4]);
}

#[test]
fn test_text_record_breaks_at_gap() {
    let mut builder = TextRecordBuilder::new();
    let records = collect(&mut builder, &[(0, vec![1, 2, 3]), (0x30, vec![4])]);
    assert_eq!(
        records,
        vec![
            TextRecord {
                start: Address::ZERO,
                bytes: vec![1, 2, 3],
            },
            TextRecord {
                start: addr(0x30),
                bytes: vec![4],
            },
        ]
    );
}

#[test]
fn test_long_item_is_split() {
    let mut builder = TextRecordBuilder::new();
    let records = collect(&mut builder, &[(0x100, vec![7; 65])]);
    let lengths: Vec<usize> = records.iter().map(|r| r.bytes.len()).collect();
    assert_eq!(lengths, vec![30, 30, 5]);
    assert_eq!(records[2].start, addr(0x100 + 60));
}

#[test]
fn test_finish_without_data() {
    let mut builder = TextRecordBuilder::new();
    assert_eq!(builder.finish(), None);
    assert!(builder.push(Address::ZERO, &[]).is_empty());
    assert_eq!(builder.finish(), None);
}

#[proptest]
fn text_records_are_bounded_and_complete(
    #[strategy(proptest::collection::vec(proptest::collection::vec(0u8..=255, 1..40), 0..20))]
    items: Vec<Vec<u8>>,
) {
    let mut builder = TextRecordBuilder::new();
    let mut address = 0u32;
    let mut placed = Vec::new();
    for item in items.iter() {
        placed.push((address, item.clone()));
        address += u32::try_from(item.len()).expect("items are short");
    }
    let records = collect(&mut builder, &placed);
    for record in &records {
        assert!(!record.bytes.is_empty());
        assert!(record.bytes.len() <= MAX_TEXT_BYTES);
        assert!(record.to_string().len() <= 1 + 6 + 2 + 2 * MAX_TEXT_BYTES);
    }
    let emitted: Vec<u8> = records.iter().flat_map(|r| r.bytes.iter().copied()).collect();
    let expected: Vec<u8> = items.iter().flatten().copied().collect();
    assert_eq!(emitted, expected);
}

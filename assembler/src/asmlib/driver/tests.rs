use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use base::prelude::{Address, InstructionCatalog};

use super::super::symbol::SymbolName;
use super::super::types::{ErrorKind, ProgramError};
use super::{assemble_source, load_catalog, AssemblyModule};

const COPY_SOURCE: &str = include_str!("../../../testdata/copy.asm");
const COPY_OBJECT: &str = include_str!("../../../testdata/copy.obj");

fn assemble_valid_input(source: &str) -> AssemblyModule {
    match assemble_source(source, &InstructionCatalog::standard()) {
        Ok(module) => module,
        Err(e) => panic!("test input should assemble without error, but got {e}"),
    }
}

fn assemble_invalid_input(source: &str) -> ProgramError {
    match assemble_source(source, &InstructionCatalog::standard()) {
        Ok(module) => panic!(
            "test input should be rejected, but assembled to:\n{}",
            module.object
        ),
        Err(e) => e,
    }
}

fn addr(n: u32) -> Address {
    Address::try_from(n).expect("test data should be in range")
}

/// Collects the message of every event logged while it is installed.
#[derive(Debug, Clone, Default)]
struct MessageLog(Arc<Mutex<Vec<String>>>);

impl MessageLog {
    fn messages(&self) -> Vec<String> {
        self.0.lock().expect("log lock should not be poisoned").clone()
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for MessageLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.0
            .lock()
            .expect("log lock should not be poisoned")
            .push(message);
    }
}

#[test]
fn test_copy_object_module() {
    let module = assemble_valid_input(COPY_SOURCE);
    assert_eq!(module.object.to_string(), COPY_OBJECT);
    assert_eq!(module.object.section_count(), 3);
}

#[test]
fn test_copy_symbol_table() {
    let module = assemble_valid_input(COPY_SOURCE);
    assert_eq!(
        module.symbols.to_string(),
        concat!(
            "COPY\t0\tCOPY\n",
            "FIRST\t0\tCOPY\n",
            "CLOOP\t3\tCOPY\n",
            "ENDFIL\t17\tCOPY\n",
            "RETADR\t2A\tCOPY\n",
            "LENGTH\t2D\tCOPY\n",
            "BUFFER\t33\tCOPY\n",
            "BUFEND\t1033\tCOPY\n",
            "MAXLEN\t1000\tCOPY\n",
            "RDREC\t0\tRDREC\n",
            "RLOOP\t9\tRDREC\n",
            "EXIT\t20\tRDREC\n",
            "INPUT\t27\tRDREC\n",
            "MAXLEN\t28\tRDREC\n",
            "WRREC\t0\tWRREC\n",
            "WLOOP\t6\tWRREC\n",
        )
    );
}

#[test]
fn test_copy_literal_table() {
    let module = assemble_valid_input(COPY_SOURCE);
    assert_eq!(module.literals.to_string(), "=C'EOF'\t30\n=X'05'\t1B\n");
    assert!(module.literals.iter().all(|literal| literal.processed));
}

#[test]
fn test_copy_sections() {
    let module = assemble_valid_input(COPY_SOURCE);
    let summary: Vec<(&str, u32, u32, bool)> = module
        .sections
        .iter()
        .map(|s| (s.name.as_str(), s.start.value(), s.length, s.primary))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("COPY", 0, 0x1033, true),
            ("RDREC", 0, 0x2B, false),
            ("WRREC", 0, 0x1C, false),
        ]
    );
}

#[test]
fn test_copy_listing() {
    let module = assemble_valid_input(COPY_SOURCE);
    let first = module
        .listing
        .lines()
        .find(|line| line.label == "FIRST")
        .expect("FIRST should be listed");
    assert_eq!(first.address, Some(addr(0)));
    assert_eq!(first.object_code, vec![0x17, 0x20, 0x27]);
    assert_eq!(
        first.to_string(),
        "    4  0000  FIRST   STL     RETADR            172027"
    );
    let ltorg = module
        .listing
        .lines()
        .find(|line| line.operator == "LTORG")
        .expect("LTORG should be listed");
    assert_eq!(ltorg.object_code, b"EOF".to_vec());
    // Comments are not listed.
    assert_eq!(
        module.listing.len(),
        module
            .tokens
            .iter()
            .filter(|token| token.operator.is_some())
            .count()
    );
}

#[test]
fn test_symbols_are_scoped_by_section() {
    let module = assemble_valid_input(COPY_SOURCE);
    let maxlen = SymbolName::from("MAXLEN");
    assert_eq!(
        module.symbols.lookup(&maxlen, &SymbolName::from("COPY")),
        Some(addr(0x1000))
    );
    assert_eq!(
        module.symbols.lookup(&maxlen, &SymbolName::from("RDREC")),
        Some(addr(0x28))
    );
    assert_eq!(
        module.symbols.lookup(&maxlen, &SymbolName::from("WRREC")),
        None
    );
}

#[test]
fn test_literal_pools() {
    let module = assemble_valid_input(concat!(
        "P\tSTART\t0\n",
        "\tLDA\t=X'05'\n",
        "\tLTORG\n",
        "\tLDA\t=X'05'\n",
        "\tLDA\t=C'AB'\n",
        "\tEND\n",
    ));
    assert_eq!(
        module.object.to_string(),
        concat!(
            "HP     00000000000C\n",
            "T0000000C03200005032FFC0320004142\n",
            "E000000\n",
        )
    );
    assert_eq!(module.literals.to_string(), "=X'05'\t3\n=C'AB'\tA\n");
    // Each pool is recorded on the statement which placed it.
    let pools: Vec<usize> = module
        .tokens
        .iter()
        .map(|token| token.literal_pool.len())
        .collect();
    assert_eq!(pools, vec![0, 0, 1, 0, 0, 1]);
}

#[test]
fn test_literal_reused_in_another_section() {
    let module = assemble_valid_input(concat!(
        "A\tSTART\t0\n",
        "\tTD\t=X'05'\n",
        "\tLTORG\n",
        "B\tCSECT\n",
        "\tTD\t=X'05'\n",
        "\tEND\tA\n",
    ));
    // B gets its own copy of the literal rather than A's address.
    assert_eq!(
        module.object.to_string(),
        concat!(
            "HA     000000000004\n",
            "T00000004E3200005\n",
            "E000000\n",
            "HB     000000000004\n",
            "T00000004E3200005\n",
            "E\n",
        )
    );
    assert_eq!(module.literals.to_string(), "=X'05'\t3\n=X'05'\t3\n");
    let sections: Vec<&str> = module
        .literals
        .iter()
        .map(|literal| literal.section.as_str())
        .collect();
    assert_eq!(sections, vec!["A", "B"]);
}

#[test]
fn test_literals_are_placed_when_section_closes() {
    let module = assemble_valid_input(concat!(
        "A\tSTART\t0\n",
        "\tLDA\t=C'AB'\n",
        "B\tCSECT\n",
        "\tRSUB\n",
        "\tEND\tA\n",
    ));
    assert_eq!(
        module.object.to_string(),
        concat!(
            "HA     000000000005\n",
            "T000000050320004142\n",
            "E000000\n",
            "HB     000000000003\n",
            "T000000034F0000\n",
            "E\n",
        )
    );
    assert_eq!(module.literals.to_string(), "=C'AB'\t3\n");
    assert_eq!(module.sections[0].length, 5);
    let csect = module
        .listing
        .lines()
        .find(|line| line.operator == "CSECT")
        .expect("CSECT should be listed");
    assert_eq!(csect.object_code, b"AB".to_vec());
}

#[test]
fn test_exports_from_several_extdef_statements() {
    let module = assemble_valid_input(concat!(
        "P\tSTART\t0\n",
        "\tEXTDEF\tX\n",
        "\tEXTDEF\tY,X\n",
        "X\tRSUB\n",
        "Y\tRSUB\n",
        "\tEND\n",
    ));
    assert_eq!(
        module.object.to_string(),
        concat!(
            "HP     000000000006\n",
            "DX000000Y000003\n",
            "T000000064F00004F0000\n",
            "E000000\n",
        )
    );
    let exports: Vec<&str> = module.sections[0]
        .exports
        .iter()
        .map(SymbolName::as_str)
        .collect();
    assert_eq!(exports, vec!["X", "Y"]);
}

#[test]
fn test_statement_count_is_logged_once() {
    let log = MessageLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());
    tracing::subscriber::with_default(subscriber, || {
        assemble_valid_input("P\tSTART\t0\n\tRSUB\n\tEND\n");
    });
    let messages = log.messages();
    let counts = messages
        .iter()
        .filter(|message| message.starts_with("source contains"))
        .count();
    assert_eq!(counts, 1, "messages were {messages:?}");
}

#[test]
fn test_implicit_section() {
    let module = assemble_valid_input("\tLDA\t#3\n\tEND\n");
    assert_eq!(
        module.object.to_string(),
        "H      000000000003\nT00000003010003\nE000000\n"
    );
    assert!(module.sections[0].primary);
}

#[test]
fn test_start_address_and_entry_point() {
    let module = assemble_valid_input(concat!(
        "P\tSTART\t1000\n",
        "\tRESB\t6\n",
        "GO\tRSUB\n",
        "\tEND\tGO\n",
    ));
    assert_eq!(
        module.object.to_string(),
        "HP     001000000009\nT001006034F0000\nE001006\n"
    );
}

#[test]
fn test_extended_external_reference() {
    let module = assemble_valid_input(concat!(
        "P\tSTART\t0\n",
        "\tEXTREF\tX\n",
        "\t+JSUB\tX\n",
        "\tEND\n",
    ));
    assert_eq!(
        module.object.to_string(),
        concat!(
            "HP     000000000004\n",
            "RX     \n",
            "T000000044B100000\n",
            "M00000105+X\n",
            "E000000\n",
        )
    );
}

#[test]
fn test_extended_local_reference_is_relocated() {
    let module = assemble_valid_input(concat!(
        "P\tSTART\t0\n",
        "\t+LDA\tDATA\n",
        "DATA\tWORD\t7\n",
        "\tEND\n",
    ));
    assert_eq!(
        module.object.to_string(),
        concat!(
            "HP     000000000007\n",
            "T0000000703100004000007\n",
            "M00000105+DATA\n",
            "E000000\n",
        )
    );
}

#[test]
fn test_word_modifications() {
    let module = assemble_valid_input(concat!(
        "P\tSTART\t0\n",
        "A\tWORD\t5\n",
        "B\tWORD\tA\n",
        "C\tWORD\tB-A\n",
        "D\tWORD\t-1\n",
        "\tEND\n",
    ));
    assert_eq!(
        module.object.to_string(),
        concat!(
            "HP     00000000000C\n",
            "T0000000C000005000000000003FFFFFF\n",
            "M00000606+B\n",
            "M00000606-A\n",
            "E000000\n",
        )
    );
}

#[test]
fn test_format2_operands() {
    let module = assemble_valid_input("\tSHIFTL\tA,4\n\tSVC\t3\n\tCOMPR\tA,S\n\tEND\n");
    assert_eq!(
        module.object.to_string(),
        "H      000000000006\nT00000006A403B030A004\nE000000\n"
    );
}

#[test]
fn test_long_constant_is_split() {
    let source = format!("\tBYTE\tC'{}'\n\tEND\n", "A".repeat(31));
    let module = assemble_valid_input(&source);
    let text = module.object.to_string();
    let records: Vec<&str> = text.lines().filter(|r| r.starts_with('T')).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], format!("T0000001E{}", "41".repeat(30)));
    assert_eq!(records[1], "T00001E0141");
}

#[test]
fn test_empty_program() {
    let module = assemble_valid_input(".\tnothing here\n\n.\n");
    assert!(module.object.is_empty());
    assert_eq!(module.object.to_string(), "");
    assert!(module.symbols.is_empty());
    assert!(module.listing.is_empty());
}

#[test]
fn test_undefined_symbol() {
    let e = assemble_invalid_input("P\tSTART\t0\n\tLDA\tNOWHERE\n\tEND\n");
    assert_eq!(e.line, 2);
    assert_eq!(
        e.kind,
        ErrorKind::UnresolvedSymbol {
            name: SymbolName::from("NOWHERE"),
            section: SymbolName::from("P"),
        }
    );
}

#[test]
fn test_other_sections_symbols_are_not_visible() {
    let e = assemble_invalid_input(concat!(
        "P\tSTART\t0\n",
        "HERE\tRSUB\n",
        "Q\tCSECT\n",
        "\tJ\tHERE\n",
        "\tEND\n",
    ));
    assert_eq!(e.line, 4);
    assert!(matches!(e.kind, ErrorKind::UnresolvedSymbol { .. }));
}

#[test]
fn test_format3_external_reference() {
    let e = assemble_invalid_input("P\tSTART\t0\n\tEXTREF\tX\n\tJSUB\tX\n\tEND\n");
    assert_eq!(e.line, 3);
    assert!(matches!(e.kind, ErrorKind::UnresolvedSymbol { .. }));
}

#[test]
fn test_undefined_export_and_entry() {
    let e = assemble_invalid_input("P\tSTART\t0\n\tEXTDEF\tQ\n\tRSUB\n\tEND\n");
    assert_eq!(e.line, 2);
    assert!(matches!(e.kind, ErrorKind::UnresolvedSymbol { .. }));
    let e = assemble_invalid_input("P\tSTART\t0\n\tRSUB\n\tEND\tQ\n");
    assert_eq!(e.line, 3);
    assert!(matches!(e.kind, ErrorKind::UnresolvedSymbol { .. }));
}

#[test]
fn test_displacement_overflow() {
    let e = assemble_invalid_input(concat!(
        "P\tSTART\t0\n",
        "\tJ\tFAR\n",
        "\tRESB\t4096\n",
        "FAR\tRSUB\n",
        "\tEND\n",
    ));
    assert_eq!(e.line, 2);
    assert!(matches!(e.kind, ErrorKind::OverflowFailure(_)));
}

#[test]
fn test_numeric_operand_ranges() {
    let e = assemble_invalid_input("\tLDA\t#4096\n\tEND\n");
    assert!(matches!(e.kind, ErrorKind::OverflowFailure(_)));
    let module = assemble_valid_input("\t+LDA\t#4096\n\tEND\n");
    assert_eq!(
        module.object.to_string(),
        "H      000000000004\nT0000000401101000\nE000000\n"
    );
}

#[test]
fn test_location_counter_overflow() {
    let e = assemble_invalid_input("P\tSTART\tFFFFE\n\tRESW\t1\n\tEND\n");
    assert_eq!(e.line, 2);
    assert!(matches!(e.kind, ErrorKind::OverflowFailure(_)));
}

#[test]
fn test_extended_format2_is_unsupported() {
    let e = assemble_invalid_input("\t+CLEAR\tX\n\tEND\n");
    assert_eq!(e.line, 1);
    assert_eq!(e.offending, "+CLEAR");
    assert_eq!(
        e.kind,
        ErrorKind::UnsupportedFormat {
            mnemonic: "CLEAR".to_string(),
            format: 4,
        }
    );
}

#[test]
fn test_end_is_required() {
    let e = assemble_invalid_input("P\tSTART\t0\n\tRSUB\n");
    assert!(matches!(e.kind, ErrorKind::ParseFailure(_)));
    let e = assemble_invalid_input("\tRSUB\n\tEND\n\tRSUB\n");
    assert_eq!(e.line, 3);
    assert!(matches!(e.kind, ErrorKind::ParseFailure(_)));
}

#[test]
fn test_duplicate_label() {
    let e = assemble_invalid_input("A\tRSUB\nA\tRSUB\n\tEND\n");
    assert_eq!(e.line, 2);
    assert_eq!(e.offending, "A");
    assert!(matches!(e.kind, ErrorKind::ParseFailure(_)));
}

#[test]
fn test_unknown_operation() {
    let e = assemble_invalid_input("\tFROB\tX\n\tEND\n");
    assert_eq!(e.offending, "FROB");
    assert!(matches!(e.kind, ErrorKind::ParseFailure(_)));
}

#[test]
fn test_load_catalog() {
    let standard = InstructionCatalog::standard();
    match load_catalog(None) {
        Ok(catalog) => assert_eq!(catalog, standard),
        Err(e) => panic!("the standard catalog should always load: {e}"),
    }
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/sicxe.catalog");
    match load_catalog(Some(path.as_path())) {
        Ok(catalog) => assert_eq!(catalog, standard),
        Err(e) => panic!("{} should load: {e}", path.display()),
    }
}

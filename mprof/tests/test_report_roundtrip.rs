use mprof::analysis::format_details;
use mprof::buckets::BucketTable;
use mprof::domain::{Address, StackTrace};
use mprof::export::{encode_report, report_len, write_report, Report};
use mprof::symbolization::{HexSymbolSource, SymbolTable};

fn populated_tables() -> (BucketTable, SymbolTable) {
    let mut buckets = BucketTable::new();
    let mut symbols = SymbolTable::new();

    for (frames, size) in [(&[0xAAu64, 0xBB][..], 64u64), (&[0xCC][..], 16), (&[][..], 8)] {
        let stack = StackTrace::from_slice(&frames.iter().map(|&f| Address(f)).collect::<Vec<_>>());
        let id = buckets.find_or_create(&stack, size);
        buckets.get_mut(id).record_alloc(size);
        symbols.ensure_resolved(&stack, &HexSymbolSource).unwrap();
    }
    (buckets, symbols)
}

#[test]
fn test_encoded_report_parses_back() {
    let (buckets, symbols) = populated_tables();
    let bytes = encode_report(&buckets, &symbols);
    assert_eq!(bytes.len(), report_len(&buckets, &symbols));

    let report = Report::parse(&bytes).unwrap();
    let names: Vec<&str> = report.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["0xaa", "0xbb", "0xcc"]);

    let stacks: Vec<Vec<u64>> = report.buckets.iter().map(|b| b.stack.clone()).collect();
    assert_eq!(stacks, vec![vec![0xAA, 0xBB], vec![0xCC], vec![]]);
    assert_eq!(report.buckets[0].alloc_bytes, 64);
}

#[test]
fn test_counters_wrap_to_low_32_bits() {
    let (mut buckets, symbols) = populated_tables();
    let first = buckets.find_or_create(&StackTrace::from([0xAA, 0xBB]), 64);
    buckets.get_mut(first).alloc_bytes = (1u64 << 32) + 5;

    let report = Report::parse(&encode_report(&buckets, &symbols)).unwrap();
    assert_eq!(report.buckets[0].alloc_bytes, 5);
}

#[test]
fn test_report_written_to_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("heap.bin");
    let (buckets, symbols) = populated_tables();
    let bytes = encode_report(&buckets, &symbols);

    write_report(std::fs::File::create(&path).unwrap(), &bytes).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), bytes);
    let report = Report::from_file(&path).unwrap();
    assert_eq!(report.buckets.len(), 3);
}

#[test]
fn test_identical_inputs_give_identical_bytes() {
    let (a_buckets, a_symbols) = populated_tables();
    let (b_buckets, b_symbols) = populated_tables();
    assert_eq!(encode_report(&a_buckets, &a_symbols), encode_report(&b_buckets, &b_symbols));
}

#[test]
fn test_json_output_shape() {
    let (buckets, symbols) = populated_tables();
    let report = Report::parse(&encode_report(&buckets, &symbols)).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["functions"].as_array().unwrap().len(), 3);
    assert_eq!(json["buckets"][1]["stack"], serde_json::json!([0xCC]));
}

#[test]
fn test_details_list_functions_and_backtraces() {
    let (buckets, symbols) = populated_tables();
    let report = Report::parse(&encode_report(&buckets, &symbols)).unwrap();
    let text = format_details(&report);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(&lines[1..4], &["170\t:\t0xaa", "187\t:\t0xbb", "204\t:\t0xcc"]);
    // Nothing freed, so in-use order is alloc bytes; backtrace is outermost first
    assert_eq!(lines[6], "64\t0\t1\t0\t:\t187 -> 170");
    assert_eq!(lines[7], "16\t0\t1\t0\t:\t204");
    assert_eq!(lines[8], "8\t0\t1\t0\t:\t");
}

use health_sheet_export::cloud_adapters::range::{column_letter, column_number, column_span};

#[test]
fn known_letters() {
    for (n, letters) in [(1, "A"), (26, "Z"), (27, "AA"), (52, "AZ"), (702, "ZZ"), (703, "AAA")] {
        assert_eq!(column_letter(n), letters);
    }
}

#[test]
fn letters_round_trip() {
    for n in 1..=1000 {
        let letters = column_letter(n);
        assert_eq!(column_number(&letters), Some(n), "column {n} -> {letters}");
    }
}

#[test]
fn header_widths_map_to_spans() {
    assert_eq!(column_span(21), "A:U");
    assert_eq!(column_span(22), "A:V");
    assert_eq!(column_span(30), "A:AD");
}

use affiliate_core::upline::{parse_upline, ParsedUpline, UplineEncoding};

#[test]
fn full_path_encoding_ends_in_own_id() {
    // "A-B-C" on node C: root A, immediate parent B.
    let parsed = parse_upline("C", Some("A-B-C"));
    match parsed {
        ParsedUpline::Chain {
            ancestors,
            parent,
            encoding,
        } => {
            assert_eq!(ancestors, vec!["A".to_string()]);
            assert_eq!(parent, "B");
            assert_eq!(encoding, UplineEncoding::FullPath);
        }
        other => panic!("expected chain, got {other:?}"),
    }
}

#[test]
fn full_chain_runs_root_to_parent() {
    let parsed = parse_upline("D", Some("A-B-C-D"));
    assert_eq!(
        parsed.full_chain(),
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    );
}

#[test]
fn parent_only_encoding_single_token() {
    // "A" on node C: legacy parent-only format.
    let parsed = parse_upline("C", Some("A"));
    assert_eq!(parsed.parent().map(String::as_str), Some("A"));
    assert!(!parsed.is_ambiguous());
}

#[test]
fn two_token_full_path_has_no_ancestors_above_parent() {
    let parsed = parse_upline("C", Some("B-C"));
    assert_eq!(parsed.parent().map(String::as_str), Some("B"));
    assert_eq!(parsed.full_chain(), vec!["B".to_string()]);
}

#[test]
fn multi_token_not_ending_in_self_is_ambiguous_parent_only() {
    // Does not end in own id: read first token as parent, flag it.
    let parsed = parse_upline("Z", Some("A-B-C"));
    assert_eq!(parsed.parent().map(String::as_str), Some("A"));
    assert!(parsed.is_ambiguous());
}

#[test]
fn empty_and_whitespace_mean_root() {
    assert_eq!(parse_upline("C", None), ParsedUpline::Root);
    assert_eq!(parse_upline("C", Some("")), ParsedUpline::Root);
    assert_eq!(parse_upline("C", Some("   ")), ParsedUpline::Root);
}

#[test]
fn separator_noise_collapses_to_root() {
    assert_eq!(parse_upline("C", Some("--")), ParsedUpline::Root);
    assert_eq!(parse_upline("C", Some("- - -")), ParsedUpline::Root);
}

#[test]
fn own_id_alone_is_root() {
    // Degenerate full path "C" on node C: no parent declared.
    assert_eq!(parse_upline("C", Some("C")), ParsedUpline::Root);
}

#[test]
fn doubled_separators_and_padding_are_dropped() {
    let parsed = parse_upline("C", Some(" A--B- C "));
    assert_eq!(parsed.parent().map(String::as_str), Some("B"));
    assert_eq!(parsed.full_chain(), vec!["A".to_string(), "B".to_string()]);
}

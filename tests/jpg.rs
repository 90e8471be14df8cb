//! JPEG grammar: absorption of frame and scan headers, marker rejection, length checks, modes.

use absorbdsl::absorb::{absorb, AbsorbConfig, AbsorbError, AbsorbStatus, Engine};
use absorbdsl::constraint::ResolvedBound;
use absorbdsl::formats::jpg;
use absorbdsl::{AbsorbConstraints, Mode, NodeStatus, Value};

/// SOF0 16x16 one component, SOS one component, then EOI.
const SCENARIO_A: [u8; 25] = [
    0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x10, 0x00, 0x10, 0x01, 0x01, 0x11, 0x00, // SOF
    0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, // SOS
    0xFF, 0xD9,
];

fn patched(at: usize, byte: u8) -> Vec<u8> {
    let mut b = SCENARIO_A.to_vec();
    b[at] = byte;
    b
}

#[test]
fn test_scenario_a_fully_absorbed_with_metadata() {
    let model = jpg::data_model().expect("schema");
    let result = model.engine().absorb(&SCENARIO_A);
    assert_eq!(result.status, AbsorbStatus::FullyAbsorbed);
    assert_eq!(result.offset, 25);
    assert_eq!(result.consumed_size, 25);
    assert!(result.error.is_none());

    let tree = result.instance_tree.expect("tree");
    let meta = tree.metadata().expect("metadata");
    assert_eq!(meta.get("height"), Some(&Value::U16(16)));
    assert_eq!(meta.get("width"), Some(&Value::U16(16)));

    assert_eq!(tree.value("jpg/SOF_hdr/F_marker"), Some(&Value::U16(0xFFC0)));
    assert_eq!(tree.value("jpg/SOF_hdr/Lf"), Some(&Value::U16(11)));
    assert_eq!(tree.value("jpg/SOF_hdr/Nf"), Some(&Value::U8(1)));
    assert_eq!(tree.value("**/F_CompGroup/0/H&V"), Some(&Value::Bits(vec![1, 1])));
    assert_eq!(tree.value("jpg/SOS_hdr/Se"), Some(&Value::U8(63)));
    assert_eq!(tree.value("jpg/afterSOS"), Some(&Value::Bytes(vec![0xFF, 0xD9])));
    assert_eq!(tree.get("**/before_SOF").expect("region").size, 0);
    assert_eq!(tree.get("**/between_SOF_SOS").expect("region").size, 0);
    assert!(tree.iter().all(|n| n.status == NodeStatus::Absorbed));
    assert!(!tree.get("jpg/afterSOS").expect("afterSOS").is_mutable());
}

#[test]
fn test_leading_bytes_absorbed_into_region() {
    let model = jpg::data_model().expect("schema");
    let mut data = vec![0x00, 0x11, 0x22];
    data.extend_from_slice(&SCENARIO_A);
    let result = model.engine().absorb(&data);
    assert_eq!(result.status, AbsorbStatus::FullyAbsorbed);
    assert_eq!(result.consumed_size, 28);
    let tree = result.instance_tree.expect("tree");
    let region = tree.get("jpg/SOF_hdr/before_SOF").expect("region");
    assert_eq!(region.size, 3);
    assert_eq!(region.value, Some(Value::Bytes(vec![0x00, 0x11, 0x22])));
    assert_eq!(tree.get("jpg/SOF_hdr/F_marker").expect("marker").offset, 3);
}

#[test]
fn test_scenario_b_wrong_marker_rejected() {
    let schema = jpg::schema().expect("schema");
    let result = absorb(&schema, &patched(1, 0xD8), &Mode::ABSORB);
    assert_eq!(result.status, AbsorbStatus::Rejected);
    assert_eq!(result.offset, 0);
    assert_eq!(result.consumed_size, 2);
    assert!(result.instance_tree.is_none());
    assert_eq!(
        result.error,
        Some(AbsorbError::Rejected { node: "F_marker".to_string(), offset: 0, value: 0xFFD8 })
    );
}

#[test]
fn test_marker_enforced_when_relaxed() {
    let schema = jpg::schema().expect("schema");
    let config = AbsorbConfig::default().with_constraints(AbsorbConstraints::none());
    let result = Engine::new(&schema, config).absorb(&patched(1, 0xD8));
    assert_eq!(result.status, AbsorbStatus::Rejected);
}

#[test]
fn test_scenario_c_length_mismatch() {
    let schema = jpg::schema().expect("schema");
    for mode in [Mode::ABSORB, Mode::MAIN] {
        let result = absorb(&schema, &patched(3, 0x05), &mode);
        assert_eq!(result.status, AbsorbStatus::PartiallyAbsorbed, "{}", mode);
        assert_eq!(
            result.error,
            Some(AbsorbError::InvalidLength {
                node: "Lf".to_string(),
                declared: 5,
                expected: ResolvedBound::exact(11),
            })
        );
        assert_eq!(result.offset, 2);
        assert_eq!(result.consumed_size, 13);
        let tree = result.instance_tree.expect("partial tree");
        assert_eq!(tree.get("jpg/SOF_hdr/Lf").expect("Lf").status, NodeStatus::Failed);
        assert_eq!(tree.value("jpg/SOF_hdr/Y"), Some(&Value::U16(16)));
        assert!(tree.get("jpg/SOS_hdr").is_none());
    }
}

#[test]
fn test_zero_components_diverges_by_mode() {
    let schema = jpg::schema().expect("schema");
    let data = patched(9, 0x00);

    let abs = absorb(&schema, &data, &Mode::ABSORB);
    assert_eq!(abs.status, AbsorbStatus::PartiallyAbsorbed);
    assert!(matches!(
        abs.error,
        Some(AbsorbError::ValueRejected { ref node, offset: 9, .. }) if node == "Nf"
    ));

    let main = absorb(&schema, &data, &Mode::MAIN);
    assert_eq!(main.status, AbsorbStatus::PartiallyAbsorbed);
    assert_eq!(
        main.error,
        Some(AbsorbError::RepetitionBoundViolated {
            node: "F_CompGroup".to_string(),
            count: 0,
            min: 1,
            max: 255,
        })
    );
}

#[test]
fn test_relaxed_checks_absorb_inconsistent_header() {
    let schema = jpg::schema().expect("schema");
    let config = AbsorbConfig::default().with_constraints(AbsorbConstraints::none());
    let result = Engine::new(&schema, config).absorb(&patched(9, 0x00));
    assert_eq!(result.status, AbsorbStatus::FullyAbsorbed);
    let tree = result.instance_tree.expect("tree");
    assert!(tree.get("**/F_CompGroup").expect("group").children.is_empty());
    // the orphaned component bytes fall into the region before SOS
    assert_eq!(tree.get("**/between_SOF_SOS").expect("region").size, 3);
}

#[test]
fn test_component_bounds_checked() {
    let schema = jpg::schema().expect("schema");
    // H = 5
    let result = absorb(&schema, &patched(11, 0x51), &Mode::ABSORB);
    assert!(matches!(
        result.error,
        Some(AbsorbError::ValueRejected { ref node, offset: 11, .. }) if node == "H&V"
    ));
    // P = 9
    let result = absorb(&schema, &patched(4, 0x09), &Mode::ABSORB);
    assert!(matches!(result.error, Some(AbsorbError::ValueRejected { ref node, .. }) if node == "P"));
}

#[test]
fn test_truncated_scan_header() {
    let schema = jpg::schema().expect("schema");
    let result = absorb(&schema, &SCENARIO_A[..20], &Mode::ABSORB);
    assert_eq!(result.status, AbsorbStatus::PartiallyAbsorbed);
    assert_eq!(
        result.error,
        Some(AbsorbError::TruncatedInput { node: "Ss".to_string(), offset: 20, needed: 1, available: 0 })
    );
    assert_eq!(result.consumed_size, 20);
    let tree = result.instance_tree.expect("partial tree");
    assert_eq!(tree.get("jpg/SOS_hdr/Ls").expect("Ls").status, NodeStatus::Absorbed);
}

#[test]
fn test_input_cap() {
    let schema = jpg::schema().expect("schema");
    let config = AbsorbConfig::default().with_max_input_len(20);
    let result = Engine::new(&schema, config).absorb(&SCENARIO_A);
    assert_eq!(result.status, AbsorbStatus::PartiallyAbsorbed);
    assert!(result.consumed_size <= 20);
}

#[test]
fn test_progress_bounded_and_deterministic_on_prefixes() {
    let schema = jpg::schema().expect("schema");
    for n in 0..=SCENARIO_A.len() {
        let data = &SCENARIO_A[..n];
        let first = absorb(&schema, data, &Mode::ABSORB);
        assert!(first.consumed_size <= n, "prefix {}", n);
        assert_eq!(first, absorb(&schema, data, &Mode::ABSORB), "prefix {}", n);
        if first.status == AbsorbStatus::FullyAbsorbed {
            assert_eq!(first.offset, first.consumed_size);
        }
    }
    assert!(absorb(&schema, &SCENARIO_A[..23], &Mode::ABSORB).is_fully_absorbed());
}

//! Data model: sample import from a directory, naming, parallel absorption.

use absorbdsl::formats::jpg;
use absorbdsl::{AbsorbStatus, Value};

const SCENARIO_A: [u8; 25] = [
    0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x10, 0x00, 0x10, 0x01, 0x01, 0x11, 0x00, //
    0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, //
    0xFF, 0xD9,
];

#[test]
fn test_load_samples_filters_and_sorts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut bad = SCENARIO_A.to_vec();
    bad[1] = 0xD8;
    std::fs::write(dir.path().join("b.JPG"), &bad).expect("write");
    std::fs::write(dir.path().join("a.jpg"), SCENARIO_A).expect("write");
    std::fs::write(dir.path().join("notes.txt"), b"not a picture").expect("write");

    let model = jpg::data_model().expect("schema");
    let samples = model.load_samples(dir.path()).expect("load");
    let names: Vec<_> = samples
        .iter()
        .map(|(p, _)| p.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["a.jpg", "b.JPG"]);

    let data: Vec<Vec<u8>> = samples.into_iter().map(|(_, d)| d).collect();
    let results = model.absorb_all(&data, 1);
    assert_eq!(results[0].name, "jpg_00");
    assert_eq!(results[0].result.status, AbsorbStatus::FullyAbsorbed);
    assert_eq!(results[1].name, "jpg_01");
    assert_eq!(results[1].result.status, AbsorbStatus::Rejected);
}

#[test]
fn test_parallel_absorption_keeps_order() {
    let model = jpg::data_model().expect("schema");
    let data: Vec<Vec<u8>> = (0..9u8)
        .map(|i| {
            let mut d = SCENARIO_A.to_vec();
            d[8] = i + 1; // width
            if i % 3 == 0 {
                d[0] = 0;
            }
            d
        })
        .collect();

    let sequential = model.absorb_all(&data, 1);
    let parallel = model.absorb_all(&data, 4);
    assert_eq!(sequential, parallel);
    for (i, sample) in parallel.iter().enumerate() {
        assert_eq!(sample.name, format!("jpg_{:02}", i));
        if i % 3 == 0 {
            assert_eq!(sample.result.status, AbsorbStatus::Rejected);
        } else {
            let tree = sample.result.instance_tree.as_ref().expect("tree");
            let width = tree.metadata().and_then(|m| m.get("width"));
            assert_eq!(width, Some(&Value::U16(i as u16 + 1)));
        }
    }
}

//! Baseline JPEG frame and scan headers.
//!
//! ```text
//! jpg
//! ├── SOF_hdr: before_SOF F_marker Lf P Y X Nf F_CompGroup{Cf H&V Tq}*Nf
//! ├── SOS_hdr: between_SOF_SOS S_marker Ls Ns S_CompGroup{Cs Td&Ta}*Ns Ss Se Ah&Al
//! └── afterSOS
//! ```
//!
//! In [`Mode::MAIN`] `Lf`/`Ls` and `Nf`/`Ns` are computed from the component groups; in
//! [`Mode::ABSORB`] they are plain fields whose consistency is checked against those groups.

use crate::ast::*;
use crate::codec::Endianness;
use crate::metadata::PathExtractor;
use crate::model::DataModel;

/// Start-of-frame markers SOF0..SOF3.
pub const SOF_MARKERS: [i64; 4] = [0xFFC0, 0xFFC1, 0xFFC2, 0xFFC3];
pub const SOS_MARKER: i64 = 0xFFDA;

/// Unconstrained filler up to the next marker, kept as-is on generation.
fn region(name: &str) -> Node {
    Node::scalar(name, ValueSpec::bytes())
        .postpone()
        .immutable()
        .absorb_constraints(AbsorbConstraints::none())
}

fn nibbles(name: &str, min: u64, max: u64, hi: &str, lo: &str) -> Node {
    Node::bits(
        name,
        BitFieldSpec::new(8, Endianness::Big)
            .subfield(4, min, max, hi)
            .subfield(4, min, max, lo),
    )
}

/// Segment length: computed in MAIN, checked against `group` in ABS.
fn segment_length(name: &str, group: &str, base: i64) -> Node {
    Node::scalar(name, ValueSpec::uint16_be().length_of(group, base)).scalar_variant(
        Mode::ABSORB,
        ValueSpec::uint16_be().depends_on(group, DependencySource::EncodedLength, base),
    )
}

fn component_count(name: &str, group: &str, max: i64) -> Node {
    Node::scalar(name, ValueSpec::uint8().count_of(group))
        .scalar_variant(Mode::ABSORB, ValueSpec::uint8().ranged(1, max))
}

fn sof() -> Node {
    Node::group(
        "SOF_hdr",
        vec![
            region("before_SOF"),
            Node::scalar("F_marker", ValueSpec::uint16_be().enumerated(SOF_MARKERS)).anchor(),
            segment_length("Lf", "F_CompGroup", 8),
            Node::scalar("P", ValueSpec::uint8().enumerated([8, 12])),
            Node::scalar("Y", ValueSpec::uint16_be().ranged(0, 65535)),
            Node::scalar("X", ValueSpec::uint16_be().ranged(1, 65535)),
            component_count("Nf", "F_CompGroup", 255),
            Node::repetition(
                "F_CompGroup",
                1,
                255,
                RepeatBound::Quantity("Nf".into()),
                Node::group(
                    "F_Comp",
                    vec![
                        Node::scalar("Cf", ValueSpec::uint8()),
                        nibbles("H&V", 1, 4, "H", "V"),
                        Node::scalar("Tq", ValueSpec::uint8().ranged(0, 3)),
                    ],
                ),
            ),
        ],
    )
}

fn sos() -> Node {
    Node::group(
        "SOS_hdr",
        vec![
            region("between_SOF_SOS"),
            Node::scalar("S_marker", ValueSpec::uint16_be().enumerated([SOS_MARKER])).anchor(),
            segment_length("Ls", "S_CompGroup", 6),
            component_count("Ns", "S_CompGroup", 4),
            Node::repetition(
                "S_CompGroup",
                1,
                4,
                RepeatBound::Quantity("Ns".into()),
                Node::group(
                    "S_Comp",
                    vec![
                        Node::scalar("Cs", ValueSpec::uint8()),
                        nibbles("Td&Ta", 0, 3, "Td", "Ta"),
                    ],
                ),
            ),
            Node::scalar("Ss", ValueSpec::uint8().ranged(0, 63)),
            Node::scalar("Se", ValueSpec::uint8().ranged(0, 63)),
            nibbles("Ah&Al", 0, 13, "Ah", "Al"),
        ],
    )
}

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::new(Node::group(
        "jpg",
        vec![sof(), sos(), Node::scalar("afterSOS", ValueSpec::bytes()).immutable()],
    ))
}

/// Picture dimensions from the frame header.
pub fn metadata_hook() -> PathExtractor {
    PathExtractor::new()
        .entry("height", "**/SOF_hdr/Y")
        .entry("width", "**/SOF_hdr/X")
}

pub fn data_model() -> Result<DataModel, SchemaError> {
    Ok(DataModel::new("jpg", "jpg", schema()?).with_hook(metadata_hook()))
}

//! # absorbdsl: declarative binary grammars and constraint-based absorption
//!
//! A grammar is a tree of typed [`Node`]s built in code. *Absorbing* a raw buffer walks the
//! grammar, decodes every leaf, checks its constraints and materializes an [`InstanceTree`]
//! that can be queried with path expressions, edited and generated back to bytes.
//!
//! ## Grammar
//!
//! - **Scalars**: `u8`..`u64`, `i8`..`i64` (big or little endian) and byte strings
//! - **Bit-packed** containers split into bounded subfields, most significant first
//! - **Groups** of named children, absorbed in declaration order
//! - **Repetitions** governed by a quantity sibling, a length sibling, or greedily
//! - Constraints: enumerations, ranges, exact/bounded sizes, and sizes that depend on a
//!   sibling's encoded length, item count or value
//! - `length_of(node, base)`, `count_of(node)`: fields computed on generation
//! - Per-[`Mode`] variants: the same node can be computed when generating (`MAIN`) and checked
//!   when absorbing (`ABS`)
//! - Attributes: anchors (markers), postponable regions, immutability, relaxed checks
//!
//! ## Example
//!
//! ```
//! use absorbdsl::{absorb, formats::jpg, AbsorbStatus, Mode};
//!
//! let schema = jpg::schema().unwrap();
//! let result = absorb(&schema, &[0x00, 0x01], &Mode::ABSORB);
//! assert_eq!(result.status, AbsorbStatus::Rejected);
//! ```

pub mod absorb;
pub mod ast;
pub mod builder;
pub mod codec;
pub mod constraint;
pub mod dump;
pub mod formats;
pub mod generate;
pub mod instance;
pub mod metadata;
pub mod model;
pub mod value;

pub use absorb::{absorb, AbsorbConfig, AbsorbError, AbsorbStatus, AbsorptionResult, Engine};
pub use ast::{AbsorbConstraints, Mode, Node, Schema, SchemaError};
pub use codec::{CodecError, Endianness};
pub use generate::generate;
pub use instance::{InstanceNode, InstanceTree, NodeStatus};
pub use metadata::{DerivedMetadata, PathExtractor, PostAbsorbHook};
pub use model::{DataModel, Sample};
pub use value::Value;

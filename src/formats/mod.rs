//! Ready-made grammars.

pub mod jpg;

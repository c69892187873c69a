//! Conflict resolution for generated files that already exist.
//!
//! A conflict is resolved with one of four strategies. `merge` runs a
//! three-step pipeline (parse, merge, serialize) where each step is either the
//! built-in default or a caller-supplied function selected by the file's
//! [`ConflictFileData`].

mod resolve;
mod types;

pub use resolve::{
    CONCAT_MERGE, ConflictRequest, DEEP_MERGE, IDENTITY_SERIALIZE, default_merge, resolve,
};
pub use types::{
    Confirm, Confirmation, ConflictFileData, ConflictResolutionResult, ConflictStrategy,
    CustomMerge, MergeFn, MergeSteps, Merger, Named, ParseFn, Parser, SerializeFn, Serializer,
};

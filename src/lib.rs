mod diagnostics;
mod merge;
mod parse_jsonc;
mod policy;
mod tree;

pub use diagnostics::{CycleReport, DiagnosticSink, TracingSink};
pub use merge::{merge, MergeError, Outcome, TreeMerger};
pub use parse_jsonc::parse_jsonc;
pub use policy::{ConflictPolicy, InvalidPolicyCode};
pub use tree::{json_type, JsonTreeError, Node, Value};

use thiserror::Error;

use crate::diagnostics::{CycleReport, DiagnosticSink, TracingSink};
use crate::policy::ConflictPolicy;
use crate::tree::{Node, Value, ROOT_LABEL};

/// Result of a completed merge.
///
/// `CycleDetected` is advisory, not fatal: every branch of the source that
/// does not loop back on itself was still copied into the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    CycleDetected,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("merge source must be a tree node, got {0}")]
    SourceNotNode(&'static str),
    #[error("merge target must be a tree node, got {0}")]
    TargetNotNode(&'static str),
}

/// One level of the traversal path: the key that led here and the source
/// node it resolved to. The node references are what the cycle check
/// compares against; the labels only exist for diagnostics.
struct Frame {
    label: String,
    node: Node,
}

/// Copies source trees into target trees in place.
///
/// The target is mutated through the caller's own handle; the source is
/// never touched. One policy applies to the whole traversal.
pub struct TreeMerger<S: DiagnosticSink = TracingSink> {
    sink: S,
}

impl TreeMerger<TracingSink> {
    pub fn new() -> Self {
        TreeMerger { sink: TracingSink }
    }
}

impl Default for TreeMerger<TracingSink> {
    fn default() -> Self {
        TreeMerger::new()
    }
}

impl<S: DiagnosticSink> TreeMerger<S> {
    pub fn with_sink(sink: S) -> Self {
        TreeMerger { sink }
    }

    /// Hands the sink back, e.g. to inspect collected reports after a
    /// merge.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Merges `source` into `target` under `policy`.
    ///
    /// Both arguments must be sub-nodes; anything else fails before any
    /// mutation happens.
    pub fn merge(
        &mut self,
        source: &Value,
        target: &Value,
        policy: ConflictPolicy,
    ) -> Result<Outcome, MergeError> {
        let src = match source.as_node() {
            Some(node) => node,
            None => {
                let error = MergeError::SourceNotNode(source.type_name());
                self.sink.invalid_argument(&error);
                return Err(error);
            }
        };
        let dst = match target.as_node() {
            Some(node) => node,
            None => {
                let error = MergeError::TargetNotNode(target.type_name());
                self.sink.invalid_argument(&error);
                return Err(error);
            }
        };
        Ok(self.merge_nodes(src, dst, policy))
    }

    /// As [`merge`](Self::merge), for callers that already hold two nodes.
    pub fn merge_nodes(&mut self, source: &Node, target: &Node, policy: ConflictPolicy) -> Outcome {
        if policy == ConflictPolicy::Overwrite {
            // Keys are removed through the shared handle so that anyone
            // else holding the target node sees it emptied, not replaced.
            target.clear();
        }
        let mut stack = vec![Frame {
            label: ROOT_LABEL.to_string(),
            node: source.clone(),
        }];
        if self.copy_into(source, target, policy, &mut stack) {
            Outcome::Success
        } else {
            Outcome::CycleDetected
        }
    }

    /// Returns false if any branch at or below this pair hit a circular
    /// reference.
    fn copy_into(
        &mut self,
        source: &Node,
        target: &Node,
        policy: ConflictPolicy,
        stack: &mut Vec<Frame>,
    ) -> bool {
        let mut clean = true;
        let keys = source.keys();
        for key in keys.iter().rev() {
            let sv = match source.get(key) {
                Some(value) => value,
                None => continue,
            };

            // MergePreferSource drops a conflicting target value up front
            // so the set-if-absent step below lets the source value in.
            // Two sub-nodes never conflict here: they merge recursively,
            // and removing the target one would discard its children.
            if policy == ConflictPolicy::MergePreferSource {
                if let Some(dv) = target.get(key) {
                    let both_nodes = matches!((&sv, &dv), (Value::Node(_), Value::Node(_)));
                    if !sv.same(&dv) && !both_nodes {
                        target.remove(key);
                    }
                }
            }

            if let Value::Node(sub) = &sv {
                if !target.contains_key(key) {
                    target.insert(key.clone(), Value::Node(Node::new()));
                }
                // Under MergePreferTarget an existing scalar stays put and
                // shadows the whole source sub-tree, so only descend when
                // the target side is a node too.
                if let Some(Value::Node(dsub)) = target.get(key) {
                    let ancestor = stack
                        .iter()
                        .position(|frame| Node::ptr_eq(&frame.node, sub));
                    match ancestor {
                        None => {
                            stack.push(Frame {
                                label: key.clone(),
                                node: sub.clone(),
                            });
                            clean = self.copy_into(sub, &dsub, policy, stack) && clean;
                            stack.pop();
                        }
                        Some(index) => {
                            // Back-reference to an ancestor. Report it and
                            // carry on with the siblings; the rest of the
                            // tree still gets copied.
                            self.sink.cycle(&cycle_report(stack, key, index));
                            clean = false;
                        }
                    }
                }
            } else if !target.contains_key(key) {
                target.insert(key.clone(), sv.clone());
            }
        }
        clean
    }
}

fn cycle_report(stack: &[Frame], key: &str, ancestor_index: usize) -> CycleReport {
    let labels: Vec<&str> = stack.iter().map(|frame| frame.label.as_str()).collect();
    let mut reference = labels.join(".");
    reference.push('.');
    reference.push_str(key);
    let ancestor = labels[..=ancestor_index].join(".");
    CycleReport { reference, ancestor }
}

/// Merges `source` into `target` with the default `tracing`-backed sink.
pub fn merge(
    source: &Value,
    target: &Value,
    policy: ConflictPolicy,
) -> Result<Outcome, MergeError> {
    TreeMerger::new().merge(source, target, policy)
}

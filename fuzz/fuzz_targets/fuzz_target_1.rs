#![no_main]
use libfuzzer_sys::fuzz_target;
use treegraft::{merge, ConflictPolicy, Node, Outcome, Value};

#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

fuzz_target!(|input: (Node, Node, u8)| {
    let (source, target, raw) = input;
    let policy = ConflictPolicy::from_code(i64::from(raw % 3)).unwrap();

    let source_before = source.to_json().expect("generated trees are acyclic");
    let outcome = merge(
        &Value::Node(source.clone()),
        &Value::Node(target.clone()),
        policy,
    )
    .expect("two nodes are always valid arguments");

    // Generated trees are built bottom-up, so no back-references exist.
    assert_eq!(outcome, Outcome::Success);

    // The source is read-only and the merged target must stay acyclic.
    assert_eq!(source.to_json().unwrap(), source_before);
    let merged = target.to_json().expect("merged tree stays acyclic");

    if policy == ConflictPolicy::Overwrite {
        assert_eq!(
            merged, source_before,
            "overwrite must leave the target structurally equal to the source"
        );
    }
});

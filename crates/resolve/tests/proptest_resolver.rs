use gixt_index::{AliasTable, Index, IndexEntry};
use gixt_protocol::Platform;
use gixt_resolve::{ResolveOptions, Resolver};
use proptest::prelude::*;

fn arb_entry() -> impl Strategy<Value = IndexEntry> {
    (
        "[a-f0-9]{4,10}",
        prop::sample::select(vec!["alice", "bob", "Carol"]),
        "[a-z ]{0,8}",
        prop::collection::vec(
            (
                prop::sample::select(vec!["run", "main", "tool", "Hello"]),
                prop::sample::select(vec![".sh", ".bat", ".py", ".ps1", ""]),
            ),
            0..3,
        ),
    )
        .prop_map(|(id, owner, description, files)| IndexEntry {
            id,
            owner: owner.to_string(),
            description,
            filenames: files.into_iter().map(|(s, e)| format!("{s}{e}")).collect(),
            updated_at: String::new(),
        })
}

proptest! {
    #[test]
    fn resolution_is_deterministic(
        entries in prop::collection::vec(arb_entry(), 0..8),
        input in prop::sample::select(vec!["run", "alice/run", "Hello.sh", "bob/tool", "main", "carol/hello"]),
        description_lookup in any::<bool>(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let aliases = AliasTable::default();
        let index = Index::new(entries);
        let options = ResolveOptions { description_lookup, ..ResolveOptions::default() };
        let resolver = Resolver::new(&aliases, &index).with_platform(Platform::Posix);

        let first = runtime.block_on(resolver.resolve(input, &options)).map_err(|e| e.to_string());
        let second = runtime.block_on(resolver.resolve(input, &options)).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }
}

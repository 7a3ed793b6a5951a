use proptest::prelude::*;
use whale_types::IndexMetadata;

fn optional_kind() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z]{1,10}")
}

proptest! {
    #[test]
    fn rendering_is_deterministic(
        name in "[a-z_]{1,12}",
        columns in prop::collection::vec("[a-z_]{1,8}", 0..6),
        index_type in optional_kind(),
        constraint in optional_kind(),
        architecture in optional_kind(),
    ) {
        let mut idx = IndexMetadata::new("db", "cluster", "schema", "table", name, columns);
        if let Some(kind) = index_type {
            idx = idx.with_index_type(kind);
        }
        if let Some(kind) = constraint {
            idx = idx.with_constraint(kind);
        }
        if let Some(kind) = architecture {
            idx = idx.with_architecture(kind);
        }

        prop_assert_eq!(idx.format_for_markdown(), idx.format_for_markdown());
    }

    #[test]
    fn columns_keep_their_order(columns in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let idx = IndexMetadata::new("db", "cluster", "schema", "table", "idx", columns.clone());
        let expected = columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");

        prop_assert_eq!(idx.format_for_markdown(), format!("* [] `idx` [{expected}]"));
    }

    #[test]
    fn type_list_follows_type_constraint_architecture(
        index_type in "[a-z]{1,6}",
        constraint in "[a-z]{1,6}",
        architecture in "[a-z]{1,6}",
    ) {
        let idx = IndexMetadata::new("db", "cluster", "schema", "table", "idx", ["c"])
            .with_architecture(architecture.clone())
            .with_index_type(index_type.clone())
            .with_constraint(constraint.clone());

        prop_assert_eq!(
            idx.format_for_markdown(),
            format!("* [{index_type}, {constraint}, {architecture}] `idx` [`c`]")
        );
    }
}

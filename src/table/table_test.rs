// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for the persistent table.

#[cfg(test)]
mod tests {
    use crate::error::FlowError;
    use crate::record::{FieldValue, Record};
    use crate::table::{DerivedSettings, PersistentTable, TableKind};
    use tempfile::TempDir;

    fn row(fields: &[(&str, FieldValue)]) -> Record {
        fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn source_table(dir: &TempDir, name: &str) -> PersistentTable {
        PersistentTable::open(dir.path(), name, TableKind::Source, DerivedSettings::source())
            .unwrap()
    }

    #[test]
    fn test_add_and_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut table = source_table(&dir, "people");

        let alice = row(&[
            ("name", FieldValue::from("alice")),
            ("age", FieldValue::Integer(34)),
        ]);
        table.add_data(FieldValue::from("a"), &alice).unwrap();

        assert_eq!(table.get_data(&FieldValue::from("a")).unwrap(), Some(alice));
        assert_eq!(table.get_data(&FieldValue::from("b")).unwrap(), None);
    }

    #[test]
    fn test_readd_shadows_previous_version() {
        let dir = TempDir::new().unwrap();
        let mut table = source_table(&dir, "people");

        table
            .add_data(FieldValue::from("a"), &row(&[("v", FieldValue::Integer(1))]))
            .unwrap();
        table
            .add_data(FieldValue::from("a"), &row(&[("v", FieldValue::Integer(2))]))
            .unwrap();

        let current = table.get_data(&FieldValue::from("a")).unwrap().unwrap();
        assert_eq!(current.get("v"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn test_remove_is_not_implemented() {
        let dir = TempDir::new().unwrap();
        let mut table = source_table(&dir, "people");

        let result = table.remove_data(&FieldValue::from("a"));
        assert!(matches!(result, Err(FlowError::NotImplemented { .. })));
    }

    #[test]
    fn test_backing_files_use_table_name() {
        let dir = TempDir::new().unwrap();
        let _table = source_table(&dir, "people");

        assert!(dir.path().join("people.index").exists());
        assert!(dir.path().join("people.table").exists());
    }

    #[test]
    fn test_range_searches_return_rows() {
        let dir = TempDir::new().unwrap();
        let mut table = source_table(&dir, "scores");

        for n in 1..=6 {
            table
                .add_data(
                    FieldValue::Integer(n),
                    &row(&[("score", FieldValue::Integer(n * 10))]),
                )
                .unwrap();
        }

        let above = table
            .search_greater_than(&FieldValue::Integer(4), false)
            .unwrap();
        assert_eq!(
            above.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(),
            vec![FieldValue::Integer(5), FieldValue::Integer(6)]
        );

        let below = table
            .search_less_than(&FieldValue::Integer(3), true)
            .unwrap();
        assert_eq!(below.len(), 3);
        assert_eq!(
            below[0].1.get("score"),
            Some(&FieldValue::Integer(10))
        );
    }

    #[test]
    fn test_all_rows_in_key_order() {
        let dir = TempDir::new().unwrap();
        let mut table = source_table(&dir, "letters");

        for key in ["c", "a", "b"] {
            table
                .add_data(FieldValue::from(key), &row(&[("k", FieldValue::from(key))]))
                .unwrap();
        }

        let keys: Vec<FieldValue> = table.all_rows().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![FieldValue::from("a"), FieldValue::from("b"), FieldValue::from("c")]
        );
    }

    #[test]
    fn test_reopen_preserves_rows() {
        let dir = TempDir::new().unwrap();
        {
            let mut table = source_table(&dir, "people");
            table
                .add_data(FieldValue::from("a"), &row(&[("v", FieldValue::Integer(7))]))
                .unwrap();
        }

        let table = source_table(&dir, "people");
        let found = table.get_data(&FieldValue::from("a")).unwrap().unwrap();
        assert_eq!(found.get("v"), Some(&FieldValue::Integer(7)));
    }
}

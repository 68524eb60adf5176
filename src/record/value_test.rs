// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for field values and record encoding.

#[cfg(test)]
mod tests {
    use crate::record::{decode, encode, FieldValue, Record};

    #[test]
    fn test_integer_float_compare_numerically() {
        assert_eq!(FieldValue::Integer(1), FieldValue::Float(1.0));
        assert!(FieldValue::Integer(1) < FieldValue::Float(1.5));
        assert!(FieldValue::Float(2.5) > FieldValue::Integer(2));
    }

    #[test]
    fn test_kind_ranks_are_stable() {
        assert!(FieldValue::Bool(true) < FieldValue::Integer(0));
        assert!(FieldValue::Integer(999) < FieldValue::Str("a".to_string()));
    }

    #[test]
    fn test_string_ordering_is_lexical() {
        assert!(FieldValue::from("alpha") < FieldValue::from("bravo"));
        assert_eq!(FieldValue::from("same"), FieldValue::from("same"));
    }

    #[test]
    fn test_record_roundtrip() {
        let mut record = Record::new();
        record.insert("name".to_string(), FieldValue::from("reed"));
        record.insert("age".to_string(), FieldValue::Integer(41));
        record.insert("score".to_string(), FieldValue::Float(9.5));
        record.insert("active".to_string(), FieldValue::Bool(true));

        let decoded = decode(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_empty_record_roundtrip() {
        let record = Record::new();
        let bytes = encode(&record).unwrap();
        assert_ne!(bytes[0], 0);
        assert_eq!(decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_wire_shape_is_externally_tagged() {
        let json = serde_json::to_value(FieldValue::Integer(5)).unwrap();
        assert_eq!(json, serde_json::json!({ "Integer": 5 }));

        let json = serde_json::to_value(FieldValue::from("x")).unwrap();
        assert_eq!(json, serde_json::json!({ "Str": "x" }));

        let json = serde_json::to_value(FieldValue::Bool(true)).unwrap();
        assert_eq!(json, serde_json::json!({ "Bool": true }));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(&[0xff, 0x00, 0x13]).is_err());
    }
}

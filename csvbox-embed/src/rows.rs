//! Reshapes positional import rows into keyed row objects.
//!
//! Each cell lands in one of three buckets by column index: dynamic,
//! virtual, or plain. Dynamic wins over virtual, virtual over plain. Plain
//! cells become top-level keys; the other buckets and the row's unmapped
//! data hang off `_dynamic_data`, `_virtual_data` and `_unmapped_data`, each
//! only when non-empty.

use csvbox_types::{Metadata, PushStatusPayload, RawRow};
use serde_json::Value;
use std::collections::HashSet;

pub const UNMAPPED_KEY: &str = "_unmapped_data";
pub const DYNAMIC_KEY: &str = "_dynamic_data";
pub const VIRTUAL_KEY: &str = "_virtual_data";

/// Column names plus the index sets that route cells to side buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowLayout {
    headers: Vec<Option<String>>,
    dynamic: HashSet<usize>,
    virtual_: HashSet<usize>,
}

impl RowLayout {
    pub fn new(
        headers: Vec<Option<String>>,
        dynamic: impl IntoIterator<Item = usize>,
        virtual_: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            headers,
            dynamic: dynamic.into_iter().collect(),
            virtual_: virtual_.into_iter().collect(),
        }
    }

    pub fn from_payload(payload: &PushStatusPayload) -> Self {
        Self::new(
            payload.headers.clone(),
            payload.dynamic_indexes.iter().copied(),
            payload.virtual_indexes.iter().copied(),
        )
    }

    /// Shapes every row, preserving input order.
    pub fn shape_all(&self, rows: &[RawRow]) -> Vec<Value> {
        rows.iter().map(|row| Value::Object(self.shape(row))).collect()
    }

    /// Shapes one row. Cells at positions without a header are dropped.
    pub fn shape(&self, row: &RawRow) -> Metadata {
        let mut plain = Metadata::new();
        let mut dynamic = Metadata::new();
        let mut virtual_ = Metadata::new();

        for (i, cell) in row.data.iter().enumerate() {
            let Some(Some(header)) = self.headers.get(i) else {
                continue;
            };
            let cell = match cell {
                Value::Null => Value::String(String::new()),
                other => other.clone(),
            };
            let bucket = if self.dynamic.contains(&i) {
                &mut dynamic
            } else if self.virtual_.contains(&i) {
                &mut virtual_
            } else {
                &mut plain
            };
            bucket.insert(header.clone(), cell);
        }

        if let Some(unmapped) = row.unmapped_data.as_ref().filter(|v| is_non_empty(v)) {
            plain.insert(UNMAPPED_KEY.into(), unmapped.clone());
        }
        if !dynamic.is_empty() {
            plain.insert(DYNAMIC_KEY.into(), Value::Object(dynamic));
        }
        if !virtual_.is_empty() {
            plain.insert(VIRTUAL_KEY.into(), Value::Object(virtual_));
        }
        plain
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn headers(names: &[&str]) -> Vec<Option<String>> {
        names.iter().map(|n| Some(n.to_string())).collect()
    }

    fn row(data: Value) -> RawRow {
        RawRow::from_value(&json!({ "data": data }))
    }

    #[test]
    fn routes_cells_into_buckets() {
        let layout = RowLayout::new(headers(&["a", "b", "c"]), [1], [2]);
        let shaped = layout.shape(&row(json!(["x", "y", "z"])));
        assert_eq!(
            Value::Object(shaped),
            json!({ "a": "x", "_dynamic_data": { "b": "y" }, "_virtual_data": { "c": "z" } })
        );
    }

    #[test]
    fn dynamic_takes_precedence_over_virtual() {
        let layout = RowLayout::new(headers(&["a", "b"]), [1], [1]);
        let shaped = layout.shape(&row(json!(["x", "y"])));
        assert_eq!(
            Value::Object(shaped),
            json!({ "a": "x", "_dynamic_data": { "b": "y" } })
        );
    }

    #[test]
    fn null_cells_become_empty_strings() {
        let layout = RowLayout::new(headers(&["a", "b"]), [], []);
        let shaped = layout.shape(&row(json!([null, 5])));
        assert_eq!(Value::Object(shaped), json!({ "a": "", "b": 5 }));
    }

    #[test]
    fn cells_without_headers_are_dropped() {
        let layout = RowLayout::new(vec![Some("a".into()), None], [], []);
        let shaped = layout.shape(&row(json!(["x", "y", "z"])));
        assert_eq!(Value::Object(shaped), json!({ "a": "x" }));
    }

    #[test]
    fn unmapped_data_attached_only_when_non_empty() {
        let layout = RowLayout::new(headers(&["a"]), [], []);

        let with = RawRow::from_value(&json!({ "data": ["x"], "unmapped_data": { "extra": "1" } }));
        assert_eq!(
            Value::Object(layout.shape(&with)),
            json!({ "a": "x", "_unmapped_data": { "extra": "1" } })
        );

        for empty in [json!({}), json!([]), json!(""), json!(null)] {
            let without = RawRow::from_value(&json!({ "data": ["x"], "unmapped_data": empty }));
            assert_eq!(Value::Object(layout.shape(&without)), json!({ "a": "x" }));
        }
    }

    #[test]
    fn row_without_data_is_empty_object() {
        let layout = RowLayout::new(headers(&["a"]), [0], []);
        assert!(layout.shape(&RawRow::default()).is_empty());
    }

    #[test]
    fn shape_all_preserves_order_and_duplicates() {
        let layout = RowLayout::new(headers(&["n"]), [], []);
        let rows = vec![row(json!(["2"])), row(json!(["1"])), row(json!(["2"]))];
        assert_eq!(
            layout.shape_all(&rows),
            vec![json!({ "n": "2" }), json!({ "n": "1" }), json!({ "n": "2" })]
        );
    }
}

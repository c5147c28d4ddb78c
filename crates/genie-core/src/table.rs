//! Tabular job outputs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// A simple string table: a header row and data rows of the same width.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTable")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

impl From<RawTable> for Table {
    fn from(raw: RawTable) -> Self {
        Self::new(raw.columns, raw.rows)
    }
}

impl Table {
    /// Creates a table, padding or truncating rows to the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Parses CSV with a header row.
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);

        let columns = reader.headers()?.iter().map(str::to_owned).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_owned).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;

        Ok(Self::new(columns, rows))
    }

    /// Builds a table from JSON records.
    ///
    /// Accepts an array of objects (columns are the union of keys in the
    /// order they first appear) or an object of equally long column arrays. Nulls
    /// become empty cells and nested values are kept as JSON text.
    pub fn from_records(value: &Value) -> Result<Self> {
        match value {
            Value::Array(records) => Self::from_row_records(records),
            Value::Object(columns) => {
                let names: Vec<String> = columns.keys().cloned().collect();
                let mut cells = Vec::with_capacity(names.len());
                for (name, column) in columns {
                    let Value::Array(values) = column else {
                        return Err(Error::serialization()
                            .with_message(format!("column {name} is not an array")));
                    };
                    cells.push(values);
                }

                let height = cells.iter().map(|c| c.len()).max().unwrap_or(0);
                let rows = (0..height)
                    .map(|i| {
                        cells
                            .iter()
                            .map(|column| column.get(i).map(cell_text).unwrap_or_default())
                            .collect()
                    })
                    .collect();

                Ok(Self::new(names, rows))
            }
            Value::Null => Ok(Self::default()),
            other => Err(Error::serialization()
                .with_message(format!("expected records, found {}", json_type(other)))),
        }
    }

    fn from_row_records(records: &[Value]) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            let Value::Object(fields) = record else {
                return Err(Error::serialization()
                    .with_message(format!("expected an object record, found {}", json_type(record))));
            };
            for key in fields.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .filter_map(Value::as_object)
            .map(|fields| {
                columns
                    .iter()
                    .map(|column| fields.get(column).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        Ok(Self::new(columns, rows))
    }

    /// Serializes the table as CSV with a header row.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }

        writer
            .into_inner()
            .map_err(|e| Error::from_source(crate::ErrorKind::Serialization, e.into_error()))
    }

    /// Converts the table to an array of objects, one per row, with cells
    /// as strings and keys in column order.
    pub fn to_records(&self) -> Value {
        self.rows
            .iter()
            .map(|row| {
                let fields = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned().map(Value::String));
                Value::Object(fields.collect())
            })
            .collect()
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the data rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the values of a column, or `None` if there is no such column.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Concatenates tables row-wise over the union of their columns.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Self {
        let tables: Vec<Table> = tables.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| table.column_index(c)).collect();
            for row in table.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|index| index.map(|i| row[i].clone()).unwrap_or_default())
                        .collect(),
                );
            }
        }

        Self { columns, rows }
    }

    /// Drops rows whose value in `column` is empty or whitespace.
    ///
    /// A table without that column is returned unchanged.
    #[must_use]
    pub fn drop_empty(mut self, column: &str) -> Self {
        if let Some(index) = self.column_index(column) {
            self.rows.retain(|row| !row[index].trim().is_empty());
        }
        self
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        nested => nested.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_from_csv() {
        let table = Table::from_csv(b"doc_name,pagenum,text\nacme,1,Revenue\nacme,2,\"a, b\"\n")
            .unwrap();

        assert_eq!(table.columns(), ["doc_name", "pagenum", "text"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("text"), Some(vec!["Revenue", "a, b"]));
        assert_eq!(table.column("missing"), None);
    }

    #[test]
    fn test_from_csv_pads_short_rows() {
        let table = Table::from_csv(b"a,b,c\n1\n").unwrap();
        assert_eq!(table.rows(), [vec!["1".to_string(), String::new(), String::new()]]);
    }

    #[test]
    fn test_from_row_records() {
        let table = Table::from_records(&json!([
            {"company": "acme", "value": 12.5},
            {"company": "globex", "unit": "USD", "value": null},
        ]))
        .unwrap();

        assert_eq!(table.columns(), ["company", "value", "unit"]);
        assert_eq!(table.column("value"), Some(vec!["12.5", ""]));
        assert_eq!(table.column("unit"), Some(vec!["", "USD"]));
    }

    #[test]
    fn test_from_column_records() {
        let table = Table::from_records(&json!({
            "pagenum": [1, 2, 3],
            "text": ["a", "b"],
        }))
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.column("text"), Some(vec!["a", "b", ""]));
    }

    #[test]
    fn test_from_records_rejects_scalars() {
        let error = Table::from_records(&json!("text")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Serialization);
        assert!(Table::from_records(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_concat_unions_columns() {
        let first = Table::from_csv(b"a,b\n1,2\n").unwrap();
        let second = Table::from_csv(b"b,c\n3,4\n").unwrap();

        let table = Table::concat([first, second]);

        assert_eq!(table.columns(), ["a", "b", "c"]);
        assert_eq!(table.column("a"), Some(vec!["1", ""]));
        assert_eq!(table.column("b"), Some(vec!["2", "3"]));
        assert_eq!(table.column("c"), Some(vec!["", "4"]));
    }

    #[test]
    fn test_drop_empty() {
        let table = Table::from_csv(b"pagenum,text\n1,Revenue\n2,\n3,  \n4,Costs\n")
            .unwrap()
            .drop_empty("text");

        assert_eq!(table.column("pagenum"), Some(vec!["1", "4"]));
    }

    #[test]
    fn test_to_csv() {
        let table = Table::from_records(&json!([{"name": "a, b", "n": 1}])).unwrap();
        let csv = String::from_utf8(table.to_csv().unwrap()).unwrap();
        assert_eq!(csv, "name,n\n\"a, b\",1\n");
    }

    #[test]
    fn test_record_keys_keep_document_order() {
        let value: Value = serde_json::from_str(r#"[{"zeta": 1, "alpha": 2, "mid": 3}]"#).unwrap();
        let table = Table::from_records(&value).unwrap();
        assert_eq!(table.columns(), ["zeta", "alpha", "mid"]);

        let value: Value = serde_json::from_str(r#"{"text": ["a"], "pagenum": ["1"]}"#).unwrap();
        let table = Table::from_records(&value).unwrap();
        assert_eq!(table.columns(), ["text", "pagenum"]);
    }

    #[test]
    fn test_to_records() {
        let table = Table::from_csv(b"text,pagenum\nRevenue,1\nCosts\n").unwrap();
        let records = table.to_records();

        assert_eq!(
            records,
            json!([
                {"text": "Revenue", "pagenum": "1"},
                {"text": "Costs", "pagenum": ""},
            ])
        );
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["text", "pagenum"]);
    }

    #[test]
    fn test_deserialize_pads_short_rows() {
        let table: Table =
            serde_json::from_str(r#"{"columns": ["a", "b"], "rows": [["1"], ["2", "3", "4"]]}"#)
                .unwrap();

        assert_eq!(table.column("b"), Some(vec!["", "3"]));
        assert_eq!(table.rows()[1], ["2", "3"]);
        assert_eq!(Table::concat([table]).column("a"), Some(vec!["1", "2"]));
    }
}

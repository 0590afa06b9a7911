use serde_json::{Map, Value};

use super::schema::{COLUMNS, ELIGIBILITY_FIELD, TESTS_FIELD};

/// Field map of a build or test record as returned by the server.
pub type Fields = Map<String, Value>;

/// A build record split into its own fields and its nested test records.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRecord {
    fields: Fields,
    tests: Vec<Fields>,
}

impl BuildRecord {
    /// Validates the shape of one element of a batch artifact.
    ///
    /// A missing or `null` test list means the build has no tests.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(format!(
                    "expected a build object, found {}",
                    json_kind(&other)
                ))
            }
        };

        let tests = match fields.remove(TESTS_FIELD) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(tests)) => tests
                .into_iter()
                .enumerate()
                .map(|(index, test)| match test {
                    Value::Object(test) => Ok(test),
                    other => Err(format!(
                        "test #{index} is {}, expected an object",
                        json_kind(&other)
                    )),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(format!(
                    "`{TESTS_FIELD}` is {}, expected an array",
                    json_kind(&other)
                ))
            }
        };

        Ok(Self { fields, tests })
    }

    #[cfg(test)]
    pub fn tests(&self) -> &[Fields] {
        &self.tests
    }
}

/// Whether a test record belongs in the dataset.
pub fn is_eligible(test: &Fields) -> bool {
    test.contains_key(ELIGIBILITY_FIELD)
}

/// Overlays a test record onto its build's fields.
///
/// Every build field is kept; a test field replaces the build field with the
/// same key.
pub fn merge_fields(build: &Fields, test: &Fields) -> Fields {
    let mut merged = build.clone();
    for (key, value) in test {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// One dataset row, holding a value for every column in [`COLUMNS`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    /// Projects a merged record onto the column schema. Columns missing from
    /// the record become `null`; keys outside the schema are dropped.
    pub fn project(merged: &Fields) -> Self {
        Self(
            COLUMNS
                .iter()
                .map(|column| merged.get(*column).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    #[cfg(test)]
    pub fn get(&self, column: &str) -> Option<&Value> {
        COLUMNS
            .iter()
            .position(|candidate| *candidate == column)
            .map(|index| &self.0[index])
    }
}

/// Expands a build into one row per eligible test, in test order.
pub fn flatten(build: &BuildRecord) -> Vec<Row> {
    build
        .tests
        .iter()
        .filter(|test| is_eligible(test))
        .map(|test| Row::project(&merge_fields(&build.fields, test)))
        .collect()
}

pub(super) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::COLUMNS;
use super::Dataset;
use crate::error::Result;

/// File formats the dataset can be exported to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Delimited text with a fixed header
    #[default]
    Csv,
    /// Array of objects keyed by column
    Json,
}

/// Writes the dataset to `path`, replacing any previous export.
pub fn write_dataset(
    dataset: &Dataset,
    path: &Path,
    format: ExportFormat,
    pretty: bool,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    export_dataset(dataset, format, pretty, &mut writer)?;
    writer.flush()?;

    Ok(())
}

pub fn export_dataset(
    dataset: &Dataset,
    format: ExportFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        ExportFormat::Csv => export_csv(dataset, output),
        ExportFormat::Json => export_json(dataset, pretty, output),
    }
}

fn export_csv(dataset: &Dataset, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "{}", COLUMNS.join(","))?;

    for row in dataset.rows() {
        let line = row
            .values()
            .iter()
            .map(|value| escape_field(render_cell(value)))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(output, "{line}")?;
    }

    Ok(())
}

fn export_json(dataset: &Dataset, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let records: Vec<IndexMap<&str, &Value>> = dataset
        .rows()
        .iter()
        .map(|row| COLUMNS.iter().copied().zip(row.values()).collect())
        .collect();

    if pretty {
        serde_json::to_writer_pretty(&mut *output, &records)?;
    } else {
        serde_json::to_writer(&mut *output, &records)?;
    }
    writeln!(output)?;

    Ok(())
}

/// Text of a single CSV cell: `null` is empty, strings are verbatim and
/// everything else is its compact JSON text.
fn render_cell(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(text) => Cow::Borrowed(text),
        other => Cow::Owned(other.to_string()),
    }
}

fn escape_field(field: Cow<'_, str>) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::record::{flatten, BuildRecord};
    use serde_json::json;

    fn dataset(builds: Value) -> Dataset {
        let mut dataset = Dataset::default();
        for build in builds.as_array().unwrap() {
            let record = BuildRecord::from_value(build.clone()).unwrap();
            dataset.push_rows(flatten(&record));
        }
        dataset
    }

    fn csv(dataset: &Dataset) -> String {
        let mut output = Vec::new();
        export_dataset(dataset, ExportFormat::Csv, false, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_csv_header_is_fixed_schema() {
        let output = csv(&Dataset::default());
        assert_eq!(
            output,
            "buildId,clientDate,committers,changeCount,comment,triggeredBy,description,\
             isDefaultBranch,branchName,changes,reasons,testCount,testRunId,testNameId,\
             stacktrace,className,testMethod,testClass,testSuite,duration,orderId,isFixed,\
             previousResponsible\n"
        );
    }

    #[test]
    fn test_csv_renders_nulls_and_scalars() {
        let data = dataset(json!([{
            "buildId": 7,
            "isDefaultBranch": true,
            "tests": [{"testMethod": "a", "duration": 1.5, "previousResponsible": "x"}]
        }]));

        let output = csv(&data);
        let row = output.lines().nth(1).unwrap();
        let cells: Vec<&str> = row.split(',').collect();

        assert_eq!(cells.len(), COLUMNS.len());
        assert_eq!(cells[0], "7");
        assert_eq!(cells[1], "");
        assert_eq!(cells[7], "true");
        assert_eq!(cells[16], "a");
        assert_eq!(cells[19], "1.5");
        assert_eq!(cells[22], "x");
    }

    #[test]
    fn test_csv_quotes_structured_and_multiline_values() {
        let data = dataset(json!([{
            "buildId": 1,
            "comment": "said \"hi\"",
            "tests": [{
                "stacktrace": "line one\nline two",
                "previousResponsible": ["Ann", "Bob"]
            }]
        }]));

        let output = csv(&data);

        assert!(output.contains("\"said \"\"hi\"\"\""));
        assert!(output.contains("\"line one\nline two\""));
        assert!(output.contains("\"[\"\"Ann\"\",\"\"Bob\"\"]\""));
    }

    #[test]
    fn test_json_export_keeps_column_order() {
        let data = dataset(json!([{
            "buildId": 2,
            "tests": [{"testMethod": "m", "previousResponsible": "p"}]
        }]));

        let mut output = Vec::new();
        export_dataset(&data, ExportFormat::Json, false, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        let parsed: Vec<serde_json::Map<String, Value>> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].len(), COLUMNS.len());
        assert!(text.starts_with("[{\"buildId\":2,\"clientDate\":null"));
        assert!(text.trim_end().ends_with("\"previousResponsible\":\"p\"}]"));
    }

    #[test]
    fn test_write_dataset_creates_parent_directories() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("investigations.csv");

        write_dataset(&Dataset::default(), &path, ExportFormat::Csv, false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("buildId,"));
        assert_eq!(content.lines().count(), 1);
    }
}

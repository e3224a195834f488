//! CSV adapter: reads the symptom dataset files into `triage_core` structures.

use std::collections::{hash_map::Entry, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};
use triage_core::{Dataset, FeatureSchema, ReferenceData, TriageError, PRECAUTION_SLOTS};

pub const TRAINING_FILE: &str = "training.csv";
pub const TESTING_FILE: &str = "Testing.csv";
pub const SEVERITY_FILE: &str = "Symptom_severity.csv";
pub const DESCRIPTION_FILE: &str = "symptom_Description.csv";
pub const PRECAUTION_FILE: &str = "symptom_precaution.csv";

/// Header of the condition column in the training and testing files.
pub const LABEL_COLUMN: &str = "prognosis";

/// Locations of the five data files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub training: PathBuf,
    pub testing: PathBuf,
    pub severity: PathBuf,
    pub description: PathBuf,
    pub precaution: PathBuf,
}

impl DataFiles {
    /// Standard file names inside one directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            training: dir.join(TRAINING_FILE),
            testing: dir.join(TESTING_FILE),
            severity: dir.join(SEVERITY_FILE),
            description: dir.join(DESCRIPTION_FILE),
            precaution: dir.join(PRECAUTION_FILE),
        }
    }
}

/// Everything read at start-up.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub training: Dataset,
    /// Absent when the testing file does not exist.
    pub testing: Option<Dataset>,
    pub reference: ReferenceData,
}

/// Reads every file. The testing file is optional; the others are required.
pub fn load_all(files: &DataFiles) -> Result<LoadedData, TriageError> {
    let training = parse_dataset_str(&read(&files.training)?)?;
    info!(
        rows = training.len(),
        symptoms = training.schema.len(),
        "training data loaded"
    );

    let testing = if files.testing.exists() {
        let testing = parse_dataset_str(&read(&files.testing)?)?;
        info!(rows = testing.len(), "testing data loaded");
        Some(testing)
    } else {
        warn!(path = ?files.testing, "testing file not found, skipping schema check");
        None
    };

    let reference = parse_reference_str(
        &read(&files.severity)?,
        &read(&files.description)?,
        &read(&files.precaution)?,
    )?;
    info!(
        severity = reference.severity_len(),
        descriptions = reference.description_len(),
        precautions = reference.precaution_len(),
        "reference data loaded"
    );

    Ok(LoadedData {
        training,
        testing,
        reference,
    })
}

fn read(path: &Path) -> Result<String, TriageError> {
    fs::read_to_string(path).map_err(|err| {
        TriageError::Parse(format!("cannot read {}: {err}", path.display()))
    })
}

/// Parses a one-hot symptom table whose `prognosis` column holds the label.
/// Columns with an empty header are ignored; repeated headers get `.1`,
/// `.2`, ... suffixes.
pub fn parse_dataset_str(data: &str) -> Result<Dataset, TriageError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(data.as_bytes());

    let headers = reader.headers().map_err(csv_error)?.clone();
    let label_column = headers
        .iter()
        .position(|name| name == LABEL_COLUMN)
        .ok_or_else(|| TriageError::Parse(format!("missing `{LABEL_COLUMN}` column")))?;

    let feature_columns: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(index, name)| *index != label_column && !name.is_empty())
        .map(|(index, _)| index)
        .collect();
    let names = dedupe_headers(feature_columns.iter().filter_map(|index| headers.get(*index)));
    let schema = FeatureSchema::new(names)?;

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let label = field(&record, label_column, line)?;
        if label.is_empty() {
            return Err(TriageError::Parse(format!("row {} has no label", line + 1)));
        }

        let mut row = Vec::with_capacity(feature_columns.len());
        for column in &feature_columns {
            let raw = field(&record, *column, line)?;
            let value = raw.parse::<f64>().map_err(|_| {
                TriageError::Parse(format!(
                    "row {} column `{}`: `{raw}` is not a number",
                    line + 1,
                    headers.get(*column).unwrap_or_default()
                ))
            })?;
            row.push(value);
        }
        rows.push(row);
        labels.push(label.to_string());
    }

    Dataset::new(schema, rows, labels)
}

fn dedupe_headers<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    names
        .map(|name| match seen.entry(name) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += 1;
                format!("{name}.{}", entry.get())
            }
            Entry::Vacant(entry) => {
                entry.insert(0);
                name.to_string()
            }
        })
        .collect()
}

/// `symptom,weight` rows without a header. Rows whose weight is not an
/// integer are skipped.
pub fn parse_severity_str(data: &str) -> Result<HashMap<String, u32>, TriageError> {
    let mut severity = HashMap::new();
    for (line, record) in headerless(data).records().enumerate() {
        let record = record.map_err(csv_error)?;
        let symptom = record.get(0).unwrap_or_default();
        if symptom.is_empty() {
            continue;
        }
        match record.get(1).map(str::parse::<u32>) {
            Some(Ok(weight)) => {
                severity.insert(symptom.to_string(), weight);
            }
            _ => warn!(line = line + 1, symptom, "severity row skipped"),
        }
    }
    Ok(severity)
}

/// `condition,description` rows without a header.
pub fn parse_descriptions_str(data: &str) -> Result<HashMap<String, String>, TriageError> {
    let mut descriptions = HashMap::new();
    for (line, record) in headerless(data).records().enumerate() {
        let record = record.map_err(csv_error)?;
        let condition = record.get(0).unwrap_or_default();
        if condition.is_empty() {
            continue;
        }
        let description = field(&record, 1, line)?;
        descriptions.insert(condition.to_string(), description.to_string());
    }
    Ok(descriptions)
}

/// `condition,p1,p2,p3,p4` rows without a header; empty slots are kept.
pub fn parse_precautions_str(
    data: &str,
) -> Result<HashMap<String, [String; PRECAUTION_SLOTS]>, TriageError> {
    let mut precautions = HashMap::new();
    for (line, record) in headerless(data).records().enumerate() {
        let record = record.map_err(csv_error)?;
        let condition = record.get(0).unwrap_or_default();
        if condition.is_empty() {
            continue;
        }
        if record.len() < PRECAUTION_SLOTS + 1 {
            return Err(TriageError::Parse(format!(
                "row {} lists {} precautions for `{condition}`, expected {PRECAUTION_SLOTS}",
                line + 1,
                record.len().saturating_sub(1)
            )));
        }
        let slots: [String; PRECAUTION_SLOTS] =
            std::array::from_fn(|slot| record.get(slot + 1).unwrap_or_default().to_string());
        precautions.insert(condition.to_string(), slots);
    }
    Ok(precautions)
}

/// Builds the reference tables from the three CSV payloads.
pub fn parse_reference_str(
    severity: &str,
    descriptions: &str,
    precautions: &str,
) -> Result<ReferenceData, TriageError> {
    Ok(ReferenceData::new(
        parse_severity_str(severity)?,
        parse_descriptions_str(descriptions)?,
        parse_precautions_str(precautions)?,
    ))
}

fn headerless(data: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data.as_bytes())
}

fn field<'r>(record: &'r StringRecord, column: usize, line: usize) -> Result<&'r str, TriageError> {
    record
        .get(column)
        .ok_or_else(|| TriageError::Parse(format!("row {} has no column {column}", line + 1)))
}

fn csv_error(err: csv::Error) -> TriageError {
    TriageError::Parse(err.to_string())
}

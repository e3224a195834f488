//! Bảng tra cứu chỉ đọc: trọng số nghiêm trọng theo triệu chứng, mô tả và
//! biện pháp phòng ngừa theo bệnh.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{FeatureSchema, TriageError};

/// Số biện pháp phòng ngừa của mỗi bệnh.
pub const PRECAUTION_SLOTS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    severity: HashMap<String, u32>,
    descriptions: HashMap<String, String>,
    precautions: HashMap<String, [String; PRECAUTION_SLOTS]>,
}

impl ReferenceData {
    pub fn new(
        severity: HashMap<String, u32>,
        descriptions: HashMap<String, String>,
        precautions: HashMap<String, [String; PRECAUTION_SLOTS]>,
    ) -> Self {
        Self {
            severity,
            descriptions,
            precautions,
        }
    }

    pub fn with_severity(mut self, symptom: impl Into<String>, weight: u32) -> Self {
        self.severity.insert(symptom.into(), weight);
        self
    }

    pub fn with_description(
        mut self,
        condition: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.descriptions.insert(condition.into(), description.into());
        self
    }

    pub fn with_precautions(
        mut self,
        condition: impl Into<String>,
        precautions: [String; PRECAUTION_SLOTS],
    ) -> Self {
        self.precautions.insert(condition.into(), precautions);
        self
    }

    /// Trọng số của một triệu chứng. Thiếu khoá là lỗi toàn vẹn dữ liệu,
    /// không bao giờ coi là 0.
    pub fn severity(&self, symptom: &str) -> Result<u32, TriageError> {
        self.severity
            .get(symptom)
            .copied()
            .ok_or_else(|| TriageError::MissingSeverity(symptom.to_string()))
    }

    pub fn description(&self, condition: &str) -> Result<&str, TriageError> {
        self.descriptions
            .get(condition)
            .map(String::as_str)
            .ok_or_else(|| TriageError::MissingDescription(condition.to_string()))
    }

    pub fn precautions(&self, condition: &str) -> Result<&[String; PRECAUTION_SLOTS], TriageError> {
        self.precautions
            .get(condition)
            .ok_or_else(|| TriageError::MissingPrecautions(condition.to_string()))
    }

    /// Triệu chứng trong lược đồ chưa có trọng số, theo thứ tự cột.
    pub fn missing_severity<'a>(&self, schema: &'a FeatureSchema) -> Vec<&'a str> {
        schema
            .names()
            .iter()
            .filter(|name| !self.severity.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn severity_len(&self) -> usize {
        self.severity.len()
    }

    pub fn description_len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn precaution_len(&self) -> usize {
        self.precautions.len()
    }
}

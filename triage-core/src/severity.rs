//! Điểm nghiêm trọng và quyết định đi khám hay tự phòng ngừa.

use serde::{Deserialize, Serialize};

use crate::{Recommendation, ReferenceData, TriageError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    pub score: f64,
    pub recommendation: Recommendation,
}

/// `(tổng trọng số * số ngày) / (số triệu chứng + 1)`, tính bằng `f64`. Tập
/// rỗng cho điểm 0; số ngày âm cho điểm không dương.
pub fn severity_score<S: AsRef<str>>(
    symptoms: &[S],
    duration_days: i64,
    reference: &ReferenceData,
) -> Result<f64, TriageError> {
    let mut total = 0.0;
    for symptom in symptoms {
        total += f64::from(reference.severity(symptom.as_ref())?);
    }
    Ok(total * duration_days as f64 / (symptoms.len() + 1) as f64)
}

/// Chấm điểm rồi so với `threshold`: lớn hơn hẳn thì khuyên đi khám.
pub fn recommend<S: AsRef<str>>(
    symptoms: &[S],
    duration_days: i64,
    reference: &ReferenceData,
    threshold: f64,
) -> Result<SeverityAssessment, TriageError> {
    let score = severity_score(symptoms, duration_days, reference)?;
    let recommendation = if score > threshold {
        Recommendation::SeekDoctor
    } else {
        Recommendation::TakePrecautions
    };
    Ok(SeverityAssessment {
        score,
        recommendation,
    })
}

//! Logic lõi của trợ lý hỏi triệu chứng: khớp triệu chứng, duyệt cây quyết định,
//! dự đoán xác nhận và chấm điểm mức độ nghiêm trọng.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod interview;
pub mod matcher;
pub mod model;
pub mod predictor;
pub mod reference;
pub mod severity;

pub use interview::{
    Descent, Interview, InterviewContext, InterviewSession, InterviewState, Respondent, Step,
    TreeWalker,
};
pub use matcher::{
    match_symptom, normalize_query, policy_for, ExactPolicy, MatchResult, MatchingPolicy,
    RegexPolicy,
};
pub use model::{
    cross_val_accuracy, train_test_split, ConditionProfiles, Dataset, DecisionTree,
    FeatureSchema, LabelEncoder, Node, NodeId, TrainedModel, ROOT,
};
pub use predictor::ConfirmatoryPredictor;
pub use reference::{ReferenceData, PRECAUTION_SLOTS};
pub use severity::{recommend, severity_score, SeverityAssessment};

/// Ngưỡng điểm mặc định để khuyên đi khám bác sĩ.
pub const DEFAULT_SEVERITY_THRESHOLD: f64 = 13.0;

/// Cấu hình huấn luyện và chính sách khuyến nghị.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageConfig {
    /// Điểm vượt ngưỡng này thì khuyên đi khám.
    pub severity_threshold: f64,
    /// Tỷ lệ dữ liệu huấn luyện giữ lại để đánh giá.
    pub test_fraction: f64,
    /// Hạt giống cho bước xáo trộn trước khi chia dữ liệu.
    pub split_seed: u64,
    /// Số fold khi tính độ chính xác.
    pub cv_folds: usize,
    /// Cách khớp văn bản người dùng với danh sách triệu chứng.
    pub matching: MatchingMode,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            severity_threshold: DEFAULT_SEVERITY_THRESHOLD,
            test_fraction: 0.2,
            split_seed: 42,
            cv_folds: 3,
            matching: MatchingMode::Regex,
        }
    }
}

impl TriageConfig {
    /// Kiểm tra các giá trị cấu hình trước khi huấn luyện.
    pub fn validate(&self) -> Result<(), TriageError> {
        if !self.severity_threshold.is_finite() {
            return Err(TriageError::Config(
                "severity_threshold must be a finite number".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(TriageError::Config(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.cv_folds < 2 {
            return Err(TriageError::Config(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        Ok(())
    }
}

/// Chiến lược khớp triệu chứng.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    /// Tìm kiếm regex trong từng tên triệu chứng (cho phép khớp một phần).
    #[default]
    Regex,
    /// Chỉ chấp nhận tên đầy đủ.
    Exact,
}

/// Khuyến nghị cuối phiên.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    SeekDoctor,
    TakePrecautions,
}

impl Recommendation {
    /// Câu thông báo hiển thị cho người dùng.
    pub fn message(&self) -> &'static str {
        match self {
            Self::SeekDoctor => "You should book consultation from a doctor.",
            Self::TakePrecautions => "It might not be that bad but you should take precautions.",
        }
    }
}

/// Báo cáo tổng hợp của một phiên hỏi đáp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisReport {
    pub generated_at: DateTime<Utc>,
    pub primary_symptom: String,
    pub duration_days: i64,
    pub confirmed_symptoms: Vec<String>,
    /// Các bệnh đánh dấu tại lá của cây.
    pub leaf_conditions: Vec<String>,
    /// Bệnh dẫn đầu tại lá, dùng để tra mô tả và biện pháp.
    pub condition: String,
    /// Kết quả dự đoán lại trên toàn bộ triệu chứng đã xác nhận.
    pub confirmed_condition: String,
    pub accuracy: Option<f64>,
    pub severity_score: f64,
    pub recommendation: Recommendation,
    pub description: String,
    pub precautions: Vec<String>,
}

impl DiagnosisReport {
    /// Hai lượt dự đoán có cho cùng một bệnh hay không.
    pub fn predictions_agree(&self) -> bool {
        self.condition == self.confirmed_condition
    }

    /// Mô tả tách thành từng câu.
    pub fn description_lines(&self) -> Vec<&str> {
        self.description
            .split(". ")
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Lỗi chung của hệ thống hỏi triệu chứng.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Thiếu mức độ nghiêm trọng cho triệu chứng `{0}`")]
    MissingSeverity(String),
    #[error("Thiếu mô tả cho bệnh `{0}`")]
    MissingDescription(String),
    #[error("Thiếu biện pháp phòng ngừa cho bệnh `{0}`")]
    MissingPrecautions(String),
    #[error("Triệu chứng không có trong lược đồ đặc trưng: `{0}`")]
    UnknownSymptom(String),
    #[error("Nhãn bệnh không xác định: `{0}`")]
    UnknownLabel(String),
    #[error("Chỉ số nhãn ngoài phạm vi: {0}")]
    UnknownLabelIndex(usize),
    #[error("Lỗi mô hình: {0}")]
    Model(String),
    #[error("Lược đồ tập kiểm thử không khớp tập huấn luyện: {0}")]
    SchemaMismatch(String),
    #[error("Cấu hình không hợp lệ: {0}")]
    Config(String),
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Lỗi vào/ra: {0}")]
    Io(#[from] std::io::Error),
    #[error("Đầu vào đã đóng")]
    InputClosed,
}

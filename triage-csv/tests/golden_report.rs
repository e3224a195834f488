use std::collections::VecDeque;
use std::fs;

use serde_json::Value;
use triage_core::{
    Interview, InterviewContext, RegexPolicy, Respondent, TrainedModel, TriageConfig, TriageError,
};
use triage_csv::{load_all, DataFiles};

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

struct Script {
    symptoms: VecDeque<&'static str>,
    days: i64,
    answers: VecDeque<bool>,
}

impl Respondent for Script {
    fn primary_symptom(&mut self) -> Result<String, TriageError> {
        self.symptoms
            .pop_front()
            .map(str::to_string)
            .ok_or(TriageError::InputClosed)
    }

    fn choose_candidate(&mut self, _candidates: &[String]) -> Result<usize, TriageError> {
        Ok(1)
    }

    fn duration_days(&mut self) -> Result<i64, TriageError> {
        Ok(self.days)
    }

    fn confirm_symptom(&mut self, _symptom: &str) -> Result<bool, TriageError> {
        self.answers.pop_front().ok_or(TriageError::InputClosed)
    }
}

#[test]
fn fungal_infection_interview_matches_golden() {
    let data = load_all(&DataFiles::in_dir(fixture_path(""))).expect("Không đọc được dữ liệu mẫu");
    let config = TriageConfig {
        test_fraction: 0.0,
        ..TriageConfig::default()
    };
    let model = TrainedModel::train(&data.training, &config).expect("Không huấn luyện được mô hình");

    let mut script = Script {
        symptoms: VecDeque::from(["itch"]),
        days: 5,
        answers: VecDeque::from([true, false]),
    };
    let report = Interview::new(InterviewContext {
        model: &model,
        reference: &data.reference,
        matcher: &RegexPolicy,
        config: &config,
    })
    .run(&mut script)
    .expect("Phiên hỏi đáp thất bại");

    let mut actual = serde_json::to_value(report).expect("Không serialize báo cáo");
    normalize_dynamic_fields(&mut actual);

    let expected = fs::read_to_string(fixture_path("fungal_infection_report.json"))
        .expect("Không đọc được golden report");
    let mut expected_value: Value = serde_json::from_str(&expected).expect("Golden không hợp lệ");
    normalize_dynamic_fields(&mut expected_value);

    assert_eq!(actual, expected_value);
}

fn normalize_dynamic_fields(value: &mut Value) {
    if let Some(obj) = value.as_object_mut() {
        if obj.contains_key("generated_at") {
            obj.insert(
                "generated_at".to_string(),
                Value::String("__DYNAMIC_TIMESTAMP__".to_string()),
            );
        }
    }
}

#![allow(dead_code)]

use std::collections::VecDeque;

use triage_core::{
    ConditionProfiles, Dataset, DecisionTree, FeatureSchema, LabelEncoder, ReferenceData,
    Respondent, TrainedModel, TriageError,
};

pub const HANDMADE_SYMPTOMS: [&str; 5] = ["itching", "skin_rash", "chills", "fatigue", "vomiting"];

/// chills? -> Malaria, otherwise itching? -> Fungal infection / Allergy.
pub fn handmade_model() -> TrainedModel {
    let schema = FeatureSchema::new(HANDMADE_SYMPTOMS.iter().map(|s| s.to_string()).collect())
        .expect("Không tạo được lược đồ");
    let encoder = LabelEncoder::fit(&["Malaria", "Allergy", "Fungal infection"]);
    let tree = DecisionTree::from_arrays(
        &[Some(2), Some(0), None, None, None],
        &[0.5, 0.5, 0.0, 0.0, 0.0],
        &[Some(1), Some(2), None, None, None],
        &[Some(4), Some(3), None, None, None],
        &[
            vec![],
            vec![],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ],
        HANDMADE_SYMPTOMS.len(),
    )
    .expect("Cây không hợp lệ");

    let mut profiles = ConditionProfiles::default();
    profiles.insert("Allergy", vec![1, 3]);
    profiles.insert("Fungal infection", vec![0, 1]);
    profiles.insert("Malaria", vec![2, 3, 4]);

    TrainedModel::from_parts(schema, encoder, tree, profiles, Some(0.95))
        .expect("Không lắp được mô hình")
}

fn precautions(items: [&str; 4]) -> [String; 4] {
    items.map(str::to_string)
}

pub fn reference() -> ReferenceData {
    ReferenceData::default()
        .with_severity("itching", 1)
        .with_severity("skin_rash", 3)
        .with_severity("chills", 3)
        .with_severity("fatigue", 4)
        .with_severity("vomiting", 5)
        .with_description(
            "Fungal infection",
            "In humans, fungal infections occur when an invading fungus takes over an area of the body. It is usually treatable.",
        )
        .with_description("Allergy", "An allergy is an immune system response to a foreign substance.")
        .with_description("Malaria", "An infectious disease caused by protozoan parasites.")
        .with_precautions(
            "Fungal infection",
            precautions(["bath twice", "use detol or neem in bathing water", "keep infected area dry", "use clean cloths"]),
        )
        .with_precautions(
            "Allergy",
            precautions(["apply calamine", "cover area with bandage", "", "use ice to compress itching"]),
        )
        .with_precautions(
            "Malaria",
            precautions(["consult nearest hospital", "avoid oily food", "avoid non veg food", "keep mosquitos out"]),
        )
}

/// Six rows, three conditions, seven symptom columns.
pub fn fixture_dataset() -> Dataset {
    let names = [
        "itching",
        "skin_rash",
        "nodal_skin_eruptions",
        "chills",
        "fatigue",
        "vomiting",
        "high_fever",
    ];
    let schema = FeatureSchema::new(names.iter().map(|s| s.to_string()).collect())
        .expect("Không tạo được lược đồ");
    let rows = vec![
        vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0],
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
    ];
    let labels = [
        "Fungal infection",
        "Fungal infection",
        "Allergy",
        "Allergy",
        "Malaria",
        "Malaria",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    Dataset::new(schema, rows, labels).expect("Dữ liệu mẫu không hợp lệ")
}

/// Answers from fixed queues; an exhausted queue behaves like closed input.
#[derive(Default)]
pub struct ScriptedRespondent {
    pub primary: VecDeque<String>,
    pub choices: VecDeque<usize>,
    pub days: VecDeque<i64>,
    pub answers: VecDeque<bool>,
    pub not_found: Vec<String>,
    pub offered: Vec<Vec<String>>,
    pub follow_ups: Vec<String>,
    pub asked: Vec<String>,
}

impl ScriptedRespondent {
    pub fn new(primary: &[&str], days: i64, answers: &[bool]) -> Self {
        Self {
            primary: primary.iter().map(|s| s.to_string()).collect(),
            days: VecDeque::from([days]),
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn with_choices(mut self, choices: &[usize]) -> Self {
        self.choices = choices.iter().copied().collect();
        self
    }
}

impl Respondent for ScriptedRespondent {
    fn primary_symptom(&mut self) -> Result<String, TriageError> {
        self.primary.pop_front().ok_or(TriageError::InputClosed)
    }

    fn symptom_not_found(&mut self, input: &str) -> Result<(), TriageError> {
        self.not_found.push(input.to_string());
        Ok(())
    }

    fn choose_candidate(&mut self, candidates: &[String]) -> Result<usize, TriageError> {
        self.offered.push(candidates.to_vec());
        self.choices.pop_front().ok_or(TriageError::InputClosed)
    }

    fn duration_days(&mut self) -> Result<i64, TriageError> {
        self.days.pop_front().ok_or(TriageError::InputClosed)
    }

    fn begin_follow_ups(&mut self, symptoms: &[String]) -> Result<(), TriageError> {
        self.follow_ups = symptoms.to_vec();
        Ok(())
    }

    fn confirm_symptom(&mut self, symptom: &str) -> Result<bool, TriageError> {
        self.asked.push(symptom.to_string());
        self.answers.pop_front().ok_or(TriageError::InputClosed)
    }
}

use triage_core::{
    recommend, severity_score, Recommendation, ReferenceData, TriageError,
    DEFAULT_SEVERITY_THRESHOLD,
};

fn reference() -> ReferenceData {
    ReferenceData::default()
        .with_severity("chills", 3)
        .with_severity("fatigue", 4)
        .with_severity("high_fever", 7)
        .with_severity("itching", 1)
}

const CHILLS_AND_FATIGUE: [&str; 2] = ["chills", "fatigue"];

#[test]
fn five_days_of_chills_and_fatigue_needs_precautions() {
    let assessment =
        recommend(&CHILLS_AND_FATIGUE, 5, &reference(), DEFAULT_SEVERITY_THRESHOLD).unwrap();

    assert!((assessment.score - 35.0 / 3.0).abs() < 1e-9);
    assert_eq!(assessment.recommendation, Recommendation::TakePrecautions);
}

#[test]
fn ten_days_of_chills_and_fatigue_needs_a_doctor() {
    let assessment =
        recommend(&CHILLS_AND_FATIGUE, 10, &reference(), DEFAULT_SEVERITY_THRESHOLD).unwrap();

    assert!((assessment.score - 70.0 / 3.0).abs() < 1e-9);
    assert_eq!(assessment.recommendation, Recommendation::SeekDoctor);
}

#[test]
fn empty_symptom_set_always_takes_precautions() {
    let none: [&str; 0] = [];
    for days in [0, 1, 7, 365, i64::MAX] {
        let assessment = recommend(&none, days, &reference(), DEFAULT_SEVERITY_THRESHOLD).unwrap();
        assert_eq!(assessment.score, 0.0);
        assert_eq!(assessment.recommendation, Recommendation::TakePrecautions);
    }
}

#[test]
fn score_exactly_at_threshold_is_not_escalated() {
    // (1 * 26) / 2 = 13
    let assessment =
        recommend(&["itching"], 26, &reference(), DEFAULT_SEVERITY_THRESHOLD).unwrap();

    assert_eq!(assessment.score, 13.0);
    assert_eq!(assessment.recommendation, Recommendation::TakePrecautions);

    let assessment =
        recommend(&["itching"], 27, &reference(), DEFAULT_SEVERITY_THRESHOLD).unwrap();
    assert_eq!(assessment.recommendation, Recommendation::SeekDoctor);
}

#[test]
fn score_never_decreases_with_duration() {
    let reference = reference();
    let mut previous = 0.0;
    for days in 1..=60 {
        let score = severity_score(&CHILLS_AND_FATIGUE, days, &reference).unwrap();
        assert!(score >= previous, "score fell at day {days}");
        previous = score;
    }
}

#[test]
fn score_never_decreases_with_total_weight() {
    let reference = reference();
    let lighter = severity_score(&["itching", "chills"], 4, &reference).unwrap();
    let heavier = severity_score(&["fatigue", "high_fever"], 4, &reference).unwrap();

    assert!(heavier >= lighter);
}

#[test]
fn unknown_symptom_is_an_integrity_error() {
    let err = severity_score(&["chills", "unknown_symptom"], 3, &reference()).unwrap_err();

    assert!(matches!(err, TriageError::MissingSeverity(ref key) if key == "unknown_symptom"));
    assert!(err.to_string().contains("unknown_symptom"));
}

#[test]
fn threshold_is_a_policy_parameter() {
    let assessment = recommend(&CHILLS_AND_FATIGUE, 5, &reference(), 10.0).unwrap();

    assert_eq!(assessment.recommendation, Recommendation::SeekDoctor);
}

#[test]
fn negative_duration_never_escalates() {
    let assessment =
        recommend(&CHILLS_AND_FATIGUE, -3, &reference(), DEFAULT_SEVERITY_THRESHOLD).unwrap();

    assert!((assessment.score - (-21.0 / 3.0)).abs() < 1e-9);
    assert_eq!(assessment.recommendation, Recommendation::TakePrecautions);
}

#[test]
fn extreme_weights_and_duration_do_not_overflow() {
    let reference = ReferenceData::default()
        .with_severity("chills", u32::MAX)
        .with_severity("fatigue", u32::MAX);
    let assessment =
        recommend(&CHILLS_AND_FATIGUE, i64::MAX, &reference, DEFAULT_SEVERITY_THRESHOLD).unwrap();

    assert!(assessment.score.is_finite());
    assert!(assessment.score > 0.0);
    assert_eq!(assessment.recommendation, Recommendation::SeekDoctor);
}

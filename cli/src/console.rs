//! Console adapter: câu hỏi qua stdout, câu trả lời từ stdin.

use std::io::{self, BufRead, Write};

use triage_core::{DiagnosisReport, Respondent, TriageError};

/// Trả lời các câu hỏi của phiên bằng cách đọc từng dòng nhập. Tự hỏi lại
/// khi câu trả lời sai định dạng.
pub struct ConsoleRespondent<R, W> {
    input: R,
    output: W,
    retrying: bool,
}

impl<R: BufRead, W: Write> ConsoleRespondent<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            retrying: false,
        }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Dòng tiếp theo, đã bỏ khoảng trắng hai đầu. Hết dữ liệu thì trả về
    /// `InputClosed`.
    fn read_line(&mut self) -> Result<String, TriageError> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(TriageError::InputClosed);
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Respondent for ConsoleRespondent<R, W> {
    fn primary_symptom(&mut self) -> Result<String, TriageError> {
        if !self.retrying {
            writeln!(
                self.output,
                "\nMay I know the primary symptom you are experiencing?"
            )?;
        }
        self.retrying = false;
        self.read_line()
    }

    fn symptom_not_found(&mut self, _input: &str) -> Result<(), TriageError> {
        writeln!(
            self.output,
            "\nI am sorry. It is not registered in our database. Enter another symptom."
        )?;
        self.retrying = true;
        Ok(())
    }

    fn choose_candidate(&mut self, candidates: &[String]) -> Result<usize, TriageError> {
        writeln!(self.output, "\nSearches related to input: ")?;
        for (index, candidate) in candidates.iter().enumerate() {
            writeln!(self.output, "{}) {}", index + 1, display_name(candidate))?;
        }
        loop {
            write!(
                self.output,
                "Select the one you meant (1 to {}):  ",
                candidates.len()
            )?;
            match self.read_line()?.parse::<usize>() {
                Ok(choice) if (1..=candidates.len()).contains(&choice) => return Ok(choice),
                _ => continue,
            }
        }
    }

    fn duration_days(&mut self) -> Result<i64, TriageError> {
        loop {
            write!(self.output, "\nOkay. For how many days? ")?;
            match self.read_line()?.parse::<i64>() {
                Ok(days) => return Ok(days),
                Err(_) => writeln!(self.output, "\nEnter number of days.")?,
            }
        }
    }

    fn begin_follow_ups(&mut self, _symptoms: &[String]) -> Result<(), TriageError> {
        writeln!(
            self.output,
            "\nAre you experiencing any of the below symptoms?"
        )?;
        Ok(())
    }

    fn confirm_symptom(&mut self, symptom: &str) -> Result<bool, TriageError> {
        write!(self.output, "{} ? : (yes/no) ", display_name(symptom))?;
        loop {
            match self.read_line()?.to_lowercase().as_str() {
                "yes" => return Ok(true),
                "no" => return Ok(false),
                _ => writeln!(self.output, "\nPlease provide proper answer (yes/no) : ")?,
            }
        }
    }
}

fn display_name(symptom: &str) -> String {
    symptom.replace('_', " ")
}

/// In báo cáo dạng văn bản theo thứ tự: khuyến nghị, chẩn đoán, mô tả,
/// biện pháp.
pub fn write_report<W: Write>(out: &mut W, report: &DiagnosisReport) -> io::Result<()> {
    writeln!(out, "\n{}", report.recommendation.message())?;

    let conditions = if report.predictions_agree() {
        report.condition.clone()
    } else {
        format!("{} or {}", report.condition, report.confirmed_condition)
    };
    match report.accuracy {
        Some(accuracy) => writeln!(
            out,
            "You may have {conditions} | Diagnosis Accuracy: {:.2}%",
            accuracy * 100.0
        )?,
        None => writeln!(out, "You may have {conditions}")?,
    }

    for line in report.description_lines() {
        writeln!(out, "{line}")?;
    }

    writeln!(out, "\nTake following measures: ")?;
    for (index, precaution) in report.precautions.iter().enumerate() {
        writeln!(out, "{} ) {precaution}", index + 1)?;
    }
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, report: &DiagnosisReport) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}

/// Phiên bị huỷ: báo lý do, phiên sau vẫn tiếp tục.
pub fn write_error<W: Write>(out: &mut W, err: &TriageError) -> io::Result<()> {
    writeln!(out, "\nSorry, this session could not be completed. {err}")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::Utc;
    use triage_core::Recommendation;

    use super::*;

    fn scripted(input: &str) -> ConsoleRespondent<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleRespondent::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn printed(console: ConsoleRespondent<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(console.output).unwrap()
    }

    fn report(confirmed_condition: &str, accuracy: Option<f64>) -> DiagnosisReport {
        DiagnosisReport {
            generated_at: Utc::now(),
            primary_symptom: "itching".to_string(),
            duration_days: 5,
            confirmed_symptoms: vec!["itching".to_string(), "skin_rash".to_string()],
            leaf_conditions: vec!["Fungal infection".to_string()],
            condition: "Fungal infection".to_string(),
            confirmed_condition: confirmed_condition.to_string(),
            accuracy,
            severity_score: 20.0 / 3.0,
            recommendation: Recommendation::TakePrecautions,
            description: "Fungi live in soil. They spread easily.".to_string(),
            precautions: vec![
                "bath twice".to_string(),
                "use detol or neem in bathing water".to_string(),
                "keep infected area dry".to_string(),
                "use clean cloths".to_string(),
            ],
        }
    }

    #[test]
    fn duration_is_asked_again_until_it_parses() {
        let mut console = scripted("five\n2.5\n5\n");
        assert_eq!(console.duration_days().unwrap(), 5);

        let text = printed(console);
        assert_eq!(text.matches("Enter number of days.").count(), 2);
        assert_eq!(text.matches("For how many days?").count(), 3);
    }

    #[test]
    fn any_integer_duration_is_accepted() {
        let mut console = scripted("-3\n5000000000\n0\n");
        assert_eq!(console.duration_days().unwrap(), -3);
        assert_eq!(console.duration_days().unwrap(), 5_000_000_000);
        assert_eq!(console.duration_days().unwrap(), 0);

        let text = printed(console);
        assert!(!text.contains("Enter number of days."));
    }

    #[test]
    fn candidate_choice_must_be_in_range() {
        let candidates = vec!["skin_rash".to_string(), "chills".to_string()];
        let mut console = scripted("0\nabc\n3\n2\n");
        assert_eq!(console.choose_candidate(&candidates).unwrap(), 2);

        let text = printed(console);
        assert!(text.contains("1) skin rash\n2) chills\n"));
        assert_eq!(text.matches("Select the one you meant (1 to 2):").count(), 4);
    }

    #[test]
    fn follow_up_accepts_only_yes_or_no() {
        let mut console = scripted("maybe\n YES \nno\n");
        assert!(console.confirm_symptom("skin_rash").unwrap());
        assert!(!console.confirm_symptom("chills").unwrap());

        let text = printed(console);
        assert!(text.starts_with("skin rash ? : (yes/no) "));
        assert_eq!(text.matches("Please provide proper answer").count(), 1);
    }

    #[test]
    fn retry_skips_the_opening_question() {
        let mut console = scripted("xyz\nitch\n");
        assert_eq!(console.primary_symptom().unwrap(), "xyz");
        console.symptom_not_found("xyz").unwrap();
        assert_eq!(console.primary_symptom().unwrap(), "itch");

        let text = printed(console);
        assert_eq!(text.matches("May I know the primary symptom").count(), 1);
        assert!(text.contains("It is not registered in our database"));
    }

    #[test]
    fn end_of_input_closes_the_session() {
        let mut console = scripted("");
        assert!(matches!(
            console.primary_symptom(),
            Err(TriageError::InputClosed)
        ));
        let mut console = scripted("oops\n");
        assert!(matches!(
            console.duration_days(),
            Err(TriageError::InputClosed)
        ));
    }

    #[test]
    fn report_text_lists_description_and_measures() {
        let mut out = Vec::new();
        write_report(&mut out, &report("Fungal infection", Some(0.9512))).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "\nIt might not be that bad but you should take precautions.\n\
             You may have Fungal infection | Diagnosis Accuracy: 95.12%\n\
             Fungi live in soil\n\
             They spread easily.\n\
             \nTake following measures: \n\
             1 ) bath twice\n\
             2 ) use detol or neem in bathing water\n\
             3 ) keep infected area dry\n\
             4 ) use clean cloths\n"
        );
    }

    #[test]
    fn disagreeing_predictions_are_both_shown() {
        let mut out = Vec::new();
        write_report(&mut out, &report("Allergy", None)).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("You may have Fungal infection or Allergy\n"));
        assert!(!text.contains("Diagnosis Accuracy"));
    }

    #[test]
    fn json_report_uses_snake_case_recommendation() {
        let mut out = Vec::new();
        write_json(&mut out, &report("Fungal infection", None)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["recommendation"], "take_precautions");
        assert_eq!(value["accuracy"], serde_json::Value::Null);
        assert_eq!(value["precautions"].as_array().map(Vec::len), Some(4));
    }
}

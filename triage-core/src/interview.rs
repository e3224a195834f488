//! Bộ máy hỏi đáp: duyệt cây quyết định thuần tuý và máy trạng thái đặt
//! câu hỏi qua [`Respondent`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    recommend, ConfirmatoryPredictor, DecisionTree, DiagnosisReport, MatchingPolicy, Node, NodeId,
    ReferenceData, TrainedModel, TriageConfig, TriageError, ROOT,
};

/// Trả lời câu hỏi của một phiên. Phần cài đặt tự hỏi lại khi nhập sai
/// định dạng; bộ máy chỉ nhận câu trả lời hợp lệ.
pub trait Respondent {
    /// Văn bản thô mô tả triệu chứng chính.
    fn primary_symptom(&mut self) -> Result<String, TriageError>;

    /// Lần nhập trước không khớp gì; sẽ hỏi lại.
    fn symptom_not_found(&mut self, _input: &str) -> Result<(), TriageError> {
        Ok(())
    }

    /// Lựa chọn (bắt đầu từ 1) giữa nhiều kết quả khớp.
    fn choose_candidate(&mut self, candidates: &[String]) -> Result<usize, TriageError>;

    /// Số ngày bất kỳ đọc được thành số nguyên, kể cả 0 và số âm.
    fn duration_days(&mut self) -> Result<i64, TriageError>;

    /// Gọi một lần trước loạt câu hỏi bổ sung, nếu có.
    fn begin_follow_ups(&mut self, _symptoms: &[String]) -> Result<(), TriageError> {
        Ok(())
    }

    /// Có/không: triệu chứng này có xuất hiện không?
    fn confirm_symptom(&mut self, symptom: &str) -> Result<bool, TriageError>;
}

/// Kết quả xét một nút.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Descend {
        next: NodeId,
        /// Triệu chứng của nút, ghi nhận khi rẽ phải.
        recorded: Option<usize>,
    },
    Leaf(NodeId),
}

/// Đường đi từ gốc tới lá cho một triệu chứng chính.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descent {
    pub leaf: NodeId,
    pub path: Vec<NodeId>,
    pub recorded: Vec<usize>,
}

/// Duyệt cây với triệu chứng chính là đặc trưng duy nhất có mặt: nút tách
/// theo triệu chứng khác luôn rẽ trái.
#[derive(Debug, Clone, Copy)]
pub struct TreeWalker<'a> {
    tree: &'a DecisionTree,
}

impl<'a> TreeWalker<'a> {
    pub fn new(tree: &'a DecisionTree) -> Self {
        Self { tree }
    }

    pub fn step(&self, node: NodeId, primary: usize) -> Result<Step, TriageError> {
        match self.tree.node(node)? {
            Node::Leaf { .. } => Ok(Step::Leaf(node)),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let presence = if *feature == primary { 1.0 } else { 0.0 };
                if presence <= *threshold {
                    Ok(Step::Descend {
                        next: *left,
                        recorded: None,
                    })
                } else {
                    Ok(Step::Descend {
                        next: *right,
                        recorded: Some(*feature),
                    })
                }
            }
        }
    }

    pub fn walk(&self, primary: usize) -> Result<Descent, TriageError> {
        let mut node = ROOT;
        let mut path = vec![ROOT];
        let mut recorded = Vec::new();
        for _ in 0..self.tree.node_count() {
            match self.step(node, primary)? {
                Step::Leaf(leaf) => {
                    return Ok(Descent {
                        leaf,
                        path,
                        recorded,
                    })
                }
                Step::Descend { next, recorded: hit } => {
                    recorded.extend(hit);
                    path.push(next);
                    node = next;
                }
            }
        }
        Err(TriageError::Model(format!(
            "no leaf reached after {} steps",
            self.tree.node_count()
        )))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterviewState {
    AskPrimarySymptom,
    Traversing { node: NodeId, primary: usize },
    Leaf(Vec<String>),
    /// Vị trí trong danh sách câu hỏi bổ sung.
    AskFollowupSymptom(usize),
    Complete,
}

/// Dữ liệu thu được trong một phiên, không sống lâu hơn phiên.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub primary_symptom: Option<String>,
    pub duration_days: i64,
    pub leaf_conditions: Vec<String>,
    pub follow_ups: Vec<String>,
    confirmed: Vec<String>,
}

impl InterviewSession {
    /// Thêm triệu chứng một lần; trả về `true` nếu là mới.
    pub fn confirm(&mut self, symptom: &str) -> bool {
        if self.is_confirmed(symptom) {
            return false;
        }
        self.confirmed.push(symptom.to_string());
        true
    }

    pub fn is_confirmed(&self, symptom: &str) -> bool {
        self.confirmed.iter().any(|known| known == symptom)
    }

    /// Triệu chứng đã xác nhận, theo thứ tự thêm vào.
    pub fn confirmed(&self) -> &[String] {
        &self.confirmed
    }
}

/// Đầu vào chỉ đọc dùng chung của một phiên.
#[derive(Clone, Copy)]
pub struct InterviewContext<'a> {
    pub model: &'a TrainedModel,
    pub reference: &'a ReferenceData,
    pub matcher: &'a dyn MatchingPolicy,
    pub config: &'a TriageConfig,
}

pub struct Interview<'a> {
    context: InterviewContext<'a>,
    state: InterviewState,
    session: InterviewSession,
}

impl<'a> Interview<'a> {
    pub fn new(context: InterviewContext<'a>) -> Self {
        Self {
            context,
            state: InterviewState::AskPrimarySymptom,
            session: InterviewSession::default(),
        }
    }

    pub fn state(&self) -> &InterviewState {
        &self.state
    }

    pub fn session(&self) -> &InterviewSession {
        &self.session
    }

    /// Chuyển một bước và trả về trạng thái mới.
    pub fn advance<R: Respondent + ?Sized>(
        &mut self,
        respondent: &mut R,
    ) -> Result<&InterviewState, TriageError> {
        let next = match std::mem::replace(&mut self.state, InterviewState::Complete) {
            InterviewState::AskPrimarySymptom => self.ask_primary(respondent)?,
            InterviewState::Traversing { node, primary } => self.traverse(node, primary)?,
            InterviewState::Leaf(conditions) => self.enter_leaf(conditions, respondent)?,
            InterviewState::AskFollowupSymptom(position) => {
                self.ask_follow_up(position, respondent)?
            }
            InterviewState::Complete => InterviewState::Complete,
        };
        self.state = next;
        Ok(&self.state)
    }

    /// Chạy phiên tới khi xong và lập báo cáo.
    pub fn run<R: Respondent + ?Sized>(
        mut self,
        respondent: &mut R,
    ) -> Result<DiagnosisReport, TriageError> {
        info!("interview started");
        while self.state != InterviewState::Complete {
            self.advance(respondent)?;
        }
        self.report()
    }

    fn ask_primary<R: Respondent + ?Sized>(
        &mut self,
        respondent: &mut R,
    ) -> Result<InterviewState, TriageError> {
        let model = self.context.model;
        let vocabulary = model.schema().names();
        let symptom = loop {
            let input = respondent.primary_symptom()?;
            let result = self.context.matcher.find(&input, vocabulary);
            if !result.found {
                debug!(input = input.as_str(), "no symptom matched");
                respondent.symptom_not_found(&input)?;
                continue;
            }
            if let Some(only) = result.single() {
                break only.to_string();
            }
            let chosen = loop {
                let choice = respondent.choose_candidate(&result.candidates)?;
                if let Some(symptom) = result.select(choice) {
                    break symptom.to_string();
                }
            };
            break chosen;
        };

        let days = respondent.duration_days()?;
        let primary = model.schema().require(&symptom)?;
        info!(symptom = symptom.as_str(), days, "primary symptom confirmed");

        self.session.primary_symptom = Some(symptom);
        self.session.duration_days = days;
        Ok(InterviewState::Traversing {
            node: ROOT,
            primary,
        })
    }

    fn traverse(&mut self, node: NodeId, primary: usize) -> Result<InterviewState, TriageError> {
        let model = self.context.model;
        match TreeWalker::new(model.tree()).step(node, primary)? {
            Step::Descend { next, recorded } => {
                if let Some(feature) = recorded {
                    let name = model
                        .schema()
                        .name(feature)
                        .ok_or_else(|| TriageError::Model(format!("unknown feature {feature}")))?;
                    self.session.confirm(name);
                }
                Ok(InterviewState::Traversing {
                    node: next,
                    primary,
                })
            }
            Step::Leaf(leaf) => {
                let conditions = model.leaf_conditions(leaf)?;
                debug!(leaf, conditions = ?conditions, "leaf reached");
                Ok(InterviewState::Leaf(conditions))
            }
        }
    }

    fn enter_leaf<R: Respondent + ?Sized>(
        &mut self,
        conditions: Vec<String>,
        respondent: &mut R,
    ) -> Result<InterviewState, TriageError> {
        let model = self.context.model;
        let lead = conditions
            .first()
            .ok_or_else(|| TriageError::Model("leaf without conditions".to_string()))?;

        let mut follow_ups = Vec::new();
        for index in model.profiles().symptoms_for(lead)? {
            let name = model
                .schema()
                .name(*index)
                .ok_or_else(|| TriageError::Model(format!("unknown feature {index}")))?;
            if !self.session.is_confirmed(name) {
                follow_ups.push(name.to_string());
            }
        }

        self.session.leaf_conditions = conditions;
        self.session.follow_ups = follow_ups;
        if self.session.follow_ups.is_empty() {
            return Ok(InterviewState::Complete);
        }
        respondent.begin_follow_ups(&self.session.follow_ups)?;
        Ok(InterviewState::AskFollowupSymptom(0))
    }

    fn ask_follow_up<R: Respondent + ?Sized>(
        &mut self,
        position: usize,
        respondent: &mut R,
    ) -> Result<InterviewState, TriageError> {
        let Some(symptom) = self.session.follow_ups.get(position).cloned() else {
            return Ok(InterviewState::Complete);
        };
        if respondent.confirm_symptom(&symptom)? {
            self.session.confirm(&symptom);
        }
        if position + 1 < self.session.follow_ups.len() {
            Ok(InterviewState::AskFollowupSymptom(position + 1))
        } else {
            Ok(InterviewState::Complete)
        }
    }

    fn report(self) -> Result<DiagnosisReport, TriageError> {
        let InterviewContext {
            model,
            reference,
            config,
            ..
        } = self.context;
        let session = self.session;

        let condition = session
            .leaf_conditions
            .first()
            .cloned()
            .ok_or_else(|| TriageError::Model("interview ended before a leaf".to_string()))?;
        let primary_symptom = session
            .primary_symptom
            .clone()
            .ok_or_else(|| TriageError::Model("interview ended without a symptom".to_string()))?;

        let confirmed_condition = ConfirmatoryPredictor::new(model).predict(session.confirmed())?;
        let assessment = recommend(
            session.confirmed(),
            session.duration_days,
            reference,
            config.severity_threshold,
        )?;
        let description = reference.description(&condition)?.to_string();
        let precautions = reference.precautions(&condition)?.to_vec();

        info!(
            condition = condition.as_str(),
            confirmed_condition = confirmed_condition.as_str(),
            score = assessment.score,
            recommendation = ?assessment.recommendation,
            "interview complete"
        );

        Ok(DiagnosisReport {
            generated_at: Utc::now(),
            primary_symptom,
            duration_days: session.duration_days,
            confirmed_symptoms: session.confirmed().to_vec(),
            leaf_conditions: session.leaf_conditions,
            condition,
            confirmed_condition,
            accuracy: model.accuracy(),
            severity_score: assessment.score,
            recommendation: assessment.recommendation,
            description,
            precautions,
        })
    }
}

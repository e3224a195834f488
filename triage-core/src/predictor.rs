//! Lượt phân loại thứ hai trên toàn bộ triệu chứng đã xác nhận.

use tracing::debug;

use crate::{TrainedModel, TriageError};

/// Chỉ mượn mô hình đã huấn luyện, không giữ trạng thái riêng.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmatoryPredictor<'a> {
    model: &'a TrainedModel,
}

impl<'a> ConfirmatoryPredictor<'a> {
    pub fn new(model: &'a TrainedModel) -> Self {
        Self { model }
    }

    /// Dự đoán bệnh từ vector hiện diện dựng từ `confirmed`.
    /// Tập rỗng là hợp lệ (vector toàn 0).
    pub fn predict<S: AsRef<str>>(&self, confirmed: &[S]) -> Result<String, TriageError> {
        let vector = self.model.schema().encode(confirmed)?;
        let class = self.model.tree().predict(&vector)?;
        let condition = self.model.encoder().inverse_transform(class)?;
        debug!(symptoms = confirmed.len(), condition, "confirmatory prediction");
        Ok(condition.to_string())
    }
}

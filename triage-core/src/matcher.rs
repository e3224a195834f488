//! Khớp văn bản tự do với danh sách triệu chứng theo thứ tự cột.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::MatchingMode;

/// Chữ thường, nối các từ bằng dấu gạch dưới như tên cột triệu chứng.
pub fn normalize_query(text: &str) -> String {
    text.trim().to_lowercase().replace(' ', "_")
}

/// Ứng viên theo thứ tự danh sách, không xếp hạng.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub found: bool,
    pub candidates: Vec<String>,
}

impl MatchResult {
    pub fn from_candidates(candidates: Vec<String>) -> Self {
        Self {
            found: !candidates.is_empty(),
            candidates,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Ứng viên duy nhất, nếu chỉ có một.
    pub fn single(&self) -> Option<&str> {
        match self.candidates.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Chọn ứng viên theo số thứ tự bắt đầu từ 1. Danh sách rỗng quay về
    /// chỉ số 0 và trả về `None`.
    pub fn select(&self, choice: usize) -> Option<&str> {
        if self.candidates.len() <= 1 {
            return self.candidates.first().map(String::as_str);
        }
        choice
            .checked_sub(1)
            .and_then(|index| self.candidates.get(index))
            .map(String::as_str)
    }
}

/// Chiến lược đổi văn bản người dùng thành tên triệu chứng.
pub trait MatchingPolicy {
    fn find(&self, query: &str, vocabulary: &[String]) -> MatchResult;
}

/// Tìm regex trong từng tên triệu chứng. Cho phép khớp một phần nên truy vấn
/// ngắn có thể ra nhiều ứng viên.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexPolicy;

impl MatchingPolicy for RegexPolicy {
    fn find(&self, query: &str, vocabulary: &[String]) -> MatchResult {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return MatchResult::none();
        }

        // Không phải regex hợp lệ thì tìm nguyên văn.
        let pattern = match Regex::new(&normalized) {
            Ok(pattern) => pattern,
            Err(_) => match Regex::new(&regex::escape(&normalized)) {
                Ok(pattern) => pattern,
                Err(_) => return MatchResult::none(),
            },
        };

        MatchResult::from_candidates(
            vocabulary
                .iter()
                .filter(|name| pattern.is_match(name))
                .cloned()
                .collect(),
        )
    }
}

/// Chỉ khớp tên triệu chứng đầy đủ.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactPolicy;

impl MatchingPolicy for ExactPolicy {
    fn find(&self, query: &str, vocabulary: &[String]) -> MatchResult {
        let normalized = normalize_query(query);
        MatchResult::from_candidates(
            vocabulary
                .iter()
                .filter(|name| **name == normalized)
                .cloned()
                .collect(),
        )
    }
}

pub fn policy_for(mode: MatchingMode) -> Box<dyn MatchingPolicy> {
    match mode {
        MatchingMode::Regex => Box::new(RegexPolicy),
        MatchingMode::Exact => Box::new(ExactPolicy),
    }
}

/// Khớp bằng chính sách regex mặc định.
pub fn match_symptom(query: &str, vocabulary: &[String]) -> MatchResult {
    RegexPolicy.find(query, vocabulary)
}

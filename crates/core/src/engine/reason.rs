use crate::domain::recommendation::{Reason, RuleId};

pub const MAX_REASONS: usize = 4;

/// Running score of one product plus the reasons that explain it.
#[derive(Debug, Clone)]
pub struct ScoreSheet {
    score: i32,
    reasons: Vec<Reason>,
}

impl ScoreSheet {
    pub fn new(base_score: i32) -> Self {
        Self {
            score: base_score,
            reasons: Vec::new(),
        }
    }

    pub fn add(&mut self, rule: RuleId, points: i32, text: impl Into<String>) {
        self.score += points;
        self.reasons.push(Reason {
            rule,
            points,
            text: text.into(),
        });
    }

    pub fn note(&mut self, rule: RuleId, text: impl Into<String>) {
        self.add(rule, 0, text);
    }

    /// Floors the score at 0 and keeps the four highest-scoring reasons; ties keep the order
    /// the rules fired in.
    pub fn finish(mut self) -> (u32, Vec<Reason>) {
        self.reasons.sort_by_key(|r| std::cmp::Reverse(r.points));
        self.reasons.truncate(MAX_REASONS);
        (self.score.max(0) as u32, self.reasons)
    }
}

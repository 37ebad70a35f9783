use crate::answers::AnswerStore;
use crate::model::Question;

/// Position within the attempt's question list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionNavigator {
    current: usize,
    count: usize,
}

impl QuestionNavigator {
    pub fn new(count: usize) -> Self {
        Self { current: 0, count }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.count == 0 || self.current + 1 == self.count
    }

    /// Returns whether the index moved.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Jumps straight to `index`. Out-of-range targets are ignored.
    pub fn jump(&mut self, index: usize) -> bool {
        if index >= self.count || index == self.current {
            return false;
        }
        self.current = index;
        true
    }

    pub fn current<'q>(&self, questions: &'q [Question]) -> Option<&'q Question> {
        questions.get(self.current)
    }

    /// Completion marker for every question, in order.
    pub fn answered_flags(&self, questions: &[Question], store: &AnswerStore) -> Vec<bool> {
        questions.iter().map(|q| store.is_answered(&q.id)).collect()
    }
}

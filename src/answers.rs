use std::collections::HashSet;

use tokio::sync::watch;
use tracing::warn;

use crate::error::AnswerError;
use crate::model::{AnswerMap, OptionId, QuestionId};

/// The attempt's working copy of selected answers.
///
/// Owned by the session controller, which is the only writer. Observers
/// subscribe to a watch channel carrying the current map; the store never
/// calls into them.
#[derive(Debug)]
pub struct AnswerStore {
    known: HashSet<QuestionId>,
    tx: watch::Sender<AnswerMap>,
    sealed: bool,
}

impl AnswerStore {
    pub fn new<'a>(question_ids: impl IntoIterator<Item = &'a QuestionId>) -> Self {
        let (tx, _) = watch::channel(AnswerMap::new());
        Self {
            known: question_ids.into_iter().cloned().collect(),
            tx,
            sealed: false,
        }
    }

    /// Records `option` for `question`, replacing any earlier choice.
    /// Returns whether the stored map changed.
    pub fn set_answer(&mut self, question: &str, option: OptionId) -> Result<bool, AnswerError> {
        if self.sealed {
            return Err(AnswerError::Sealed);
        }
        if !self.known.contains(question) {
            return Err(AnswerError::UnknownQuestion(question.to_string()));
        }
        Ok(self.tx.send_if_modified(|map| match map.get(question) {
            Some(&current) if current == option => false,
            _ => {
                map.insert(question.to_string(), option);
                true
            }
        }))
    }

    /// Loads answers saved by an earlier run of this attempt. Entries for
    /// questions outside the attempt are dropped.
    pub fn merge_prior(&mut self, prior: &AnswerMap) -> usize {
        let mut merged = 0;
        self.tx.send_modify(|map| {
            for (question, option) in prior {
                if self.known.contains(question) {
                    map.insert(question.clone(), *option);
                    merged += 1;
                } else {
                    warn!(question = %question, "dropping saved answer for unknown question");
                }
            }
        });
        merged
    }

    pub fn answered_count(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_answered(&self, question: &str) -> bool {
        self.tx.borrow().contains_key(question)
    }

    pub fn selected(&self, question: &str) -> Option<OptionId> {
        self.tx.borrow().get(question).copied()
    }

    pub fn snapshot(&self) -> AnswerMap {
        self.tx.borrow().clone()
    }

    /// Change feed. A fresh receiver treats the current contents as seen.
    pub fn subscribe(&self) -> watch::Receiver<AnswerMap> {
        self.tx.subscribe()
    }

    /// Rejects every further mutation.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

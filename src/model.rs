use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type QuestionId = String;
pub type OptionId = i64;

/// Selected option per question. Unanswered questions are absent.
pub type AnswerMap = BTreeMap<QuestionId, OptionId>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
}

/// A question as served to members. Carries no correct-answer data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(default)]
    pub points: u32,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn option(&self, id: OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// Start-or-resume response from the exam service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSnapshot {
    pub attempt_id: String,
    pub exam_title: String,
    /// Minutes.
    pub duration: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub resumed: Option<bool>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answers: Option<AnswerMap>,
}

/// One member's run of one exam, as held by the session controller.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub attempt_id: String,
    pub exam_id: String,
    pub exam_title: String,
    pub duration_minutes: u32,
    pub started_at: DateTime<Utc>,
    pub questions: Vec<Question>,
    pub prior_answers: Option<AnswerMap>,
    pub resumed: bool,
    deadline: DateTime<Utc>,
}

impl Attempt {
    /// Builds the attempt from a service snapshot. `acquired_at` stands in for
    /// the start timestamp when the service does not report one.
    pub fn from_snapshot(
        exam_id: &str,
        snapshot: AttemptSnapshot,
        acquired_at: DateTime<Utc>,
    ) -> Self {
        let started_at = snapshot.started_at.unwrap_or(acquired_at);
        let deadline = started_at + Duration::minutes(i64::from(snapshot.duration));
        let prior_answers = snapshot.answers.filter(|a| !a.is_empty());
        Self {
            attempt_id: snapshot.attempt_id,
            exam_id: exam_id.to_string(),
            exam_title: snapshot.exam_title,
            duration_minutes: snapshot.duration,
            started_at,
            resumed: snapshot.resumed.unwrap_or(prior_answers.is_some()),
            questions: snapshot.questions,
            prior_answers,
            deadline,
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn question_ids(&self) -> impl Iterator<Item = &QuestionId> {
        self.questions.iter().map(|q| &q.id)
    }

    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }
}

/// Exam listed as available to the member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedExam {
    pub id: String,
    pub title: String,
    pub duration: u32,
    #[serde(default)]
    pub pass_mark: Option<u32>,
    #[serde(default)]
    pub question_count: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub exam_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamRef {
    pub title: String,
}

/// One of the member's attempts as reported by the results listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub id: String,
    pub exam_id: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub total_points: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub exams: Option<ExamRef>,
}

impl AttemptResult {
    pub fn is_completed(&self) -> bool {
        self.submitted_at.is_some()
    }

    pub fn verdict(&self) -> &'static str {
        match (self.is_completed(), self.passed) {
            (false, _) => "in progress",
            (true, Some(true)) => "passed",
            (true, Some(false)) => "failed",
            (true, None) => "pending",
        }
    }

    pub fn exam_title(&self) -> &str {
        self.exams
            .as_ref()
            .map(|e| e.title.as_str())
            .unwrap_or(&self.exam_id)
    }
}

//! Linear question/answer flow that drives the chat transcript.
//!
//! A [`Conversation`] walks a fixed [`Script`] exactly once, in order, then
//! hands its [`AnswerSet`] off to plan generation. No transition performs
//! I/O; the plan call itself happens outside, bracketed by
//! [`Conversation::begin_plan_request`] and [`Conversation::finish_plan_request`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{CLOSING, GREETING};
use crate::error::PlanError;
use crate::questions::{InputKind, QuestionSpec, Script};

/// Question id to the literal text the user supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, String>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, answer: impl Into<String>) {
        self.0.insert(id.into(), answer.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Assistant,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InProgress,
    AwaitingPlanRequest,
    PlanRequested,
    PlanReady,
    PlanFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversationState {
    pub current_index: usize,
    pub phase: Phase,
}

/// Why an answer was not accepted. The flow does not move on any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    UnknownOption,
    NotAcceptingAnswers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Answer recorded and the next question asked.
    Next,
    /// Answer recorded and it was the last one.
    Complete,
    Rejected(Rejection),
}

/// Handed out when a plan request starts; a result is only applied when the
/// ticket still belongs to the current session generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanTicket {
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub position: usize,
    pub total: usize,
    pub category: String,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub label: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    script: Script,
    state: ConversationState,
    answers: AnswerSet,
    transcript: Vec<TranscriptEntry>,
    plan: Option<String>,
    plan_error: Option<String>,
    generation: u64,
}

impl Conversation {
    pub fn new(script: Script) -> Self {
        let mut conversation = Self {
            script,
            state: ConversationState {
                current_index: 0,
                phase: Phase::InProgress,
            },
            answers: AnswerSet::new(),
            transcript: Vec::new(),
            plan: None,
            plan_error: None,
            generation: 0,
        };
        conversation.seed_transcript();
        conversation
    }

    fn seed_transcript(&mut self) {
        self.say(GREETING.to_string());
        let first = self.script[0].prompt.clone();
        self.say(first);
    }

    fn say(&mut self, text: String) {
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::Assistant,
            text,
        });
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    pub fn plan_error(&self) -> Option<&str> {
        self.plan_error.as_deref()
    }

    /// The question awaiting an answer, if the flow is still collecting input.
    pub fn current_question(&self) -> Option<&QuestionSpec> {
        match self.state.phase {
            Phase::InProgress => self.script.get(self.state.current_index),
            _ => None,
        }
    }

    pub fn advance(&mut self, answer: &str) -> Advance {
        let Some(question) = self.current_question() else {
            return Advance::Rejected(Rejection::NotAcceptingAnswers);
        };

        let valid = match &question.kind {
            InputKind::FreeText | InputKind::Numeric => {
                if answer.trim().is_empty() {
                    Err(Rejection::Empty)
                } else {
                    Ok(())
                }
            }
            InputKind::SingleSelect { options } => {
                if options.iter().any(|option| option == answer) {
                    Ok(())
                } else {
                    Err(Rejection::UnknownOption)
                }
            }
        };
        if let Err(rejection) = valid {
            debug!(question = %question.id, ?rejection, "Answer rejected");
            return Advance::Rejected(rejection);
        }

        let id = question.id.clone();
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::User,
            text: answer.to_string(),
        });
        self.answers.insert(id, answer);
        self.state.current_index += 1;

        match self.script.get(self.state.current_index) {
            Some(next) => {
                let prompt = next.prompt.clone();
                self.say(prompt);
                Advance::Next
            }
            None => {
                self.state.phase = Phase::AwaitingPlanRequest;
                self.say(CLOSING.to_string());
                debug!(answers = self.answers.len(), "All questions answered");
                Advance::Complete
            }
        }
    }

    /// Starts a plan request. Returns `None` unless the answers are complete
    /// and no request is already outstanding.
    pub fn begin_plan_request(&mut self) -> Option<PlanTicket> {
        match self.state.phase {
            Phase::AwaitingPlanRequest | Phase::PlanFailed => {
                self.state.phase = Phase::PlanRequested;
                self.plan = None;
                self.plan_error = None;
                Some(PlanTicket {
                    generation: self.generation,
                })
            }
            _ => None,
        }
    }

    /// Applies the outcome of a plan request. Results from before a restart
    /// are dropped; returns whether the result was applied.
    pub fn finish_plan_request(
        &mut self,
        ticket: PlanTicket,
        result: Result<String, PlanError>,
    ) -> bool {
        if ticket.generation != self.generation || self.state.phase != Phase::PlanRequested {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale plan result"
            );
            return false;
        }

        match result {
            Ok(plan) => {
                self.plan = Some(plan);
                self.state.phase = Phase::PlanReady;
            }
            Err(err) => {
                self.plan_error = Some(format!(
                    "Failed to generate plan. {}. Please try again later.",
                    err.to_string().trim_end_matches('.')
                ));
                self.state.phase = Phase::PlanFailed;
            }
        }
        true
    }

    pub fn restart(&mut self) {
        self.generation += 1;
        self.state = ConversationState {
            current_index: 0,
            phase: Phase::InProgress,
        };
        self.answers = AnswerSet::new();
        self.transcript.clear();
        self.plan = None;
        self.plan_error = None;
        self.seed_transcript();
    }

    pub fn progress(&self) -> Progress {
        let total = self.script.len();
        let position = (self.state.current_index + 1).min(total);
        let category = self.script[position - 1].category.clone();
        let percent = ((position * 100) as f64 / total as f64).round() as u8;
        Progress {
            position,
            total,
            category,
            percent,
        }
    }

    pub fn summary(&self) -> Vec<SummaryLine> {
        self.script
            .iter()
            .map(|question| SummaryLine {
                label: question.label().to_string(),
                answer: self.answers.get(&question.id).unwrap_or("N/A").to_string(),
            })
            .collect()
    }
}

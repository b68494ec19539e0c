use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// How a question expects to be answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputKind {
    FreeText,
    /// Rendered as a number field; answers are kept as text and never parsed.
    Numeric,
    SingleSelect { options: Vec<String> },
}

impl InputKind {
    pub fn select<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        InputKind::SingleSelect {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            InputKind::SingleSelect { options } => Some(options),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSpec {
    pub id: String,
    pub prompt: String,
    pub category: String,
    pub kind: InputKind,
}

impl QuestionSpec {
    pub fn new(id: &str, prompt: &str, category: &str, kind: InputKind) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            category: category.to_string(),
            kind,
        }
    }

    /// Short label used in the profile summary: the prompt up to its first `?`.
    pub fn label(&self) -> &str {
        self.prompt.split('?').next().unwrap_or(&self.prompt)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("question script is empty")]
    Empty,
    #[error("duplicate question id '{0}'")]
    DuplicateId(String),
    #[error("question '{0}' is single-select but offers no options")]
    NoOptions(String),
}

/// The fixed, ordered question sequence. Cheap to clone and shared between sessions.
#[derive(Debug, Clone)]
pub struct Script(Arc<[QuestionSpec]>);

impl Script {
    pub fn new(questions: Vec<QuestionSpec>) -> Result<Self, ScriptError> {
        if questions.is_empty() {
            return Err(ScriptError::Empty);
        }

        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id.as_str()) {
                return Err(ScriptError::DuplicateId(question.id.clone()));
            }
            if let Some(options) = question.kind.options() {
                if options.is_empty() {
                    return Err(ScriptError::NoOptions(question.id.clone()));
                }
            }
        }

        Ok(Self(questions.into()))
    }

    /// The financial health check questionnaire.
    pub fn financial_profile() -> Self {
        use InputKind::{FreeText, Numeric};

        let questions = vec![
            // Basic Profile
            QuestionSpec::new("name", "To get started, what's your full name?", "Basic Profile", FreeText),
            QuestionSpec::new("age", "Great! What's your age?", "Basic Profile", Numeric),
            QuestionSpec::new(
                "location",
                "Which city and state do you live in? This helps with location-specific advice.",
                "Basic Profile",
                FreeText,
            ),
            // Employment & Income
            QuestionSpec::new(
                "occupation",
                "What is your current occupation? (e.g., Salaried, Self-employed, Student)",
                "Employment & Income",
                FreeText,
            ),
            QuestionSpec::new(
                "monthlyIncome",
                "What is your approximate monthly take-home income (in INR)?",
                "Employment & Income",
                Numeric,
            ),
            QuestionSpec::new(
                "incomeType",
                "Is your income generally fixed or does it vary each month?",
                "Employment & Income",
                InputKind::select(["Fixed", "Variable"]),
            ),
            // Expenses & Lifestyle
            QuestionSpec::new(
                "monthlyExpenses",
                "On average, how much do you spend on essentials like rent, groceries, and utilities each month?",
                "Expenses & Lifestyle",
                Numeric,
            ),
            QuestionSpec::new(
                "dependents",
                "Do you have any dependents you support financially? (e.g., Spouse, Children, Parents)",
                "Expenses & Lifestyle",
                FreeText,
            ),
            QuestionSpec::new(
                "healthInsurance",
                "Do you currently have health insurance?",
                "Expenses & Lifestyle",
                InputKind::select(["Yes", "No"]),
            ),
            // Liabilities & Debt
            QuestionSpec::new(
                "loans",
                "Do you have any ongoing loans like a home, car, or personal loan?",
                "Liabilities & Debt",
                InputKind::select(["Yes", "No"]),
            ),
            QuestionSpec::new(
                "creditCardDebt",
                "Do you typically carry an outstanding balance on your credit cards?",
                "Liabilities & Debt",
                InputKind::select(["Yes", "No"]),
            ),
            // Financial Assets
            QuestionSpec::new(
                "savings",
                "Roughly how much do you have in savings accounts?",
                "Financial Assets",
                Numeric,
            ),
            QuestionSpec::new(
                "investments",
                "Do you invest in Mutual Funds, Stocks, or FDs?",
                "Financial Assets",
                InputKind::select(["Yes", "No"]),
            ),
            // Financial Goals
            QuestionSpec::new(
                "shortTermGoals",
                "What's a short-term financial goal you have? (e.g., Vacation, new gadget, emergency fund)",
                "Financial Goals",
                FreeText,
            ),
            QuestionSpec::new(
                "longTermGoals",
                "And what about a long-term goal? (e.g., Retirement, buying a house)",
                "Financial Goals",
                FreeText,
            ),
            QuestionSpec::new(
                "monthlyInvestment",
                "How much are you comfortable investing each month towards these goals?",
                "Financial Goals",
                Numeric,
            ),
            // Risk Appetite
            QuestionSpec::new(
                "riskAppetite",
                "How comfortable are you with investment risk?",
                "Risk Appetite",
                InputKind::select(["Low", "Medium", "High"]),
            ),
            QuestionSpec::new(
                "investmentPreference",
                "Do you prefer guaranteed returns (safer) or higher potential returns (with risk)?",
                "Risk Appetite",
                InputKind::select(["Guaranteed Returns", "Higher Potential Returns"]),
            ),
        ];

        Self(questions.into())
    }
}

impl Deref for Script {
    type Target = [QuestionSpec];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

use std::sync::Mutex;

use async_trait::async_trait;
use fincheck::chat::run_chat;
use fincheck::questions::{InputKind, QuestionSpec};
use fincheck::{AnswerSet, PlanError, PlanProvider, Script};

/// Records every answer set it sees and replays scripted results in order.
struct ScriptedPlans {
    results: Mutex<Vec<Result<String, PlanError>>>,
    seen: Mutex<Vec<AnswerSet>>,
}

impl ScriptedPlans {
    fn new(mut results: Vec<Result<String, PlanError>>) -> Self {
        results.reverse();
        Self {
            results: Mutex::new(results),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<AnswerSet> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlanProvider for ScriptedPlans {
    async fn request_plan(&self, answers: &AnswerSet) -> Result<String, PlanError> {
        self.seen.lock().unwrap().push(answers.clone());
        self.results
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Err(PlanError::MalformedResponse))
    }
}

fn script() -> Script {
    Script::new(vec![
        QuestionSpec::new("name", "What's your full name?", "Basic Profile", InputKind::FreeText),
        QuestionSpec::new("age", "What's your age?", "Basic Profile", InputKind::Numeric),
        QuestionSpec::new(
            "riskAppetite",
            "How comfortable are you with investment risk?",
            "Risk Appetite",
            InputKind::select(["Low", "Medium", "High"]),
        ),
    ])
    .unwrap()
}

async fn run(input: &str, provider: &ScriptedPlans) -> String {
    let mut output = Vec::new();
    run_chat(script(), provider, input.as_bytes(), &mut output)
        .await
        .unwrap();
    String::from_utf8(output).unwrap()
}

#[tokio::test]
async fn test_chat_collects_answers_and_prints_plan() {
    let provider = ScriptedPlans::new(vec![Ok("1. Budget\n2. Invest".to_string())]);
    let output = run("Asha\n30\n2\n\n\n", &provider).await;

    assert!(output.contains("Advisor: What's your full name?"));
    assert!(output.contains("You: Asha"));
    assert!(output.contains("  2) Medium"));
    assert!(output.contains("You: Medium"));
    assert!(output.contains("Your Financial Summary"));
    assert!(output.contains("  What's your age: 30"));
    assert!(output.contains("Generating your personalized plan..."));
    assert!(output.contains("1. Budget\n2. Invest"));

    let seen = provider.seen();
    assert_eq!(seen.len(), 1);
    let expected: AnswerSet = [("name", "Asha"), ("age", "30"), ("riskAppetite", "Medium")]
        .into_iter()
        .collect();
    assert_eq!(seen[0], expected);
}

#[tokio::test]
async fn test_chat_hints_on_blank_or_unknown_input() {
    let provider = ScriptedPlans::new(vec![]);
    let output = run("\nAsha\n30\nextreme\nhigh\n/quit\n", &provider).await;

    assert!(output.contains("Please enter an answer to continue."));
    assert!(output.contains("Please pick one of the listed options."));
    assert!(output.contains("You: High"));
    assert_eq!(output.matches("You: ").count(), 3);
    assert!(provider.seen().is_empty());
}

#[tokio::test]
async fn test_chat_failure_then_retry() {
    let provider = ScriptedPlans::new(vec![
        Err(PlanError::Remote("Gemini API error: 500 Internal Server Error".to_string())),
        Ok("Second try plan".to_string()),
    ]);
    let output = run("Asha\n30\nLow\n\n\n\n", &provider).await;

    assert!(output.contains(
        "Failed to generate plan. Gemini API error: 500 Internal Server Error. Please try again later."
    ));
    assert!(output.contains("Press Enter to try again"));
    assert!(output.contains("Second try plan"));

    let seen = provider.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1]);
}

#[tokio::test]
async fn test_chat_restart_clears_answers() {
    let provider = ScriptedPlans::new(vec![Ok("plan".to_string())]);
    let output = run("Asha\n/restart\nRavi\n41\n3\n\n", &provider).await;

    assert!(output.contains("--- Starting over ---"));
    let seen = provider.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].get("name"), Some("Ravi"));
    assert_eq!(seen[0].get("riskAppetite"), Some("High"));
}

#[tokio::test]
async fn test_chat_ends_cleanly_on_eof() {
    let provider = ScriptedPlans::new(vec![]);
    let output = run("Asha\n", &provider).await;

    assert!(output.contains("Advisor: What's your age?"));
    assert!(provider.seen().is_empty());
}

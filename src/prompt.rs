use crate::conversation::AnswerSet;

/// Builds the single prompt sent to the model for a user's profile.
pub fn build_plan_prompt(answers: &AnswerSet) -> String {
    // A map of strings always serializes; fall back to Debug just in case.
    let profile = serde_json::to_string_pretty(answers).unwrap_or_else(|_| format!("{:?}", answers));

    format!(
        r#"You are an expert financial advisor in India. Based on the following user profile, create a personalized, actionable financial plan.
The user's details are:
{profile}

Please provide advice on the following:
1.  **Budgeting and Cash Flow:** Analyze income vs. expenses and suggest a budget.
2.  **Emergency Fund:** Recommend an ideal emergency fund size and where to keep it.
3.  **Debt Management:** Suggest strategies for managing any existing loans or credit card debt.
4.  **Investment Strategy:** Based on their goals and risk appetite, recommend specific investment avenues (e.g., Mutual Funds - specify types like index, ELSS; Stocks; FDs; PPF).
5.  **Goal-Based Planning:** Link the investment strategy to their short-term and long-term goals.
6.  **Insurance:** Comment on the importance of health insurance based on their profile.

Present the plan in a clear, encouraging, and easy-to-understand format. Use markdown for formatting."#
    )
}

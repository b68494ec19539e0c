// Defaults, overridable from the environment (or a .env file loaded at startup).

use std::env;

lazy_static::lazy_static! {
    pub static ref GEMINI_BASE_URL: String = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
    pub static ref GEMINI_MODEL: String = env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-preview-05-20".to_string());
    pub static ref SERVER_URL: String = env::var("FINCHECK_SERVER_URL").unwrap_or_else(|_| format!("http://127.0.0.1:{}", DEFAULT_PORT));
}

pub const DEFAULT_PORT: u16 = 8888;

pub const GREETING: &str = "Hi there! I'm your personal finance assistant. I'll ask a few questions to understand your financial situation. Let's start with the basics.";

pub const CLOSING: &str = "That's all the information I need for now. Thank you! Here is a summary of your profile. Click the button below to get your personalized financial plan.";

pub const GENERATING: &str = "Generating your personalized plan...";

/// Browser sessions untouched for this long are dropped when a new one starts.
pub const SESSION_IDLE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60 * 60);

pub const MAX_SESSIONS: usize = 10_000;

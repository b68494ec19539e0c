// Interactive terminal chat: runs the questionnaire locally and asks a
// PlanProvider (normally a remote `fincheck serve`) for the plan.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::constants::GENERATING;
use crate::conversation::{Advance, Conversation, Phase, Rejection, Speaker};
use crate::proxy::PlanProvider;
use crate::questions::{InputKind, Script};

const RESTART: &str = "/restart";
const QUIT: &str = "/quit";

/// Maps what the user typed onto the exact text `advance` expects: for a
/// single-select question either the option's number or its name in any case.
fn resolve_input(kind: &InputKind, line: &str) -> String {
    let Some(options) = kind.options() else {
        return line.to_string();
    };
    let trimmed = line.trim();
    if let Ok(n) = trimmed.parse::<usize>() {
        if let Some(option) = n.checked_sub(1).and_then(|i| options.get(i)) {
            return option.clone();
        }
    }
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(trimmed))
        .cloned()
        .unwrap_or_else(|| trimmed.to_string())
}

struct Printer<W> {
    out: W,
    shown: usize,
}

impl<W: Write> Printer<W> {
    /// Prints transcript entries appended since the last call.
    fn flush_transcript(&mut self, conversation: &Conversation) -> Result<()> {
        let transcript = conversation.transcript();
        // A restart shrinks the transcript; start over from the top.
        if transcript.len() < self.shown {
            self.shown = 0;
            writeln!(self.out, "\n--- Starting over ---")?;
        }
        for entry in &transcript[self.shown..] {
            match entry.speaker {
                Speaker::Assistant => writeln!(self.out, "\nAdvisor: {}", entry.text)?,
                Speaker::User => writeln!(self.out, "You: {}", entry.text)?,
            }
        }
        self.shown = transcript.len();
        Ok(())
    }

    fn show_prompt(&mut self, conversation: &Conversation) -> Result<()> {
        match conversation.phase() {
            Phase::InProgress => {
                let progress = conversation.progress();
                if let Some(options) = conversation.current_question().and_then(|q| q.kind.options()) {
                    for (i, option) in options.iter().enumerate() {
                        writeln!(self.out, "  {}) {}", i + 1, option)?;
                    }
                }
                write!(
                    self.out,
                    "[{} {}/{}] > ",
                    progress.category, progress.position, progress.total
                )?;
            }
            Phase::AwaitingPlanRequest => {
                writeln!(self.out, "\nYour Financial Summary")?;
                for line in conversation.summary() {
                    writeln!(self.out, "  {}: {}", line.label, line.answer)?;
                }
                write!(self.out, "\nPress Enter to get your financial plan ({} to start over, {} to exit) > ", RESTART, QUIT)?;
            }
            Phase::PlanFailed => {
                if let Some(error) = conversation.plan_error() {
                    writeln!(self.out, "\n{}", error)?;
                }
                write!(self.out, "Press Enter to try again ({} to start over, {} to exit) > ", RESTART, QUIT)?;
            }
            Phase::PlanReady => {
                if let Some(plan) = conversation.plan() {
                    writeln!(self.out, "\nYour Personalized Financial Plan\n\n{}\n", plan)?;
                }
                write!(self.out, "Type {} to start over, or press Enter to exit > ", RESTART)?;
            }
            Phase::PlanRequested => {}
        }
        self.out.flush()?;
        Ok(())
    }
}

pub async fn run_chat<P, R, W>(script: Script, provider: &P, input: R, output: W) -> Result<()>
where
    P: PlanProvider + ?Sized,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    info!("Starting interactive chat session...");
    let mut conversation = Conversation::new(script);
    let mut printer = Printer { out: output, shown: 0 };
    let mut lines = input.lines();

    loop {
        printer.flush_transcript(&conversation)?;
        printer.show_prompt(&conversation)?;

        let Some(line) = lines.next_line().await? else {
            writeln!(printer.out)?;
            break;
        };

        match line.trim() {
            QUIT => break,
            RESTART => {
                conversation.restart();
                continue;
            }
            _ => {}
        }

        match conversation.phase() {
            Phase::InProgress => {
                let kind = match conversation.current_question() {
                    Some(question) => question.kind.clone(),
                    None => continue,
                };
                let answer = resolve_input(&kind, &line);
                if let Advance::Rejected(rejection) = conversation.advance(&answer) {
                    let hint = match rejection {
                        Rejection::UnknownOption => "Please pick one of the listed options.",
                        _ => "Please enter an answer to continue.",
                    };
                    writeln!(printer.out, "{}", hint)?;
                }
            }
            Phase::AwaitingPlanRequest | Phase::PlanFailed => {
                let Some(ticket) = conversation.begin_plan_request() else {
                    continue;
                };
                writeln!(printer.out, "\n{}", GENERATING)?;
                printer.out.flush()?;

                let result = provider.request_plan(conversation.answers()).await;
                if let Err(err) = &result {
                    warn!(error = %err, "Plan request failed");
                }
                conversation.finish_plan_request(ticket, result);
            }
            Phase::PlanReady => break,
            Phase::PlanRequested => {}
        }
    }

    info!("Chat session finished.");
    Ok(())
}

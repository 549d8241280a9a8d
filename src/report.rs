//! # Report Session
//! Pull-based accumulator for a streamed generation session. The session
//! folds an ordered, finite sequence of text fragments into one growing
//! buffer and exposes the latest concatenation after every step, so a
//! display layer can render progress while generation is still running.
//!
//! The session is a plain state machine: the caller pulls from whatever
//! producer it has (an SSE stream, a vector in tests) and feeds each item
//! in. No runtime dependency here.

use crate::ai::AiError;

/// Static user-facing message for a failed generation; partial text stays
/// available next to it.
pub const REPORT_FAILURE_MESSAGE: &str = "Failed to generate the report.";

/// Outcome of feeding one producer item into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    /// Fragment appended; the buffer grew.
    Progress,
    /// Producer signalled completion.
    Completed,
    /// Producer failed; the buffer keeps everything accumulated so far.
    Failed,
}

/// One generation session. Append-only while running; a new session starts
/// from an empty buffer.
#[derive(Debug, Default)]
pub struct ReportSession {
    buffer: String,
    failed: bool,
    done: bool,
}

impl ReportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next pulled item. `None` means the producer completed.
    /// After a terminal step the session stops advancing: further calls
    /// return the terminal step again and leave the buffer untouched.
    pub fn advance(&mut self, item: Option<Result<String, AiError>>) -> SessionStep {
        if self.failed {
            return SessionStep::Failed;
        }
        if self.done {
            return SessionStep::Completed;
        }
        match item {
            Some(Ok(fragment)) => {
                self.buffer.push_str(&fragment);
                SessionStep::Progress
            }
            Some(Err(_)) => {
                self.failed = true;
                SessionStep::Failed
            }
            None => {
                self.done = true;
                SessionStep::Completed
            }
        }
    }

    /// Latest concatenation of all fragments accepted so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Prompt for the on-demand financial report. Markdown with fixed `###`
/// section titles so the dashboard can style sections without parsing help.
pub fn report_prompt(stock_symbol: &str) -> String {
    format!(
        "Generate a comprehensive financial analysis report for the stock symbol: {stock_symbol}.\n\
         The report should be well-structured, easy to read, and suitable for an educational context for a new trader.\n\
         Format the output in Markdown.\n\
         \n\
         Please include the following sections, using '###' for each section title:\n\
         \n\
         ### 1. Company Introduction\n\
         - A brief, engaging overview of the company, its business model, and its industry.\n\
         \n\
         ### 2. Simplified Financial Analysis\n\
         - Discuss key metrics like P/E Ratio, Revenue Growth, and Net Income in simple terms.\n\
         - Explain what these metrics mean for a potential investor.\n\
         \n\
         ### 3. Recent Performance & Market Position\n\
         - Briefly touch on the stock's performance over the last year.\n\
         - Mention its key competitors and its position in the market.\n\
         \n\
         ### 4. Key Takeaways & Potential Risks\n\
         - Summarize the main points in a bulleted list.\n\
         - Mention 2-3 potential risks investors should be aware of, explaining them simply."
    )
}

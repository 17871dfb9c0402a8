// src/context.rs
//! # Analysis context
//! The hand-off to the external reasoning agent: the request plus the news that
//! survived the relevance gate. Once returned, the context belongs to the caller.

use chrono::{DateTime, NaiveDate, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::InvalidRequestError;
use crate::ingest::types::NewsBatch;
use crate::market::TechnicalSummary;
use crate::request::AnalysisRequest;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("context_built_total", "Analysis contexts handed out.");
        describe_counter!(
            "context_rejected_total",
            "Requests rejected for an empty ticker or idea."
        );
    });
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisContext {
    request: AnalysisRequest,
    news: NewsBatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    technicals: Option<TechnicalSummary>,
    generated_at: DateTime<Utc>,
}

/// System + user message pair for a chat-style model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptBundle {
    pub system: String,
    pub user: String,
}

/// Package `batch` with `request`. Fails only when the ticker or the idea is blank;
/// an empty batch is fine (the agent is expected to report that no news was found).
pub fn build_context(
    batch: NewsBatch,
    request: AnalysisRequest,
) -> Result<AnalysisContext, InvalidRequestError> {
    ensure_metrics_described();
    if let Err(e) = request.validate() {
        counter!("context_rejected_total").increment(1);
        tracing::warn!(target: "router", error = %e, "request rejected");
        return Err(e);
    }

    counter!("context_built_total").increment(1);
    tracing::info!(
        target: "router",
        ticker = %request.ticker,
        command = %request.command,
        news = batch.len(),
        "context built"
    );
    Ok(AnalysisContext {
        request,
        news: batch,
        technicals: None,
        generated_at: Utc::now(),
    })
}

impl AnalysisContext {
    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    pub fn news(&self) -> &NewsBatch {
        &self.news
    }

    pub fn technicals(&self) -> Option<&TechnicalSummary> {
        self.technicals.as_ref()
    }

    /// Attach the ticker's price snapshot.
    pub fn with_technicals(mut self, summary: TechnicalSummary) -> Self {
        self.technicals = Some(summary);
        self
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn has_news(&self) -> bool {
        !self.news.is_empty()
    }

    pub fn into_parts(self) -> (AnalysisRequest, NewsBatch) {
        (self.request, self.news)
    }

    /// Render the hand-off as prompt text. `today` is stated in the instruction so the
    /// agent can judge how fresh each item is.
    pub fn render_prompt(&self, today: NaiveDate) -> PromptBundle {
        let system = format!(
            "You are a trading news analyst. You help an active trader who gives a ticker symbol \
             and their current trade idea by linking recent news to that idea: supporting \
             evidence, risks, and open questions. Be concise and actionable.\n\
             The current date is {}.",
            today.format("%Y-%m-%d")
        );

        let mut user = format!(
            "Ticker: {}\nIdea: {}\nCommand: {}\n\n",
            self.request.ticker.trim(),
            self.request.idea.trim(),
            self.request.command
        );
        if self.news.is_empty() {
            user.push_str(&format!(
                "No relevant news found for {}.\n",
                self.request.ticker.trim()
            ));
        } else {
            // NewsBatch serializes as a plain array; fall back to a line listing if that ever fails.
            let items = serde_json::to_string_pretty(&self.news).unwrap_or_else(|_| {
                self.news
                    .iter()
                    .map(|it| format!("- [{}] {}: {}", it.source(), it.published_at(), it.headline()))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            user.push_str("Here are some recent news items:\n");
            user.push_str(&items);
            user.push('\n');
        }
        if let Some(t) = &self.technicals {
            user.push_str("\nTechnical snapshot (5-minute bars):\n");
            for line in t.prompt_lines() {
                user.push_str("- ");
                user.push_str(&line);
                user.push('\n');
            }
        }
        user.push_str("---");

        PromptBundle { system, user }
    }
}

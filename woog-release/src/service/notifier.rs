//! Failure notification
//!
//! Delivers the alert stage's message. Only called when a prior stage
//! failed; the decision itself lives in the domain layer.

use async_trait::async_trait;
use tracing::info;
use woog_client::TelegramClient;
use woog_core::domain::run::PipelineRun;

use crate::error::StageError;

/// Longest failure reason included in a message
const MAX_REASON_LEN: usize = 500;

/// Sends failure notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, run: &PipelineRun) -> Result<(), StageError>;
}

/// Sends the notification to a fixed Telegram chat
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: TelegramClient,
    chat_id: String,
    /// Repository name shown in the message (e.g., "woog-life/scraper")
    repository: String,
}

impl TelegramNotifier {
    pub fn new(client: TelegramClient, chat_id: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            client,
            chat_id: chat_id.into(),
            repository: repository.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, run: &PipelineRun) -> Result<(), StageError> {
        let text = failure_message(run, &self.repository);

        let sent = self
            .client
            .send_markdown(&self.chat_id, &text)
            .await
            .map_err(|e| StageError::Notify(e.to_string()))?;

        info!(
            "Failure notification delivered (message {})",
            sent.message_id
        );
        Ok(())
    }
}

/// Formats the Markdown alert for a failed run
pub fn failure_message(run: &PipelineRun, repository: &str) -> String {
    let mut text = format!(
        "*Release failed* for `{}`\nCommit: `{}`\nRun: `{}`\n",
        repository, run.commit, run.id
    );

    for (stage, reason) in run.failures() {
        text.push_str(&format!(
            "- `{}`: {}\n",
            stage,
            escape_markdown(&truncate(reason, MAX_REASON_LEN))
        ));
    }

    text
}

/// Escapes the characters legacy Telegram Markdown treats as entity markers
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use woog_core::domain::run::{StageName, StageOutcome};

    fn failed_run() -> PipelineRun {
        let mut run = PipelineRun::new("deadbeef");
        run.record(StageName::BuildPushDocker, StageOutcome::Success);
        run.record(
            StageName::Deploy,
            StageOutcome::Failure("cronjobs.batch is forbidden: user_x".to_string()),
        );
        run
    }

    #[test]
    fn test_failure_message() {
        let run = failed_run();
        let text = failure_message(&run, "woog-life/scraper");

        assert!(text.starts_with("*Release failed* for `woog-life/scraper`\n"));
        assert!(text.contains("Commit: `deadbeef`"));
        assert!(text.contains(&run.id.to_string()));
        assert!(text.contains("- `deploy`: cronjobs.batch is forbidden: user\\_x\n"));
        assert!(!text.contains("build_push_docker"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a_b*c`d[e]"), "a\\_b\\*c\\`d\\[e]");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }

    #[tokio::test]
    async fn test_telegram_notifier_delivers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "message_id": 7 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::with_base_url(server.uri(), "token");
        let notifier = TelegramNotifier::new(client, "-100", "woog-life/scraper");
        notifier.notify(&failed_run()).await.unwrap();
    }

    #[tokio::test]
    async fn test_telegram_notifier_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::with_base_url(server.uri(), "token");
        let notifier = TelegramNotifier::new(client, "-100", "woog-life/scraper");
        let err = notifier.notify(&failed_run()).await.unwrap_err();
        assert!(matches!(err, StageError::Notify(msg) if msg.contains("Unauthorized")));
    }
}

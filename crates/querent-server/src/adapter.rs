use futures::{Stream, StreamExt};
use tracing::{debug, error};

use querent_core::messages::{AssistantContent, Message, StepFailure};
use querent_engine::Snapshot;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnswerError {
    #[error("No SQL query generated")]
    NotFound,
    #[error("{0}")]
    StepFailed(StepFailure),
}

/// Consume pipeline snapshots and pick the answer.
///
/// The last message of each snapshot is inspected: a non-empty answer becomes
/// the current candidate, a failure ends consumption immediately. The final
/// candidate wins.
pub async fn collect_answer<S>(snapshots: S) -> Result<String, AnswerError>
where
    S: Stream<Item = Snapshot>,
{
    futures::pin_mut!(snapshots);
    let mut candidate: Option<String> = None;

    while let Some(snapshot) = snapshots.next().await {
        let Some(Message::Assistant(last)) = snapshot.log.last() else {
            continue;
        };

        match &last.content {
            AssistantContent::Failure(failure) => {
                error!(node = ?snapshot.node, error = %failure, "pipeline step failed");
                return Err(AnswerError::StepFailed(failure.clone()));
            }
            AssistantContent::Answer { text } if !text.trim().is_empty() => {
                debug!(node = ?snapshot.node, "candidate answer recorded");
                candidate = Some(text.clone());
            }
            AssistantContent::Answer { .. } => {}
        }
    }

    candidate.ok_or(AnswerError::NotFound)
}

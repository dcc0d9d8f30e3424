//! Single-shot query against a finished project.

use tracing::{info, instrument};

use sitesync_customgpt::KnowledgeBase;
use sitesync_shared::{ConversationTurn, ProjectId, Result, SiteSyncError};

/// Open a conversation named `conversation_name` and send `prompt` once.
#[instrument(skip_all, fields(project_id = %project))]
pub async fn ask(
    kb: &dyn KnowledgeBase,
    project: &ProjectId,
    conversation_name: &str,
    prompt: &str,
) -> Result<ConversationTurn> {
    if prompt.trim().is_empty() {
        return Err(SiteSyncError::validation("prompt must not be empty"));
    }

    let conversation = kb
        .create_conversation(project, conversation_name)
        .await?
        .or_status(|status| SiteSyncError::Conversation { status })?;

    let reply = kb
        .send_message(project, &conversation.session_id, prompt)
        .await?
        .or_status(|status| SiteSyncError::Query { status })?;

    info!(session_id = %conversation.session_id, "prompt answered");

    Ok(ConversationTurn {
        session_id: conversation.session_id,
        prompt: reply.user_query,
        response_text: reply.response_text,
    })
}

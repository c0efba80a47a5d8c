use tracing::{info, instrument, warn};

use unicloud_core::sample::create_sample_graph;
use unicloud_core::store::{ChatStore, GraphStore, IntakeStore, Role};
use unicloud_core::{chat_response_to_graph, graph_to_chat_format, ChatRequest};

use crate::api::{DesignBackend, TerraformArchive};
use crate::error::ClientError;

pub const INITIAL_DESIGN_MESSAGE: &str =
    "Please design a cloud infrastructure based on my requirements. Generate the initial architecture.";

/// How the first graph of a session was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignOutcome {
    Generated,
    Fallback { reason: String },
}

/// One designer session: intake answers, the working graph and the
/// conversation, all driven through a single backend.
pub struct DesignSession<B> {
    backend: B,
    pub intake: IntakeStore,
    pub graph: GraphStore,
    pub chat: ChatStore,
}

impl<B: DesignBackend> DesignSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            intake: IntakeStore::new(),
            graph: GraphStore::new(),
            chat: ChatStore::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn request(&self, message: &str) -> ChatRequest {
        ChatRequest {
            context: self.intake.intake().to_context(),
            history: self.chat.history(),
            message: message.to_string(),
        }
    }

    /// Ask for the first architecture. Any backend or decode failure
    /// installs the local sample graph instead.
    #[instrument(skip(self))]
    pub async fn design_initial(&mut self) -> Result<DesignOutcome, ClientError> {
        if !self.intake.is_complete() {
            return Err(ClientError::IncompleteIntake);
        }

        let request = self.request(INITIAL_DESIGN_MESSAGE);
        let result = match self.backend.send_chat(&request).await {
            Ok(response) => chat_response_to_graph(&response).map_err(ClientError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(graph) => {
                info!(nodes = graph.nodes.len(), edges = graph.edges.len(), "initial design generated");
                self.graph.set_graph(graph);
                Ok(DesignOutcome::Generated)
            }
            Err(e) => {
                warn!(error = %e, "initial design failed, using sample graph");
                self.graph.set_graph(create_sample_graph(self.intake.intake()));
                Ok(DesignOutcome::Fallback {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// One iterative chat turn. The reply replaces the graph and its notes
    /// become the assistant message.
    #[instrument(skip(self))]
    pub async fn send_message(&mut self, text: &str) -> Result<(), ClientError> {
        let request = self.request(text);
        self.chat.add_message(text, Role::User, None);

        self.chat.set_typing(true);
        let result = self.exchange(&request).await;
        self.chat.set_typing(false);

        match result {
            Ok(notes) => {
                self.chat.add_message(notes, Role::Assistant, None);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "chat turn failed");
                self.chat
                    .add_message(format!("Sorry, something went wrong: {e}"), Role::Assistant, None);
                Err(e)
            }
        }
    }

    async fn exchange(&mut self, request: &ChatRequest) -> Result<String, ClientError> {
        let response = self.backend.send_chat(request).await?;
        let graph = chat_response_to_graph(&response)?;
        info!(nodes = graph.nodes.len(), edges = graph.edges.len(), "graph updated from chat");
        self.graph.set_graph(graph);
        Ok(response.notes)
    }

    /// Encode the current graph and ask the backend for a Terraform archive.
    pub async fn export_terraform(&self) -> Result<TerraformArchive, ClientError> {
        let request = graph_to_chat_format(self.graph.graph())?;
        self.backend.generate_terraform(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use unicloud_core::{ChatResponse, TerraformRequest, TechStackField};

    /// Replies from a fixed queue and records every request it sees.
    struct ScriptedBackend {
        replies: Mutex<Vec<Result<ChatResponse, ClientError>>>,
        seen: Mutex<Vec<ChatRequest>>,
        exports: Mutex<Vec<TerraformRequest>>,
    }

    impl ScriptedBackend {
        fn new(mut replies: Vec<Result<ChatResponse, ClientError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(vec![]),
                exports: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl DesignBackend for ScriptedBackend {
        async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ClientError::Mock("no reply scripted".into())))
        }

        async fn generate_terraform(
            &self,
            request: &TerraformRequest,
        ) -> Result<TerraformArchive, ClientError> {
            self.exports.lock().unwrap().push(request.clone());
            Ok(TerraformArchive {
                content_type: "application/zip".into(),
                bytes: b"PK".to_vec(),
            })
        }
    }

    fn reply(components: &[&str], connections: &[&str], notes: &str) -> ChatResponse {
        ChatResponse {
            components: components.iter().map(|s| s.to_string()).collect(),
            connections: connections.iter().map(|s| s.to_string()).collect(),
            notes: notes.into(),
        }
    }

    fn ready_session(replies: Vec<Result<ChatResponse, ClientError>>) -> DesignSession<ScriptedBackend> {
        let mut session = DesignSession::new(ScriptedBackend::new(replies));
        session.intake.set_tech_stack_field(TechStackField::Backend, "rust");
        session
    }

    #[tokio::test]
    async fn incomplete_intake_is_rejected() {
        let mut session = DesignSession::new(ScriptedBackend::new(vec![]));
        let err = session.design_initial().await.unwrap_err();
        assert!(matches!(err, ClientError::IncompleteIntake));
        assert!(session.backend().seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn initial_design_installs_decoded_graph() {
        let mut session = ready_session(vec![Ok(reply(
            &["aws:alb", "aws:ecs_service x2"],
            &["0->1"],
            "two tiers",
        ))]);

        let outcome = session.design_initial().await.unwrap();
        assert_eq!(outcome, DesignOutcome::Generated);
        assert_eq!(session.graph.graph().nodes.len(), 2);
        assert!(!session.graph.is_dirty());

        let seen = session.backend().seen.lock().unwrap();
        assert_eq!(seen[0].message, INITIAL_DESIGN_MESSAGE);
        assert!(seen[0].context.contains("backend=rust"));
    }

    #[tokio::test]
    async fn initial_design_falls_back_to_sample() {
        let mut session = ready_session(vec![Err(ClientError::Mock("down".into()))]);
        let outcome = session.design_initial().await.unwrap();
        assert_eq!(outcome, DesignOutcome::Fallback { reason: "down".into() });
        assert!(session.graph.graph().has_node("vpc-1"));
    }

    #[tokio::test]
    async fn undecodable_initial_reply_falls_back() {
        let mut session = ready_session(vec![Ok(reply(&["not a component"], &[], ""))]);
        let outcome = session.design_initial().await.unwrap();
        assert!(matches!(outcome, DesignOutcome::Fallback { .. }));
        assert!(session.graph.graph().has_node("vpc-1"));
    }

    #[tokio::test]
    async fn chat_turn_replaces_graph_and_records_notes() {
        let mut session = ready_session(vec![Ok(reply(&["aws:lambda"], &[], "went serverless"))]);
        session.send_message("make it cheaper").await.unwrap();

        let seen = session.backend().seen.lock().unwrap();
        assert_eq!(seen[0].message, "make it cheaper");
        assert_eq!(seen[0].history.len(), 1, "history excludes the new message");

        let messages = session.chat.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].content, "went serverless");
        assert!(!session.chat.is_typing());
        assert_eq!(session.graph.graph().nodes[0].props["service"], "lambda");
    }

    #[tokio::test]
    async fn failed_chat_turn_is_recorded_and_returned() {
        let mut session = ready_session(vec![Err(ClientError::BadRequest("bad history".into()))]);
        let err = session.send_message("hello").await.unwrap_err();
        assert!(matches!(err, ClientError::BadRequest(_)));

        let last = session.chat.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("Bad Request: bad history"));
        assert!(!session.chat.is_typing());
        assert!(session.graph.graph().is_empty());
    }

    #[tokio::test]
    async fn export_encodes_current_graph() {
        let mut session = ready_session(vec![Ok(reply(&["aws:vpc", "aws:subnet"], &["0->1"], "n"))]);
        session.design_initial().await.unwrap();

        let archive = session.export_terraform().await.unwrap();
        assert_eq!(archive.bytes, b"PK");
        let exports = session.backend().exports.lock().unwrap();
        assert_eq!(exports[0].components.len(), 2);
        assert_eq!(exports[0].connections, vec!["0->1".to_string()]);
    }
}

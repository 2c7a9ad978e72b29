//! REST endpoint for knowledge-base chat
//!
//! Chat availability is prioritized over error transparency: every failure
//! is absorbed into a fallback answer and the endpoint always returns 200.

use actix_web::{post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::knowledge::OFFLINE_RESPONSE;
use crate::service::KnowledgeRetriever;

/// Request body for `/chat`
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Free-text operator question
    #[serde(default)]
    pub query: String,
}

/// Response body for `/chat`
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub answer: String,
}

/// Answer an operator question from the knowledge base
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer produced (may be a fallback)", body = ChatResponse)
    ),
    tag = "chat"
)]
#[post("/chat")]
pub async fn chat(
    retriever: web::Data<KnowledgeRetriever>,
    body: Option<web::Json<ChatRequest>>,
) -> impl Responder {
    let query = body.map(|b| b.into_inner().query).unwrap_or_default();

    let answer = match retriever.answer(&query) {
        Ok(answer) => answer,
        Err(e) => {
            tracing::error!(error = %e, "Knowledge retrieval failed");
            OFFLINE_RESPONSE.to_string()
        }
    };

    tracing::debug!(query = %query, answer = %answer, "Chat answered");
    HttpResponse::Ok().json(ChatResponse { answer })
}

/// Configure chat routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(chat);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    use crate::service::knowledge::{EMPTY_QUERY_RESPONSE, UNKNOWN_RESPONSE};

    async fn ask(entries: Vec<&str>, body: serde_json::Value) -> serde_json::Value {
        let retriever = KnowledgeRetriever::from_entries(
            entries.into_iter().map(str::to_string).collect(),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(retriever))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status().as_u16(), 200);
        test::read_body_json(res).await
    }

    #[actix_web::test]
    async fn test_empty_query_prompt() {
        let body = ask(vec!["Check the traps."], serde_json::json!({"query": ""})).await;
        assert_eq!(body, serde_json::json!({"answer": EMPTY_QUERY_RESPONSE}));
    }

    #[actix_web::test]
    async fn test_missing_query_field_behaves_as_empty() {
        let body = ask(vec!["Check the traps."], serde_json::json!({})).await;
        assert_eq!(body, serde_json::json!({"answer": EMPTY_QUERY_RESPONSE}));
    }

    #[actix_web::test]
    async fn test_matching_query_returns_entry() {
        let body = ask(
            vec!["Steam traps are inspected monthly."],
            serde_json::json!({"query": "when are steam traps inspected?"}),
        )
        .await;
        assert_eq!(
            body,
            serde_json::json!({"answer": "Steam traps are inspected monthly."})
        );
    }

    #[actix_web::test]
    async fn test_unrelated_query_gets_unknown_fallback() {
        let body = ask(
            vec!["Steam traps are inspected monthly."],
            serde_json::json!({"query": "zebra giraffe"}),
        )
        .await;
        assert_eq!(body, serde_json::json!({"answer": UNKNOWN_RESPONSE}));
    }

    #[actix_web::test]
    async fn test_retrieval_failure_is_absorbed_into_200() {
        // Empty corpus + punctuation-only query -> empty vocabulary error,
        // converted to the offline fallback.
        let body = ask(vec![], serde_json::json!({"query": "?!"})).await;
        assert_eq!(body, serde_json::json!({"answer": OFFLINE_RESPONSE}));
    }
}

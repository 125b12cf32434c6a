//! Integration tests for registration over HTTP.
//!
//! Each test spins up a stub backend on a random port and drives the
//! assistant and form against the real multipart / JSON contract.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use uuid::Uuid;

use registration_assistant::config::ClientConfig;
use registration_assistant::error::SubmitError;
use registration_assistant::fallback::AssistClient;
use registration_assistant::form::{FormStore, RegistrationForm, SelectedFile};
use registration_assistant::submission::{HttpRegistrationClient, SubmissionBridge};
use registration_assistant::wizard::prompts::{
    self, FALLBACK_UNAVAILABLE, SUBMIT_SUCCESS, SUBMIT_TRANSPORT_FAILURE,
};
use registration_assistant::wizard::{RegistrationAssistant, StepCatalog, TurnOutcome};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One multipart part as the backend received it.
#[derive(Debug, Clone)]
struct CapturedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl CapturedPart {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Clone)]
struct Backend {
    register_reply: (StatusCode, Value),
    chat_reply: (StatusCode, String),
    parts: Arc<Mutex<Vec<CapturedPart>>>,
    chat_requests: Arc<Mutex<Vec<Value>>>,
}

impl Backend {
    fn accepting(company_id: Uuid) -> Self {
        Self {
            register_reply: (
                StatusCode::OK,
                json!({
                    "success": true,
                    "company_id": company_id.to_string(),
                    "message": "Registration successful",
                }),
            ),
            chat_reply: (StatusCode::OK, json!({"response": "stub reply"}).to_string()),
            parts: Arc::new(Mutex::new(Vec::new())),
            chat_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn parts(&self) -> Vec<CapturedPart> {
        self.parts.lock().unwrap().clone()
    }

    fn part(&self, name: &str) -> Option<CapturedPart> {
        self.parts().into_iter().find(|p| p.name == name)
    }
}

async fn register(State(backend): State<Backend>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let content_type = field.content_type().map(String::from);
        let data = field.bytes().await.unwrap().to_vec();
        backend.parts.lock().unwrap().push(CapturedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    let (status, body) = backend.register_reply.clone();
    (status, Json(body))
}

async fn chat(State(backend): State<Backend>, Json(body): Json<Value>) -> (StatusCode, String) {
    backend.chat_requests.lock().unwrap().push(body);
    backend.chat_reply.clone()
}

/// Start the stub backend on a random port, return its config.
async fn start_backend(backend: Backend) -> ClientConfig {
    let app = Router::new()
        .route("/api/v1/register", post(register))
        .route("/api/ai/chat", post(chat))
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    ClientConfig {
        api_base_url: format!("http://127.0.0.1:{port}"),
        request_timeout: Duration::from_secs(2),
        ..ClientConfig::default()
    }
}

/// Wire a form and an assistant to the backend described by `config`.
fn wire(config: &ClientConfig) -> (RegistrationForm, RegistrationAssistant) {
    let store = FormStore::new();
    let bridge = SubmissionBridge::new();
    let client = HttpRegistrationClient::new(config).unwrap();
    let form = RegistrationForm::mount(
        store.clone(),
        &bridge,
        Arc::new(client),
        config.upload_limits.clone(),
    );
    let assistant = RegistrationAssistant::new(StepCatalog::registration(), store, bridge);
    (form, assistant)
}

async fn answer_through_confirmation(assistant: &RegistrationAssistant, upload: Option<SelectedFile>) {
    for answer in ["Acme Inc", "Logistics", "Jane Doe", "jane@acme.com"] {
        assistant.submit_answer(answer).await;
    }
    assistant.skip_step().await;
    match upload {
        Some(file) => {
            assert_eq!(assistant.select_choice("yes").await, TurnOutcome::AwaitingUpload);
            assistant.attach_documents(vec![file]).await;
        }
        None => {
            assistant.select_choice("no").await;
        }
    }
    assert!(assistant.position().await.is_terminal());
}

#[tokio::test]
async fn test_dialogue_submits_multipart_registration() {
    timeout(TEST_TIMEOUT, async {
        let company_id = Uuid::new_v4();
        let backend = Backend::accepting(company_id);
        let config = start_backend(backend.clone()).await;
        let (_form, assistant) = wire(&config);

        let license = SelectedFile::new("license.pdf", "application/pdf", b"%PDF-1.4".to_vec());
        answer_through_confirmation(&assistant, Some(license)).await;

        let outcome = assistant.submit_answer("yes").await;
        let TurnOutcome::Submitted(Ok(receipt)) = outcome else {
            panic!("expected a successful submission, got {outcome:?}");
        };
        assert_eq!(receipt.company_id, Some(company_id));

        let text = |name: &str| backend.part(name).map(|p| p.text());
        assert_eq!(text("company_name").as_deref(), Some("Acme Inc"));
        assert_eq!(text("area_of_service").as_deref(), Some("Logistics"));
        assert_eq!(text("applicant[full_name]").as_deref(), Some("Jane Doe"));
        assert_eq!(text("applicant[email]").as_deref(), Some("jane@acme.com"));
        assert_eq!(text("applicant[phone]").as_deref(), Some(""));

        let files: Vec<_> = backend.parts().into_iter().filter(|p| p.name == "files").collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name.as_deref(), Some("license.pdf"));
        assert_eq!(files[0].content_type.as_deref(), Some("application/pdf"));
        assert_eq!(files[0].data, b"%PDF-1.4");

        assert_eq!(assistant.messages().await.last().unwrap().text, SUBMIT_SUCCESS);
        // The dialogue path keeps the values after submitting.
        assert_eq!(assistant.form().snapshot().company_name, "Acme Inc");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_backend_detail_is_surfaced() {
    timeout(TEST_TIMEOUT, async {
        let mut backend = Backend::accepting(Uuid::new_v4());
        backend.register_reply = (
            StatusCode::BAD_REQUEST,
            json!({"detail": "Company already registered"}),
        );
        let config = start_backend(backend).await;
        let (_form, assistant) = wire(&config);
        answer_through_confirmation(&assistant, None).await;
        let before = assistant.form().snapshot();

        let err = assistant.trigger_submit().await.unwrap_err();
        assert_eq!(
            err,
            SubmitError::Rejected {
                status: Some(400),
                detail: Some("Company already registered".into()),
            }
        );
        assert_eq!(err.to_string(), "Company already registered");
        assert_eq!(
            assistant.messages().await.last().unwrap().text,
            prompts::submit_rejected(Some("Company already registered"))
        );
        assert_eq!(assistant.form().snapshot(), before);
        assert!(!assistant.is_typing());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_success_false_body_is_a_failure() {
    timeout(TEST_TIMEOUT, async {
        let mut backend = Backend::accepting(Uuid::new_v4());
        backend.register_reply = (
            StatusCode::OK,
            json!({"success": false, "message": "Duplicate registration"}),
        );
        let config = start_backend(backend).await;
        let (_form, assistant) = wire(&config);
        answer_through_confirmation(&assistant, None).await;

        let err = assistant.trigger_submit().await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Rejected { detail: Some(ref d), .. } if d == "Duplicate registration"
        ));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_form_submit_resets_on_success() {
    timeout(TEST_TIMEOUT, async {
        let backend = Backend::accepting(Uuid::new_v4());
        let config = start_backend(backend.clone()).await;
        let (form, _assistant) = wire(&config);

        form.set_field("companyName".parse().unwrap(), "Acme Inc").unwrap();
        form.set_field("fullName".parse().unwrap(), "Jane Doe").unwrap();
        form.set_field("email".parse().unwrap(), "jane@acme.com").unwrap();

        assert!(form.submit().await.is_ok());
        let status = form.status().await.unwrap();
        assert!(status.success);
        assert!(form.values().is_initial());
        assert_eq!(
            backend.part("applicant[email]").map(|p| p.text()).as_deref(),
            Some("jane@acme.com")
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_invalid_form_never_reaches_backend() {
    timeout(TEST_TIMEOUT, async {
        let backend = Backend::accepting(Uuid::new_v4());
        let config = start_backend(backend.clone()).await;
        let (form, _assistant) = wire(&config);
        form.set_field("email".parse().unwrap(), "jane@acme").unwrap();

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Validation(ref errors) if errors.len() == 3));
        assert!(backend.parts().is_empty());
        assert!(form.status().await.is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_failure() {
    timeout(TEST_TIMEOUT, async {
        // Reserve a port, then free it so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ClientConfig {
            api_base_url: format!("http://127.0.0.1:{port}"),
            request_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        };
        let (_form, assistant) = wire(&config);
        answer_through_confirmation(&assistant, None).await;

        let err = assistant.trigger_submit().await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(
            assistant.messages().await.last().unwrap().text,
            SUBMIT_TRANSPORT_FAILURE
        );
        assert!(!assistant.is_typing());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_unmounted_form_means_no_handler() {
    timeout(TEST_TIMEOUT, async {
        let config = start_backend(Backend::accepting(Uuid::new_v4())).await;
        let (form, assistant) = wire(&config);
        drop(form);

        assert_eq!(
            assistant.trigger_submit().await,
            Err(SubmitError::HandlerNotFound)
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_fallback_reply_over_http() {
    timeout(TEST_TIMEOUT, async {
        let mut backend = Backend::accepting(Uuid::new_v4());
        backend.chat_reply = (
            StatusCode::OK,
            json!({"response": "We need it to verify your business."}).to_string(),
        );
        let config = start_backend(backend.clone()).await;
        let (_form, assistant) = wire(&config);
        let assistant = assistant.with_fallback(Arc::new(AssistClient::new(&config).unwrap()));

        let outcome = assistant.handle_unexpected_input("why do you need this?").await;
        assert_eq!(outcome, TurnOutcome::Redirected);

        let texts: Vec<_> = assistant.messages().await.into_iter().map(|m| m.text).collect();
        assert_eq!(texts[texts.len() - 2], "We need it to verify your business.");
        assert_eq!(texts[texts.len() - 1], "What is your company name?");

        let requests = backend.chat_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["message"], "why do you need this?");
        let history = requests[0]["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1]["isUser"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_fallback_server_error_degrades() {
    timeout(TEST_TIMEOUT, async {
        let mut backend = Backend::accepting(Uuid::new_v4());
        backend.chat_reply = (StatusCode::INTERNAL_SERVER_ERROR, String::new());
        let config = start_backend(backend).await;
        let (_form, assistant) = wire(&config);
        let assistant = assistant.with_fallback(Arc::new(AssistClient::new(&config).unwrap()));

        assistant.handle_unexpected_input("???").await;
        let texts: Vec<_> = assistant.messages().await.into_iter().map(|m| m.text).collect();
        assert_eq!(texts[texts.len() - 2], FALLBACK_UNAVAILABLE);
        assert_eq!(assistant.current_step_index().await, 0);
        assert!(!assistant.is_typing());
    })
    .await
    .expect("test timed out");
}

//! HTTP client for the backend API. One transport path: build headers,
//! send, normalize the response. Success and error bodies come back as
//! JSON except when a proxy or the framework answers with HTML/text, in
//! which case the error message is pulled from the `<title>` tag.

use log::{debug, error};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    AiEmailRequest, AiEmailResponse, BulkCreateReport, BulkCreateRequest, Contact, ContactDraft,
    ContactPatch, Credentials, EmailLog, EmailSend, Group, GroupDraft, GroupPatch, ImportPreview,
    NewsletterAudience, SendReport, UserResponse,
};
use crate::session::SessionStore;

pub mod endpoints {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const LOGOUT: &str = "/auth/logout";
    pub const ME: &str = "/auth/me";

    pub const CONTACTS: &str = "/contacts";
    pub const CONTACTS_PARSE_IMPORT: &str = "/contacts/parse-import";
    pub const CONTACTS_BULK: &str = "/contacts/bulk";

    pub const GROUPS: &str = "/groups";

    pub const EMAIL_SEND: &str = "/email/send";
    pub const EMAIL_SEND_NEWSLETTER: &str = "/email/send/newsletter";
    pub const EMAIL_SEND_TRANSACTIONAL: &str = "/email/send/transactional";
    pub const EMAIL_LOGS: &str = "/email/logs";

    pub const AI_GENERATE: &str = "/ai-email/generate";

    pub fn contact_by_id(id: &str) -> String {
        format!("{}/{}", CONTACTS, id)
    }

    pub fn group_by_id(id: &str) -> String {
        format!("{}/{}", GROUPS, id)
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// Error status with a message extracted from the response body.
    #[error("{0}")]
    Server(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from server: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Normalized response body: JSON when the server declares it, raw text
/// otherwise.
#[derive(Debug)]
enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Payload::Json(value) => Ok(serde_json::from_value(value)?),
            // A server that mislabels JSON as text still gets a chance.
            Payload::Text(text) => Ok(serde_json::from_str(&text)?),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionStore) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            session,
        }
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
        include_auth: bool,
    ) -> Result<Payload, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("{} {} (auth: {})", method, url, include_auth);

        let mut request = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");

        if include_auth {
            if let Some(header) = self.session.auth_header() {
                request = request.header(AUTHORIZATION, header);
            }
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        Self::process_response(response).await
    }

    /// Multipart upload; no JSON content type, reqwest sets the boundary.
    async fn request_multipart(
        &self,
        endpoint: &str,
        form: Form,
        include_auth: bool,
    ) -> Result<Payload, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {} (multipart, auth: {})", url, include_auth);

        let mut request = self.http.post(&url).multipart(form);

        if include_auth {
            if let Some(header) = self.session.auth_header() {
                request = request.header(AUTHORIZATION, header);
            }
        }

        let response = request.send().await?;
        Self::process_response(response).await
    }

    async fn process_response(response: Response) -> Result<Payload, ApiError> {
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.contains("application/json"));

        let text = response.text().await?;

        if is_json {
            let value: serde_json::Value = serde_json::from_str(&text)?;
            debug!("JSON response ({}): {}", status, value);

            if !status.is_success() {
                let message = error_field(&value, "detail")
                    .or_else(|| error_field(&value, "message"))
                    .unwrap_or_else(|| "API request failed".to_string());
                error!("API error ({}): {}", status, message);
                return Err(ApiError::Server(message));
            }
            Ok(Payload::Json(value))
        } else {
            debug!("Text response ({}): {} bytes", status, text.len());

            if !status.is_success() {
                let message = extract_title(&text)
                    .unwrap_or_else(|| "Server returned an error".to_string());
                error!("Server error ({}): {}", status, message);
                return Err(ApiError::Server(message));
            }
            Ok(Payload::Text(text))
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        include_auth: bool,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, None, include_auth)
            .await?
            .decode()
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        include_auth: bool,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, endpoint, Some(&body), include_auth)
            .await?
            .decode()
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        include_auth: bool,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, endpoint, Some(&body), include_auth)
            .await?
            .decode()
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        include_auth: bool,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, endpoint, Some(&body), include_auth)
            .await?
            .decode()
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        include_auth: bool,
    ) -> Result<T, ApiError> {
        self.request(Method::DELETE, endpoint, None, include_auth)
            .await?
            .decode()
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: Form,
        include_auth: bool,
    ) -> Result<T, ApiError> {
        self.request_multipart(endpoint, form, include_auth)
            .await?
            .decode()
    }
}

// ---------------------------------------------------------------------------
// Typed endpoints
// ---------------------------------------------------------------------------

impl ApiClient {
    // Auth

    pub async fn login(&self, email: &str, password: &str) -> Result<UserResponse, ApiError> {
        let body = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post(endpoints::LOGIN, &body, false).await
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let body = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post(endpoints::REGISTER, &body, false).await
    }

    /// Best-effort server-side logout; local session cleanup happens
    /// regardless of the outcome.
    pub async fn logout(&self) -> Result<serde_json::Value, ApiError> {
        self.post(endpoints::LOGOUT, &serde_json::json!({}), true)
            .await
    }

    pub async fn me(&self) -> Result<serde_json::Value, ApiError> {
        self.get(endpoints::ME, true).await
    }

    // Contacts (recipients)

    pub async fn contacts(&self) -> Result<Vec<Contact>, ApiError> {
        self.get(endpoints::CONTACTS, true).await
    }

    pub async fn create_contact(&self, draft: &ContactDraft) -> Result<Contact, ApiError> {
        self.post(endpoints::CONTACTS, draft, true).await
    }

    pub async fn update_contact(
        &self,
        id: &str,
        patch: &ContactPatch,
    ) -> Result<Contact, ApiError> {
        self.put(&endpoints::contact_by_id(id), patch, true).await
    }

    pub async fn delete_contact(&self, id: &str) -> Result<serde_json::Value, ApiError> {
        self.delete(&endpoints::contact_by_id(id), true).await
    }

    /// First half of the bulk import flow: upload the raw file, get back the
    /// rows the server managed to parse.
    pub async fn parse_import(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ImportPreview, ApiError> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);
        self.post_multipart(endpoints::CONTACTS_PARSE_IMPORT, form, true)
            .await
    }

    /// Second half: create the previewed rows, optionally attaching them to
    /// a group.
    pub async fn bulk_create_contacts(
        &self,
        request: &BulkCreateRequest,
    ) -> Result<BulkCreateReport, ApiError> {
        self.post(endpoints::CONTACTS_BULK, request, true).await
    }

    // Groups (campaigns)

    pub async fn groups(&self) -> Result<Vec<Group>, ApiError> {
        self.get(endpoints::GROUPS, true).await
    }

    pub async fn group(&self, id: &str) -> Result<Group, ApiError> {
        self.get(&endpoints::group_by_id(id), true).await
    }

    pub async fn create_group(&self, draft: &GroupDraft) -> Result<Group, ApiError> {
        self.post(endpoints::GROUPS, draft, true).await
    }

    pub async fn update_group(&self, id: &str, patch: &GroupPatch) -> Result<Group, ApiError> {
        self.put(&endpoints::group_by_id(id), patch, true).await
    }

    pub async fn delete_group(&self, id: &str) -> Result<serde_json::Value, ApiError> {
        self.delete(&endpoints::group_by_id(id), true).await
    }

    // Email

    pub async fn send_email(&self, send: &EmailSend) -> Result<SendReport, ApiError> {
        self.post(endpoints::EMAIL_SEND, send, true).await
    }

    pub async fn send_newsletter(
        &self,
        subject: &str,
        body: &str,
        audience: &NewsletterAudience,
        inline_images: Vec<(String, Vec<u8>)>,
    ) -> Result<SendReport, ApiError> {
        let form = audience_form(subject, body, audience);
        let form = attach_files(form, "inline_images", inline_images);
        self.post_multipart(endpoints::EMAIL_SEND_NEWSLETTER, form, true)
            .await
    }

    pub async fn send_transactional(
        &self,
        subject: &str,
        body: &str,
        audience: &NewsletterAudience,
        attachments: Vec<(String, Vec<u8>)>,
    ) -> Result<SendReport, ApiError> {
        let form = audience_form(subject, body, audience);
        let form = attach_files(form, "attachments", attachments);
        self.post_multipart(endpoints::EMAIL_SEND_TRANSACTIONAL, form, true)
            .await
    }

    pub async fn email_logs(&self) -> Result<Vec<EmailLog>, ApiError> {
        self.get(endpoints::EMAIL_LOGS, true).await
    }

    // AI

    pub async fn generate_email(
        &self,
        request: &AiEmailRequest,
    ) -> Result<AiEmailResponse, ApiError> {
        self.post(endpoints::AI_GENERATE, request, true).await
    }
}

fn audience_form(subject: &str, body: &str, audience: &NewsletterAudience) -> Form {
    let form = Form::new()
        .text("subject", subject.to_string())
        .text("body", body.to_string());

    match audience {
        NewsletterAudience::Groups(ids) => form.text("group_ids", ids.join(",")),
        NewsletterAudience::AllSubscribers => form.text("send_to_all", "true"),
    }
}

fn attach_files(mut form: Form, field: &'static str, files: Vec<(String, Vec<u8>)>) -> Form {
    for (name, bytes) in files {
        form = form.part(field, Part::bytes(bytes).file_name(name));
    }
    form
}

fn error_field(value: &serde_json::Value, key: &str) -> Option<String> {
    let field = value.get(key)?;
    // FastAPI validation errors put structures under `detail`.
    Some(match field.as_str() {
        Some(s) => s.to_string(),
        None => field.to_string(),
    })
}

/// Content of the first `<title>` tag, ASCII case-insensitive.
fn extract_title(text: &str) -> Option<String> {
    let open = find_ci(text.as_bytes(), b"<title")?;
    let after_open = open + text[open..].find('>')? + 1;
    let close = after_open + find_ci(&text.as_bytes()[after_open..], b"</title")?;
    Some(text[after_open..close].trim().to_string())
}

fn find_ci(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use mockito::Matcher;

    fn anon_client(server: &mockito::ServerGuard, dir: &tempfile::TempDir) -> ApiClient {
        let session = SessionStore::file_at(dir.path().join("session.json"));
        ApiClient::new(&server.url(), session)
    }

    fn authed_client(
        server: &mockito::ServerGuard,
        dir: &tempfile::TempDir,
        token: &str,
    ) -> ApiClient {
        let session = SessionStore::file_at(dir.path().join("session.json"));
        session.set_token(token).unwrap();
        ApiClient::new(&server.url(), session)
    }

    #[test]
    fn title_extraction() {
        assert_eq!(
            extract_title("<html><head><title>Not Found</title></head></html>").as_deref(),
            Some("Not Found")
        );
        assert_eq!(
            extract_title("<TITLE> Bad Gateway </TITLE>").as_deref(),
            Some("Bad Gateway")
        );
        assert_eq!(extract_title("no markup at all"), None);
        assert_eq!(extract_title("<title>unterminated"), None);
    }

    #[tokio::test]
    async fn no_token_means_no_authorization_header() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let mock = server
            .mock("GET", "/contacts")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = anon_client(&server, &dir);
        let contacts: Vec<Contact> = client.get("/contacts", true).await.unwrap();

        assert!(contacts.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stored_token_becomes_bearer_header() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let mock = server
            .mock("GET", "/contacts")
            .match_header("authorization", "Bearer tok-123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "tok-123");
        let _: Vec<Contact> = client.contacts().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthenticated_request_never_sends_auth() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let mock = server
            .mock("POST", "/auth/login")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"email": "a@b.com", "token": "t"}"#)
            .create_async()
            .await;

        // Token in the session, but login opts out of auth.
        let client = authed_client(&server, &dir, "tok-123");
        let user = client.login("a@b.com", "pw").await.unwrap();

        assert_eq!(user.token, "t");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn json_error_surfaces_detail_field() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("POST", "/auth/login")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Invalid credentials"}"#)
            .create_async()
            .await;

        let client = anon_client(&server, &dir);
        let err = client.login("a@b.com", "wrong").await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn json_error_falls_back_to_message_field() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("GET", "/email/logs")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "boom"}"#)
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let err = client.email_logs().await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn json_error_without_fields_is_generic() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("GET", "/email/logs")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let err = client.email_logs().await.unwrap_err();
        assert_eq!(err.to_string(), "API request failed");
    }

    #[tokio::test]
    async fn html_error_surfaces_title() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("GET", "/contacts")
            .with_status(404)
            .with_header("content-type", "text/html")
            .with_body("<html><head><title>Not Found</title></head><body>404</body></html>")
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let err = client.contacts().await.unwrap_err();
        assert_eq!(err.to_string(), "Not Found");
    }

    #[tokio::test]
    async fn text_error_without_title_is_generic() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("GET", "/contacts")
            .with_status(502)
            .with_header("content-type", "text/plain")
            .with_body("upstream broke")
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let err = client.contacts().await.unwrap_err();
        assert_eq!(err.to_string(), "Server returned an error");
    }

    #[tokio::test]
    async fn create_contact_posts_json_body() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let mock = server
            .mock("POST", "/contacts")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "Ada",
                "email": "ada@example.com"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": "c1", "user_id": "u1", "name": "Ada", "email": "ada@example.com"}"#,
            )
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let draft = ContactDraft {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };
        let contact = client.create_contact(&draft).await.unwrap();

        assert_eq!(contact.id, "c1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_email_reports_recipients() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("POST", "/email/send")
            .match_body(Matcher::Json(serde_json::json!({
                "subject": "Hello",
                "body": "<p>Hi</p>",
                "group_id": "g1"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Email sent", "recipients": ["a@x.com", "b@x.com"]}"#)
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let send = EmailSend {
            subject: "Hello".to_string(),
            body: "<p>Hi</p>".to_string(),
            to_emails: None,
            group_id: Some("g1".to_string()),
        };
        let report = client.send_email(&send).await.unwrap();

        assert_eq!(report.recipients.len(), 2);
        assert_eq!(report.message.as_deref(), Some("Email sent"));
    }

    #[tokio::test]
    async fn parse_import_uploads_multipart() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let mock = server
            .mock("POST", "/contacts/parse-import")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"count": 2, "contacts": [
                    {"name": "John Doe", "email": "john@example.com"},
                    {"name": "Jane Doe", "email": "jane@example.com"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let csv = b"name,email\nJohn Doe,john@example.com\nJane Doe,jane@example.com".to_vec();
        let preview = client.parse_import("contacts.csv", csv).await.unwrap();

        assert_eq!(preview.count, 2);
        assert_eq!(preview.contacts[0].email, "john@example.com");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn newsletter_form_carries_group_ids() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let mock = server
            .mock("POST", "/email/send/newsletter")
            .match_body(Matcher::Regex("g1,g2".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"recipients": ["a@x.com"]}"#)
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let audience = NewsletterAudience::Groups(vec!["g1".to_string(), "g2".to_string()]);
        let report = client
            .send_newsletter("S", "B", &audience, Vec::new())
            .await
            .unwrap();

        assert_eq!(report.recipients, vec!["a@x.com"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn me_sends_bearer_and_returns_profile() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let mock = server
            .mock("GET", "/auth/me")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"email": "user@example.com"}"#)
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "tok");
        let profile = client.me().await.unwrap();

        assert_eq!(profile["email"], "user@example.com");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn patch_sends_partial_body() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let mock = server
            .mock("PATCH", "/contacts/c1")
            .match_body(Matcher::Json(serde_json::json!({"name": "Ada II"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "c1", "name": "Ada II", "email": "ada@example.com"}"#)
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let patch = ContactPatch {
            name: Some("Ada II".to_string()),
            email: None,
        };
        let contact: Contact = client
            .patch(&endpoints::contact_by_id("c1"), &patch, true)
            .await
            .unwrap();

        assert_eq!(contact.name, "Ada II");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_single_group() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("GET", "/groups/g1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "g1", "group_name": "VIP", "contact_ids": ["c1", "c2"]}"#)
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let group = client.group("g1").await.unwrap();

        assert_eq!(group.group_name, "VIP");
        assert_eq!(group.contact_ids.len(), 2);
    }

    #[tokio::test]
    async fn ai_generation_roundtrip() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("POST", "/ai-email/generate")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "tone": "witty"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"subject": "Big news", "body": "<p>...</p>"}"#)
            .create_async()
            .await;

        let client = authed_client(&server, &dir, "t");
        let request = AiEmailRequest {
            subject_hint: Some("launch".to_string()),
            tone: Some("witty".to_string()),
            audience: None,
            key_points: vec!["free shipping".to_string()],
        };
        let draft = client.generate_email(&request).await.unwrap();

        assert_eq!(draft.subject, "Big news");
    }
}

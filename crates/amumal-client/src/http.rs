use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use amumal_core::{
    AvailabilityChecker, CheckError, CheckOutcome, FetchError, FieldError, Page, PageSource,
    PostSummary,
};

use crate::protocol::{
    detail, CheckData, Envelope, LoginData, LoginRequest, PasswordUpdateRequest, PostListData,
    ProfileData, ProfileUpdateRequest, SignupRequest, SubmitOutcome,
};

/// Error type for requests that did not produce a usable response.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP client could not be built: {0}")]
    Build(String),

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Response could not be decoded: {0}")]
    Decode(String),
}

/// HTTP client for the forum backend. Cheap to clone; clones share the
/// connection pool and the session cookie.
#[derive(Debug, Clone)]
pub struct ForumClient {
    client: reqwest::Client,
    base_url: String,
}

impl ForumClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /user/check-email`.
    pub async fn check_email(&self, email: &str) -> Result<CheckOutcome, CheckError> {
        self.check("/user/check-email", "email", email, FieldError::InvalidEmail)
            .await
    }

    /// `GET /user/check-nickname`.
    pub async fn check_nickname(&self, nickname: &str) -> Result<CheckOutcome, CheckError> {
        self.check(
            "/user/check-nickname",
            "nickname",
            nickname,
            FieldError::InvalidNickname,
        )
        .await
    }

    async fn check(
        &self,
        path: &str,
        param: &str,
        candidate: &str,
        malformed: FieldError,
    ) -> Result<CheckOutcome, CheckError> {
        let response = self
            .client
            .get(self.url(path))
            .query(&[(param, candidate)])
            .send()
            .await
            .map_err(|e| CheckError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let envelope: Envelope<CheckData> = response
                    .json()
                    .await
                    .map_err(|e| CheckError::Decode(e.to_string()))?;
                // A 200 without a positive flag counts as taken.
                if envelope.data.unwrap_or_default().possible {
                    Ok(CheckOutcome::Available)
                } else {
                    Ok(CheckOutcome::Taken)
                }
            }
            StatusCode::BAD_REQUEST => Ok(CheckOutcome::Rejected(malformed)),
            other => Err(CheckError::Status(other.as_u16())),
        }
    }

    /// `GET /posts?cursor_id=&count=`.
    pub async fn list_posts(
        &self,
        cursor: u64,
        count: u32,
    ) -> Result<Page<PostSummary>, FetchError> {
        let response = self
            .client
            .get(self.url("/posts"))
            .query(&[("cursor_id", cursor), ("count", u64::from(count))])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let envelope: Envelope<PostListData> = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        let data = envelope
            .data
            .ok_or_else(|| FetchError::Decode("missing post list".to_string()))?;

        Ok(Page {
            items: data.post_list,
            next_cursor: data.next_cursor,
        })
    }

    /// `POST /user/login`.
    pub async fn login(
        &self,
        request: &LoginRequest,
    ) -> Result<SubmitOutcome<LoginData>, ClientError> {
        let builder = self.client.post(self.url("/user/login")).json(request);
        submit(builder, StatusCode::OK, detail::LOGIN_SUCCESS).await
    }

    /// `POST /user/signup`.
    pub async fn signup(&self, request: &SignupRequest) -> Result<SubmitOutcome<()>, ClientError> {
        let builder = self.client.post(self.url("/user/signup")).json(request);
        submit(builder, StatusCode::CREATED, detail::REGISTER_SUCCESS).await
    }

    /// `PUT /user/update-me/:id`.
    pub async fn update_profile(
        &self,
        user_id: u64,
        request: &ProfileUpdateRequest,
    ) -> Result<SubmitOutcome<ProfileData>, ClientError> {
        let builder = self
            .client
            .put(self.url(&format!("/user/update-me/{user_id}")))
            .json(request);
        submit(builder, StatusCode::OK, detail::PROFILE_UPDATE_SUCCESS).await
    }

    /// `PUT /user/update-password/:id`.
    pub async fn update_password(
        &self,
        user_id: u64,
        request: &PasswordUpdateRequest,
    ) -> Result<SubmitOutcome<()>, ClientError> {
        let builder = self
            .client
            .put(self.url(&format!("/user/update-password/{user_id}")))
            .json(request);
        submit(builder, StatusCode::OK, detail::PASSWORD_UPDATE_SUCCESS).await
    }

    /// `DELETE /user/logout/:id`.
    pub async fn logout(&self, user_id: u64) -> Result<SubmitOutcome<()>, ClientError> {
        let builder = self
            .client
            .delete(self.url(&format!("/user/logout/{user_id}")));
        submit(builder, StatusCode::OK, detail::LOGOUT_SUCCESS).await
    }

    /// `DELETE /user/:id`.
    pub async fn delete_account(&self, user_id: u64) -> Result<SubmitOutcome<()>, ClientError> {
        let builder = self.client.delete(self.url(&format!("/user/{user_id}")));
        submit(builder, StatusCode::OK, detail::USER_DELETE_SUCCESS).await
    }
}

/// Send a submit request and map it onto the action's discriminant.
async fn submit<T: DeserializeOwned>(
    builder: RequestBuilder,
    expected: StatusCode,
    success_tag: &str,
) -> Result<SubmitOutcome<T>, ClientError> {
    let response = builder
        .send()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?;
    let status = response.status();

    // Error bodies are not guaranteed to be JSON.
    let envelope: Option<Envelope<serde_json::Value>> = response.json().await.ok();
    let (tag, data) = match envelope {
        Some(env) => (env.detail, env.data),
        None => (None, None),
    };

    if status != expected || tag.as_deref() != Some(success_tag) {
        tracing::debug!(%status, detail = ?tag, "submit rejected");
        return Ok(SubmitOutcome::Failed {
            status: status.as_u16(),
            detail: tag,
        });
    }

    let data = serde_json::from_value(data.unwrap_or(serde_json::Value::Null))
        .map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(SubmitOutcome::Succeeded(data))
}

/// Availability of an email address.
#[derive(Debug, Clone)]
pub struct EmailAvailability(pub ForumClient);

/// Availability of a nickname.
#[derive(Debug, Clone)]
pub struct NicknameAvailability(pub ForumClient);

#[async_trait]
impl AvailabilityChecker for EmailAvailability {
    async fn check(&self, candidate: &str) -> Result<CheckOutcome, CheckError> {
        self.0.check_email(candidate).await
    }
}

#[async_trait]
impl AvailabilityChecker for NicknameAvailability {
    async fn check(&self, candidate: &str) -> Result<CheckOutcome, CheckError> {
        self.0.check_nickname(candidate).await
    }
}

/// The post listing as a page source.
#[derive(Debug, Clone)]
pub struct PostFeed(pub ForumClient);

impl PageSource for PostFeed {
    type Item = PostSummary;

    async fn fetch_page(&self, cursor: u64, count: u32) -> Result<Page<PostSummary>, FetchError> {
        self.0.list_posts(cursor, count).await
    }
}

/// Serialize a request body for logging without leaking passwords.
pub fn redacted<T: Serialize>(body: &T) -> String {
    let mut value = match serde_json::to_value(body) {
        Ok(v) => v,
        Err(_) => return String::new(),
    };
    if let Some(map) = value.as_object_mut() {
        for (key, v) in map.iter_mut() {
            if key.contains("password") {
                *v = serde_json::Value::String("***".to_string());
            }
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ForumClient {
        ForumClient::new(server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_check_email_available_and_taken() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/check-email"))
            .and(query_param("email", "free@b.co"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"possible": true}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/check-email"))
            .and(query_param("email", "used@b.co"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"possible": false}})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client.check_email("free@b.co").await,
            Ok(CheckOutcome::Available)
        );
        assert_eq!(client.check_email("used@b.co").await, Ok(CheckOutcome::Taken));
    }

    #[tokio::test]
    async fn test_check_nickname_bad_request_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/check-nickname"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"detail": "invalid_nickname_format"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client.check_nickname("bad").await,
            Ok(CheckOutcome::Rejected(FieldError::InvalidNickname))
        );
    }

    #[tokio::test]
    async fn test_check_server_error_is_check_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/check-email"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let checker = EmailAvailability(client_for(&server).await);
        assert_eq!(
            checker.check("a@b.co").await,
            Err(CheckError::Status(500))
        );
    }

    #[tokio::test]
    async fn test_list_posts_passes_cursor_and_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(query_param("cursor_id", "15"))
            .and(query_param("count", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "detail": "posts_list_success",
                "data": {
                    "post_list": [
                        {"post_id": 16, "title": "hello", "author_nickname": "a",
                         "created_at": "2024-01-01 00:00:00", "views": 3,
                         "likes": "1k", "comments_count": 0}
                    ],
                    "next_cursor": null
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let feed = PostFeed(client_for(&server).await);
        let page = feed.fetch_page(15, 10).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].post_id, 16);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_list_posts_missing_list_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .mount(&server)
            .await;

        let result = client_for(&server).await.list_posts(0, 10).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_list_posts_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server).await.list_posts(0, 10).await;
        assert_eq!(result, Err(FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_login_success_decodes_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .and(body_json(json!({"email": "a@b.co", "password": "Abc123!@"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "detail": "login_success",
                "data": {"user_id": 3, "profile_nickname": "alice",
                         "profile_img_url": null, "session_id": "s"}
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .await
            .login(&LoginRequest {
                email: "a@b.co".to_string(),
                password: "Abc123!@".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Succeeded(LoginData {
                user_id: 3,
                profile_nickname: "alice".to_string(),
                profile_img_url: None,
            })
        );
    }

    #[tokio::test]
    async fn test_wrong_discriminant_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/signup"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"detail": "other"})))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .await
            .signup(&SignupRequest {
                email: "a@b.co".to_string(),
                password: "Abc123!@".to_string(),
                nickname: "alice".to_string(),
                profile_image: None,
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                status: 201,
                detail: Some("other".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_password_update_wrong_current() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/user/update-password/3"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "invalid_password"})),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .await
            .update_password(
                3,
                &PasswordUpdateRequest {
                    current_password: "Old123!@".to_string(),
                    new_password: "New123!@".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(outcome.failed_with(400, detail::INVALID_PASSWORD));
    }

    #[tokio::test]
    async fn test_delete_account_plain_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/user/3"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.delete_account(3).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                status: 500,
                detail: None
            }
        );
    }

    #[test]
    fn test_redacted_hides_passwords() {
        let body = PasswordUpdateRequest {
            current_password: "Old123!@".to_string(),
            new_password: "New123!@".to_string(),
        };
        let text = redacted(&body);
        assert!(!text.contains("Old123"));
        assert!(!text.contains("New123"));
    }
}

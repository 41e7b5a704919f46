use crate::api::adapter;
use crate::auth::AuthContext;
use crate::config::Config;
use crate::error::ApiError;
use crate::logger;
use crate::models::{Answer, Protocol, Quiz, UserProfile};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;

/// Remote quiz backend as seen by the session flow.
#[async_trait]
pub trait QuizApi: Send + Sync {
    async fn fetch_quiz(&self, quiz_id: &str) -> Result<Quiz, ApiError>;

    /// Records that the signed-in user started `quiz_id`.
    async fn record_start(&self, quiz_id: &str) -> Result<(), ApiError>;

    async fn submit_answers(&self, quiz_id: &str, answers: &[Answer]) -> Result<(), ApiError>;

    async fn fetch_protocol(&self, protocol_id: &str) -> Result<Protocol, ApiError>;

    async fn fetch_current_user(&self) -> Result<UserProfile, ApiError>;
}

#[derive(Debug, Serialize)]
struct SubmissionBody<'a> {
    answers: &'a [Answer],
}

#[derive(Debug, Clone)]
pub struct HttpQuizApi {
    http: reqwest::Client,
    base_url: String,
    auth: AuthContext,
}

impl HttpQuizApi {
    pub fn new(config: &Config, auth: AuthContext) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("hackquiz/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.auth.bearer_token().ok_or(ApiError::Unauthorized)?;
        Ok(request.bearer_auth(token))
    }

    fn with_optional_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request and returns the body text of a 2xx response.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        logger::log(&format!("{} -> {}", what, status));
        check_status(status, body, what)
    }
}

fn check_status(status: StatusCode, body: String, what: &str) -> Result<String, ApiError> {
    if status.is_success() {
        return Ok(body);
    }
    match status {
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(what.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
        _ => Err(ApiError::Http {
            status: status.as_u16(),
            message: crate::utils::truncate_string(body.trim(), 200),
        }),
    }
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn fetch_quiz(&self, quiz_id: &str) -> Result<Quiz, ApiError> {
        let request = self.with_optional_auth(self.http.get(self.url(&format!("quizzes/{}", quiz_id))));
        let body = self.send(request, &format!("quiz {}", quiz_id)).await?;
        Ok(adapter::parse_quiz(&body)?)
    }

    async fn record_start(&self, quiz_id: &str) -> Result<(), ApiError> {
        let request =
            self.authorized(self.http.post(self.url(&format!("quizzes/{}/sessions", quiz_id))))?;
        self.send(request, &format!("start of quiz {}", quiz_id))
            .await
            .map(|_| ())
    }

    async fn submit_answers(&self, quiz_id: &str, answers: &[Answer]) -> Result<(), ApiError> {
        let request = self
            .authorized(self.http.post(self.url(&format!("quizzes/{}/submissions", quiz_id))))?
            .json(&SubmissionBody { answers });
        self.send(request, &format!("submission for quiz {}", quiz_id))
            .await
            .map(|_| ())
    }

    async fn fetch_protocol(&self, protocol_id: &str) -> Result<Protocol, ApiError> {
        let request =
            self.with_optional_auth(self.http.get(self.url(&format!("protocols/{}", protocol_id))));
        let body = self
            .send(request, &format!("protocol {}", protocol_id))
            .await?;
        Ok(adapter::parse_protocol(&body)?)
    }

    async fn fetch_current_user(&self) -> Result<UserProfile, ApiError> {
        let request = self.authorized(self.http.get(self.url("users/me")))?;
        let body = self.send(request, "current user").await?;
        Ok(adapter::parse_user(&body)?)
    }
}

/// Scripted backend for tests: responses are queued per call kind and every call is
/// recorded.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        FetchQuiz(String),
        RecordStart(String),
        Submit(String, Vec<Answer>),
        FetchProtocol(String),
        FetchCurrentUser,
    }

    #[derive(Default)]
    pub struct MockQuizApi {
        pub quizzes: Mutex<Vec<Quiz>>,
        pub start_results: Mutex<VecDeque<Result<(), ApiError>>>,
        pub submit_results: Mutex<VecDeque<Result<(), ApiError>>>,
        pub raw_quiz_body: Mutex<Option<String>>,
        pub delay: Option<Duration>,
        pub calls: Mutex<Vec<Call>>,
    }

    impl MockQuizApi {
        pub fn with_quiz(quiz: Quiz) -> Self {
            let api = Self::default();
            api.quizzes.lock().unwrap().push(quiz);
            api
        }

        pub fn push_submit_result(&self, result: Result<(), ApiError>) {
            self.submit_results.lock().unwrap().push_back(result);
        }

        pub fn push_start_result(&self, result: Result<(), ApiError>) {
            self.start_results.lock().unwrap().push_back(result);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        async fn simulate_latency(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl QuizApi for MockQuizApi {
        async fn fetch_quiz(&self, quiz_id: &str) -> Result<Quiz, ApiError> {
            self.simulate_latency().await;
            self.calls
                .lock()
                .unwrap()
                .push(Call::FetchQuiz(quiz_id.to_string()));
            if let Some(body) = self.raw_quiz_body.lock().unwrap().as_ref() {
                return Ok(adapter::parse_quiz(body)?);
            }
            self.quizzes
                .lock()
                .unwrap()
                .iter()
                .find(|q| q.id == quiz_id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("quiz {}", quiz_id)))
        }

        async fn record_start(&self, quiz_id: &str) -> Result<(), ApiError> {
            self.simulate_latency().await;
            self.calls
                .lock()
                .unwrap()
                .push(Call::RecordStart(quiz_id.to_string()));
            self.start_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }

        async fn submit_answers(&self, quiz_id: &str, answers: &[Answer]) -> Result<(), ApiError> {
            self.simulate_latency().await;
            self.calls
                .lock()
                .unwrap()
                .push(Call::Submit(quiz_id.to_string(), answers.to_vec()));
            self.submit_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }

        async fn fetch_protocol(&self, protocol_id: &str) -> Result<Protocol, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::FetchProtocol(protocol_id.to_string()));
            Ok(Protocol {
                id: protocol_id.to_string(),
                name: format!("Protocol {}", protocol_id),
                description: None,
            })
        }

        async fn fetch_current_user(&self) -> Result<UserProfile, ApiError> {
            self.calls.lock().unwrap().push(Call::FetchCurrentUser);
            Err(ApiError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerValue;

    fn client(auth: AuthContext) -> HttpQuizApi {
        let mut config = Config::from_lookup(|_| None, None).unwrap();
        config.api_url = "http://127.0.0.1:9/api".to_string();
        HttpQuizApi::new(&config, auth).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let api = client(AuthContext::new());
        assert_eq!(api.url("/quizzes/1"), "http://127.0.0.1:9/api/quizzes/1");
        assert_eq!(api.url("users/me"), "http://127.0.0.1:9/api/users/me");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            check_status(StatusCode::OK, "body".to_string(), "x").unwrap(),
            "body"
        );
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, String::new(), "quiz 9"),
            Err(ApiError::NotFound(what)) if what == "quiz 9"
        ));
        assert!(matches!(
            check_status(StatusCode::FORBIDDEN, String::new(), "x"),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, " upstream down ".to_string(), "x"),
            Err(ApiError::Http { status: 502, message }) if message == "upstream down"
        ));
    }

    #[tokio::test]
    async fn test_record_start_without_identity_is_rejected_locally() {
        let api = client(AuthContext::new());
        let err = api.record_start("q-1").await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_submit_without_identity_is_rejected_locally() {
        let api = client(AuthContext::new());
        let answers = vec![Answer {
            question_id: "1".to_string(),
            value: AnswerValue::Text("borrowing".to_string()),
        }];
        assert!(api.submit_answers("q-1", &answers).await.unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_submission_body_shape() {
        let answers = vec![Answer {
            question_id: "1".to_string(),
            value: AnswerValue::Multiple(vec!["a".to_string(), "b".to_string()]),
        }];
        let body = serde_json::to_value(SubmissionBody { answers: &answers }).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"answers": [{"question_id": "1", "answer": ["a", "b"]}]})
        );
    }
}

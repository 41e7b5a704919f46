use crate::api::QuizApi;
use crate::logger;
use crate::models::{ApiRequest, ApiResponse};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Serves `ApiRequest`s until the request channel closes. Each request runs on its own
/// task so a slow submission never holds up a quiz fetch.
pub fn spawn_api_worker(
    api: Arc<dyn QuizApi>,
    mut requests: UnboundedReceiver<ApiRequest>,
    responses: UnboundedSender<ApiResponse>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let api = Arc::clone(&api);
            let responses = responses.clone();
            tokio::spawn(async move {
                let response = handle_request(api.as_ref(), request).await;
                if responses.send(response).is_err() {
                    logger::log("Response channel closed, dropping API response");
                }
            });
        }
        logger::log("Worker channel disconnected, exiting");
    })
}

pub async fn handle_request(api: &dyn QuizApi, request: ApiRequest) -> ApiResponse {
    match request {
        ApiRequest::FetchQuiz { quiz_id } => {
            logger::log(&format!("Fetching quiz {}", quiz_id));
            let result = api.fetch_quiz(&quiz_id).await;
            if let Err(e) = &result {
                logger::log(&format!("Quiz {} failed to load: {}", quiz_id, e));
            }
            ApiResponse::QuizLoaded { quiz_id, result }
        }
        ApiRequest::FetchProtocol {
            quiz_id,
            protocol_id,
        } => {
            let result = api.fetch_protocol(&protocol_id).await;
            if let Err(e) = &result {
                logger::log(&format!("Protocol {} lookup failed: {}", protocol_id, e));
            }
            ApiResponse::ProtocolLoaded { quiz_id, result }
        }
        ApiRequest::RecordStart { quiz_id, attempt } => {
            logger::log(&format!("Recording start of quiz {}", quiz_id));
            let result = api.record_start(&quiz_id).await;
            if let Err(e) = &result {
                logger::log(&format!("Recording start of {} failed: {}", quiz_id, e));
            }
            ApiResponse::StartRecorded {
                quiz_id,
                attempt,
                result,
            }
        }
        ApiRequest::Submit {
            quiz_id,
            attempt,
            answers,
        } => {
            logger::log(&format!(
                "Submitting {} answers for quiz {}",
                answers.len(),
                quiz_id
            ));
            let result = api.submit_answers(&quiz_id, &answers).await;
            if let Err(e) = &result {
                logger::log(&format!("Submission for {} failed: {}", quiz_id, e));
            }
            ApiResponse::Submitted {
                quiz_id,
                attempt,
                result,
            }
        }
        ApiRequest::FetchCurrentUser => {
            let result = api.fetch_current_user().await;
            if let Err(e) = &result {
                logger::log(&format!("Current user refresh failed: {}", e));
            }
            ApiResponse::CurrentUser { result }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::mock::{Call, MockQuizApi};
    use crate::error::{ApiError, ParseError};
    use crate::session::tests::sample_quiz;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_unknown_quiz_is_not_found() {
        let api = MockQuizApi::with_quiz(sample_quiz(3, 10));
        let response = handle_request(
            &api,
            ApiRequest::FetchQuiz {
                quiz_id: "nope".to_string(),
            },
        )
        .await;
        match response {
            ApiResponse::QuizLoaded { quiz_id, result } => {
                assert_eq!(quiz_id, "nope");
                assert!(matches!(result, Err(ApiError::NotFound(_))));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_becomes_parse_error() {
        let api = MockQuizApi::default();
        *api.raw_quiz_body.lock().unwrap() = Some("{ id: \"q\", title: ".to_string());
        let response = handle_request(
            &api,
            ApiRequest::FetchQuiz {
                quiz_id: "q".to_string(),
            },
        )
        .await;
        assert!(matches!(
            response,
            ApiResponse::QuizLoaded {
                result: Err(ApiError::Parse(ParseError::Syntax { .. })),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_worker_round_trip() {
        let api = Arc::new(MockQuizApi {
            delay: Some(Duration::from_millis(10)),
            ..MockQuizApi::with_quiz(sample_quiz(3, 10))
        });
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
        let handle = spawn_api_worker(api.clone(), req_rx, resp_tx);

        req_tx
            .send(ApiRequest::RecordStart {
                quiz_id: "quiz-1".to_string(),
                attempt: 7,
            })
            .unwrap();
        let response = resp_rx.recv().await.unwrap();
        assert!(matches!(
            response,
            ApiResponse::StartRecorded { result: Ok(()), .. }
        ));
        assert_eq!(response.attempt(), Some(7));
        assert_eq!(api.calls(), vec![Call::RecordStart("quiz-1".to_string())]);

        drop(req_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_current_user_failure_is_reported() {
        let api = MockQuizApi::default();
        let response = handle_request(&api, ApiRequest::FetchCurrentUser).await;
        assert!(response.quiz_id().is_none());
        assert!(matches!(
            response,
            ApiResponse::CurrentUser {
                result: Err(ApiError::Unauthorized)
            }
        ));
    }
}

use crate::config::PublishableStatus;
use crate::errors::RelayError;
use crate::graphql::{self, CreateData, LookupData, NewComment};
use crate::metrics_defs::{STORE_ERRORS, STORE_REQUEST_DURATION};
use crate::store::{GraphqlRequest, GraphqlTransport, RemoteOutcome};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

/// Stateless translation between the storefront contract and the store.
#[derive(Clone)]
pub struct CommentRelay {
    transport: Arc<dyn GraphqlTransport>,
    status: PublishableStatus,
}

impl CommentRelay {
    pub fn new(transport: Arc<dyn GraphqlTransport>, status: PublishableStatus) -> Self {
        CommentRelay { transport, status }
    }

    /// Creates one comment record and returns the store's confirmation.
    pub async fn submit(&self, image_id: &str, comment: &str) -> Result<Value, RelayError> {
        if image_id.trim().is_empty() {
            return Err(RelayError::missing("image_id"));
        }
        if comment.trim().is_empty() {
            return Err(RelayError::missing("comment"));
        }

        let new_comment = NewComment::new(image_id, comment, self.status, Utc::now());
        tracing::debug!(image_id, handle = %new_comment.handle, "creating comment");

        let response = self.call("create", new_comment.into_request()).await?;

        if let Some(errors) = graphql::request_errors(&response) {
            let details = errors.clone();
            tracing::warn!(image_id, errors = %details, "store rejected create request");
            return Err(self.failed("create", RelayError::RemoteProtocol(details)));
        }

        let payload = self
            .data::<CreateData>("create", response)?
            .and_then(|data| data.metaobject_create)
            .ok_or_else(|| {
                self.failed(
                    "create",
                    RelayError::ContractViolation("missing metaobjectCreate".into()),
                )
            })?;

        if let Some(user_errors) = payload.user_errors.filter(|errors| !errors.is_empty()) {
            let details = Value::from(user_errors);
            tracing::warn!(image_id, errors = %details, "store reported field errors");
            return Err(self.failed("create", RelayError::RemoteValidation(details)));
        }

        match payload.metaobject {
            Some(metaobject) if !metaobject.is_null() => Ok(metaobject),
            _ => Err(self.failed(
                "create",
                RelayError::ContractViolation("no record in create confirmation".into()),
            )),
        }
    }

    /// Returns the text of up to 100 comments attached to `image_id`.
    pub async fn retrieve(&self, image_id: &str) -> Result<Vec<String>, RelayError> {
        if image_id.trim().is_empty() {
            return Err(RelayError::missing("image_id"));
        }

        let response = self
            .call("lookup", graphql::lookup_request(image_id))
            .await?;

        if let Some(errors) = graphql::request_errors(&response) {
            if mentions_filterable(errors) {
                tracing::warn!(
                    image_id,
                    "{} is not filterable on {}; enable filtering for it in the store",
                    graphql::IMAGE_ID_KEY,
                    graphql::RECORD_TYPE,
                );
            }
            let details = errors.clone();
            tracing::warn!(image_id, errors = %details, "store rejected lookup request");
            return Err(self.failed("lookup", RelayError::RemoteProtocol(details)));
        }

        let connection = self
            .data::<LookupData>("lookup", response)?
            .and_then(|data| data.metaobjects)
            .ok_or_else(|| {
                self.failed(
                    "lookup",
                    RelayError::ContractViolation("missing metaobjects".into()),
                )
            })?;

        let comments = connection.comment_texts();
        tracing::debug!(image_id, count = comments.len(), "retrieved comments");
        Ok(comments)
    }

    /// Sends one request and unpacks the transport outcome into the raw response.
    async fn call(
        &self,
        operation: &'static str,
        request: GraphqlRequest,
    ) -> Result<Value, RelayError> {
        let start = Instant::now();
        let outcome = self.transport.execute(&request).await;
        histogram!(STORE_REQUEST_DURATION, "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        match outcome {
            RemoteOutcome::Success(payload) => Ok(payload),
            RemoteOutcome::RemoteError { status, payload } => {
                tracing::warn!(operation, %status, %payload, "store returned error status");
                Err(self.failed(operation, RelayError::RemoteStatus { status, payload }))
            }
            RemoteOutcome::NoResponse => Err(self.failed(operation, RelayError::NoResponse)),
            RemoteOutcome::SetupError(message) => {
                tracing::error!(operation, %message, "could not complete store request");
                Err(self.failed(operation, RelayError::Setup(message)))
            }
        }
    }

    /// Typed `data` block. Only consulted once `errors` has been ruled out.
    fn data<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        response: Value,
    ) -> Result<Option<T>, RelayError> {
        graphql::response_data(response).map_err(|e| {
            self.failed(
                operation,
                RelayError::ContractViolation(format!("malformed response: {e}")),
            )
        })
    }

    fn failed(&self, operation: &'static str, error: RelayError) -> RelayError {
        counter!(STORE_ERRORS, "operation" => operation, "kind" => error.kind()).increment(1);
        error
    }
}

fn mentions_filterable(errors: &Value) -> bool {
    fn message_mentions(error: &Value) -> bool {
        error
            .get("message")
            .and_then(Value::as_str)
            .is_some_and(|message| message.to_ascii_lowercase().contains("filterable"))
    }

    match errors {
        Value::Array(errors) => errors.iter().any(message_mentions),
        error => message_mentions(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::FakeTransport;
    use chrono::DateTime;
    use http::StatusCode;
    use serde_json::json;

    fn relay(transport: &Arc<FakeTransport>) -> CommentRelay {
        CommentRelay::new(transport.clone(), PublishableStatus::Active)
    }

    fn created(image_id: &str) -> Value {
        json!({
            "data": {
                "metaobjectCreate": {
                    "metaobject": {
                        "id": "gid://shopify/Metaobject/1",
                        "handle": "comment-42-1",
                        "type": "image_comment",
                        "fields": [{"key": "image_id", "value": image_id}]
                    },
                    "userErrors": []
                }
            }
        })
    }

    #[tokio::test]
    async fn test_submit_sends_one_create_request() {
        let transport = FakeTransport::replying(RemoteOutcome::Success(created("42")));
        let before = Utc::now();

        let confirmation = relay(&transport).submit("42", "Nice photo!").await.unwrap();
        assert_eq!(confirmation["id"], "gid://shopify/Metaobject/1");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let metaobject = &requests[0].variables["metaobject"];
        assert_eq!(metaobject["type"], "image_comment");
        assert_eq!(metaobject["capabilities"]["publishable"]["status"], "ACTIVE");

        let fields = metaobject["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], json!({"key": "image_id", "value": "42"}));
        assert_eq!(fields[1], json!({"key": "comment_text", "value": "Nice photo!"}));
        assert_eq!(fields[2]["key"], "timestamp");

        let timestamp = DateTime::parse_from_rfc3339(fields[2]["value"].as_str().unwrap())
            .unwrap()
            .with_timezone(&Utc);
        assert!(timestamp >= before - chrono::Duration::milliseconds(1));
        assert!(timestamp <= Utc::now());
    }

    #[tokio::test]
    async fn test_submit_forwards_comment_verbatim() {
        let transport = FakeTransport::replying(RemoteOutcome::Success(created("7")));
        let comment = "  <b>wow</b>\n 'quoted' \\ ";

        relay(&transport).submit("7", comment).await.unwrap();

        let requests = transport.requests();
        assert_eq!(
            requests[0].variables["metaobject"]["fields"][1]["value"],
            json!(comment)
        );
    }

    #[tokio::test]
    async fn test_submit_requires_fields() {
        let transport = FakeTransport::replying(RemoteOutcome::Success(created("42")));
        let relay = relay(&transport);

        for (image_id, comment) in [("", "hi"), ("42", ""), ("  ", "hi"), ("42", " \n")] {
            let err = relay.submit(image_id, comment).await.unwrap_err();
            assert!(matches!(err, RelayError::InvalidInput(_)));
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_submit_user_errors() {
        let user_errors = json!([{"field": ["metaobject", "fields", "0"], "message": "is invalid", "code": "INVALID"}]);
        let transport = FakeTransport::replying(RemoteOutcome::Success(json!({
            "data": {"metaobjectCreate": {"metaobject": null, "userErrors": user_errors}}
        })));

        let err = relay(&transport).submit("42", "hi").await.unwrap_err();
        assert_eq!(err, RelayError::RemoteValidation(user_errors));
    }

    #[tokio::test]
    async fn test_submit_request_errors() {
        let errors = json!([{"message": "Field 'metaobjectCreate' doesn't exist"}]);
        let transport =
            FakeTransport::replying(RemoteOutcome::Success(json!({"errors": errors})));

        let err = relay(&transport).submit("42", "hi").await.unwrap_err();
        assert_eq!(err, RelayError::RemoteProtocol(errors));
    }

    #[tokio::test]
    async fn test_submit_missing_confirmation() {
        for body in [
            json!({"data": {"metaobjectCreate": {"metaobject": null, "userErrors": []}}}),
            json!({"data": {"metaobjectCreate": null}}),
            json!({"data": null}),
            json!({}),
        ] {
            let transport = FakeTransport::replying(RemoteOutcome::Success(body));
            let err = relay(&transport).submit("42", "hi").await.unwrap_err();
            assert!(matches!(err, RelayError::ContractViolation(_)));
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn test_transport_outcomes() {
        let transport = FakeTransport::replying(RemoteOutcome::NoResponse);
        assert_eq!(
            relay(&transport).submit("42", "hi").await.unwrap_err(),
            RelayError::NoResponse
        );
        assert_eq!(
            relay(&transport).retrieve("42").await.unwrap_err(),
            RelayError::NoResponse
        );

        let transport = FakeTransport::replying(RemoteOutcome::RemoteError {
            status: StatusCode::PAYMENT_REQUIRED,
            payload: json!({"errors": "Unavailable Shop"}),
        });
        let err = relay(&transport).retrieve("42").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            err,
            RelayError::RemoteStatus {
                status: StatusCode::PAYMENT_REQUIRED,
                payload: json!({"errors": "Unavailable Shop"}),
            }
        );

        let transport = FakeTransport::replying(RemoteOutcome::SetupError("boom".into()));
        assert_eq!(
            relay(&transport).submit("42", "hi").await.unwrap_err(),
            RelayError::Setup("boom".into())
        );
    }

    #[tokio::test]
    async fn test_retrieve_filters_records_without_text() {
        let transport = FakeTransport::replying(RemoteOutcome::Success(json!({
            "data": {
                "metaobjects": {
                    "edges": [
                        {"node": {"id": "1", "fields": [{"key": "comment_text", "value": "Nice photo!"}]}},
                        {"node": {"id": "2", "fields": [{"key": "image_id", "value": "42"}]}}
                    ]
                }
            }
        })));

        let comments = relay(&transport).retrieve("42").await.unwrap();
        assert_eq!(comments, vec!["Nice photo!"]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].variables["query"], "fields.image_id:'42'");
        assert_eq!(requests[0].variables["first"], 100);
    }

    #[tokio::test]
    async fn test_retrieve_requires_image_id() {
        let transport = FakeTransport::replying(RemoteOutcome::NoResponse);
        let err = relay(&transport).retrieve("").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_unfilterable_field() {
        let errors = json!([{"message": "Field 'image_id' is not filterable"}]);
        assert!(mentions_filterable(&errors));
        assert!(!mentions_filterable(&json!([{"message": "Access denied"}])));

        let transport =
            FakeTransport::replying(RemoteOutcome::Success(json!({"errors": errors})));
        let err = relay(&transport).retrieve("42").await.unwrap_err();
        assert_eq!(err, RelayError::RemoteProtocol(errors));
    }

    #[tokio::test]
    async fn test_retrieve_missing_connection() {
        let transport = FakeTransport::replying(RemoteOutcome::Success(json!({"data": {}})));
        let err = relay(&transport).retrieve("42").await.unwrap_err();
        assert!(matches!(err, RelayError::ContractViolation(_)));
    }

    #[tokio::test]
    async fn test_request_errors_win_over_malformed_data() {
        let errors = json!([{"message": "Access denied"}]);
        let transport = FakeTransport::replying(RemoteOutcome::Success(json!({
            "errors": errors,
            "data": {"metaobjectCreate": {"metaobject": null, "userErrors": null}}
        })));

        let err = relay(&transport).submit("42", "hi").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err, RelayError::RemoteProtocol(errors));
    }

    #[tokio::test]
    async fn test_non_list_errors_are_passed_through() {
        let errors = json!({"message": "Throttled"});
        let transport =
            FakeTransport::replying(RemoteOutcome::Success(json!({"errors": errors})));

        let err = relay(&transport).retrieve("42").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err, RelayError::RemoteProtocol(errors.clone()));

        let err = relay(&transport).submit("42", "hi").await.unwrap_err();
        assert_eq!(err, RelayError::RemoteProtocol(errors));
    }

    #[tokio::test]
    async fn test_null_user_errors_with_record_is_success() {
        let transport = FakeTransport::replying(RemoteOutcome::Success(json!({
            "data": {"metaobjectCreate": {
                "metaobject": {"id": "gid://shopify/Metaobject/2"},
                "userErrors": null
            }}
        })));

        let confirmation = relay(&transport).submit("42", "hi").await.unwrap();
        assert_eq!(confirmation["id"], "gid://shopify/Metaobject/2");
    }
}

//! GraphQL documents and response shapes for the image comment records.

use crate::config::PublishableStatus;
use crate::store::GraphqlRequest;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const RECORD_TYPE: &str = "image_comment";
pub const IMAGE_ID_KEY: &str = "image_id";
pub const COMMENT_TEXT_KEY: &str = "comment_text";
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Upper bound on records returned by a single lookup.
pub const PAGE_SIZE: u32 = 100;

const CREATE_MUTATION: &str = r#"mutation CreateImageComment($metaobject: MetaobjectCreateInput!) {
  metaobjectCreate(metaobject: $metaobject) {
    metaobject {
      id
      handle
      type
      fields {
        key
        value
      }
    }
    userErrors {
      field
      message
      code
    }
  }
}"#;

const LOOKUP_QUERY: &str = r#"query ImageComments($type: String!, $first: Int!, $query: String!) {
  metaobjects(type: $type, first: $first, query: $query) {
    edges {
      node {
        id
        fields {
          key
          value
        }
      }
    }
  }
}"#;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub value: Option<String>,
}

impl Field {
    fn new(key: &str, value: impl Into<String>) -> Self {
        Field {
            key: key.to_string(),
            value: Some(value.into()),
        }
    }
}

/// A fully prepared creation request.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub handle: String,
    pub fields: Vec<Field>,
    pub status: PublishableStatus,
}

impl NewComment {
    pub fn new(image_id: &str, comment: &str, status: PublishableStatus, now: DateTime<Utc>) -> Self {
        NewComment {
            handle: handle_for(image_id, now),
            fields: vec![
                Field::new(IMAGE_ID_KEY, image_id),
                Field::new(COMMENT_TEXT_KEY, comment),
                Field::new(TIMESTAMP_KEY, now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ],
            status,
        }
    }

    pub fn into_request(self) -> GraphqlRequest {
        let fields: Vec<Value> = self
            .fields
            .into_iter()
            .map(|f| json!({"key": f.key, "value": f.value}))
            .collect();

        GraphqlRequest {
            query: CREATE_MUTATION,
            variables: json!({
                "metaobject": {
                    "type": RECORD_TYPE,
                    "handle": self.handle,
                    "fields": fields,
                    "capabilities": {
                        "publishable": {"status": self.status}
                    }
                }
            }),
        }
    }
}

pub fn lookup_request(image_id: &str) -> GraphqlRequest {
    GraphqlRequest {
        query: LOOKUP_QUERY,
        variables: json!({
            "type": RECORD_TYPE,
            "first": PAGE_SIZE,
            "query": filter_expression(IMAGE_ID_KEY, image_id),
        }),
    }
}

/// `fields.<key>:'<value>'` with `\` and `'` escaped in the value.
pub fn filter_expression(key: &str, value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("fields.{key}:'{escaped}'")
}

/// Longest slug kept in a handle; the store caps handles at 255 characters.
pub const MAX_SLUG_LEN: usize = 64;

/// Record handle: `comment-<slug>-<unix millis>`.
///
/// Two submissions for the same image within one millisecond collide, as do
/// ids that share their first `MAX_SLUG_LEN` slug characters.
pub fn handle_for(image_id: &str, now: DateTime<Utc>) -> String {
    let mut slug = String::with_capacity(image_id.len());
    for c in image_id.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "image" } else { slug };

    format!("comment-{slug}-{}", now.timestamp_millis())
}

/// Request-level errors of a GraphQL response, exactly as the store sent them.
///
/// An empty list counts as no errors. Non-list values are passed through.
pub fn request_errors(response: &Value) -> Option<&Value> {
    match response.get("errors")? {
        Value::Null => None,
        Value::Array(errors) if errors.is_empty() => None,
        errors => Some(errors),
    }
}

/// The `data` block of a GraphQL response; `None` when absent or null.
pub fn response_data<T: DeserializeOwned>(response: Value) -> Result<Option<T>, serde_json::Error> {
    match response {
        Value::Object(mut body) => match body.remove("data") {
            Some(data) => serde_json::from_value(data),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateData {
    #[serde(rename = "metaobjectCreate")]
    pub metaobject_create: Option<CreatePayload>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePayload {
    pub metaobject: Option<Value>,
    #[serde(rename = "userErrors", default)]
    pub user_errors: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct LookupData {
    pub metaobjects: Option<Connection>,
}

#[derive(Debug, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
pub struct Edge {
    pub node: Node,
}

#[derive(Debug, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Connection {
    /// `comment_text` of every record that has one, in the order received.
    pub fn comment_texts(self) -> Vec<String> {
        self.edges
            .into_iter()
            .filter_map(|edge| {
                edge.node
                    .fields
                    .into_iter()
                    .find(|f| f.key == COMMENT_TEXT_KEY)
                    .and_then(|f| f.value)
            })
            .collect()
    }
}

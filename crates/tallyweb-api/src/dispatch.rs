//! Route dispatcher
//!
//! Turns a `(verb, model)` pair into an axum method router. The verb decides
//! which parts of the request become call arguments:
//! - post: the JSON body
//! - find: the query string
//! - patch: the `:id` path parameter and the JSON body
//! - get / delete: the `:id` path parameter

use crate::error::ApiError;
use axum::body::Bytes;
use axum::extract::{Path, Query as QueryParams};
use axum::http::Method;
use axum::response::Json;
use axum::routing::{on, MethodFilter, MethodRouter};
use serde_json::Value;
use std::collections::HashMap;
use tallyweb_core::{CoreError, ErrorSeverity, ModelRef, Query, Record, ResourceModel};

/// Logical operation a route is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Read-all, served over GET
    Find,
    Get,
    Post,
    Patch,
    Delete,
}

impl Verb {
    pub fn method(self) -> Method {
        match self {
            Verb::Find | Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        }
    }

    pub fn method_filter(self) -> MethodFilter {
        match self {
            Verb::Find | Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Patch => MethodFilter::PATCH,
            Verb::Delete => MethodFilter::DELETE,
        }
    }
}

impl std::str::FromStr for Verb {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "find" => Ok(Verb::Find),
            "get" => Ok(Verb::Get),
            "post" => Ok(Verb::Post),
            "patch" => Ok(Verb::Patch),
            "delete" => Ok(Verb::Delete),
            _ => Err(format!("Invalid verb: {}", s)),
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verb::Find => write!(f, "find"),
            Verb::Get => write!(f, "get"),
            Verb::Post => write!(f, "post"),
            Verb::Patch => write!(f, "patch"),
            Verb::Delete => write!(f, "delete"),
        }
    }
}

/// Wrap a model method so axum can serve it
pub fn wrap_controller(controller: ModelRef, verb: Verb) -> MethodRouter {
    let handler = move |params: Option<Path<HashMap<String, String>>>,
                        QueryParams(query): QueryParams<Query>,
                        body: Bytes| {
        let controller = controller.clone();
        async move {
            let params = params.map(|Path(params)| params).unwrap_or_default();
            dispatch(controller.as_ref(), verb, params, query, body).await
        }
    };

    on(verb.method_filter(), handler)
}

async fn dispatch(
    controller: &dyn ResourceModel,
    verb: Verb,
    params: HashMap<String, String>,
    query: Query,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let id = params.get("id").cloned().unwrap_or_default();

    let result = match verb {
        Verb::Post => controller.post(parse_body(&body)?).await.map(Value::Object),
        Verb::Find => controller
            .find(&query)
            .await
            .map(|records| Value::Array(records.into_iter().map(Value::Object).collect())),
        Verb::Patch => controller
            .patch(&Value::String(id), parse_body(&body)?)
            .await
            .map(Value::Object),
        Verb::Get => controller.get(&id).await.map(Value::Object),
        Verb::Delete => controller
            .delete(&Value::String(id))
            .await
            .map(|()| Value::Null),
    };

    result.map(Json).map_err(|source| {
        report(controller.name(), verb, &source);
        ApiError::Controller {
            resource: controller.name().to_string(),
            source,
        }
    })
}

fn report(resource: &str, verb: Verb, error: &CoreError) {
    let level = match error.severity() {
        ErrorSeverity::Info => log::Level::Info,
        ErrorSeverity::Warning => log::Level::Warn,
        ErrorSeverity::Error => log::Level::Error,
    };
    log::log!(target: "tallyweb::dispatch", level, "{}.{} failed: {}", resource, verb, error);
}

/// Decode a request body into a record. An empty body is an empty record.
fn parse_body(body: &Bytes) -> Result<Record, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Record::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(ApiError::BadRequest {
            message: "Request body must be a JSON object".to_string(),
        }),
        Err(e) => Err(ApiError::BadRequest {
            message: format!("Malformed JSON body: {}", e),
        }),
    }
}

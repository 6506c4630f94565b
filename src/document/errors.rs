//! JSON:API error objects and an accumulating collection.

use axum::http::StatusCode;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorObject {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

impl ErrorObject {
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        ErrorObject {
            status: status.as_u16().to_string(),
            code: None,
            title: title.into(),
            detail: None,
            source: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: Some(pointer.into()),
            parameter: None,
        });
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: None,
            parameter: Some(parameter.into()),
        });
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
            .parse::<u16>()
            .ok()
            .and_then(|n| StatusCode::from_u16(n).ok())
            .unwrap_or(StatusCode::BAD_REQUEST)
    }
}

/// Errors collected while reading a request. Each `add_*` helper fixes the
/// status and `source.pointer` for one kind of problem.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorCollection {
    errors: Vec<ErrorObject>,
}

impl ErrorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ErrorObject) {
        self.errors.push(error);
    }

    /// Document-level problem (missing or malformed `data`).
    pub fn add_data_error(&mut self, title: impl Into<String>) {
        self.add(ErrorObject::new(StatusCode::BAD_REQUEST, title).with_pointer("/data"));
    }

    pub fn add_data_type_error(&mut self, title: impl Into<String>) {
        self.add(ErrorObject::new(StatusCode::CONFLICT, title).with_pointer("/data/type"));
    }

    pub fn add_data_id_error(&mut self, title: impl Into<String>) {
        self.add(ErrorObject::new(StatusCode::CONFLICT, title).with_pointer("/data/id"));
    }

    pub fn add_data_attribute_error(&mut self, name: &str, title: impl Into<String>) {
        self.add(
            ErrorObject::new(StatusCode::UNPROCESSABLE_ENTITY, title)
                .with_pointer(format!("/data/attributes/{}", escape_pointer(name))),
        );
    }

    pub fn add_relationship_error(&mut self, name: &str, title: impl Into<String>) {
        self.add(
            ErrorObject::new(StatusCode::UNPROCESSABLE_ENTITY, title)
                .with_pointer(format!("/data/relationships/{}", escape_pointer(name))),
        );
    }

    pub fn add_relationship_type_error(&mut self, name: &str, title: impl Into<String>) {
        self.add(
            ErrorObject::new(StatusCode::UNPROCESSABLE_ENTITY, title)
                .with_pointer(format!("/data/relationships/{}/data/type", escape_pointer(name))),
        );
    }

    pub fn add_relationship_id_error(&mut self, name: &str, title: impl Into<String>) {
        self.add(
            ErrorObject::new(StatusCode::UNPROCESSABLE_ENTITY, title)
                .with_pointer(format!("/data/relationships/{}/data/id", escape_pointer(name))),
        );
    }

    pub fn add_query_parameter_error(&mut self, name: &str, title: impl Into<String>) {
        self.add(ErrorObject::new(StatusCode::BAD_REQUEST, title).with_parameter(name));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorObject> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<ErrorObject> {
        self.errors
    }

    /// Status shared by every error; 400 when they disagree or the collection is empty.
    pub fn status(&self) -> StatusCode {
        let mut statuses = self.errors.iter().map(ErrorObject::status_code);
        match statuses.next() {
            Some(first) if statuses.all(|s| s == first) => first,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoIterator for ErrorCollection {
    type Item = ErrorObject;
    type IntoIter = std::vec::IntoIter<ErrorObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// RFC 6901 escaping for a single pointer segment.
fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn attribute_error_points_at_attribute() {
        let mut errors = ErrorCollection::new();
        errors.add_data_attribute_error("title", "Invalid element.");
        let e = errors.iter().next().unwrap();
        assert_eq!(e.status, "422");
        assert_eq!(e.source.as_ref().unwrap().pointer.as_deref(), Some("/data/attributes/title"));
    }

    #[test]
    fn pointer_segments_are_escaped() {
        let mut errors = ErrorCollection::new();
        errors.add_relationship_type_error("a/b~c", "x");
        let pointer = errors.iter().next().unwrap().source.clone().unwrap().pointer.unwrap();
        assert_eq!(pointer, "/data/relationships/a~1b~0c/data/type");
    }

    #[test]
    fn status_is_common_status_or_bad_request() {
        let mut errors = ErrorCollection::new();
        assert_eq!(errors.status(), StatusCode::BAD_REQUEST);
        errors.add_data_attribute_error("a", "x");
        errors.add_relationship_error("b", "x");
        assert_eq!(errors.status(), StatusCode::UNPROCESSABLE_ENTITY);
        errors.add_data_type_error("x");
        assert_eq!(errors.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn serializes_without_empty_members() {
        let e = ErrorObject::new(StatusCode::NOT_FOUND, "Resource not found.").with_parameter("id");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"status": "404", "title": "Resource not found.", "source": {"parameter": "id"}})
        );
    }
}

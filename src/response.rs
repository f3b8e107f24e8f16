use crate::error::AppError;
use serde::Serialize;

/// Uniform reply: exactly one of `data` and `error` is set
#[derive(Debug, Serialize, PartialEq)]
pub struct Response<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failure(error: &AppError) -> Self {
        Self {
            data: None,
            message: Some(error.user_message()),
            error: Some(error.to_string()),
        }
    }

    pub fn from_result(result: Result<T, AppError>, message: impl Into<String>) -> Self {
        match result {
            Ok(data) => Self::success(data, message),
            Err(e) => Self::failure(&e),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!("{{\"error\":\"Could not encode response: {}\"}}", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let response = Response::success(vec![1, 2], "Loaded");
        let value: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(value, json!({"data": [1, 2], "message": "Loaded"}));
        assert!(!response.is_error());
    }

    #[test]
    fn test_failure_envelope() {
        let response: Response<()> = Response::failure(&AppError::NotFound("Painting".into()));
        let value: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(
            value,
            json!({"message": "Painting was not found.", "error": "Not found: Painting"})
        );
        assert!(response.is_error());
    }
}

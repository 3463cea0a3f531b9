use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub mod config;
pub mod log;

/// 统一的 JSON 响应信封
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebResult {
    pub success: bool,
    #[serde(rename = "errorCode")]
    pub code: u32,
    #[serde(rename = "errorMsg")]
    pub msg: String,
    pub data: Value,
}

impl WebResult {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            success: true,
            code: 200,
            msg: "".to_string(),
            data: json!(data),
        }
    }

    pub fn ok_with_msg(data: impl Serialize, msg: impl ToString) -> Self {
        Self {
            msg: msg.to_string(),
            ..Self::ok(data)
        }
    }

    pub fn err_with_code(code: u32, msg: impl ToString) -> Self {
        Self {
            success: false,
            code,
            msg: msg.to_string(),
            data: Default::default(),
        }
    }

    pub fn into_json(self) -> Json<WebResult> {
        Json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_field_names() {
        let value = serde_json::to_value(WebResult::ok(vec!["build.id"])).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["errorCode"], 200);
        assert_eq!(value["errorMsg"], "");
        assert_eq!(value["data"][0], "build.id");
    }

    #[test]
    fn test_error_envelope() {
        let result = WebResult::err_with_code(503, "down");
        assert!(!result.success);
        assert_eq!(result.code, 503);
        assert!(result.data.is_null());
    }
}

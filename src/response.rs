use axum::Json;
use serde::Serialize;

/// Success envelope shared by every endpoint: `{success, message, data?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn ok<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: Some(data),
    })
}

pub fn message_only(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_includes_data() {
        let Json(body) = ok("Family created successfully.", serde_json::json!({"id": 1}));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Family created successfully.");
        assert_eq!(json["data"]["id"], 1);
    }

    #[test]
    fn message_only_omits_data() {
        let Json(body) = message_only("Logged out successfully.");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["success"], true);
    }
}

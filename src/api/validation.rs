use actix_web::HttpResponse;
use serde::Serialize;

/// Body of every error reply
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub msg: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            error: error.into(),
            fields: None,
        }
    }

    fn with_fields(mut self, fields: serde_json::Map<String, serde_json::Value>) -> Self {
        self.fields = Some(serde_json::Value::Object(fields));
        self
    }
}

fn bad_request(response: ErrorResponse) -> actix_web::Error {
    actix_web::error::InternalError::from_response("", HttpResponse::BadRequest().json(response)).into()
}

/// JsonConfig with standardized error replies for every JSON body in the service
///
/// Missing or empty required fields are reported as `MissingRequestParameters`
/// so they are rejected before any network I/O happens.
pub fn json_config(max_payload_size: usize) -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default()
        .limit(max_payload_size)
        .error_handler(|err, _req| {
            let mut fields = serde_json::Map::new();

            match err {
                actix_web_validator::Error::Validate(validation_errors) => {
                    for (field, errors) in validation_errors.field_errors() {
                        let messages: Vec<String> = errors
                            .iter()
                            .map(|e| {
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| format!("Validation error in field: {}", field))
                            })
                            .collect();
                        fields.insert(field.to_string(), serde_json::json!({"errors": messages}));
                    }

                    // Nested segment errors do not show up in field_errors
                    if fields.is_empty() {
                        fields.insert(
                            "message".to_string(),
                            serde_json::json!(validation_errors.to_string()),
                        );
                    }

                    bad_request(
                        ErrorResponse::new("Missing request parameters", "MissingRequestParameters")
                            .with_fields(fields),
                    )
                }
                actix_web_validator::Error::Deserialize(de_err) => {
                    let err_string = de_err.to_string();

                    let (msg, kind) = if err_string.contains("missing field") {
                        ("Missing request parameters", "MissingRequestParameters")
                    } else if err_string.contains("EOF while parsing") {
                        ("Request body is empty. Expected JSON payload", "MissingRequestParameters")
                    } else {
                        ("Invalid JSON format", "InvalidRequest")
                    };
                    fields.insert("message".to_string(), serde_json::json!(err_string));

                    bad_request(ErrorResponse::new(msg, kind).with_fields(fields))
                }
                _ => bad_request(ErrorResponse::new("Invalid request body", "InvalidRequest")),
            }
        })
}

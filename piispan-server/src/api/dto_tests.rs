//! Unit tests for DTOs and OpenAPI schema generation

#[cfg(test)]
mod tests {
    use crate::api::dto::*;
    use piispan::runtime::Span;
    use serde_json::json;
    use utoipa::OpenApi;

    #[test]
    fn test_infer_request_mask_is_optional() {
        let request: InferRequest = serde_json::from_value(json!({"text": "hi"})).unwrap();
        assert_eq!(request.text, "hi");
        assert_eq!(request.mask, None);

        let request: InferRequest =
            serde_json::from_value(json!({"text": "hi", "mask": null})).unwrap();
        assert_eq!(request.mask, None);

        let request: BatchInferRequest =
            serde_json::from_value(json!({"texts": ["a", "b"], "mask": true})).unwrap();
        assert_eq!(request.texts, vec!["a", "b"]);
        assert_eq!(request.mask, Some(true));

        let request: BatchInferRequest =
            serde_json::from_value(json!({"texts": [], "mask": null})).unwrap();
        assert_eq!(request.mask, None);
    }

    #[test]
    fn test_request_shape_errors() {
        assert!(serde_json::from_value::<InferRequest>(json!({})).is_err());
        assert!(serde_json::from_value::<InferRequest>(json!({"text": 5})).is_err());
        assert!(serde_json::from_value::<BatchInferRequest>(json!({"texts": "a"})).is_err());
        assert!(
            serde_json::from_value::<InferRequest>(json!({"text": "x", "mask": "yes"})).is_err()
        );
    }

    #[test]
    fn test_span_conversion() {
        let span = Span {
            start: 3,
            end: 20,
            label: "EMAIL".to_string(),
            text: "alice@example.com".to_string(),
            score: Some(0.97),
        };

        let dto = SpanDto::from(span);
        assert_eq!(dto.start, 3);
        assert_eq!(dto.end, 20);
        assert_eq!(dto.label, "EMAIL");
        assert_eq!(dto.text, "alice@example.com");
        assert_eq!(dto.score, Some(0.97));
    }

    #[test]
    fn test_masked_serializes_as_null() {
        let response = InferResponse {
            text: "x".to_string(),
            spans: vec![],
            masked: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"text": "x", "spans": [], "masked": null}));
    }

    #[test]
    fn test_batch_item_error_omitted_on_success() {
        let ok = BatchItem {
            text: "a".to_string(),
            spans: vec![],
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"text": "a", "spans": []})
        );

        let failed = BatchItem {
            error: Some("boom".to_string()),
            ..ok
        };
        assert_eq!(serde_json::to_value(&failed).unwrap()["error"], "boom");
    }

    #[test]
    fn test_openapi_schema_generation() {
        use crate::api::ApiDoc;

        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "PII Model API");

        let paths = &openapi.paths.paths;
        for path in ["/", "/health", "/labels", "/infer", "/infer/batch"] {
            assert!(paths.contains_key(path), "{} should be documented", path);
        }

        let schemas = &openapi.components.as_ref().unwrap().schemas;
        for schema in [
            "InferRequest",
            "BatchInferRequest",
            "InferResponse",
            "BatchInferResponse",
            "SpanDto",
            "HealthResponse",
            "ErrorResponse",
        ] {
            assert!(schemas.contains_key(schema), "{} schema should exist", schema);
        }
    }
}

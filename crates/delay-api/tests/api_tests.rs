//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use delay_api::api::{create_router, initialize_service, AppState};
use delay_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    BundleFile, CsvAirportFile, PredictionService,
};
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const AIRPORTS_CSV: &str = "\
AirportID,AirportName,AirportCode,CityName,State,ModelAirportID
10397,Hartsfield-Jackson Atlanta Intl,ATL,Atlanta,GA,1
12892,Los Angeles International,LAX,Los Angeles,CA,2
11298,Dallas/Fort Worth International,DFW,Dallas/Fort Worth,TX,3.0
14747,Seattle/Tacoma International,SEA,Seattle,WA,
";

const MODEL_BUNDLE: &str = r#"{
    "model_type": "LogisticRegression",
    "accuracy": 0.78,
    "model_version": "1.0",
    "export_date": "2024-05-01",
    "training_samples": 271940,
    "features": ["DayOfWeek", "OriginAirport_Model"],
    "model_object": {"format": "logistic", "intercept": -1.4, "coefficients": [0.02, 0.001]}
}"#;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    // Keeps the fixture files alive
    _dir: TempDir,
}

impl TestApp {
    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn headers_for_origin(&self, uri: &str, origin: &str) -> HeaderMap {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response.headers().clone()
    }

    async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn predict(&self, body: Value) -> (StatusCode, Value) {
        self.post_raw("/predict", &body.to_string()).await
    }
}

struct Options {
    model: Option<&'static str>,
    initialize: bool,
    lazy_init: bool,
    cors_origins: Option<Vec<String>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            model: Some(MODEL_BUNDLE),
            initialize: true,
            lazy_init: true,
            cors_origins: None,
        }
    }
}

async fn setup(options: Options) -> TestApp {
    let dir = TempDir::new().unwrap();
    let airports_path = dir.path().join("airports.csv");
    let model_path = dir.path().join("model.json");
    fs::write(&airports_path, AIRPORTS_CSV).unwrap();
    if let Some(model) = options.model {
        fs::write(&model_path, model).unwrap();
    }

    let health_registry = HealthRegistry::new();
    health_registry.register(components::AIRPORT_DIRECTORY).await;
    health_registry.register(components::DELAY_PREDICTOR).await;

    let service = Arc::new(PredictionService::new(
        CsvAirportFile::new(airports_path),
        BundleFile::new(model_path),
    ));
    let state = Arc::new(
        AppState::new(
            service,
            health_registry,
            ServiceMetrics::new().unwrap(),
            StructuredLogger::new("test"),
        )
        .with_lazy_init(options.lazy_init),
    );

    if options.initialize {
        initialize_service(&state).await;
    }

    TestApp {
        router: create_router(state.clone(), options.cors_origins),
        state,
        _dir: dir,
    }
}

async fn ready_app() -> TestApp {
    setup(Options::default()).await
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let app = ready_app().await;
    let (status, body) = app.get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Flight Delay Prediction API");
    assert!(!body["version"].as_str().unwrap().is_empty());
    assert!(body["endpoints"]
        .as_array()
        .unwrap()
        .contains(&json!("POST /predict")));
}

#[tokio::test]
async fn test_health_is_healthy_after_initialization() {
    let app = ready_app().await;
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["airport_directory"]["status"], "healthy");
    assert_eq!(body["components"]["delay_predictor"]["status"], "healthy");

    let (status, body) = app.get("/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_health_is_degraded_before_initialization() {
    let app = setup(Options {
        initialize: false,
        lazy_init: false,
        ..Options::default()
    })
    .await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");

    let (status, body) = app.get("/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
}

#[tokio::test]
async fn test_list_airports_sorted_by_name() {
    let app = ready_app().await;
    let (status, body) = app.get("/airports").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);

    let names: Vec<&str> = body["airports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "Dallas/Fort Worth International",
            "Hartsfield-Jackson Atlanta Intl",
            "Los Angeles International",
            "Seattle/Tacoma International",
        ]
    );
    assert!(body["airports"][0].get("model_id").is_none());
}

#[tokio::test]
async fn test_get_airport_by_id() {
    let app = ready_app().await;
    let (status, body) = app.get("/airports/10397").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "id": 10397,
            "name": "Hartsfield-Jackson Atlanta Intl",
            "code": "ATL",
            "city": "Atlanta",
            "state": "GA"
        })
    );
}

#[tokio::test]
async fn test_get_unknown_airport_is_404() {
    let app = ready_app().await;
    let (status, body) = app.get("/airports/99999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "Airport with ID 99999 not found");
}

#[tokio::test]
async fn test_get_airport_with_non_integer_id_is_400() {
    let app = ready_app().await;
    let (status, body) = app.get("/airports/invalid").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_predict_success() {
    let app = ready_app().await;
    let (status, body) = app.predict(json!({"dayOfWeek": 1, "airportId": 10397})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["input"]["dayOfWeek"], 1);
    assert_eq!(body["input"]["airportId"], 10397);
    assert_eq!(body["input"]["airport"]["name"], "Hartsfield-Jackson Atlanta Intl");
    assert_eq!(body["input"]["airport"]["code"], "ATL");

    let delay = body["prediction"]["delayProbability"].as_f64().unwrap();
    let no_delay = body["prediction"]["noDelayProbability"].as_f64().unwrap();
    assert!((delay + no_delay - 1.0).abs() < 1e-3);
    assert_eq!(body["prediction"]["isDelayed"], delay > 0.5);
    assert_eq!(body["confidence"].as_f64().unwrap(), delay.max(no_delay));

    assert_eq!(body["modelInfo"]["modelType"], "LogisticRegression");
    assert_eq!(body["modelInfo"]["accuracy"], 0.78);
    assert_eq!(body["modelInfo"]["version"], "1.0");
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let app = ready_app().await;
    let request = json!({"dayOfWeek": 5, "airportId": 11298});

    let (_, first) = app.predict(request.clone()).await;
    let (_, second) = app.predict(request).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_predict_invalid_day_is_422() {
    let app = ready_app().await;

    for day in [0, 8, -1] {
        let (status, body) = app.predict(json!({"dayOfWeek": day, "airportId": 10397})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "day {}", day);
        assert_eq!(body["status"], "error");
        assert_eq!(
            body["error"],
            "dayOfWeek must be an integer between 1 and 7 (1=Monday, 7=Sunday)"
        );
        assert_eq!(body["input"], json!({"dayOfWeek": day, "airportId": 10397}));
    }
}

#[tokio::test]
async fn test_predict_non_integer_inputs_are_422() {
    let app = ready_app().await;

    let (status, body) = app
        .predict(json!({"dayOfWeek": 1, "airportId": "invalid"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "airportId must be an integer");

    let (status, body) = app.predict(json!({"dayOfWeek": "Monday", "airportId": 10397})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["input"]["dayOfWeek"], "Monday");

    let (status, _) = app.predict(json!({"airportId": 10397})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_predict_malformed_json_is_422_without_input() {
    let app = ready_app().await;
    let (status, body) = app.post_raw("/predict", "{ not json").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
    assert_eq!(body["input"], Value::Null);
    assert!(body.as_object().unwrap().contains_key("input"));
}

#[tokio::test]
async fn test_predict_unknown_airport_is_404() {
    let app = ready_app().await;
    let (status, body) = app.predict(json!({"dayOfWeek": 1, "airportId": 99999})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Airport with ID 99999 not found in dataset");
}

#[tokio::test]
async fn test_predict_unmapped_airport_is_404() {
    let app = ready_app().await;
    let (status, body) = app.predict(json!({"dayOfWeek": 3, "airportId": 14747})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No model mapping found for airport ID 14747");
}

#[tokio::test]
async fn test_predict_without_model_is_500() {
    let app = setup(Options {
        model: None,
        ..Options::default()
    })
    .await;

    let (status, body) = app.predict(json!({"dayOfWeek": 1, "airportId": 10397})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal prediction error");

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["components"]["delay_predictor"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_invalid_day_is_rejected_before_initialization() {
    let app = setup(Options {
        initialize: false,
        lazy_init: false,
        ..Options::default()
    })
    .await;

    let (status, _) = app.predict(json!({"dayOfWeek": 8, "airportId": 10397})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.predict(json!({"dayOfWeek": 1, "airportId": 10397})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_lazy_initialization_on_first_request() {
    let app = setup(Options {
        initialize: false,
        ..Options::default()
    })
    .await;
    assert!(!app.state.service.is_ready());

    let (status, body) = app.predict(json!({"dayOfWeek": 2, "airportId": 12892})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["input"]["airport"]["code"], "LAX");
    assert!(app.state.service.is_ready());

    let (status, _) = app.get("/readyz").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_airports_fail_without_lazy_initialization() {
    let app = setup(Options {
        initialize: false,
        lazy_init: false,
        ..Options::default()
    })
    .await;

    let (status, body) = app.get("/airports").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to load airport data");
}

#[tokio::test]
async fn test_predict_status() {
    let app = ready_app().await;
    let (status, body) = app.get("/predict/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["initialized"], true);
    assert_eq!(body["state"], "ready");
    assert_eq!(body["model"]["status"], "loaded");
    assert_eq!(body["model"]["metadata"]["trainingSamples"], 271940);
    assert_eq!(
        body["model"]["inputFeatures"],
        json!(["DayOfWeek", "OriginAirport_Model"])
    );
    assert_eq!(
        body["model"]["supportedValues"]["dayOfWeek"],
        "1-7 (1=Monday, 7=Sunday)"
    );
    assert_eq!(body["airports"]["status"], "loaded");
    assert_eq!(body["airports"]["totalAirports"], 4);
    assert_eq!(body["airports"]["mappedAirports"], 3);
    assert_eq!(body["airports"]["sampleAirports"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_predict_status_reports_failure() {
    let app = setup(Options {
        model: Some("{ not json"),
        ..Options::default()
    })
    .await;

    let (status, body) = app.get("/predict/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["initialized"], false);
    assert_eq!(body["state"], "failed");
    assert_eq!(body["model"]["status"], "Model not loaded");
    assert_eq!(body["airports"]["status"], "loaded");
    assert!(body["failure"].as_str().unwrap().contains("model"));
    assert!(body["model_failure"].as_str().unwrap().contains("invalid model bundle"));
    assert!(body.get("airports_failure").is_none());
}

#[tokio::test]
async fn test_airports_served_without_model() {
    let app = setup(Options {
        model: None,
        ..Options::default()
    })
    .await;
    assert!(!app.state.service.is_ready());

    let (status, body) = app.get("/airports").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);

    let (status, body) = app.get("/airports/10397").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "ATL");

    let (status, _) = app.get("/airports/99999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_failures_per_component() {
    let app = setup(Options {
        model: None,
        ..Options::default()
    })
    .await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["components"]["airport_directory"]["status"], "healthy");
    assert!(body["components"]["airport_directory"].get("message").is_none());
    assert_eq!(body["components"]["delay_predictor"]["status"], "unhealthy");
    assert!(body["components"]["delay_predictor"]["message"]
        .as_str()
        .unwrap()
        .contains("failed to read model artifact"));

    let (status, _) = app.get("/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let app = ready_app().await;
    let headers = app.headers_for_origin("/airports", "http://example.com").await;

    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_cors_restricts_to_configured_origins() {
    let app = setup(Options {
        cors_origins: Some(vec!["http://localhost:3000".to_string()]),
        ..Options::default()
    })
    .await;

    let headers = app.headers_for_origin("/", "http://localhost:3000").await;
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );

    let headers = app.headers_for_origin("/", "http://evil.example").await;
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_metrics_count_prediction_outcomes() {
    let app = ready_app().await;
    app.predict(json!({"dayOfWeek": 1, "airportId": 10397})).await;
    app.predict(json!({"dayOfWeek": 1, "airportId": 14747})).await;

    let (status, text) = app.get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains(r#"flight_delay_predictions_total{outcome="success"} 1"#));
    assert!(text.contains(r#"flight_delay_predictions_total{outcome="mapping_error"} 1"#));
    assert!(text.contains("flight_delay_airports_loaded 4"));
    assert!(text.contains(r#"model_type="LogisticRegression""#));
}

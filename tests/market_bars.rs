// tests/market_bars.rs
//
// Price bars → technical snapshot → context, from files and over HTTP.

use std::path::Path;

use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt as _;

use news_batch_router::api::{create_router, AppState};
use news_batch_router::market::IndicatorSettings;
use news_batch_router::{AnalysisRequest, BarStore, NewsRouter, RouterConfig, TechnicalCalculator};

const BARS: &str = "tests/fixtures/bars_5min.csv";

fn config() -> RouterConfig {
    RouterConfig {
        fixture_path: "tests/fixtures/decoy_news.json".into(),
        aliases_path: Some("config/aliases.toml".into()),
        bars_path: Some(BARS.into()),
        min_bars_per_ticker: 10,
        ..RouterConfig::default()
    }
}

#[test]
fn fixture_bars_drop_gaps_and_thin_tickers() {
    let store = BarStore::load(Path::new(BARS), 10).unwrap();
    assert_eq!(store.len(), 1);
    let bars = store.bars_for("ACME").unwrap();
    // 40 rows: the first and the one after the gap go
    assert_eq!(bars.len(), 38);
    assert!(store.bars_for("THIN").is_none());

    let calc = TechnicalCalculator::new(IndicatorSettings::default()).unwrap();
    let s = calc.summarize("ACME", bars).unwrap();
    assert_eq!(s.last_close, 119.5);
    assert!(s.sma.is_some());
    assert!(s.macd.macd > 0.0);
}

#[test]
fn shipped_config_loads_bars() {
    let cfg = RouterConfig::load_from_file("config/router.toml").unwrap();
    let router = NewsRouter::from_config(cfg).unwrap();
    assert!(router.technicals_for("GLBX").is_some());
    assert!(router.technicals_for("WEC").is_none());
}

#[test]
fn router_context_carries_snapshot() {
    let router = NewsRouter::from_config(config()).unwrap();
    let batch = router.ingest_fixture().unwrap();
    let ctx = router
        .route_batch(&batch, AnalysisRequest::new("ACME", "long", "analyze"))
        .unwrap();
    assert_eq!(ctx.news().len(), 1);
    assert_eq!(ctx.technicals().map(|t| t.bars), Some(38));
}

#[test]
fn missing_bar_file_fails_setup() {
    let cfg = RouterConfig {
        bars_path: Some("tests/fixtures/__missing_bars__.csv".into()),
        ..config()
    };
    assert!(NewsRouter::from_config(cfg).is_err());
}

#[tokio::test]
async fn http_context_includes_technicals() {
    let app = create_router(AppState::new(NewsRouter::from_config(config()).unwrap()));
    let req = Request::builder()
        .method("POST")
        .uri("/context")
        .header("content-type", "application/json")
        .body(Body::from(json!({"ticker": "acme", "idea": "long"}).to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["context"]["technicals"]["last_close"], 119.5);
    assert!(v["prompt"]["user"]
        .as_str()
        .unwrap()
        .contains("Technical snapshot (5-minute bars):"));
}

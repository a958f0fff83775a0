use crate::generator::SeededDetectionSource;
use crate::query_bridge::model::{DisplayModel, RecordRequest};
use crate::workflow::runner::Runner;
use anyhow::Context;
use log::{info, warn};
use measurecore::ObjectCategory;
use serde::Deserialize;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

pub fn bridge_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

type SharedSource = Arc<Mutex<SeededDetectionSource>>;

#[derive(Debug, Deserialize)]
struct RecentQuery {
    max_age_ms: Option<u64>,
    limit: Option<usize>,
}

fn display_model(runner: &Runner) -> DisplayModel {
    let cache = runner.cache();
    let config = runner.config();
    DisplayModel {
        statistics: cache.statistics(),
        recent: cache.query_recent(config.recent_window_ms, config.recent_limit),
    }
}

fn error_reply(message: String, status: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&json!({"status": "error", "message": message})),
        status,
    )
}

/// HTTP front over a session's cache for display and query clients.
pub struct QueryBridge {
    runner: Arc<Runner>,
    source: SharedSource,
}

impl QueryBridge {
    pub fn new(runner: Arc<Runner>, source: SeededDetectionSource) -> Self {
        Self {
            runner,
            source: Arc::new(Mutex::new(source)),
        }
    }

    #[cfg(test)]
    pub fn model(&self) -> DisplayModel {
        display_model(&self.runner)
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone + Send + Sync + 'static
    {
        let runner = self.runner.clone();
        let runner_filter = warp::any().map(move || runner.clone());
        let source = self.source.clone();
        let source_filter = warp::any().map(move || source.clone());

        let payload_route = warp::path("payload")
            .and(warp::path::end())
            .and(warp::get())
            .and(runner_filter.clone())
            .map(|runner: Arc<Runner>| warp::reply::json(&display_model(&runner)));

        let recent_route = warp::path("recent")
            .and(warp::path::end())
            .and(warp::get())
            .and(warp::query::<RecentQuery>())
            .and(runner_filter.clone())
            .map(|query: RecentQuery, runner: Arc<Runner>| {
                let config = runner.config();
                let records = runner.cache().query_recent(
                    query.max_age_ms.unwrap_or(config.recent_window_ms),
                    query.limit.unwrap_or(config.recent_limit),
                );
                warp::reply::json(&records)
            });

        let category_route = warp::path!("category" / String)
            .and(warp::get())
            .and(runner_filter.clone())
            .map(
                |name: String, runner: Arc<Runner>| match name.parse::<ObjectCategory>() {
                    Ok(category) => warp::reply::with_status(
                        warp::reply::json(&runner.cache().query_by_category(category)),
                        StatusCode::OK,
                    ),
                    Err(err) => error_reply(err.to_string(), StatusCode::BAD_REQUEST),
                },
            );

        let ingest_route = warp::path("ingest")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(runner_filter.clone())
            .map(|request: RecordRequest, runner: Arc<Runner>| {
                let cache = runner.cache();
                match request.into_record(cache.now_ms()) {
                    Ok(record) => {
                        let outcome = cache.upsert(record);
                        warp::reply::with_status(
                            warp::reply::json(&json!({"status": "ok", "result": outcome})),
                            StatusCode::OK,
                        )
                    }
                    Err(err) => {
                        warn!("ingest rejected: {}", err);
                        error_reply(err.to_string(), StatusCode::BAD_REQUEST)
                    }
                }
            });

        let generate_route = warp::path("generate")
            .and(warp::path::end())
            .and(warp::post())
            .and(runner_filter)
            .and(source_filter)
            .map(|runner: Arc<Runner>, source: SharedSource| {
                let mut guard = source.lock().unwrap_or_else(PoisonError::into_inner);
                match runner.run_frame(&mut *guard) {
                    Ok(tally) => {
                        let expired = runner.cache().evict_stale();
                        warp::reply::with_status(
                            warp::reply::json(
                                &json!({"status": "ok", "tally": tally, "expired": expired}),
                            ),
                            StatusCode::OK,
                        )
                    }
                    Err(err) => {
                        warn!("generate error: {:#}", err);
                        error_reply(format!("{:#}", err), StatusCode::INTERNAL_SERVER_ERROR)
                    }
                }
            });

        payload_route
            .or(recent_route)
            .or(category_route)
            .or(ingest_route)
            .or(generate_route)
    }

    /// Binds `addr`, then serves the routes on a background thread with its
    /// own runtime. Bind failures are returned to the caller.
    pub fn spawn(&self, addr: SocketAddr) -> anyhow::Result<thread::JoinHandle<()>> {
        let routes = self.routes();
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building bridge runtime")?;
        let (bound, server) = runtime
            .block_on(async move { warp::serve(routes).try_bind_ephemeral(addr) })
            .context("binding query bridge")?;
        info!("query bridge listening on {}", bound);
        let handle = thread::Builder::new()
            .name("query-bridge".into())
            .spawn(move || runtime.block_on(server))
            .context("spawning bridge thread")?;
        Ok(handle)
    }

    pub fn publish_status(&self, message: &str) {
        println!("[bridge] {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorConfig;
    use crate::workflow::config::WorkflowConfig;
    use serde_json::Value;

    fn bridge() -> QueryBridge {
        let cfg = WorkflowConfig::from_args(16, 0.5, 60_000, 1, 4);
        let runner = Arc::new(Runner::offline(cfg).unwrap());
        let source = SeededDetectionSource::new(GeneratorConfig {
            seed: 4,
            batch_size: 3,
            min_confidence: 0.6,
            ..Default::default()
        })
        .unwrap();
        QueryBridge::new(runner, source)
    }

    fn body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn ingest_then_query_by_category() {
        let bridge = bridge();
        let routes = bridge.routes();

        let response = warp::test::request()
            .method("POST")
            .path("/ingest")
            .json(&json!({"id": "p-1", "category": "person", "confidence": 0.9, "height_m": 1.8}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response.body())["result"]["outcome"], "inserted");

        let response = warp::test::request()
            .path("/category/person")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let records = body(response.body());
        assert_eq!(records.as_array().unwrap().len(), 1);
        assert_eq!(records[0]["id"], "p-1");
    }

    #[tokio::test]
    async fn ingest_rejects_invalid_record() {
        let bridge = bridge();
        let routes = bridge.routes();
        let response = warp::test::request()
            .method("POST")
            .path("/ingest")
            .json(&json!({"id": "x", "category": "cup", "confidence": 1.5}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(bridge.model().recent.is_empty());
    }

    #[tokio::test]
    async fn ingest_clamps_future_timestamp() {
        let bridge = bridge();
        let routes = bridge.routes();
        let response = warp::test::request()
            .method("POST")
            .path("/ingest")
            .json(&json!({
                "id": "c-1",
                "category": "cup",
                "confidence": 0.8,
                "timestamp_ms": u64::MAX
            }))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let now = bridge.runner.cache().now_ms();
        let stored = bridge.runner.cache().get("c-1").unwrap();
        assert_eq!(stored.last_updated_ms(), now);
    }

    #[test]
    fn spawn_reports_address_in_use() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let err = bridge().spawn(addr).unwrap_err();
        assert!(format!("{:#}", err).contains("binding query bridge"));
    }

    #[tokio::test]
    async fn unknown_category_is_bad_request() {
        let routes = bridge().routes();
        let response = warp::test::request()
            .path("/category/sofa")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_feeds_cache_and_payload_reports_it() {
        let bridge = bridge();
        let routes = bridge.routes();
        let response = warp::test::request()
            .method("POST")
            .path("/generate")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response.body())["tally"]["inserted"].as_u64().unwrap() > 0);

        let response = warp::test::request().path("/payload").reply(&routes).await;
        let payload = body(response.body());
        assert!(payload["statistics"]["total_records"].as_u64().unwrap() > 0);

        let response = warp::test::request()
            .path("/recent?limit=1")
            .reply(&routes)
            .await;
        assert!(body(response.body()).as_array().unwrap().len() <= 1);
    }
}

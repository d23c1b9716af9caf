//! Request statistics.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use futures_util::StreamExt;

use crate::observability::StatsSink;

#[derive(Clone)]
struct StatsState {
    name: Arc<str>,
    sink: Arc<dyn StatsSink>,
}

/// Record request volume, status, size and duration under `handler = name`.
pub fn with_stats(name: &str, sink: Arc<dyn StatsSink>, router: Router) -> Router {
    let state = StatsState {
        name: Arc::from(name),
        sink,
    };
    router.layer(middleware::from_fn_with_state(state, record_stats))
}

async fn record_stats(State(state): State<StatsState>, req: Request, next: Next) -> Response {
    let mut tags = vec![("handler", state.name.to_string())];
    state.sink.counter("requests", 1, &tags);

    let start = Instant::now();
    let res = next.run(req).await;
    let duration = start.elapsed();

    let status = res.status().as_u16();
    tags.push(("code-group", format!("{}xx", status / 100)));
    tags.push(("code", status.to_string()));

    state.sink.counter("responses", 1, &tags);
    let res = match res.body().size_hint().exact() {
        Some(size) => {
            state.sink.histogram("response.size", size as f64, &tags);
            res
        }
        None => count_body(
            res,
            ResponseSize {
                sink: state.sink.clone(),
                tags: tags.clone(),
                bytes: 0,
            },
        ),
    };
    state.sink.timing("response.duration", duration, &tags);

    res
}

/// Stream the body through, counting the bytes actually sent.
fn count_body(res: Response, mut size: ResponseSize) -> Response {
    res.map(|body| {
        Body::from_stream(body.into_data_stream().map(move |chunk| {
            if let Ok(bytes) = &chunk {
                size.bytes += bytes.len() as u64;
            }
            chunk
        }))
    })
}

/// Records `response.size` once a streamed body is finished or dropped.
struct ResponseSize {
    sink: Arc<dyn StatsSink>,
    tags: Vec<(&'static str, String)>,
    bytes: u64,
}

impl Drop for ResponseSize {
    fn drop(&mut self) {
        self.sink.histogram("response.size", self.bytes as f64, &self.tags);
    }
}

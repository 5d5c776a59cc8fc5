use axum::http::StatusCode;
use prometheus::{Encoder, TextEncoder};

pub async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Encode error: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Encode error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RATE_LIMITED;

    #[tokio::test]
    async fn test_metrics_text_contains_registered_counters() {
        RATE_LIMITED.inc_by(0.0);
        let body = metrics_handler().await.unwrap();
        assert!(body.contains("decorators_rate_limited_total"));
    }
}

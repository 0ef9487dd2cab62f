use std::future::Future;
use std::time::Instant;

use tracing::Instrument;

use crate::error::Result;

/// Wraps one public service method with the span + metrics + log triple.
///
/// Every call records `<service>_requests_total` and
/// `<service>_request_duration_seconds`, both labelled `{method, status}`,
/// and runs inside a span carrying the method name and the caller-supplied
/// argument summary. Errors log at ERROR with their correlation id; the id
/// is also recorded on the span so traces and logs can be joined.
pub async fn observed<T, F>(
    service: &'static str,
    method: &'static str,
    args: String,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let span = tracing::info_span!(
        "service_method",
        service,
        method,
        args = %args,
        otel.status_code = tracing::field::Empty,
        correlation_id = tracing::field::Empty,
    );
    let start = Instant::now();
    let result = fut.instrument(span.clone()).await;
    let elapsed = start.elapsed().as_secs_f64();
    let status = if result.is_ok() { "success" } else { "error" };

    metrics::counter!(
        format!("{service}_requests_total"),
        "method" => method,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        format!("{service}_request_duration_seconds"),
        "method" => method,
        "status" => status
    )
    .record(elapsed);

    match &result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
            tracing::debug!(service, method, elapsed_secs = elapsed, "completed");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("correlation_id", err.correlation_id.as_str());
            tracing::error!(
                service,
                method,
                elapsed_secs = elapsed,
                correlation_id = %err.correlation_id,
                error = %err,
                "method failed"
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[tokio::test]
    async fn test_observed_passes_values_through() {
        let out: Result<u32> = observed("svc", "op", String::new(), async { Ok(41 + 1) }).await;
        assert_eq!(out.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_observed_preserves_errors() {
        let out: Result<u32> = observed("svc", "op", String::new(), async {
            Err(ServiceError::invalid_field("bad"))
        })
        .await;
        assert_eq!(out.unwrap_err().reason(), "InvalidField");
    }
}

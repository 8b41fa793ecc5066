//! Body helpers for the pipeline.
//!
//! Bodies are pull-based streams: a body nobody polls is paused, and it is
//! read only as fast as the consumer it is handed to. Only `request-only`
//! steps need the bytes twice and buffer them, bounded by a limit.

use axum::body::Body;
use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::{BodyExt, Limited};

use crate::error::{GatewayError, GatewayResult};

/// Read and discard the rest of a body.
///
/// Used when a request ends without any module consuming the client body,
/// so the connection is not left half-read.
pub async fn drain(body: Body) {
    let mut stream = body.into_data_stream();
    let mut drained = 0usize;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => drained += bytes.len(),
            Err(e) => {
                tracing::debug!(error = %e, "Body stream ended with error while draining");
                break;
            }
        }
    }
    tracing::trace!(bytes = drained, "Body drained");
}

/// Collect a body into memory, failing once it exceeds `limit` bytes.
pub async fn buffer(body: Body, limit: usize) -> GatewayResult<Bytes> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<http_body_util::LengthLimitError>() => Err(GatewayError::BodyTooLarge(limit)),
        Err(e) => Err(GatewayError::Body(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffer_within_limit() {
        let bytes = buffer(Body::from("hello"), 16).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_buffer_over_limit() {
        let err = buffer(Body::from("hello world"), 4).await.unwrap_err();
        assert!(matches!(err, GatewayError::BodyTooLarge(4)));
    }

    #[tokio::test]
    async fn test_drain_consumes_stream() {
        let chunks = futures_util::stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
        ]);
        drain(Body::from_stream(chunks)).await;
    }
}

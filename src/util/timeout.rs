//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::link::LinkError;

/// Wrap a future with an optional deadline. `None` waits indefinitely.
pub async fn with_timeout<T>(
    duration: Option<Duration>,
    future: impl Future<Output = Result<T, LinkError>>,
) -> Result<T, LinkError> {
    let Some(duration) = duration else {
        return future.await;
    };
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(LinkError::Timeout(duration.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_a_timeout_error() {
        let result: Result<(), LinkError> = with_timeout(
            Some(Duration::from_millis(50)),
            std::future::pending(),
        )
        .await;
        assert!(matches!(result, Err(LinkError::Timeout(50))));
    }

    #[tokio::test]
    async fn no_deadline_passes_result_through() {
        let result = with_timeout(None, async { Ok::<_, LinkError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}

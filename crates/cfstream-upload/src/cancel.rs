use cfstream_core::{ApiError, ApiResult};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race `fut` against `token`; a fired token fails the call with [`ApiError::Cancelled`].
pub(crate) async fn cancellable<T, F>(token: Option<&CancellationToken>, fut: F) -> ApiResult<T>
where
    F: Future<Output = ApiResult<T>>,
{
    match token {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(ApiError::Cancelled),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}

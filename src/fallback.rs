//! Ordered fallback across alternate endpoint shapes
//!
//! Server versions expose the same capability under different paths
//! (`/api/v1/notes` vs `/api/v1/notes/list`). [`first_success`] runs a list of
//! equivalent candidates in order and returns the first one that succeeds.
//!
//! # Examples
//!
//! ```rust,no_run
//! use conduit::fallback::first_success;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let value = first_success(["/a", "/b"].map(|path| move || async move {
//!     // Try the request at `path` here
//!     Ok::<_, conduit::Error>(path.len())
//! }))
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use futures::future::BoxFuture;
use std::future::Future;

/// A boxed, lazily started candidate for use with [`first_success`] when the
/// candidates are built from different closures.
pub type Candidate<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Result<T>> + Send + 'a>;

/// Run `candidates` strictly in order and return the first success.
///
/// Candidates after a success are never started. If every candidate fails, the
/// error of the last one is returned and the earlier ones are only logged. An
/// empty list fails with [`Error::InvalidResponse`].
pub async fn first_success<I, F, Fut, T>(candidates: I) -> Result<T>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for (attempt, candidate) in candidates.into_iter().enumerate() {
        match candidate().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                log::debug!("fallback candidate {} failed: {}", attempt, err);
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or(Error::InvalidResponse))
}

//! Command execution helpers

use std::future::Future;
use std::time::Instant;

use whenis_domain::Result;

use crate::utils::logging::{error_label, log_command_execution};

/// Time `command_fn`, log the outcome and pass the result through.
///
/// ```rust,ignore
/// pub async fn my_command(ctx: &AppContext) -> Result<MyView> {
///     execute_logged("calendar::my_command", || async {
///         ctx.service.do_something(&ctx.request_context()).await
///     })
///     .await
/// }
/// ```
pub async fn execute_logged<F, Fut, T>(command_name: &str, command_fn: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = command_fn().await;
    let error_type = result.as_ref().err().map(error_label);

    log_command_execution(command_name, start.elapsed(), error_type);

    result
}

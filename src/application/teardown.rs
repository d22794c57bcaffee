use crate::error::CommandError;
use crate::infrastructure::log_messages::container as messages;
use crate::infrastructure::{ContainerHandle, ContainerRuntime};
use tracing::{info, instrument};

/// Stops then removes the container; no retries
#[instrument(skip_all, fields(container = %handle))]
pub async fn teardown(
    runtime: &ContainerRuntime,
    handle: &ContainerHandle,
) -> Result<(), CommandError> {
    info!("{}", messages::STOPPING_SERVER);
    runtime.stop(handle).await?;
    runtime.remove(handle).await?;
    info!("{}", messages::STOPPED_SERVER);
    Ok(())
}

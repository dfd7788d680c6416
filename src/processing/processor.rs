//! The reconnecting loop shared by event handlers and filters.

use backon::{BackoffBuilder, ExponentialBuilder};
use tracing::{info, warn};

use crate::reverse_call::{
    CancellationSignal, ReverseCallClient, ReverseCallDispatcher, ReverseCallError,
    ReverseCallProtocol,
};

use super::ProcessorError;

/// Connect, register and serve requests until `cancel` fires.
///
/// Every failure to register, stream error or keep-alive timeout is followed
/// by a backoff delay and a fresh connection. The backoff starts over once a
/// registration succeeds.
pub async fn run<P: ReverseCallProtocol>(
    client: &ReverseCallClient<P>,
    registration: &P::Registration,
    dispatcher: &dyn ReverseCallDispatcher<P>,
    backoff: ExponentialBuilder,
    cancel: &CancellationSignal,
) -> Result<(), ProcessorError> {
    let mut delays = backoff.build();
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            info!(processor = P::NAME, "Processor cancelled");
            return Ok(());
        }
        attempt += 1;

        let error = match client.connect(registration, cancel).await {
            Ok(connection) => {
                info!(processor = P::NAME, attempt, "Registered with runtime");
                delays = backoff.build();
                attempt = 0;
                match connection.handle(dispatcher, cancel).await {
                    Ok(()) => {
                        info!(processor = P::NAME, "Processor cancelled");
                        return Ok(());
                    }
                    Err(error) => error,
                }
            }
            Err(error) => error,
        };

        if matches!(error, ReverseCallError::Cancelled) {
            info!(processor = P::NAME, "Processor cancelled");
            return Ok(());
        }

        let Some(delay) = delays.next() else {
            return Err(ProcessorError::ReconnectExhausted(error));
        };
        warn!(
            processor = P::NAME,
            attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "Connection to runtime lost, reconnecting"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(processor = P::NAME, "Processor cancelled");
                return Ok(());
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

//! gRPC channel to the runtime over TCP or a Unix domain socket.

use std::path::PathBuf;

use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;
use tracing::info;

use super::{ClientError, Result};

/// Check if an address is a UDS path.
pub fn is_uds_address(address: &str) -> bool {
    address.starts_with('/') || address.starts_with("./")
}

/// Create a channel to `address` without connecting yet.
///
/// Paths starting with `/` or `./` are Unix domain sockets; anything else
/// is a TCP address, with or without an `http(s)://` scheme. The channel
/// connects on first use and reconnects on its own after failures. Must be
/// called from within a Tokio runtime.
pub fn create_channel(address: &str) -> Result<Channel> {
    if is_uds_address(address) {
        let socket_path = PathBuf::from(address);
        info!(
            path = %socket_path.display(),
            transport = "uds",
            "Creating runtime channel"
        );

        // The URI is required by the endpoint but ignored by the connector.
        let channel = Endpoint::try_from("http://[::]:50053")?.connect_with_connector_lazy(
            service_fn(move |_: Uri| {
                let path = socket_path.clone();
                async move {
                    let stream = UnixStream::connect(path).await?;
                    Ok::<_, std::io::Error>(TokioIo::new(stream))
                }
            }),
        );
        Ok(channel)
    } else {
        let uri = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        info!(
            address = %address,
            transport = "tcp",
            "Creating runtime channel"
        );

        let endpoint = Channel::from_shared(uri).map_err(|source| ClientError::InvalidEndpoint {
            endpoint: address.to_string(),
            source,
        })?;
        Ok(endpoint.connect_lazy())
    }
}

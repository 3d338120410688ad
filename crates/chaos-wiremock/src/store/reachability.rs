use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Check whether a TCP connection to `host:port` can be opened within `limit`.
pub async fn can_connect(host: &str, port: u16, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("Cannot connect to {}:{}: {}", host, port, e);
            false
        }
        Err(_) => {
            debug!("Connecting to {}:{} timed out after {:?}", host, port, limit);
            false
        }
    }
}

/// Errors that can occur in the transport layer.
///
/// Every variant except [`ConnectFailed`](Self::ConnectFailed),
/// [`ConnectTimeout`](Self::ConnectTimeout) and
/// [`LineTooLong`](Self::LineTooLong) leaves the connection closed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the TCP connection failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server did not accept the connection in time.
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    /// The peer closed the connection.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A received line exceeded [`MAX_LINE_LENGTH`](crate::MAX_LINE_LENGTH)
    /// bytes and was discarded. The connection stays usable.
    #[error("discarded a {0}-byte line over the length limit")]
    LineTooLong(usize),

    /// The connection was already closed when the operation started.
    #[error("connection is not open")]
    NotOpen,
}

use std::io;
use std::path::Path;

use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;

use crate::protocol::{ProtocolError, SocketMessage, MAX_FRAME_LEN};

/// Connect to the daemon socket.
pub async fn connect(socket_path: &Path) -> io::Result<UnixStream> {
    UnixStream::connect(socket_path).await.map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("rosterd is not running ({})", socket_path.display()),
        )
    })
}

/// Read one length-prefixed frame and decode it.
/// Returns `Ok(None)` on a clean end of stream at a frame boundary.
pub async fn read_message(stream: &mut UnixStream) -> io::Result<Option<SocketMessage>> {
    let mut length = [0u8; 4];
    match stream.read_exact(&mut length).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let length = u32::from_be_bytes(length);
    if length > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            ProtocolError::Oversized(length),
        ));
    }

    let mut payload = vec![0u8; length as usize];
    stream.read_exact(&mut payload).await?;

    let message = SocketMessage::decode(&payload)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(message))
}

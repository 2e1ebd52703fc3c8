/*
 *  display/transport.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Serial port transport, fixed 8N1 framing
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::config::SerialConfig;
use crate::display::traits::Transport;

/// Serial connection to the display
pub struct SerialTransport {
    path: String,
    port: SerialStream,
    write_timeout: Duration,
}

impl SerialTransport {
    /// Open `path` at the configured baud rate, 8 data bits, 1 stop bit,
    /// no parity and no flow control.
    pub fn open(path: &str, config: &SerialConfig) -> io::Result<Self> {
        info!("Opening serial port {} at {} baud", path, config.baud_rate);

        let port = tokio_serial::new(path, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(io::Error::from)?;

        Ok(Self {
            path: path.to_string(),
            port,
            write_timeout: config.write_timeout(),
        })
    }
}

/// `write_all` + `flush` on `port`, bounded by `limit`.
///
/// Expiry surfaces as `io::ErrorKind::TimedOut`; bytes may have partly left.
pub(crate) async fn write_within<W>(port: &mut W, bytes: &[u8], limit: Duration, name: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let result = tokio::time::timeout(limit, async {
        port.write_all(bytes).await?;
        port.flush().await
    })
    .await;

    match result {
        Ok(done) => done,
        Err(_) => {
            debug!("write of {} bytes to {} timed out", bytes.len(), name);
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("write to {} timed out after {:?}", name, limit),
            ))
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_within(&mut self.port, bytes, self.write_timeout, &self.path).await
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_write_within_delivers() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        write_within(&mut tx, &[1, 2, 3, 4, 5, 0x66], Duration::from_millis(500), "duplex")
            .await
            .unwrap();

        let mut buf = [0u8; 6];
        rx.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 0x66]);
    }

    #[tokio::test]
    async fn test_stalled_port_times_out() {
        // reader held but never drained, so the pipe fills after 4 bytes
        let (mut tx, _rx) = tokio::io::duplex(4);
        let err = write_within(&mut tx, &[0u8; 64], Duration::from_millis(50), "duplex")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(err.to_string().contains("duplex"));
    }
}

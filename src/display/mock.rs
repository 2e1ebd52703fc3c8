/*
 *  display/mock.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Recording transport for testing and emulated runs without hardware
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
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::display::traits::Transport;

/// Mock transport for testing
///
/// Records every buffer handed to it, one entry per `write` call, so write
/// boundaries and ordering can be checked. Useful for:
/// - Unit and integration tests
/// - `--emulated` runs without a display attached
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

/// Internal state for the mock transport (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockTransportState {
    /// Successful writes, in order
    pub writes: Vec<Vec<u8>>,

    /// Every write call, including failed ones
    pub attempts: usize,

    /// Fail every write once this many have succeeded
    pub fail_after: Option<usize>,

    /// Yield to the scheduler inside each write
    pub yield_on_write: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that accepts `n` writes and fails all after
    pub fn failing_after(n: usize) -> Self {
        let mock = Self::new();
        mock.state.lock().fail_after = Some(n);
        mock
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockTransportState>> {
        Arc::clone(&self.state)
    }

    /// Snapshot of recorded writes
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// Total bytes accepted
    pub fn bytes_written(&self) -> usize {
        self.state.lock().writes.iter().map(Vec::len).sum()
    }

    /// Forget recorded writes (useful between tests)
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.writes.clear();
        state.attempts = 0;
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let yield_on_write = self.state.lock().yield_on_write;
        if yield_on_write {
            tokio::task::yield_now().await;
        }

        let mut state = self.state.lock();
        state.attempts += 1;
        if state.fail_after.is_some_and(|n| state.writes.len() >= n) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Simulated write failure"));
        }
        state.writes.push(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

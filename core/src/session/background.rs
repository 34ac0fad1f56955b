/*
 * background.rs
 * Copyright (C) 2026 Marco Venturi
 *
 * This file is part of Portalettere, an Exchange gateway library.
 *
 * Portalettere is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Portalettere is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Portalettere.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Client keep-alive around long server loads.
//!
//! IMAP clients drop the connection when a large folder fetch stays silent
//! for too long. The load runs on a worker thread while the calling thread
//! writes a space character to the client at every interval; the space is
//! legal filler ahead of an untagged response line.

use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::GatewayError;

/// Run `task` on a worker thread, keeping `sink` alive until it finishes.
///
/// When the sink write fails the client is gone; the worker is abandoned
/// mid-flight and the write error is surfaced instead of the load result.
pub fn run_with_keepalive<T, F, W>(
    task: F,
    sink: &mut W,
    interval: Duration,
) -> Result<T, GatewayError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GatewayError> + Send + 'static,
    W: Write,
{
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let _ = tx.send(task());
    });
    loop {
        match rx.recv_timeout(interval) {
            Ok(result) => {
                let _ = worker.join();
                return result;
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Err(e) = sink.write_all(b" ").and_then(|_| sink.flush()) {
                    return Err(GatewayError::Transport {
                        message: "client connection lost during keep-alive".to_string(),
                        source: Some(e),
                    });
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(GatewayError::transport("background load aborted"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_task_writes_nothing() {
        let mut sink = Vec::new();
        let result =
            run_with_keepalive(|| Ok(42), &mut sink, Duration::from_secs(5)).unwrap();
        assert_eq!(result, 42);
        assert!(sink.is_empty());
    }

    #[test]
    fn slow_task_emits_filler() {
        let mut sink = Vec::new();
        let result = run_with_keepalive(
            || {
                thread::sleep(Duration::from_millis(120));
                Ok("done")
            },
            &mut sink,
            Duration::from_millis(30),
        )
        .unwrap();
        assert_eq!(result, "done");
        assert!(!sink.is_empty());
        assert!(sink.iter().all(|&b| b == b' '));
    }

    #[test]
    fn task_error_propagates() {
        let mut sink = Vec::new();
        let err = run_with_keepalive::<(), _, _>(
            || Err(GatewayError::transport("load failed")),
            &mut sink,
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(err.to_string().contains("load failed"));
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "closed",
            ))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn dead_client_abandons_worker() {
        let mut sink = BrokenSink;
        let err = run_with_keepalive(
            || {
                thread::sleep(Duration::from_millis(200));
                Ok(())
            },
            &mut sink,
            Duration::from_millis(10),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
    }
}

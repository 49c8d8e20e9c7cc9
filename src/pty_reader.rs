use std::io::Read;
use std::thread;
use tokio::sync::mpsc::{Receiver, channel};

/// Spawns a background thread that forwards everything read from `reader`.
///
/// Used for both the pty master and the controlling terminal, whose blocking
/// reads cannot sit inside the reactor. The channel closes on end-of-stream or
/// on the first read error.
pub fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = channel(64);

    thread::spawn(move || {
        let mut buffer = [0u8; 4096];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break, // EOF
                Ok(n) => {
                    if tx.blocking_send(buffer[..n].to_vec()).is_err() {
                        break; // Receiver dropped
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });

    rx
}

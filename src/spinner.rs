//! Terminal feedback while a blocking metadata query runs.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

const FRAME_DELAY: Duration = Duration::from_millis(250);

/// Animated ellipsis on the current line. The worker thread holds no state
/// beyond the stop flag; [`Spinner::stop`] joins it after it has cleared the
/// line, so the next print starts on a clean line.
pub struct Spinner {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let message = message.to_owned();
        let handle = std::thread::spawn(move || {
            let frames = ["", ".", "..", "..."];
            let mut frame = 0usize;
            while !flag.load(Ordering::Relaxed) {
                print!("\r{}{}\x1b[K", message, frames[frame % frames.len()]);
                let _ = io::stdout().flush();
                frame += 1;
                std::thread::sleep(FRAME_DELAY);
            }
            print!("\r\x1b[K");
            let _ = io::stdout().flush();
        });
        Self { stop, handle }
    }

    /// Signals the worker and waits for it to clear the line.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

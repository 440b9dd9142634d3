//! Shared yt-dlp process plumbing.
//!
//! Production code always spawns the `yt-dlp` found on PATH. Tests swap in a
//! stub shell script so they run without network access or a real yt-dlp
//! install.

#[cfg(test)]
use std::path::PathBuf;
use std::process::Command;
#[cfg(test)]
use std::sync::{Mutex, MutexGuard};

/// Browser User-Agent forwarded to yt-dlp so channel pages that gate on
/// client sniffing behave the same way they do for a desktop browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[cfg(test)]
static YT_DLP_STUB: Mutex<Option<PathBuf>> = Mutex::new(None);
#[cfg(test)]
static STUB_USE_LOCK: Mutex<()> = Mutex::new(());

/// Blocking command builder for one-shot invocations (metadata listing).
pub fn yt_dlp_command() -> Command {
    #[cfg(test)]
    {
        if let Some(path) = YT_DLP_STUB.lock().unwrap().clone() {
            return Command::new(path);
        }
    }
    Command::new("yt-dlp")
}

/// Async flavour for the long-running batched download, so its stdout can be
/// streamed while we stay responsive to Ctrl-C. Shares the stub override with
/// [`yt_dlp_command`].
pub fn yt_dlp_async_command() -> tokio::process::Command {
    #[cfg(test)]
    {
        if let Some(path) = YT_DLP_STUB.lock().unwrap().clone() {
            return tokio::process::Command::new(path);
        }
    }
    tokio::process::Command::new("yt-dlp")
}

#[cfg(test)]
pub(crate) fn set_ytdlp_stub_path(path: PathBuf) -> YtDlpStubGuard {
    let guard = STUB_USE_LOCK.lock().unwrap();
    {
        let mut lock = YT_DLP_STUB.lock().unwrap();
        *lock = Some(path);
    }
    YtDlpStubGuard { lock: Some(guard) }
}

/// Keeps the stub slot claimed until the owning test finishes, serializing
/// every test that spawns the (fake) yt-dlp binary.
#[cfg(test)]
pub(crate) struct YtDlpStubGuard {
    lock: Option<MutexGuard<'static, ()>>,
}

#[cfg(test)]
impl Drop for YtDlpStubGuard {
    fn drop(&mut self) {
        *YT_DLP_STUB.lock().unwrap() = None;
        self.lock.take();
    }
}

#[cfg(test)]
pub(crate) mod teststub {
    use super::{YtDlpStubGuard, set_ytdlp_stub_path};
    use anyhow::Result;
    use std::fs;
    use std::path::Path;

    /// Writes an executable yt-dlp stand-in with the given body and routes
    /// [`super::yt_dlp_command`] at it for the lifetime of the guard.
    pub(crate) fn install_stub(dir: &Path, script: &str) -> Result<YtDlpStubGuard> {
        let script_path = dir.join("yt-dlp");
        fs::write(&script_path, script)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&script_path)?.permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script_path, perms)?;
        }
        Ok(set_ytdlp_stub_path(script_path))
    }
}

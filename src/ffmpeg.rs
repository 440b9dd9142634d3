//! Startup check for the external ffmpeg transcoder.

use anyhow::{Context, Result, bail};
use std::io::ErrorKind;
use std::process::Command;

#[cfg(windows)]
const INSTALL_HELP: &str = "To install FFmpeg:\n\
     1. Download FFmpeg from https://ffmpeg.org/download.html\n\
     2. Extract the archive to a folder (e.g. C:\\ffmpeg)\n\
     3. Add the bin folder (e.g. C:\\ffmpeg\\bin) to your system PATH\n\
     4. Restart your terminal/command prompt";
#[cfg(not(windows))]
const INSTALL_HELP: &str = "To install FFmpeg:\n\
     On Ubuntu/Debian: sudo apt-get install ffmpeg\n\
     On macOS with Homebrew: brew install ffmpeg";

/// Runs `ffmpeg -version` and returns the first line of its output.
///
/// Hard precondition for every download path: the recode-to-MP4
/// post-processing step needs a working ffmpeg on PATH, so the CLI aborts
/// before any network activity when this fails.
pub fn check_ffmpeg() -> Result<String> {
    check_transcoder("ffmpeg")
}

fn check_transcoder(bin: &str) -> Result<String> {
    let output = match Command::new(bin).arg("-version").output() {
        Ok(output) => output,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            bail!("FFmpeg is not installed or not in system PATH.\n\n{}", INSTALL_HELP);
        }
        Err(err) => return Err(err).context("checking FFmpeg"),
    };

    if !output.status.success() {
        bail!("FFmpeg is installed but returned an error (status {})", output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout.lines().next().unwrap_or("").trim().to_owned();
    if version.is_empty() {
        bail!("FFmpeg ran but produced no version output");
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[cfg(unix)]
    fn install_fake_transcoder(dir: &std::path::Path, script: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("ffmpeg");
        fs::write(&path, script).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn reports_first_version_line() {
        let dir = tempdir().unwrap();
        let path = install_fake_transcoder(
            dir.path(),
            "#!/usr/bin/env bash\necho 'ffmpeg version 6.1.1 Copyright'\necho 'built with gcc'\n",
        );
        let version = check_transcoder(path.to_str().unwrap()).unwrap();
        assert_eq!(version, "ffmpeg version 6.1.1 Copyright");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_an_error() {
        let dir = tempdir().unwrap();
        let path = install_fake_transcoder(dir.path(), "#!/usr/bin/env bash\nexit 2\n");
        let err = check_transcoder(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("returned an error"));
    }

    #[test]
    fn missing_binary_mentions_install_guidance() {
        let err = check_transcoder("/nonexistent/tubegrab-ffmpeg").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("not installed or not in system PATH"));
        assert!(message.contains("To install FFmpeg"));
    }
}

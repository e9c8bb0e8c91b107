//! Native messaging host: the extension streams page events in, one reply
//! goes back per event.
//!
//! Protocol: each message is prefixed with a 4-byte little-endian uint32 length,
//! followed by UTF-8 JSON of that length.

use std::path::PathBuf;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, SkipperError};
use crate::session::{PageEvent, Session};

/// Native messaging host name registered with the browser.
pub const NATIVE_HOST_NAME: &str = "com.video_skipper.host";

/// Browsers cap host messages at 1 MiB.
pub const MAX_MESSAGE_BYTES: usize = 1_048_576;

/// Read one framed message. `Ok(None)` once the browser closes the pipe.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_MESSAGE_BYTES {
        return Err(SkipperError::NativeMessage(format!(
            "message of {} bytes exceeds the {} byte limit",
            len, MAX_MESSAGE_BYTES
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await.map_err(|e| {
        SkipperError::NativeMessage(format!("truncated message body: {}", e))
    })?;
    Ok(Some(buf))
}

/// Write one framed message.
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > MAX_MESSAGE_BYTES {
        return Err(SkipperError::NativeMessage(format!(
            "reply of {} bytes exceeds the {} byte limit",
            payload.len(),
            MAX_MESSAGE_BYTES
        )));
    }

    writer
        .write_all(&(payload.len() as u32).to_le_bytes())
        .await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Feed events from `reader` into the session until EOF.
///
/// A message that does not parse, or an event the session rejects, gets an
/// error reply and the loop carries on. Framing errors end the loop.
pub async fn serve<R, W>(session: &Session, reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = read_message(reader).await? {
        let handled = match serde_json::from_slice::<PageEvent>(&bytes) {
            Ok(event) => {
                tracing::debug!("Page event: {:?}", event);
                session.handle_event(event).await
            }
            Err(e) => Err(SkipperError::NativeMessage(format!("invalid page event: {}", e))),
        };

        match handled {
            Ok(reply) => write_message(writer, &reply).await?,
            Err(e) => {
                tracing::warn!("Rejected page event: {}", e);
                let reply = serde_json::json!({
                    "type": "error",
                    "message": e.to_string(),
                });
                write_message(writer, &reply).await?;
            }
        }
    }

    tracing::debug!("Native messaging pipe closed");
    Ok(())
}

/// Run as a native messaging host on stdin/stdout.
pub async fn run(session: &Session) -> Result<()> {
    let poller = session.spawn_poller();
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    let result = serve(session, &mut stdin, &mut stdout).await;
    poller.abort();
    result
}

/// Extension IDs are 32 characters in `a..=p`.
pub fn is_valid_extension_id(id: &str) -> bool {
    id.len() == 32 && id.chars().all(|c| ('a'..='p').contains(&c))
}

/// Platform-specific path for the native messaging host manifest.
pub fn native_host_manifest_path() -> Result<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let home = dirs::home_dir()
            .ok_or_else(|| SkipperError::Other("Cannot determine home directory".to_string()))?;
        Ok(home
            .join("Library/Application Support/Google/Chrome/NativeMessagingHosts")
            .join(format!("{}.json", NATIVE_HOST_NAME)))
    }

    #[cfg(target_os = "windows")]
    {
        // Windows reads the location from the registry; the file itself can live anywhere.
        let app_data = dirs::data_local_dir().ok_or_else(|| {
            SkipperError::Other("Cannot determine AppData directory".to_string())
        })?;
        Ok(app_data
            .join("video-skipper")
            .join(format!("{}.json", NATIVE_HOST_NAME)))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let config = dirs::config_dir().ok_or_else(|| {
            SkipperError::Other("Cannot determine config directory".to_string())
        })?;
        Ok(config
            .join("google-chrome/NativeMessagingHosts")
            .join(format!("{}.json", NATIVE_HOST_NAME)))
    }
}

/// Manifest JSON for a host binary at `binary_path`, callable by one extension.
pub fn generate_manifest(binary_path: &str, extension_id: &str) -> serde_json::Value {
    serde_json::json!({
        "name": NATIVE_HOST_NAME,
        "description": "Video Skipper - page event host for the skip extension",
        "path": binary_path,
        "type": "stdio",
        "allowed_origins": [
            format!("chrome-extension://{}/", extension_id)
        ]
    })
}

/// Install the manifest to the platform-specific location.
pub fn install_manifest(extension_id: &str) -> Result<PathBuf> {
    if !is_valid_extension_id(extension_id) {
        return Err(SkipperError::Other(format!(
            "Invalid extension ID {:?}: expected 32 characters a-p",
            extension_id
        )));
    }
    let manifest_path = native_host_manifest_path()?;

    let binary_path = std::env::current_exe()
        .map_err(|e| SkipperError::Other(format!("Cannot determine binary path: {}", e)))?
        .to_string_lossy()
        .to_string();

    // Prefer the PATH-resolved binary; current_exe may point into a build dir
    let resolved_path = which::which("video-skipper")
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or(binary_path);

    let manifest = generate_manifest(&resolved_path, extension_id);

    if let Some(parent) = manifest_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SkipperError::Other(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let content = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(&manifest_path, content).map_err(|e| {
        SkipperError::Other(format!(
            "Failed to write native messaging host manifest to {}: {}",
            manifest_path.display(),
            e
        ))
    })?;

    tracing::info!("Installed native messaging manifest at {}", manifest_path.display());
    Ok(manifest_path)
}

/// Remove the manifest. Returns whether there was one to remove.
pub fn uninstall_manifest() -> Result<bool> {
    let manifest_path = native_host_manifest_path()?;
    if !manifest_path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(&manifest_path).map_err(|e| {
        SkipperError::Other(format!(
            "Failed to remove native messaging host manifest: {}",
            e
        ))
    })?;
    Ok(true)
}

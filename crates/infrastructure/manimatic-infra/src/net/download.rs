use camino::{Utf8Path, Utf8PathBuf};
use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::TransportError;

/// Stream a rendered video to `target`.
///
/// Bytes land in `<target>.part` first and are renamed into place only after
/// the whole body was written, so a failed attempt never leaves a truncated
/// file at `target`. Returns the number of bytes written.
pub async fn download_artifact(
    client: &Client,
    url: &str,
    target: &Utf8Path,
) -> Result<u64, TransportError> {
    let tmp_path = partial_path(target);

    if let Some(parent) = target.parent() {
        if !parent.as_str().is_empty() {
            tokio::fs::create_dir_all(parent.as_std_path()).await?;
        }
    }

    let mut last_err = TransportError::Closed;

    for attempt in 1..=manimatic_config::DOWNLOAD_ATTEMPTS {
        match download_once(client, url, &tmp_path).await {
            Ok(written) => {
                tokio::fs::rename(tmp_path.as_std_path(), target.as_std_path()).await?;
                return Ok(written);
            }
            Err(e) => {
                warn!(attempt, "download of {url} failed: {e}");
                last_err = e;
            }
        }
        if attempt < manimatic_config::DOWNLOAD_ATTEMPTS {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
    }

    let _ = tokio::fs::remove_file(tmp_path.as_std_path()).await;
    Err(last_err)
}

/// `<target>.part`, with `.part` appended to the whole file name.
fn partial_path(target: &Utf8Path) -> Utf8PathBuf {
    let mut name = target.file_name().unwrap_or("download").to_owned();
    name.push_str(".part");
    target.with_file_name(name)
}

async fn download_once(client: &Client, url: &str, tmp_path: &Utf8Path) -> Result<u64, TransportError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| TransportError::Request {
            endpoint: url.to_string(),
            message: e.to_string(),
        })?;

    if !resp.status().is_success() {
        return Err(TransportError::Status {
            endpoint: url.to_string(),
            status: resp.status().as_u16(),
        });
    }

    let mut file = File::create(tmp_path.as_std_path()).await?;
    let mut stream = resp.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TransportError::Stream(e.to_string()))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use crate::config::DocumentConfig;
use crate::document::{planned_documents, Document};
use crate::types::{AppError, AppResult};

/// Size of the write buffer between the response stream and the file.
pub const CHUNK_SIZE: usize = 8192;

/// Download `url` and save it as `path`, returning the number of bytes written.
///
/// The status is checked before the file is created, so a non-2xx response
/// leaves nothing on disk. A transport error mid-body can leave a partial
/// file behind.
pub async fn download_file(client: &Client, url: &str, path: &Path) -> AppResult<u64> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Download(format!("{url} returned {status}")));
    }

    let file = File::create(path).await?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;

    info!(path = %path.display(), bytes = written, "Downloaded: {}", path.display());
    Ok(written)
}

/// Download every configured filing into `work_dir`.
pub async fn download_all(
    client: &Client,
    config: &DocumentConfig,
    work_dir: &Path,
) -> AppResult<Vec<Document>> {
    let documents = planned_documents(config);
    for document in &documents {
        download_file(client, &document.url, &work_dir.join(&document.local_path)).await?;
    }
    Ok(documents)
}

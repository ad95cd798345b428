use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode, header};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::ReadAt;
use anyhow::{Result, anyhow, bail};

const DEFAULT_MAX_RETRY: u32 = 10;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Remote reader backed by HTTP Range requests
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// Sends a HEAD request to confirm the server accepts byte ranges and to
    /// learn the resource size.
    pub async fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let resp = client.head(&url).send().await?;

        if !resp.status().is_success() {
            bail!("HEAD {} failed with status: {}", url, resp.status());
        }

        let headers = resp.headers();
        let accepts_bytes = headers
            .get(header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("bytes"));
        if !accepts_bytes {
            bail!("{} does not support Range requests", url);
        }

        let size = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow!("{} did not return Content-Length", url))?;

        debug!("{} accepts ranges, {} bytes", url, size);

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: DEFAULT_MAX_RETRY,
        })
    }

    /// Limit how many connection-level failures a single read tolerates
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let last = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let expected = (last - offset + 1) as usize;
        let mut received = 0;
        let mut failures = 0;

        while received < expected {
            let range = format!("bytes={}-{}", offset + received as u64, last);
            let result = self
                .client
                .get(&self.url)
                .header(header::RANGE, &range)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        bail!("GET {} ({}) returned status: {}", self.url, range, resp.status());
                    }
                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        bail!("GET {} ({}) returned an empty body", self.url, range);
                    }
                    let n = bytes.len().min(expected - received);
                    buf[received..received + n].copy_from_slice(&bytes[..n]);
                    received += n;
                    self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    failures += 1;
                    if failures >= self.max_retry {
                        bail!("giving up on {} after {} attempts: {}", self.url, failures, e);
                    }
                    warn!("connection error, retry {}/{}: {}", failures, self.max_retry, e);
                    tokio::time::sleep(RETRY_BACKOFF * failures).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    const BODY: &[u8] = b"0123456789";

    /// Minimal HTTP/1.1 server answering HEAD and single-range GET requests.
    async fn serve(accept_ranges: bool) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/blob", listener.local_addr().unwrap());
        let task = tokio::spawn(async move {
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                tokio::spawn(respond(socket, accept_ranges));
            }
        });
        (url, task)
    }

    async fn respond(mut socket: TcpStream, accept_ranges: bool) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 512];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&chunk[..n]);
        }
        let request = String::from_utf8_lossy(&request).to_lowercase();

        let response = if request.starts_with("head") {
            let ranges = if accept_ranges { "accept-ranges: bytes\r\n" } else { "" };
            format!(
                "HTTP/1.1 200 OK\r\n{}content-length: {}\r\nconnection: close\r\n\r\n",
                ranges,
                BODY.len()
            )
            .into_bytes()
        } else {
            let range = request
                .lines()
                .find_map(|line| line.strip_prefix("range: bytes="))
                .unwrap();
            let (first, last) = range.trim().split_once('-').unwrap();
            let first: usize = first.parse().unwrap();
            let last: usize = last.parse().unwrap();
            let body = &BODY[first..=last];
            let mut head = format!(
                "HTTP/1.1 206 Partial Content\r\ncontent-range: bytes {}-{}/{}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                first,
                last,
                BODY.len(),
                body.len()
            )
            .into_bytes();
            head.extend_from_slice(body);
            head
        };
        socket.write_all(&response).await.unwrap();
        socket.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn reads_ranges_and_clamps_at_end() {
        let (url, server) = serve(true).await;
        let reader = HttpRangeReader::new(url).await.unwrap();
        assert_eq!(reader.size(), 10);

        let mut buf = [0u8; 4];
        assert_eq!(reader.read_at(8, &mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(reader.read_at(10, &mut buf).await.unwrap(), 0);
        assert_eq!(reader.read_at(3, &mut []).await.unwrap(), 0);

        let mut all = [0u8; 16];
        assert_eq!(reader.read_at(0, &mut all).await.unwrap(), 10);
        assert_eq!(&all[..10], BODY);
        assert_eq!(reader.transferred_bytes(), 12);

        server.abort();
    }

    #[tokio::test]
    async fn rejects_servers_without_byte_ranges() {
        let (url, server) = serve(false).await;
        let err = HttpRangeReader::new(url).await.err().unwrap();
        assert!(err.to_string().contains("does not support Range requests"));
        server.abort();
    }

    #[tokio::test]
    async fn gives_up_when_server_goes_away() {
        let (url, server) = serve(true).await;
        let reader = HttpRangeReader::new(url).await.unwrap().with_max_retry(1);
        server.abort();
        let _ = server.await;

        let mut buf = [0u8; 4];
        let err = reader.read_at(0, &mut buf).await.err().unwrap();
        assert!(err.to_string().contains("giving up"));
        assert_eq!(reader.transferred_bytes(), 0);
    }
}

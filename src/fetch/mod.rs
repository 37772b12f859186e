// src/fetch/mod.rs

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, ClientBuilder, StatusCode,
};
use std::{collections::BTreeMap, path::Path, time::Duration};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::Config;

/// Why the report could not be downloaded. All variants abort the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to download {url}: status code {status}")]
    Status { url: Url, status: StatusCode },

    #[error("GET {url} failed")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("body from {url} is not valid UTF-8")]
    Decode {
        url: Url,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("invalid request header {name:?}: {reason}")]
    Header { name: String, reason: String },
}

impl FetchError {
    /// HTTP status for a non-200 answer, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Turn the configured name/value pairs into a reqwest header map.
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let key = HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::Header {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        let val = HeaderValue::from_str(value).map_err(|e| FetchError::Header {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        map.insert(key, val);
    }
    Ok(map)
}

/// Client builder carrying the browser headers and the request timeout.
pub fn client_builder(config: &Config) -> Result<ClientBuilder, FetchError> {
    Ok(Client::builder()
        .default_headers(header_map(&config.headers)?)
        .timeout(Duration::from_secs(config.timeout_secs)))
}

pub fn build_client(config: &Config) -> Result<Client, FetchError> {
    let url = config.endpoint.clone();
    client_builder(config)?
        .build()
        .map_err(|source| FetchError::Transport { url, source })
}

/// Single GET of the performance report. Anything but a 200 is an error; no retries.
#[instrument(level = "info", skip(client, url), fields(url = %url))]
pub async fn download_report(client: &Client, url: &Url) -> Result<String, FetchError> {
    let transport = |source| FetchError::Transport {
        url: url.clone(),
        source,
    };

    let resp = client.get(url.clone()).send().await.map_err(transport)?;
    let status = resp.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status {
            url: url.clone(),
            status,
        });
    }

    let bytes = resp.bytes().await.map_err(transport)?;
    debug!(bytes = bytes.len(), "body received");
    let text = String::from_utf8(bytes.to_vec()).map_err(|source| FetchError::Decode {
        url: url.clone(),
        source,
    })?;
    info!("CSV file successfully downloaded");
    Ok(text)
}

/// Keep a verbatim copy of the downloaded report next to the split output.
pub async fn save_report(text: &str, dest: impl AsRef<Path>) -> anyhow::Result<()> {
    let dest = dest.as_ref();
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(dest, text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::{
        io::{Read, Write},
        net::TcpListener,
        sync::mpsc,
        thread,
    };

    /// Answer exactly one HTTP request with `response`, handing back the raw request text.
    fn serve_once(response: impl Into<Vec<u8>>) -> Result<(Url, mpsc::Receiver<String>)> {
        let response = response.into();
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let mut seen = Vec::new();
                while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => seen.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(&response);
                let _ = tx.send(String::from_utf8_lossy(&seen).to_string());
            }
        });
        Ok((Url::parse(&format!("http://{}/report.csv", addr))?, rx))
    }

    fn test_client(cfg: &Config) -> Result<Client> {
        Ok(client_builder(cfg)?.no_proxy().build()?)
    }

    #[tokio::test]
    async fn ok_response_returns_body_and_sends_browser_headers() -> Result<()> {
        let (url, rx) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: 11\r\nConnection: close\r\n\r\nDate,A\r\nx\r\n",
        )?;
        let cfg = Config::default();
        let body = download_report(&test_client(&cfg)?, &url).await?;
        assert_eq!(body, "Date,A\r\nx\r\n");

        let request = rx.recv()?.to_lowercase();
        assert!(request.contains("sec-fetch-mode: navigate"));
        assert!(request.contains("user-agent: mozilla/5.0 (x11; linux x86_64)"));
        Ok(())
    }

    #[tokio::test]
    async fn non_200_is_a_status_failure() -> Result<()> {
        let (url, _rx) = serve_once(
            "HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )?;
        let cfg = Config::default();
        let err = download_report(&test_client(&cfg)?, &url)
            .await
            .expect_err("403 must fail");
        assert!(matches!(err, FetchError::Status { .. }));
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(err.to_string().contains("status code 403"));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_decode_failure() -> Result<()> {
        let mut resp = b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\nConnection: close\r\n\r\n".to_vec();
        resp.push(0x80);
        let (url, _rx) = serve_once(resp)?;
        let err = download_report(&test_client(&Config::default())?, &url)
            .await
            .expect_err("lone continuation byte must fail");
        assert!(matches!(err, FetchError::Decode { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn silent_server_times_out_as_transport_failure() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        thread::spawn(move || {
            // hold the connection open without ever answering
            if let Ok((stream, _)) = listener.accept() {
                thread::sleep(std::time::Duration::from_secs(5));
                drop(stream);
            }
        });
        let url = Url::parse(&format!("http://{}/report.csv", addr))?;
        let cfg = Config {
            timeout_secs: 1,
            ..Config::default()
        };

        let start = std::time::Instant::now();
        let err = download_report(&test_client(&cfg)?, &url)
            .await
            .expect_err("silent server must time out");
        assert!(start.elapsed() < std::time::Duration::from_secs(4));
        assert!(matches!(err, FetchError::Transport { ref source, .. } if source.is_timeout()));
        assert_eq!(err.status(), None);
        Ok(())
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_failure() -> Result<()> {
        let addr = TcpListener::bind("127.0.0.1:0")?.local_addr()?;
        // listener dropped: nothing accepts on this port any more
        let url = Url::parse(&format!("http://{}/report.csv", addr))?;
        let err = download_report(&test_client(&Config::default())?, &url)
            .await
            .expect_err("closed port must fail");
        assert!(matches!(err, FetchError::Transport { .. }));
        assert_eq!(err.status(), None);
        Ok(())
    }

    #[test]
    fn bad_header_value_is_rejected() {
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), "line\nbreak".to_string());
        let err = header_map(&headers).expect_err("newline is not a valid header value");
        assert!(matches!(err, FetchError::Header { ref name, .. } if name == "User-Agent"));
    }

    #[tokio::test]
    async fn save_report_creates_parent_dirs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("raw").join("report.csv");
        save_report("a,b\n", &dest).await?;
        assert_eq!(std::fs::read_to_string(dest)?, "a,b\n");
        Ok(())
    }
}

//! Fixtures shared by the unit tests: zip archives written with the `zip` crate and a tiny HTTP
//! server on localhost.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes an uncompressed zip at `path`. Entries with no contents become directories.
pub fn write_zip(path: &Path, entries: &[(&str, Option<&[u8]>)]) {
    write_zip_with(path, CompressionMethod::Stored, entries);
}

/// Like [`write_zip`], with file entries compressed using `method`.
pub fn write_zip_with(path: &Path, method: CompressionMethod, entries: &[(&str, Option<&[u8]>)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(method);

    for (name, contents) in entries {
        match contents {
            Some(data) => {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
            None => zip.add_directory(*name, options).unwrap(),
        }
    }

    zip.finish().unwrap();
}

#[derive(Clone)]
pub enum Route {
    Ok(Vec<u8>),
    Status(u16),
    /// Announces more bytes than it sends, then hangs up.
    Truncated(Vec<u8>),
    /// Reads the request and never answers.
    Stall,
}

pub struct TestServer {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, Route)>) -> Self {
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let hits = Arc::new(Mutex::new(Vec::new()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let server_hits = hits.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let hits = server_hits.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &routes, &hits).await;
                });
            }
        });

        Self { base_url, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request paths in the order they arrived.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    hits: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let read = stream.read(&mut buf).await?;
        if read == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..read]);
    }

    let request = String::from_utf8_lossy(&request);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    hits.lock().unwrap().push(path.clone());

    let (status, body, declared) = match routes.get(&path).cloned() {
        Some(Route::Ok(body)) => (200, body.clone(), body.len()),
        Some(Route::Status(code)) => (code, b"error".to_vec(), 5),
        Some(Route::Truncated(body)) => (200, body.clone(), body.len() + 100),
        Some(Route::Stall) => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            return Ok(());
        }
        None => (404, b"not found".to_vec(), 9),
    };

    let head = format!(
        "HTTP/1.1 {} Test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status, declared
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;
    stream.shutdown().await
}

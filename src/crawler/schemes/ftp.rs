//! FTP fetcher
//!
//! Every fetch opens its own control connection. The client is blocking, so
//! it runs on tokio's blocking pool.

use crate::crawler::schemes::file::guess_mimetype;
use crate::crawler::schemes::{FetchOutcome, FetchRequest, FetchResponse, SchemeFetcher};
use async_trait::async_trait;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use thiserror::Error;
use tracing::debug;
use url::{Host, Url};

const FTP_PORT: u16 = 21;

#[derive(Debug, Error)]
enum FtpFetchError {
    #[error("cannot resolve host {0}")]
    Resolve(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Ftp(#[from] FtpError),
}

/// Server, credentials and path of an `ftp` URL
#[derive(Debug, Clone, PartialEq, Eq)]
struct FtpTarget {
    host: String,
    port: u16,
    user: String,
    password: String,
    /// Decoded path segments relative to the login directory
    segments: Vec<String>,
}

impl FtpTarget {
    fn from_url(url: &Url) -> Option<Self> {
        let host = match url.host()? {
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };
        let (user, password) = if url.username().is_empty() {
            ("anonymous".to_string(), String::new())
        } else {
            (
                decode(url.username()),
                url.password().map(decode).unwrap_or_default(),
            )
        };
        let segments = url
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode)
            .collect();

        Some(Self {
            host,
            port: url.port_or_known_default().unwrap_or(FTP_PORT),
            user,
            password,
            segments,
        })
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Fetches `ftp` URLs
pub struct FtpFetcher {
    timeout: Duration,
}

impl FtpFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `timeout` - Applies to connecting and to every read
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn connect(target: &FtpTarget, timeout: Duration) -> Result<FtpStream, FtpFetchError> {
    let addr = (target.host.as_str(), target.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| FtpFetchError::Resolve(target.host.clone()))?;

    let mut ftp = FtpStream::connect_timeout(addr, timeout)?;
    ftp.get_ref().set_read_timeout(Some(timeout))?;
    ftp.login(target.user.as_str(), target.password.as_str())?;
    ftp.transfer_type(FileType::Binary)?;
    Ok(ftp)
}

/// Looks at the path: a directory is listed, a file is sized and maybe read
fn explore(
    ftp: &mut FtpStream,
    target: &FtpTarget,
    url: &Url,
    accepted_mimetypes: &[String],
) -> Result<FetchResponse, FtpFetchError> {
    // descend as far as possible, whatever remains names a file
    let mut entered = 0;
    for segment in &target.segments {
        if ftp.cwd(segment).is_err() {
            break;
        }
        entered += 1;
    }

    if entered == target.segments.len() {
        if !url.path().ends_with('/') {
            debug!("Directory referenced without trailing slash: {}", url);
            let mut redirect = url.clone();
            redirect.set_path(&format!("{}/", url.path()));
            return Ok(FetchResponse::new(FetchOutcome::Redirect(redirect.to_string())));
        }

        let mut entries = Vec::new();
        for entry in ftp.nlst(None)? {
            // some servers answer with full paths
            let name = entry.rsplit('/').next().unwrap_or(&entry);
            if name.is_empty() || name == "." || name == ".." {
                continue;
            }
            if let Ok(child) = url.join(&urlencoding::encode(name)) {
                entries.push(child.to_string());
            }
        }
        entries.sort();
        return Ok(FetchResponse::new(FetchOutcome::Listing(entries)));
    }

    let remaining = target.segments[entered..].join("/");
    let mut response = FetchResponse::new(FetchOutcome::NoContent);
    response.size = Some(ftp.size(&remaining)? as u64);
    // not every server supports MDTM
    response.mtime = ftp.mdtm(&remaining).ok().map(|t| t.and_utc());
    response.mimetype = guess_mimetype(Path::new(&remaining)).map(String::from);

    let accepted = response
        .mimetype
        .as_ref()
        .map_or(false, |m| accepted_mimetypes.contains(m));
    if accepted {
        let content = ftp.retr_as_buffer(&remaining)?.into_inner();
        response.outcome = FetchOutcome::Content(content);
    }
    Ok(response)
}

fn retrieve(
    target: &FtpTarget,
    url: &Url,
    timeout: Duration,
    accepted_mimetypes: &[String],
) -> FetchResponse {
    let mut ftp = match connect(target, timeout) {
        Ok(ftp) => ftp,
        Err(e) => return FetchResponse::failed(format!("FTP error: {}", e)),
    };
    let response = explore(&mut ftp, target, url, accepted_mimetypes)
        .unwrap_or_else(|e| FetchResponse::failed(format!("FTP error: {}", e)));
    if let Err(e) = ftp.quit() {
        debug!("Closing FTP connection to {} failed: {}", target.host, e);
    }
    response
}

#[async_trait]
impl SchemeFetcher for FtpFetcher {
    fn schemes(&self) -> &[&'static str] {
        &["ftp"]
    }

    async fn fetch(&self, request: &FetchRequest, accepted_mimetypes: &[String]) -> FetchResponse {
        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => return FetchResponse::failed(format!("invalid FTP URL: {}", e)),
        };
        let Some(target) = FtpTarget::from_url(&url) else {
            return FetchResponse::failed(format!("missing host in FTP URL: {}", url));
        };

        let timeout = self.timeout;
        let accepted = accepted_mimetypes.to_vec();
        match tokio::task::spawn_blocking(move || retrieve(&target, &url, timeout, &accepted))
            .await
        {
            Ok(response) => response,
            Err(e) => FetchResponse::failed(format!("FTP transfer aborted: {}", e)),
        }
    }
}

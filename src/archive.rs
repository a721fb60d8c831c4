//! Turning a deploy argument into a local ZIP archive
//!
//! Accepted inputs:
//!
//! - an `https` URL whose path ends in `.zip`, downloaded to a temp file
//! - a local directory, zipped with the system `zip` utility
//! - a local `.zip` file, used as is
//!
//! Inline content (base64, data URLs) and other URLs are rejected.
//! Temporary archives are removed when the [`ResolvedArchive`] is dropped.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use url::Url;

use crate::error::{DeployError, Result};

const ARCHIVE_NAME: &str = "site.zip";

/// A classified deploy argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployInput {
    /// `https` URL of a ZIP archive
    RemoteZip(Url),
    /// Local directory to package
    Directory(PathBuf),
    /// Local ZIP archive
    ZipFile(PathBuf),
}

impl DeployInput {
    /// Classify a deploy argument without touching the network.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInput` for non-`https` URLs, URLs that do not name
    /// a `.zip`, missing paths, plain files that are not `.zip`, and inline
    /// content.
    pub fn classify(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DeployError::invalid_argument("zipFile must not be empty"));
        }

        let path = Path::new(input);
        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }
        if path.is_file() {
            if has_zip_extension(input) {
                return Ok(Self::ZipFile(path.to_path_buf()));
            }
            return Err(DeployError::unsupported_input(format!(
                "{} is not a .zip archive",
                path.display()
            )));
        }

        if let Some(url) = parse_url(input) {
            return match url.scheme() {
                "https" if has_zip_extension(url.path()) => Ok(Self::RemoteZip(url)),
                "https" => Err(DeployError::unsupported_input(format!(
                    "{url} does not point to a .zip file"
                ))),
                scheme => Err(DeployError::unsupported_input(format!(
                    "{scheme} URLs are not accepted, use an https URL to a .zip file"
                ))),
            };
        }

        if has_zip_extension(input) {
            return Err(DeployError::unsupported_input(format!(
                "{} does not exist",
                path.display()
            )));
        }

        Err(DeployError::unsupported_input(
            "expected an https URL to a .zip file, a directory, or a .zip path; \
             inline file content is not accepted",
        ))
    }
}

/// A ZIP archive on local disk, ready to upload
#[derive(Debug)]
pub struct ResolvedArchive {
    path: PathBuf,
    size: u64,
    temp: Option<TempDir>,
}

impl ResolvedArchive {
    /// Location of the archive
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the archive lives in a temp directory owned by this value
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// File name announced to the backend
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| ARCHIVE_NAME.to_string())
    }
}

/// Produce a local ZIP for `input` no larger than `max_bytes`.
///
/// # Errors
///
/// `FileTooLarge` if the archive (or a download in progress) exceeds
/// `max_bytes`, `Archive` if zipping fails, `Http`/`Io` for download and
/// file errors.
pub async fn resolve(
    input: DeployInput,
    http: &reqwest::Client,
    max_bytes: u64,
) -> Result<ResolvedArchive> {
    let archive = match input {
        DeployInput::ZipFile(path) => {
            let size = tokio::fs::metadata(&path).await?.len();
            ResolvedArchive {
                path,
                size,
                temp: None,
            }
        }
        DeployInput::Directory(dir) => zip_directory(&dir).await?,
        DeployInput::RemoteZip(url) => download(&url, http, max_bytes).await?,
    };

    check_size(archive.size, max_bytes)?;
    tracing::debug!(
        path = %archive.path.display(),
        size = archive.size,
        "archive ready"
    );
    Ok(archive)
}

/// Reject archives over `limit` bytes
///
/// # Errors
///
/// Returns `FileTooLarge` if `size > limit`.
pub fn check_size(size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(DeployError::FileTooLarge { size, limit });
    }
    Ok(())
}

/// Parse `input` as a URL only when it starts with `scheme://`.
///
/// A bare colon is not enough: `site:v2` is a path, and `C:\site` a drive.
fn parse_url(input: &str) -> Option<Url> {
    let (scheme, _) = input.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return None;
    }
    Url::parse(input).ok()
}

fn has_zip_extension(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".zip")
}

async fn zip_directory(dir: &Path) -> Result<ResolvedArchive> {
    if std::fs::read_dir(dir)?.next().is_none() {
        return Err(DeployError::unsupported_input(format!(
            "{} is empty",
            dir.display()
        )));
    }

    let zip = which::which("zip").map_err(|_| {
        DeployError::archive(
            "the `zip` utility is required to deploy a directory; install it or pass a .zip file",
        )
    })?;

    let temp = tempfile::Builder::new().prefix("sitedeploy-").tempdir()?;
    // zip refuses to write into an existing empty file, so the target must not exist yet
    let path = temp.path().join(ARCHIVE_NAME);

    tracing::debug!(dir = %dir.display(), "zipping directory");
    let output = Command::new(&zip)
        .arg("-r")
        .arg("-q")
        .arg(&path)
        .arg(".")
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| DeployError::archive(format!("failed to run {}: {e}", zip.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeployError::archive(format!(
            "zip exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let size = tokio::fs::metadata(&path).await?.len();
    Ok(ResolvedArchive {
        path,
        size,
        temp: Some(temp),
    })
}

async fn download(url: &Url, http: &reqwest::Client, max_bytes: u64) -> Result<ResolvedArchive> {
    tracing::debug!(%url, "downloading archive");
    let response = http.get(url.clone()).send().await?.error_for_status()?;
    if let Some(length) = response.content_length() {
        check_size(length, max_bytes)?;
    }

    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| has_zip_extension(name))
        .unwrap_or(ARCHIVE_NAME)
        .to_string();

    let temp = tempfile::Builder::new().prefix("sitedeploy-").tempdir()?;
    let path = temp.path().join(name);
    let mut file = tokio::fs::File::create(&path).await?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        written += chunk.len() as u64;
        check_size(written, max_bytes)?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(ResolvedArchive {
        path,
        size: written,
        temp: Some(temp),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_classify_https_zip() {
        let input = DeployInput::classify("https://cdn.example.com/builds/site.ZIP").unwrap();
        assert!(matches!(input, DeployInput::RemoteZip(_)));
    }

    #[test]
    fn test_classify_rejects_other_urls() {
        for url in [
            "https://example.com/site.tar.gz",
            "http://example.com/site.zip",
            "ftp://example.com/site.zip",
            "data:application/zip;base64,UEsDBBQAAAAIAA==",
        ] {
            assert!(
                matches!(
                    DeployInput::classify(url),
                    Err(DeployError::UnsupportedInput(_))
                ),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_colon_without_slashes_is_not_a_url() {
        assert!(parse_url("site:v2").is_none());
        assert!(parse_url("C://site.zip").is_none());
        assert!(parse_url("1abc://host/site.zip").is_none());
        assert!(parse_url("data:application/zip;base64,UEsDBA==").is_none());
        assert_eq!(
            parse_url("https://cdn.example.com/site.zip").map(|u| u.host_str().map(str::to_string)),
            Some(Some("cdn.example.com".to_string()))
        );
    }

    #[test]
    fn test_classify_directory_with_colon_in_name() {
        let root = TempDir::new().unwrap();
        let site = root.path().join("site:v2");
        std::fs::create_dir(&site).unwrap();
        std::fs::write(site.join("index.html"), "<h1>v2</h1>").unwrap();
        let archive = root.path().join("build:v2.zip");
        std::fs::write(&archive, b"PK").unwrap();

        assert_eq!(
            DeployInput::classify(site.to_str().unwrap()).unwrap(),
            DeployInput::Directory(site.clone())
        );
        assert_eq!(
            DeployInput::classify(archive.to_str().unwrap()).unwrap(),
            DeployInput::ZipFile(archive.clone())
        );
    }

    #[test]
    fn test_classify_rejects_base64() {
        let result = DeployInput::classify("UEsDBBQAAAAIAGZ0d1cAAAAAAAAAAAAAAAAKAAAAaW5kZXguaHRtbA==");
        assert!(matches!(result, Err(DeployError::UnsupportedInput(_))));
    }

    #[test]
    fn test_classify_local_paths() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("site.zip");
        std::fs::write(&zip, b"PK").unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"hi").unwrap();

        assert_eq!(
            DeployInput::classify(dir.path().to_str().unwrap()).unwrap(),
            DeployInput::Directory(dir.path().to_path_buf())
        );
        assert_eq!(
            DeployInput::classify(zip.to_str().unwrap()).unwrap(),
            DeployInput::ZipFile(zip.clone())
        );
        assert!(matches!(
            DeployInput::classify(text.to_str().unwrap()),
            Err(DeployError::UnsupportedInput(_))
        ));
        let missing = dir.path().join("missing.zip");
        assert!(matches!(
            DeployInput::classify(missing.to_str().unwrap()),
            Err(DeployError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn test_classify_empty_argument() {
        assert!(matches!(
            DeployInput::classify("   "),
            Err(DeployError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_check_size() {
        assert!(check_size(10, 10).is_ok());
        assert!(matches!(
            check_size(11, 10),
            Err(DeployError::FileTooLarge { size: 11, limit: 10 })
        ));
    }

    #[tokio::test]
    async fn test_resolve_zip_passthrough() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("site.zip");
        std::fs::write(&zip, b"PK\x05\x06").unwrap();

        let archive = resolve(DeployInput::ZipFile(zip.clone()), &reqwest::Client::new(), 100)
            .await
            .unwrap();
        assert_eq!(archive.path(), zip.as_path());
        assert_eq!(archive.size(), 4);
        assert!(!archive.is_temporary());
        assert_eq!(archive.file_name(), "site.zip");
    }

    #[tokio::test]
    async fn test_resolve_rejects_oversize_zip() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("big.zip");
        let file = std::fs::File::create(&zip).unwrap();
        file.set_len(2048).unwrap();

        let result = resolve(DeployInput::ZipFile(zip), &reqwest::Client::new(), 1024).await;
        assert!(matches!(
            result,
            Err(DeployError::FileTooLarge {
                size: 2048,
                limit: 1024
            })
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_directory() {
        let dir = TempDir::new().unwrap();
        let result = resolve(
            DeployInput::Directory(dir.path().to_path_buf()),
            &reqwest::Client::new(),
            1024,
        )
        .await;
        assert!(matches!(result, Err(DeployError::UnsupportedInput(_))));
    }

    /// File entries of a ZIP archive, directories excluded
    fn archive_entries(archive: &Path) -> BTreeSet<String> {
        let listing = match which::which("unzip") {
            Ok(unzip) => std::process::Command::new(unzip)
                .arg("-Z1")
                .arg(archive)
                .output()
                .unwrap(),
            // `zip -sf` lists entries between a header and a total line
            Err(_) => std::process::Command::new(which::which("zip").unwrap())
                .arg("-sf")
                .arg(archive)
                .output()
                .unwrap(),
        };
        assert!(listing.status.success(), "listing {} failed", archive.display());

        String::from_utf8_lossy(&listing.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| *line != "Archive contains:" && !line.starts_with("Total "))
            .filter(|line| !line.ends_with('/'))
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_zip_directory_reproduces_file_set() {
        if which::which("zip").is_err() {
            eprintln!("skipping: zip not installed");
            return;
        }

        let site = TempDir::new().unwrap();
        std::fs::write(site.path().join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::create_dir(site.path().join("css")).unwrap();
        std::fs::write(site.path().join("css/site.css"), "h1{}").unwrap();
        std::fs::create_dir_all(site.path().join("assets/img")).unwrap();
        std::fs::write(site.path().join("assets/img/logo.svg"), "<svg/>").unwrap();
        std::fs::create_dir(site.path().join(".well-known")).unwrap();
        std::fs::write(
            site.path().join(".well-known/security.txt"),
            "Contact: mailto:ops@example.com",
        )
        .unwrap();
        std::fs::write(site.path().join(".htaccess"), "Options -Indexes").unwrap();

        let archive = resolve(
            DeployInput::Directory(site.path().to_path_buf()),
            &reqwest::Client::new(),
            u64::MAX,
        )
        .await
        .unwrap();
        assert!(archive.is_temporary());
        assert!(archive.size() > 0);

        let expected: BTreeSet<String> = [
            ".htaccess",
            ".well-known/security.txt",
            "assets/img/logo.svg",
            "css/site.css",
            "index.html",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        assert_eq!(archive_entries(archive.path()), expected);

        let temp_path = archive.path().to_path_buf();
        drop(archive);
        assert!(!temp_path.exists());
    }
}

//! Nextcloud backend
//!
//! Folders and files go through WebDAV (`reqwest_dav`). Public access is
//! granted through the OCS sharing API, which plain WebDAV has no notion of.
//! Folder handles are DAV paths relative to the user's files root, e.g.
//! `gallery/sunset`.

use super::{BlobBackend, BlobError, BlobResult, RemoteFile};
use crate::models::FolderHandle;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tokio::sync::OnceCell;

const OCS_SHARES_PATH: &str = "ocs/v2.php/apps/files_sharing/api/v1/shares";
/// OCS share type for anonymous public links
const SHARE_TYPE_PUBLIC_LINK: i32 = 3;
/// OCS permission bit for read access
const PERMISSION_READ: i32 = 1;

/// Connection settings for a Nextcloud server
#[derive(Clone, Deserialize)]
pub struct WebDavConfig {
    pub server_url: String,
    pub username: String,
    pub app_password: String,
}

impl std::fmt::Debug for WebDavConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDavConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct OcsEnvelope<T> {
    ocs: OcsBody<T>,
}

#[derive(Debug, Deserialize)]
struct OcsBody<T> {
    meta: OcsMeta,
    data: T,
}

#[derive(Debug, Deserialize)]
struct OcsMeta {
    statuscode: u16,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShareData {
    share_type: i32,
    #[serde(default)]
    url: Option<String>,
}

/// Blob backend talking to a Nextcloud instance
pub struct WebDavBackend {
    config: WebDavConfig,
    http: reqwest::Client,
    dav: OnceCell<reqwest_dav::Client>,
}

impl WebDavBackend {
    pub fn new(config: WebDavConfig) -> BlobResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent(concat!("photo-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BlobError::Remote(format!("Client build failed: {}", e)))?;

        Ok(Self {
            config,
            http,
            dav: OnceCell::new(),
        })
    }

    fn server(&self) -> &str {
        self.config.server_url.trim_end_matches('/')
    }

    fn webdav_url(&self) -> String {
        format!("{}/remote.php/dav/files/{}", self.server(), self.config.username)
    }

    /// Returns the cached WebDAV client, building it on first use
    async fn dav(&self) -> BlobResult<&reqwest_dav::Client> {
        self.dav
            .get_or_try_init(|| async {
                log::debug!("Building WebDAV client for {}", self.webdav_url());
                reqwest_dav::ClientBuilder::new()
                    .set_host(self.webdav_url())
                    .set_auth(reqwest_dav::Auth::Basic(
                        self.config.username.clone(),
                        self.config.app_password.clone(),
                    ))
                    .build()
                    .map_err(|e| BlobError::Remote(format!("WebDAV client error: {:?}", e)))
            })
            .await
    }

    fn ocs_request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.app_password))
            .header("OCS-APIRequest", "true")
            .header("Accept", "application/json")
    }

    async fn parse_ocs<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> BlobResult<T> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(response.url().to_string()));
        }
        if !status.is_success() {
            return Err(BlobError::Remote(format!("OCS request returned status {}", status)));
        }

        let envelope = response
            .json::<OcsEnvelope<T>>()
            .await
            .map_err(|e| BlobError::Remote(format!("Failed to parse OCS response: {}", e)))?;

        // OCS v2 mirrors HTTP codes; v1 uses 100 for success
        if !matches!(envelope.ocs.meta.statuscode, 100 | 200) {
            return Err(BlobError::Remote(format!(
                "OCS status {}: {}",
                envelope.ocs.meta.statuscode,
                envelope.ocs.meta.message.unwrap_or_default()
            )));
        }
        Ok(envelope.ocs.data)
    }

    /// Status of a depth-0 PROPFIND on `path`, relative to the files root
    async fn propfind_status(&self, path: &str) -> BlobResult<StatusCode> {
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|e| BlobError::Remote(format!("Invalid method: {}", e)))?;
        let url = format!("{}/{}", self.webdav_url(), path.trim_matches('/'));

        let response = self
            .http
            .request(method, &url)
            .basic_auth(&self.config.username, Some(&self.config.app_password))
            .header("Depth", "0")
            .send()
            .await
            .map_err(|e| BlobError::Remote(format!("PROPFIND '{}' failed: {}", path, e)))?;
        Ok(response.status())
    }
}

/// 404 means absent; any other failure status is a remote error
fn presence(path: &str, status: StatusCode) -> BlobResult<bool> {
    match status {
        StatusCode::NOT_FOUND => Ok(false),
        status if status.is_success() => Ok(true),
        status => Err(BlobError::Remote(format!(
            "PROPFIND '{}' returned status {}",
            path, status
        ))),
    }
}

/// Last non-empty path segment of a DAV href
fn href_name(href: &str) -> Option<&str> {
    href.trim_end_matches('/').rsplit('/').next().filter(|s| !s.is_empty())
}

fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

#[async_trait]
impl BlobBackend for WebDavBackend {
    async fn authenticate(&self) -> BlobResult<()> {
        self.dav().await.map(|_| ())
    }

    async fn find_folder(&self, parent: &str, name: &str) -> BlobResult<Option<FolderHandle>> {
        if !presence(parent, self.propfind_status(parent).await?)? {
            log::debug!("Parent folder '{}' does not exist yet", parent);
            return Ok(None);
        }

        let client = self.dav().await?;
        let list = client
            .list(parent, reqwest_dav::Depth::Number(1))
            .await
            .map_err(|e| BlobError::Remote(format!("Listing '{}' failed: {:?}", parent, e)))?;

        for item in list {
            if let reqwest_dav::list_cmd::ListEntity::Folder(folder) = item {
                if href_name(&folder.href) == Some(name) {
                    return Ok(Some(FolderHandle::new(join_path(parent, name))));
                }
            }
        }
        Ok(None)
    }

    async fn create_folder(&self, parent: &str, name: &str) -> BlobResult<FolderHandle> {
        let client = self.dav().await?;

        // WebDAV cannot create nested collections in one call
        let mut current = String::new();
        for part in parent.split('/').filter(|p| !p.is_empty()) {
            current = join_path(&current, part);
            if let Err(e) = client.mkcol(&current).await {
                log::debug!("MKCOL '{}' note: {:?}", current, e);
            }
        }

        let path = join_path(parent, name);
        client
            .mkcol(&path)
            .await
            .map_err(|e| BlobError::Remote(format!("MKCOL '{}' failed: {:?}", path, e)))?;
        log::info!("Created remote folder {}", path);
        Ok(FolderHandle::new(path))
    }

    async fn upload_file(
        &self,
        folder: &FolderHandle,
        name: &str,
        content: Vec<u8>,
    ) -> BlobResult<RemoteFile> {
        let client = self.dav().await?;
        let path = join_path(folder.as_str(), name);
        client
            .put(&path, content)
            .await
            .map_err(|e| BlobError::Remote(format!("Upload of '{}' failed: {:?}", path, e)))?;
        log::info!("Uploaded {}", path);
        Ok(RemoteFile {
            id: path,
            name: name.to_string(),
        })
    }

    async fn make_public(&self, file: &RemoteFile) -> BlobResult<()> {
        let url = format!("{}/{}?format=json", self.server(), OCS_SHARES_PATH);
        let path = format!("/{}", file.id);
        let share_type = SHARE_TYPE_PUBLIC_LINK.to_string();
        let permissions = PERMISSION_READ.to_string();
        let response = self
            .ocs_request(Method::POST, &url)
            .form(&[
                ("path", path.as_str()),
                ("shareType", share_type.as_str()),
                ("permissions", permissions.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BlobError::Remote(format!("Share request failed: {}", e)))?;

        Self::parse_ocs::<serde_json::Value>(response).await?;
        log::debug!("Shared {} publicly", file.id);
        Ok(())
    }

    async fn public_link(&self, file: &RemoteFile) -> BlobResult<String> {
        let url = format!("{}/{}", self.server(), OCS_SHARES_PATH);
        let path = format!("/{}", file.id);
        let response = self
            .ocs_request(Method::GET, &url)
            .query(&[("format", "json"), ("path", path.as_str()), ("reshares", "false")])
            .send()
            .await
            .map_err(|e| BlobError::Remote(format!("Share lookup failed: {}", e)))?;

        let shares = Self::parse_ocs::<Vec<ShareData>>(response).await?;
        shares
            .into_iter()
            .filter(|share| share.share_type == SHARE_TYPE_PUBLIC_LINK)
            .find_map(|share| share.url)
            .map(|share_url| format!("{}/download", share_url.trim_end_matches('/')))
            .ok_or_else(|| BlobError::Remote(format!("No public link for {}", file.id)))
    }

    async fn folder_exists(&self, folder: &FolderHandle) -> BlobResult<bool> {
        let status = self.propfind_status(folder.as_str()).await?;
        presence(folder.as_str(), status)
    }

    async fn delete_folder(&self, folder: &FolderHandle) -> BlobResult<()> {
        let client = self.dav().await?;
        client
            .delete(folder.as_str())
            .await
            .map_err(|e| BlobError::Remote(format!("DELETE '{}' failed: {:?}", folder, e)))?;
        log::info!("Deleted remote folder {}", folder);
        Ok(())
    }
}

//! Streaming read session over a resolved object
//!
//! The download is opened lazily on the first read. Every wait on the
//! network, the open included, is bounded by the stall timeout: a read that
//! sees no bytes within it fails with [`FsError::Timeout`].

use crate::fs::cache::Listing;
use crate::fs::error::{FsError, FsResult};
use crate::fs::lister::DirectoryLister;
use crate::fs::metadata::Metadata;
use crate::fs::path::display_path;
use crate::onedrive_service::onedrive_client::{DownloadStream, RemoteStore};
use crate::onedrive_service::onedrive_models::RemoteObject;
use bytes::{Buf, Bytes};
use futures_util::StreamExt;
use log::{debug, error};
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

enum ReadState {
    Created,
    Streaming {
        stream: DownloadStream,
        pending: Bytes,
    },
    Closed,
}

pub struct ReadHandle {
    path: String,
    object: RemoteObject,
    store: Arc<dyn RemoteStore>,
    lister: Arc<DirectoryLister>,
    stall_timeout: Duration,
    state: ReadState,
    position: u64,
    at_end: bool,
    directory: Option<(Listing, usize)>,
}

impl ReadHandle {
    pub(crate) fn new(
        path: String,
        object: RemoteObject,
        store: Arc<dyn RemoteStore>,
        lister: Arc<DirectoryLister>,
        stall_timeout: Duration,
    ) -> Self {
        Self {
            path,
            object,
            store,
            lister,
            stall_timeout,
            state: ReadState::Created,
            position: 0,
            at_end: false,
            directory: None,
        }
    }

    pub fn path(&self) -> &str {
        display_path(&self.path)
    }

    pub fn object(&self) -> &RemoteObject {
        &self.object
    }

    pub fn stat(&self) -> Metadata {
        Metadata::from(&self.object)
    }

    /// Bytes handed out since the last reset
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, ReadState::Streaming { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ReadState::Closed)
    }

    /// Read the next bytes into `buf`; `Ok(0)` means end of file.
    pub async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        if self.is_closed() {
            return Err(FsError::HandleClosed(self.path().to_string()));
        }
        if self.object.is_container {
            return Err(FsError::unsupported(format!(
                "reading content of folder {}",
                self.path()
            )));
        }
        if buf.is_empty() || self.at_end {
            return Ok(0);
        }

        if matches!(self.state, ReadState::Created) {
            let stream = self.open_stream().await?;
            self.state = ReadState::Streaming {
                stream,
                pending: Bytes::new(),
            };
        }

        let ReadState::Streaming { stream, pending } = &mut self.state else {
            return Err(FsError::HandleClosed(display_path(&self.path).to_string()));
        };

        while pending.is_empty() {
            match timeout(self.stall_timeout, stream.next()).await {
                Err(_) => {
                    error!(
                        "Failed to download {}: no data was transferred for {:?}",
                        display_path(&self.path),
                        self.stall_timeout
                    );
                    return Err(FsError::Timeout(self.stall_timeout));
                }
                Ok(None) => {
                    debug!("Download of {} finished", display_path(&self.path));
                    self.at_end = true;
                    self.state = ReadState::Created;
                    return Ok(0);
                }
                Ok(Some(Err(e))) => {
                    error!("Failed to download {}: {:#}", display_path(&self.path), e);
                    return Err(e.into());
                }
                Ok(Some(Ok(chunk))) => *pending = chunk,
            }
        }

        let n = buf.len().min(pending.len());
        buf[..n].copy_from_slice(&pending[..n]);
        pending.advance(n);
        self.position += n as u64;
        Ok(n)
    }

    async fn open_stream(&self) -> FsResult<DownloadStream> {
        debug!("Opening download stream for {}", self.path());
        match timeout(self.stall_timeout, self.store.open_download_stream(&self.object.id)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => {
                error!("Failed to download {}: {:#}", self.path(), e);
                Err(e.into())
            }
            Err(_) => {
                error!(
                    "Failed to download {}: no response for {:?}",
                    self.path(),
                    self.stall_timeout
                );
                Err(FsError::Timeout(self.stall_timeout))
            }
        }
    }

    /// Reposition the handle.
    ///
    /// `Start(0)` rewinds and drops the current download, so the next read
    /// starts a new one. `End(0)` reports the known size without reading.
    /// Any other target is rejected.
    pub fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        if self.is_closed() {
            return Err(FsError::HandleClosed(self.path().to_string()));
        }

        match pos {
            SeekFrom::Start(0) => {
                self.state = ReadState::Created;
                self.position = 0;
                self.at_end = false;
                Ok(0)
            }
            SeekFrom::End(0) => {
                self.position = self.object.size;
                self.at_end = true;
                Ok(self.position)
            }
            other => Err(FsError::unsupported(format!(
                "seek to {:?} on {}",
                other,
                self.path()
            ))),
        }
    }

    /// Release the download, if any. Safe to call repeatedly.
    pub fn close(&mut self) -> FsResult<()> {
        if !self.is_closed() {
            debug!("Close {}", self.path());
        }
        self.state = ReadState::Closed;
        self.directory = None;
        Ok(())
    }

    /// Next entries of the folder this handle was opened on.
    ///
    /// The listing is snapshotted on the first call; later calls continue
    /// where the previous one stopped. `count == 0` returns all remaining
    /// entries, and an exhausted listing yields an empty vector.
    pub async fn read_directory(&mut self, count: usize) -> FsResult<Vec<Metadata>> {
        if self.is_closed() {
            return Err(FsError::HandleClosed(self.path().to_string()));
        }
        if !self.object.is_container {
            return Err(FsError::NotAContainer(self.path().to_string()));
        }

        if self.directory.is_none() {
            let listing = self.lister.list_children(&self.path, &self.object).await?;
            self.directory = Some((listing, 0));
        }

        let Some((listing, cursor)) = self.directory.as_mut() else {
            return Ok(Vec::new());
        };
        let end = if count == 0 {
            listing.len()
        } else {
            listing.len().min(cursor.saturating_add(count))
        };
        let entries = listing[*cursor..end].iter().map(Metadata::from).collect();
        *cursor = end;
        Ok(entries)
    }
}

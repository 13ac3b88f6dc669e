//! Compression Codec
//!
//! zstd compression served by a background worker. Callers submit jobs over
//! a channel and await the reply, so the codec's asynchrony shows up in the
//! signatures. The worker fans each job out to tokio's blocking pool.

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::{CacheError, Result};

/// Frame header every zstd payload starts with.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default zstd level, balanced for speed.
pub const DEFAULT_LEVEL: i32 = 3;

const QUEUE_DEPTH: usize = 64;

// == Codec Job ==
enum CodecJob {
    Compress {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<Vec<u8>>>,
    },
    Decompress {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<Vec<u8>>>,
    },
}

impl CodecJob {
    fn run(self, level: i32) {
        // The caller may have gone away; a dropped receiver is fine
        match self {
            CodecJob::Compress { data, reply } => {
                let _ = reply.send(encode(&data, level));
            }
            CodecJob::Decompress { data, reply } => {
                let _ = reply.send(decode(&data));
            }
        }
    }
}

impl std::fmt::Debug for CodecJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecJob::Compress { data, .. } => write!(f, "Compress({} bytes)", data.len()),
            CodecJob::Decompress { data, .. } => write!(f, "Decompress({} bytes)", data.len()),
        }
    }
}

// == Codec ==
/// Handle to the compression worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Codec {
    jobs: mpsc::Sender<CodecJob>,
}

impl Codec {
    // == Spawn ==
    /// Starts the worker on the current tokio runtime.
    ///
    /// Fails when called outside a runtime.
    pub fn spawn(level: i32) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| CacheError::Codec(format!("codec worker unavailable: {}", e)))?;
        let (jobs, rx) = mpsc::channel(QUEUE_DEPTH);
        handle.spawn(run_worker(rx, level));
        info!(level, "Compression worker started");
        Ok(Self { jobs })
    }

    /// Whether the worker is still accepting jobs.
    pub fn is_available(&self) -> bool {
        !self.jobs.is_closed()
    }

    // == Compress ==
    pub async fn compress(&self, text: String) -> Result<Vec<u8>> {
        let data = text.into_bytes();
        self.submit(|reply| CodecJob::Compress { data, reply }).await
    }

    // == Decompress ==
    /// Decompresses zstd data; anything else is returned unchanged.
    pub async fn decompress(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        if !is_compressed(&data) {
            return Ok(data);
        }
        self.submit(|reply| CodecJob::Decompress { data, reply }).await
    }

    async fn submit<F>(&self, job: F) -> Result<Vec<u8>>
    where
        F: FnOnce(oneshot::Sender<Result<Vec<u8>>>) -> CodecJob,
    {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(job(reply))
            .await
            .map_err(|_| CacheError::Codec("codec worker stopped".to_string()))?;
        rx.await
            .map_err(|_| CacheError::Codec("codec worker dropped the job".to_string()))?
    }

    #[cfg(test)]
    pub(crate) fn closed() -> Self {
        let (jobs, _) = mpsc::channel(1);
        Self { jobs }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<CodecJob>, level: i32) {
    while let Some(job) = rx.recv().await {
        debug!(?job, "Codec job received");
        tokio::task::spawn_blocking(move || job.run(level));
    }
    debug!("Compression worker stopped");
}

// == Blocking Primitives ==
/// Compresses `data` on the calling thread.
pub fn encode(data: &[u8], level: i32) -> Result<Vec<u8>> {
    zstd::encode_all(data, level).map_err(|e| CacheError::Codec(format!("zstd compression failed: {}", e)))
}

/// Decompresses zstd data on the calling thread; other input passes through.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    if !is_compressed(data) {
        return Ok(data.to_vec());
    }
    zstd::decode_all(data).map_err(|e| CacheError::Codec(format!("zstd decompression failed: {}", e)))
}

pub fn is_compressed(data: &[u8]) -> bool {
    data.starts_with(&ZSTD_MAGIC)
}

//! Anonymous FTP listing and retrieval
//!
//! Every call opens its own control connection, logs in anonymously, changes
//! into the target directory and always sends QUIT before returning. The FTP
//! library is blocking, so sessions run on the blocking pool. Both sockets
//! carry read and write timeouts, and the async side enforces the deadlines
//! too: a listing has a whole-operation deadline, a retrieval fails once no
//! bytes have arrived for the idle timeout. A session the async side gives up
//! on is shut down before the call returns.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::client::config::ClientConfig;
use crate::app::client::download;
use crate::app::client::ProgressFn;
use crate::errors::{NetworkError, NetworkResult};

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// How long an aborted session may take to unwind
const ABORT_GRACE: Duration = Duration::from_secs(2);

/// Socket timeouts sit this far past the async deadlines and only catch what
/// an abort cannot reach, such as a stalled data connection
const SOCKET_TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

/// Settings a blocking session needs, detached from the async handler
#[derive(Debug, Clone)]
struct SessionSettings {
    host: String,
    port: u16,
    connect_timeout: Duration,
    chunk_size: usize,
}

/// Handle the async side keeps on a running blocking session
///
/// Aborting shuts the control socket down, which fails any read blocked on
/// it, and tells the transfer loop to stop touching files and progress.
#[derive(Debug, Clone, Default)]
struct SessionAbort {
    control: Arc<Mutex<Option<TcpStream>>>,
    cancelled: Arc<AtomicBool>,
}

impl SessionAbort {
    fn register(&self, stream: &TcpStream) {
        match stream.try_clone() {
            Ok(clone) => {
                if let Ok(mut slot) = self.control.lock() {
                    *slot = Some(clone);
                }
            }
            Err(e) => debug!("Could not keep a handle on the control socket: {}", e),
        }
        // Aborted before the socket existed
        if self.is_cancelled() {
            self.shutdown();
        }
    }

    fn abort(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.shutdown();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn shutdown(&self) {
        let Ok(mut slot) = self.control.lock() else {
            return;
        };
        if let Some(stream) = slot.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("Control socket shutdown: {}", e);
            }
        }
    }
}

/// FTP operations handler
#[derive(Debug, Clone)]
pub struct FtpHandler {
    settings: SessionSettings,
    listing_timeout: Duration,
    transfer_timeout: Duration,
}

impl FtpHandler {
    /// Creates a handler for the configured host
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            settings: SessionSettings {
                host: config.ftp_host.clone(),
                port: config.ftp_port,
                connect_timeout: config.connect_timeout,
                chunk_size: config.chunk_size.max(1),
            },
            listing_timeout: config.listing_timeout,
            transfer_timeout: config.transfer_timeout,
        }
    }

    /// Lists the file names in a remote directory
    ///
    /// Names are returned bare (any directory prefix the server adds is
    /// stripped) and in server order.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::Timeout` when the whole session exceeds the
    /// listing deadline, or the connect/FTP error that ended it.
    pub async fn list_files(&self, directory: &str) -> NetworkResult<Vec<String>> {
        let abort = SessionAbort::default();
        let mut handle = {
            let settings = self.settings.clone();
            let remote_dir = directory.to_string();
            let io_timeout = self.listing_timeout + SOCKET_TIMEOUT_MARGIN;
            let abort = abort.clone();
            tokio::task::spawn_blocking(move || {
                with_session(&settings, &remote_dir, io_timeout, &abort, |ftp| {
                    ftp.nlst(None).map_err(ftp_error("NLST"))
                })
            })
        };

        let outcome = tokio::time::timeout(self.listing_timeout, &mut handle).await;
        let names = match outcome {
            Err(_) => {
                warn!("Listing {} exceeded {:?}", directory, self.listing_timeout);
                release(&abort, handle).await;
                return Err(NetworkError::Timeout {
                    after: self.listing_timeout,
                });
            }
            Ok(Err(join_error)) => {
                return Err(NetworkError::Worker {
                    reason: join_error.to_string(),
                })
            }
            Ok(Ok(result)) => result?,
        };

        debug!("Listed {} entries in {}", names.len(), directory);
        Ok(names.iter().map(|name| bare_name(name)).collect())
    }

    /// Retrieves `filename` from `directory` into `destination`
    ///
    /// Bytes land in a temporary sibling that is renamed into place only on
    /// success; on failure the temporary file is removed.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::Timeout` when no data arrives for the idle
    /// timeout, or the connect/FTP/I/O error that ended the transfer.
    pub async fn fetch(
        &self,
        directory: &str,
        filename: &str,
        destination: &Path,
        progress: ProgressFn,
    ) -> NetworkResult<u64> {
        let temp_path = download::prepare_destination(destination).await?;
        let received = Arc::new(AtomicU64::new(0));
        let abort = SessionAbort::default();

        info!("Starting FTP download of {}{}", directory, filename);

        let handle = {
            let settings = self.settings.clone();
            let remote_dir = directory.to_string();
            let remote_file = filename.to_string();
            let temp_path = temp_path.clone();
            let received = Arc::clone(&received);
            let io_timeout = self.transfer_timeout + SOCKET_TIMEOUT_MARGIN;
            let abort = abort.clone();
            tokio::task::spawn_blocking(move || {
                with_session(&settings, &remote_dir, io_timeout, &abort, |ftp| {
                    let target = Transfer {
                        filename: &remote_file,
                        temp_path: &temp_path,
                        chunk_size: settings.chunk_size,
                        io_timeout,
                    };
                    retrieve(ftp, &target, &received, &progress, &abort)
                })
            })
        };

        match watch_transfer(handle, &received, self.transfer_timeout, &abort).await {
            Ok(bytes) => {
                download::commit(&temp_path, destination).await?;
                Ok(bytes)
            }
            Err(e) => {
                download::discard(&temp_path).await;
                Err(e)
            }
        }
    }
}

/// Wait for a blocking transfer, failing it when the byte count stalls
///
/// A stalled session is aborted and given a short grace period to unwind, so
/// its files are closed before the caller cleans up.
async fn watch_transfer(
    mut handle: JoinHandle<NetworkResult<u64>>,
    received: &AtomicU64,
    idle_timeout: Duration,
    abort: &SessionAbort,
) -> NetworkResult<u64> {
    let check_every = (idle_timeout / 4).max(Duration::from_millis(50));
    let mut ticker = tokio::time::interval(check_every);
    let mut last_seen = received.load(Ordering::Relaxed);
    let mut last_change = Instant::now();

    loop {
        tokio::select! {
            joined = &mut handle => {
                return match joined {
                    Ok(result) => result,
                    Err(join_error) => Err(NetworkError::Worker {
                        reason: join_error.to_string(),
                    }),
                };
            }
            _ = ticker.tick() => {
                let now = received.load(Ordering::Relaxed);
                if now != last_seen {
                    last_seen = now;
                    last_change = Instant::now();
                } else if last_change.elapsed() >= idle_timeout {
                    warn!("Transfer stalled at {} bytes", now);
                    release(abort, handle).await;
                    return Err(NetworkError::Timeout {
                        after: idle_timeout,
                    });
                }
            }
        }
    }
}

/// Abort a session the async side gave up on and wait for it to unwind
async fn release<T>(abort: &SessionAbort, handle: JoinHandle<T>) {
    abort.abort();
    if tokio::time::timeout(ABORT_GRACE, handle).await.is_err() {
        warn!("FTP session still running {:?} after abort", ABORT_GRACE);
    }
}

/// Run `op` inside an anonymous session rooted at `directory`
///
/// Every blocking read or write on the control connection fails after
/// `io_timeout`. QUIT is attempted whether or not the body succeeded.
fn with_session<T>(
    settings: &SessionSettings,
    directory: &str,
    io_timeout: Duration,
    abort: &SessionAbort,
    op: impl FnOnce(&mut FtpStream) -> NetworkResult<T>,
) -> NetworkResult<T> {
    let connect_error = |e: &dyn std::fmt::Display| NetworkError::Connect {
        host: settings.host.clone(),
        reason: e.to_string(),
    };

    let addr = resolve(&settings.host, settings.port)?;
    let stream = TcpStream::connect_timeout(&addr, settings.connect_timeout)
        .map_err(|e| connect_error(&e))?;
    set_io_timeout(&stream, io_timeout).map_err(|e| connect_error(&e))?;
    abort.register(&stream);

    let mut ftp = FtpStream::connect_with_stream(stream).map_err(|e| connect_error(&e))?;

    let result = enter_directory(&mut ftp, directory).and_then(|()| op(&mut ftp));

    if let Err(e) = ftp.quit() {
        debug!("QUIT failed on {}: {}", settings.host, e);
    }
    result
}

fn set_io_timeout(stream: &TcpStream, timeout: Duration) -> std::io::Result<()> {
    // A zero timeout is rejected by the socket API
    let timeout = timeout.max(Duration::from_millis(1));
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))
}

fn enter_directory(ftp: &mut FtpStream, directory: &str) -> NetworkResult<()> {
    ftp.login(ANONYMOUS_USER, ANONYMOUS_PASSWORD)
        .map_err(ftp_error("login"))?;
    ftp.cwd(directory).map_err(ftp_error("CWD"))?;
    Ok(())
}

/// What a blocking retrieval writes and how
struct Transfer<'a> {
    filename: &'a str,
    temp_path: &'a Path,
    chunk_size: usize,
    io_timeout: Duration,
}

fn retrieve(
    ftp: &mut FtpStream,
    target: &Transfer<'_>,
    received: &AtomicU64,
    progress: &ProgressFn,
    abort: &SessionAbort,
) -> NetworkResult<u64> {
    ftp.transfer_type(FileType::Binary)
        .map_err(ftp_error("TYPE I"))?;
    // SIZE is optional on many servers; progress just lacks a total then
    let total = ftp.size(target.filename).ok().map(|size| size as u64);

    let mut stream = ftp
        .retr_as_stream(target.filename)
        .map_err(ftp_error("RETR"))?;
    set_io_timeout(stream.get_ref(), target.io_timeout)?;

    if abort.is_cancelled() {
        return Err(aborted());
    }
    let mut file = std::fs::File::create(target.temp_path)?;
    let mut buffer = vec![0u8; target.chunk_size];
    let mut written = 0u64;

    loop {
        let read = stream.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        if abort.is_cancelled() {
            return Err(aborted());
        }
        file.write_all(&buffer[..read])?;
        written += read as u64;
        received.store(written, Ordering::Relaxed);
        progress(written, total);
    }
    file.flush()?;

    ftp.finalize_retr_stream(stream)
        .map_err(ftp_error("RETR"))?;
    Ok(written)
}

fn aborted() -> NetworkError {
    NetworkError::Worker {
        reason: "session aborted after timeout".to_string(),
    }
}

fn resolve(host: &str, port: u16) -> NetworkResult<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| NetworkError::Connect {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or_else(|| NetworkError::Connect {
            host: host.to_string(),
            reason: "host name resolved to no addresses".to_string(),
        })
}

fn ftp_error(operation: &'static str) -> impl Fn(FtpError) -> NetworkError {
    move |e| NetworkError::Ftp {
        operation: operation.to_string(),
        reason: e.to_string(),
    }
}

/// Strip any directory prefix a server puts in NLST output
fn bare_name(entry: &str) -> String {
    entry
        .trim_end_matches(['\r', '\n'])
        .rsplit('/')
        .next()
        .unwrap_or(entry)
        .to_string()
}

//! Redis key source
//!
//! Enumerates keys with `SCAN cursor MATCH pattern COUNT n` on a dedicated
//! producer connection and prices them with `MEMORY USAGE`. Worker lookups
//! borrow connections from a small pool that grows to the number of
//! concurrent callers.

use crate::cancel::CancelToken;
use crate::error::{KeyscopeError, Result};
use crate::scanner::ScanOptions;
use crate::source::{KeySource, KeyStream};
use redis::{Client, Connection};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connect timeout for every pooled connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`KeySource`] backed by a single Redis endpoint.
pub struct RedisKeySource {
    client: Client,
    idle: Mutex<Vec<Connection>>,
}

impl RedisKeySource {
    /// Open a source for `url` (`redis://[:password@]host:port[/db]`) and
    /// verify the server is reachable.
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| KeyscopeError::Config(format!("Invalid redis url '{url}': {e}")))?;
        let source = Self {
            client,
            idle: Mutex::new(Vec::new()),
        };
        let mut conn = source.checkout()?;
        redis::cmd("PING").query::<String>(&mut conn)?;
        source.checkin(conn);
        info!(url = %redact_url(url), "Connected to redis");
        Ok(source)
    }

    fn connect(&self) -> Result<Connection> {
        self.client
            .get_connection_with_timeout(CONNECT_TIMEOUT)
            .map_err(|e| KeyscopeError::Connection(e.to_string()))
    }

    fn checkout(&self) -> Result<Connection> {
        let pooled = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
        match pooled {
            Some(conn) => Ok(conn),
            None => self.connect(),
        }
    }

    fn checkin(&self, conn: Connection) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn);
    }

    /// Run `f` on a pooled connection. Connections that failed at the
    /// transport level are dropped instead of returned to the pool.
    fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.checkout()?;
        let result = f(&mut conn);
        match &result {
            Err(e) if e.is_connection() => {}
            _ => self.checkin(conn),
        }
        result
    }
}

impl KeySource for RedisKeySource {
    fn scan_keys(&self, options: &ScanOptions, cancel: &CancelToken) -> Result<KeyStream> {
        let mut conn = self.connect()?;
        let pattern = options.pattern.clone();
        let count = options.scan_count.max(1);
        let cancel = cancel.clone();

        KeyStream::spawn(options, move |sink| {
            let mut cursor: u64 = 0;
            let mut batches = 0u64;
            loop {
                if cancel.is_cancelled() {
                    debug!(batches, "Key scan cancelled");
                    return Ok(());
                }
                let (next, raw): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(count)
                    .query(&mut conn)?;
                batches += 1;
                for key in decode_keys(raw) {
                    if !sink.send(key) {
                        return Ok(());
                    }
                }
                if next == 0 {
                    debug!(batches, "Key scan exhausted");
                    return Ok(());
                }
                cursor = next;
            }
        })
    }

    fn keys_count(&self) -> Result<u64> {
        self.with_connection(|conn| Ok(redis::cmd("DBSIZE").query::<u64>(conn)?))
    }

    fn memory_usage(&self, key: &str) -> Result<u64> {
        self.with_connection(|conn| {
            let usage: Option<u64> = redis::cmd("MEMORY").arg("USAGE").arg(key).query(conn)?;
            usage.ok_or_else(|| KeyscopeError::KeyMissing(key.to_string()))
        })
    }
}

/// Keys as UTF-8 strings. Keys that are not valid UTF-8 cannot be segmented
/// and are logged and skipped.
fn decode_keys(raw: Vec<Vec<u8>>) -> impl Iterator<Item = String> {
    raw.into_iter().filter_map(|bytes| match String::from_utf8(bytes) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(
                key = %String::from_utf8_lossy(e.as_bytes()),
                "Key is not valid UTF-8, skipping"
            );
            None
        }
    })
}

/// Hide the password component of a redis url for logging.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

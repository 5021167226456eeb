//! memcached text protocol client for the `stats` family of commands.
//!
//! Requests are single ASCII lines (`stats\n`, `stats items\n`). Each response
//! is a run of `STAT <key> <value>` lines closed by `END`. A blank line or EOF
//! also ends the response.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{PollerError, Result};
use crate::value::{cast, StatValue};

pub const CMD_STATS: &str = "stats";
pub const CMD_STATS_ITEMS: &str = "stats items";

const END_MARKER: &str = "END";

/// A line-oriented client connection to a memcached server.
///
/// The poller opens the connection before each refresh and closes it right
/// after, so implementations must support repeated open/close cycles.
pub trait Connection: Send {
    fn open(&mut self, host: &str, port: u16) -> Result<()>;

    /// Sends one command; the line terminator is appended by the connection.
    fn send(&mut self, command: &str) -> Result<()>;

    /// Reads one response line without its terminator, `None` on EOF.
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Releases the connection. Safe to call when already closed.
    fn close(&mut self);
}

/// Blocking TCP connection with per-operation timeouts.
pub struct TcpConnection {
    connect_timeout: Duration,
    io_timeout: Duration,
    addr: String,
    stream: Option<BufReader<TcpStream>>,
}

impl TcpConnection {
    pub fn new(connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            io_timeout,
            addr: String::new(),
            stream: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn io_err(&self, source: std::io::Error) -> PollerError {
        PollerError::Io {
            addr: self.addr.clone(),
            source,
        }
    }
}

impl Default for TcpConnection {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(5))
    }
}

impl Connection for TcpConnection {
    fn open(&mut self, host: &str, port: u16) -> Result<()> {
        self.close();
        self.addr = format!("{host}:{port}");

        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| self.io_err(e))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.io_timeout))
                        .map_err(|e| self.io_err(e))?;
                    stream
                        .set_write_timeout(Some(self.io_timeout))
                        .map_err(|e| self.io_err(e))?;
                    debug!("Connected to memcached at {}", addr);
                    self.stream = Some(BufReader::new(stream));
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }

        let err = last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
        });
        Err(self.io_err(err))
    }

    fn send(&mut self, command: &str) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(PollerError::NotConnected)?;
        let mut line = Vec::with_capacity(command.len() + 1);
        line.extend_from_slice(command.as_bytes());
        line.push(b'\n');
        let res = stream.get_mut().write_all(&line);
        res.map_err(|e| self.io_err(e))
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let stream = self.stream.as_mut().ok_or(PollerError::NotConnected)?;
        let mut buf = String::new();
        let res = stream.read_line(&mut buf);
        match res {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string())),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.get_ref().shutdown(std::net::Shutdown::Both);
            debug!("Closed connection to {}", self.addr);
        }
    }
}

/// Parses one `<tag> <key> <value>` record. The value is everything after the
/// key, so values containing spaces survive intact.
pub fn parse_stat_line(line: &str) -> Result<(String, StatValue)> {
    let line = line.trim();
    if line == "ERROR"
        || line.starts_with("CLIENT_ERROR")
        || line.starts_with("SERVER_ERROR")
    {
        return Err(PollerError::Server(line.to_string()));
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let _tag = parts.next();
    let rest = parts.next().map(str::trim_start).unwrap_or("");
    let mut parts = rest.splitn(2, char::is_whitespace);
    match (parts.next(), parts.next().map(str::trim_start)) {
        (Some(key), Some(value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), cast(value)))
        }
        _ => Err(PollerError::MalformedLine(line.to_string())),
    }
}

/// Sends `command` and collects the records of its response.
pub fn query(conn: &mut dyn Connection, command: &str) -> Result<Vec<(String, StatValue)>> {
    debug!("Sending '{}'", command);
    conn.send(command)?;

    let mut records = Vec::new();
    while let Some(line) = conn.read_line()? {
        let line = line.trim();
        if line.is_empty() || line == END_MARKER {
            break;
        }
        trace!("<- {}", line);
        records.push(parse_stat_line(line)?);
    }

    debug!("'{}' returned {} records", command, records.len());
    Ok(records)
}

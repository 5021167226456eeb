//! Shared fixtures: a scripted in-memory memcached connection and
//! descriptor files.

#![allow(dead_code)]

use memcached_gmond::error::{PollerError, Result};
use memcached_gmond::Connection;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::{Arc, Mutex};

pub const STATS: &[&str] = &[
    "STAT pid 1234",
    "STAT version 1.6.21",
    "STAT curr_items 10",
    "STAT rusage_user 0.500000",
];

pub const STATS_ITEMS: &[&str] = &[
    "STAT items:1:number 5",
    "STAT items:1:age 100",
    "STAT items:2:age 300",
    "STAT items:3:age 200",
    "STAT items:5:age 400",
];

/// What the fake connection observed.
#[derive(Debug, Default)]
pub struct Observed {
    pub opens: usize,
    pub close_calls: usize,
    pub commands: Vec<String>,
}

pub struct FakeConnection {
    responses: HashMap<String, Vec<String>>,
    pending: VecDeque<String>,
    is_open: bool,
    fail_open: bool,
    observed: Arc<Mutex<Observed>>,
}

impl FakeConnection {
    pub fn new(stats: &[&str], items: &[&str]) -> (Self, Arc<Mutex<Observed>>) {
        let observed = Arc::new(Mutex::new(Observed::default()));
        let responses = HashMap::from([
            ("stats".to_string(), stats.iter().map(|s| s.to_string()).collect()),
            (
                "stats items".to_string(),
                items.iter().map(|s| s.to_string()).collect(),
            ),
        ]);
        let conn = Self {
            responses,
            pending: VecDeque::new(),
            is_open: false,
            fail_open: false,
            observed: Arc::clone(&observed),
        };
        (conn, observed)
    }

    pub fn standard() -> (Self, Arc<Mutex<Observed>>) {
        Self::new(STATS, STATS_ITEMS)
    }

    pub fn unreachable() -> (Self, Arc<Mutex<Observed>>) {
        let (mut conn, observed) = Self::standard();
        conn.fail_open = true;
        (conn, observed)
    }
}

impl Connection for FakeConnection {
    fn open(&mut self, host: &str, port: u16) -> Result<()> {
        if self.fail_open {
            return Err(PollerError::Io {
                addr: format!("{host}:{port}"),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            });
        }
        self.observed.lock().unwrap().opens += 1;
        self.is_open = true;
        Ok(())
    }

    fn send(&mut self, command: &str) -> Result<()> {
        if !self.is_open {
            return Err(PollerError::NotConnected);
        }
        self.observed
            .lock()
            .unwrap()
            .commands
            .push(command.to_string());
        match self.responses.get(command) {
            Some(lines) => {
                self.pending.extend(lines.iter().cloned());
                self.pending.push_back("END".to_string());
            }
            None => self.pending.push_back("ERROR".to_string()),
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        if !self.is_open {
            return Err(PollerError::NotConnected);
        }
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) {
        self.observed.lock().unwrap().close_calls += 1;
        self.pending.clear();
        self.is_open = false;
    }
}

/// Writes a descriptor file with one `%s`-formatted entry per name.
pub fn descriptor_file(names: &[&str]) -> tempfile::NamedTempFile {
    let descriptors: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            serde_json::json!({
                "name": name,
                "format": "%s",
                "value_type": "uint",
                "groups": "memcached",
            })
        })
        .collect();
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{}", serde_json::Value::Array(descriptors)).unwrap();
    file
}

use crate::serial::{SerialLine, decode_snapshot, encode_snapshot};
use crate::traits::{
    ConnectionController, KnownNetworkSet, NetworkCredential, NetworkScanner, RecordSource,
    SerialChannel,
};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// 测试用的模拟后端：不接触任何真实硬件或系统命令。

/// In-memory credential records. `None` content simulates a record that
/// cannot be read.
#[derive(Debug, Default)]
pub struct MockRecords {
    records: HashMap<String, Option<String>>,
}

impl MockRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, content: &str) -> Self {
        self.records.insert(name.to_string(), Some(content.to_string()));
        self
    }

    pub fn unreadable(mut self, name: &str) -> Self {
        self.records.insert(name.to_string(), None);
        self
    }
}

#[async_trait]
impl RecordSource for MockRecords {
    async fn list_records(&self) -> Result<Vec<String>> {
        Ok(self.records.keys().cloned().collect())
    }

    async fn read_record(&self, name: &str) -> Result<String> {
        match self.records.get(name) {
            Some(Some(content)) => Ok(content.clone()),
            Some(None) => Err(Error::CommandFailed(format!("permission denied: {}", name))),
            None => Err(Error::CommandFailed(format!("no such record: {}", name))),
        }
    }
}

/// Scanner whose visible set can be changed between ticks.
#[derive(Debug, Default)]
pub struct MockScanner {
    visible: Mutex<HashSet<String>>,
    failing: AtomicBool,
}

impl MockScanner {
    pub fn new(visible: &[&str]) -> Self {
        let scanner = Self::default();
        scanner.set_visible(visible);
        scanner
    }

    pub fn set_visible(&self, visible: &[&str]) {
        *self.visible.lock().unwrap() = visible.iter().map(|s| s.to_string()).collect();
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkScanner for MockScanner {
    async fn visible_ssids(&self) -> Result<HashSet<String>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::CommandFailed("simulated scan failure".into()));
        }
        Ok(self.visible.lock().unwrap().clone())
    }
}

/// Host connection state with scripted switch failures.
#[derive(Debug, Default)]
pub struct MockController {
    current: Mutex<Option<String>>,
    failures_left: AtomicUsize,
    queries: AtomicUsize,
    switches: Mutex<Vec<String>>,
}

impl MockController {
    pub fn connected_to(ssid: Option<&str>) -> Self {
        let controller = Self::default();
        controller.set_current(ssid);
        controller
    }

    /// Simulates an out-of-band change, e.g. the user picking a network.
    pub fn set_current(&self, ssid: Option<&str>) {
        *self.current.lock().unwrap() = ssid.map(String::from);
    }

    /// The next `n` switch attempts fail.
    pub fn fail_next_switches(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn switches(&self) -> Vec<String> {
        self.switches.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionController for MockController {
    async fn current_ssid(&self) -> Result<Option<String>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.lock().unwrap().clone())
    }

    async fn switch_to(&self, ssid: &str) -> Result<()> {
        self.switches.lock().unwrap().push(ssid.to_string());
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Switch {
                ssid: ssid.to_string(),
                reason: "simulated association failure".into(),
            });
        }
        *self.current.lock().unwrap() = Some(ssid.to_string());
        Ok(())
    }
}

/// Scripted serial device. Lines are handed out in order; once the script
/// runs out, reads fail as if the board was unplugged, unless the channel is
/// held open, in which case they wait forever.
#[derive(Debug, Default)]
pub struct MockChannel {
    script: Mutex<VecDeque<SerialLine>>,
    sent: Mutex<Vec<String>>,
    failing_writes: AtomicBool,
    held_open: bool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held_open() -> Self {
        Self {
            held_open: true,
            ..Self::default()
        }
    }

    pub fn with_lines(lines: &[&str]) -> Self {
        let channel = Self::default();
        for line in lines {
            channel.push_line(line);
        }
        channel
    }

    pub fn push_line(&self, raw: &str) {
        self.script.lock().unwrap().push_back(SerialLine::parse(raw));
    }

    pub fn set_write_failure(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    /// Raw snapshot lines that reached the board.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// The last snapshot as the board would parse it.
    pub fn last_received(&self) -> Option<Vec<NetworkCredential>> {
        self.sent.lock().unwrap().last().map(|line| decode_snapshot(line))
    }
}

#[async_trait]
impl SerialChannel for MockChannel {
    async fn write_snapshot(&self, networks: &KnownNetworkSet) -> Result<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(Error::Transport("simulated write failure".into()));
        }
        self.sent.lock().unwrap().push(encode_snapshot(networks));
        Ok(())
    }

    async fn read_line(&self) -> Result<SerialLine> {
        // 让出执行权，模拟真实的阻塞读取
        tokio::task::yield_now().await;
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(line) => Ok(line),
            None if self.held_open => std::future::pending().await,
            None => Err(Error::Transport("device disconnected".into())),
        }
    }
}

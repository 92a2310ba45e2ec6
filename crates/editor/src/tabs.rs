// Multi-tab coordinator.
//
// Editors of the same page in one process share a `TabBus`. Each bus key
// holds the last version stamp written for a page plus a broadcast channel
// that wakes observers when the stamp changes. A tab that sees another tab
// report a newer version raises a notice and calls its conflict hook.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 16;
pub const VERSION_KEY_PREFIX: &str = "pagedraft:version:";

pub fn version_key(page_id: &str) -> String {
    format!("{VERSION_KEY_PREFIX}{page_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionStamp {
    pub tab_id: Uuid,
    pub version: u64,
}

struct Channel {
    value: Option<VersionStamp>,
    sender: broadcast::Sender<Option<VersionStamp>>,
}

impl Channel {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { value: None, sender }
    }
}

/// Shared key/value bus with change notification.
#[derive(Clone, Default)]
pub struct TabBus {
    channels: Arc<Mutex<HashMap<String, Channel>>>,
}

impl TabBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, key: &str) -> Option<VersionStamp> {
        self.lock().get(key).and_then(|channel| channel.value)
    }

    pub fn write(&self, key: &str, stamp: VersionStamp) {
        let mut channels = self.lock();
        let channel = channels.entry(key.to_owned()).or_insert_with(Channel::new);
        channel.value = Some(stamp);
        // No receivers is fine.
        let _ = channel.sender.send(Some(stamp));
    }

    /// Clear `key` if the stored stamp belongs to `tab_id`.
    pub fn clear_owned(&self, key: &str, tab_id: Uuid) -> bool {
        let mut channels = self.lock();
        let Some(channel) = channels.get_mut(key) else {
            return false;
        };
        if channel.value.map(|stamp| stamp.tab_id) != Some(tab_id) {
            return false;
        }
        channel.value = None;
        let _ = channel.sender.send(None);
        true
    }

    pub fn subscribe(&self, key: &str) -> broadcast::Receiver<Option<VersionStamp>> {
        self.lock().entry(key.to_owned()).or_insert_with(Channel::new).sender.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Channel>> {
        self.channels.lock().expect("tab bus lock should not be poisoned")
    }
}

/// Another tab advanced the page past our version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabNotice {
    pub page_id: String,
    pub from_tab: Uuid,
    pub remote_version: u64,
    pub local_version: u64,
}

pub type ConflictHook = Box<dyn FnMut(&TabNotice)>;

pub struct TabCoordinator {
    bus: TabBus,
    page_id: String,
    key: String,
    tab_id: Uuid,
    local_version: u64,
    receiver: broadcast::Receiver<Option<VersionStamp>>,
    hook: Option<ConflictHook>,
    notice: Option<TabNotice>,
    last_notified: Option<u64>,
    mounted: bool,
}

impl TabCoordinator {
    pub fn new(bus: &TabBus, page_id: &str) -> Self {
        let key = version_key(page_id);
        let receiver = bus.subscribe(&key);
        Self {
            bus: bus.clone(),
            page_id: page_id.to_owned(),
            key,
            tab_id: Uuid::new_v4(),
            local_version: 0,
            receiver,
            hook: None,
            notice: None,
            last_notified: None,
            mounted: true,
        }
    }

    pub fn with_hook(mut self, hook: impl FnMut(&TabNotice) + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn tab_id(&self) -> Uuid {
        self.tab_id
    }

    pub fn local_version(&self) -> u64 {
        self.local_version
    }

    /// Record our version without broadcasting it (e.g. right after load).
    pub fn observe(&mut self, version: u64) {
        self.local_version = self.local_version.max(version);
    }

    /// Record and broadcast our version. A newer stamp from another tab is
    /// left in place.
    pub fn announce(&mut self, version: u64) {
        self.local_version = version;
        if !self.mounted {
            return;
        }
        if let Some(stamp) = self.bus.read(&self.key) {
            if stamp.tab_id != self.tab_id && stamp.version > version {
                debug!(page_id = %self.page_id, version, remote_version = stamp.version, "bus holds a newer version");
                return;
            }
        }
        self.bus.write(&self.key, VersionStamp { tab_id: self.tab_id, version });
        debug!(page_id = %self.page_id, version, "announced draft version to other tabs");
    }

    /// Check the bus without waiting. Returns a notice the first time a
    /// newer version from another tab is seen.
    pub fn poll(&mut self) -> Option<TabNotice> {
        loop {
            match self.receiver.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        self.evaluate()
    }

    /// Wait until another tab reports a newer version.
    pub async fn next_notice(&mut self) -> Option<TabNotice> {
        if let Some(notice) = self.evaluate() {
            return Some(notice);
        }
        loop {
            match self.receiver.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    if let Some(notice) = self.evaluate() {
                        return Some(notice);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The most recent notice not yet dismissed.
    pub fn notice(&self) -> Option<&TabNotice> {
        self.notice.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.notice = None;
    }

    /// Treat stamps up to `version` as handled. A newer stamp raises a
    /// notice on the next poll even if it was reported before.
    pub fn acknowledge(&mut self, version: u64) {
        self.last_notified = Some(version);
    }

    /// Stop participating and clear our stamp from the bus.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        if self.bus.clear_owned(&self.key, self.tab_id) {
            debug!(page_id = %self.page_id, "cleared tab version stamp");
        }
    }

    fn evaluate(&mut self) -> Option<TabNotice> {
        let stamp = self.bus.read(&self.key)?;
        if stamp.tab_id == self.tab_id || stamp.version <= self.local_version {
            return None;
        }
        if self.last_notified.is_some_and(|seen| stamp.version <= seen) {
            return None;
        }

        let notice = TabNotice {
            page_id: self.page_id.clone(),
            from_tab: stamp.tab_id,
            remote_version: stamp.version,
            local_version: self.local_version,
        };
        info!(
            page_id = %self.page_id,
            remote_version = stamp.version,
            local_version = self.local_version,
            "another tab saved a newer version"
        );
        self.last_notified = Some(stamp.version);
        self.notice = Some(notice.clone());
        if let Some(hook) = self.hook.as_mut() {
            hook(&notice);
        }
        Some(notice)
    }
}

impl Drop for TabCoordinator {
    fn drop(&mut self) {
        self.unmount();
    }
}

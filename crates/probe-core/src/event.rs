//! Event records handed to the senders.

use probe_config::InfoSpec;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::classify::CrashSpec;

/// Kind of occurrence being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Crash,
    Info,
    Uptime,
    Reboot,
    Vm,
    /// Liveness ping from the outer loop; no sender handles it.
    HeartBeat,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Crash => "crash",
            EventType::Info => "info",
            EventType::Uptime => "uptime",
            EventType::Reboot => "reboot",
            EventType::Vm => "vm",
            EventType::HeartBeat => "heartbeat",
        };
        f.write_str(s)
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crash" => Ok(EventType::Crash),
            "info" => Ok(EventType::Info),
            "uptime" => Ok(EventType::Uptime),
            "reboot" => Ok(EventType::Reboot),
            "vm" => Ok(EventType::Vm),
            "heartbeat" => Ok(EventType::HeartBeat),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

/// Where an event was delivered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    /// Filesystem watch (inotify).
    #[default]
    FsWatch,
    Polling,
    Timer,
    /// Fired once at startup.
    Oneshot,
}

impl Channel {
    /// Watch-delivered crashes always get an evidence directory and have
    /// their trigger file archived.
    pub fn is_fs_watch(&self) -> bool {
        matches!(self, Channel::FsWatch)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::FsWatch => "inotify",
            Channel::Polling => "polling",
            Channel::Timer => "timer",
            Channel::Oneshot => "oneshot",
        };
        f.write_str(s)
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inotify" | "fswatch" => Ok(Channel::FsWatch),
            "polling" => Ok(Channel::Polling),
            "timer" => Ok(Channel::Timer),
            "oneshot" => Ok(Channel::Oneshot),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// Spec the event refers to. Crash payloads are swapped for the refined
/// spec once reclassification succeeds.
#[derive(Debug, Clone, Default)]
pub enum EventPayload {
    #[default]
    None,
    Crash(Arc<CrashSpec>),
    Info(Arc<InfoSpec>),
}

/// One occurrence, owned by the dispatcher for the duration of handling.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event_type: EventType,
    pub channel: Channel,
    /// Trigger-relative path reported by the watcher.
    pub path: String,
    pub payload: EventPayload,
    /// Evidence directory, set once allocated.
    pub dir: Option<PathBuf>,
}

impl EventRecord {
    pub fn new(event_type: EventType, channel: Channel) -> Self {
        Self {
            event_type,
            channel,
            path: String::new(),
            payload: EventPayload::None,
            dir: None,
        }
    }

    pub fn crash(spec: Arc<CrashSpec>, channel: Channel, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            payload: EventPayload::Crash(spec),
            ..Self::new(EventType::Crash, channel)
        }
    }

    pub fn info(spec: Arc<InfoSpec>, channel: Channel) -> Self {
        Self {
            payload: EventPayload::Info(spec),
            ..Self::new(EventType::Info, channel)
        }
    }

    pub fn crash_spec(&self) -> Option<&Arc<CrashSpec>> {
        match &self.payload {
            EventPayload::Crash(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn info_spec(&self) -> Option<&Arc<InfoSpec>> {
        match &self.payload {
            EventPayload::Info(spec) => Some(spec),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_parses_watch_aliases() {
        assert_eq!("inotify".parse::<Channel>().unwrap(), Channel::FsWatch);
        assert_eq!("FSWATCH".parse::<Channel>().unwrap(), Channel::FsWatch);
        assert_eq!("polling".parse::<Channel>().unwrap(), Channel::Polling);
        assert!("carrier-pigeon".parse::<Channel>().is_err());
        assert!(Channel::FsWatch.is_fs_watch());
        assert!(!Channel::Polling.is_fs_watch());
    }

    #[test]
    fn event_type_round_trips_through_display() {
        for t in [
            EventType::Crash,
            EventType::Info,
            EventType::Uptime,
            EventType::Reboot,
            EventType::Vm,
            EventType::HeartBeat,
        ] {
            assert_eq!(t.to_string().parse::<EventType>().unwrap(), t);
        }
    }

    #[test]
    fn info_record_exposes_spec() {
        let spec = Arc::new(InfoSpec {
            name: "BOOT_LOGS".into(),
            logs: vec![],
        });
        let event = EventRecord::info(spec, Channel::Oneshot);
        assert_eq!(event.event_type, EventType::Info);
        assert_eq!(event.info_spec().unwrap().name, "BOOT_LOGS");
        assert!(event.crash_spec().is_none());
        assert!(event.dir.is_none());
    }
}

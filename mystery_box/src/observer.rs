//! Operator-facing progress reporting.
//!
//! Components report what they are doing through an injected [Observer]
//! rather than logging directly, so the timing lines an operator relies on
//! can be asserted on. [TracingObserver] is the default and forwards every
//! event to `tracing`.
use std::{fmt, time::Duration};

use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Launching {
        name: String,
        image: String,
    },
    WaitingForIp {
        name: String,
        attempt: u32,
        attempts: u32,
    },
    HardwareUp {
        name: String,
        ip: String,
        elapsed: Duration,
    },
    Configuring {
        name: String,
    },
    Configured {
        ip: String,
        elapsed: Duration,
    },
    Ready {
        name: String,
        elapsed: Duration,
    },
    Lifecycle {
        name: String,
        action: &'static str,
        elapsed: Duration,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Launching { name, image } => write!(f, "📦 launching {} from {}...", name, image),
            Event::WaitingForIp {
                name,
                attempt,
                attempts,
            } => write!(
                f,
                "📦 waiting for {} to get an ipv4 address ({}/{})",
                name, attempt, attempts
            ),
            Event::HardwareUp { name, ip, elapsed } => write!(
                f,
                "📦 {} hardware up at {} (+{}s)",
                name,
                ip,
                elapsed.as_secs()
            ),
            Event::Configuring { name } => write!(f, "📦 configuring {}...", name),
            Event::Configured { ip, elapsed } => write!(
                f,
                "📦 devbox configured and ready to use at {} (+{}s)",
                ip,
                elapsed.as_secs()
            ),
            Event::Ready { name, elapsed } => write!(
                f,
                "📦 {} fully configured and ready to use (+{}s)",
                name,
                elapsed.as_secs()
            ),
            Event::Lifecycle {
                name,
                action,
                elapsed,
            } => write!(f, "📦 {} {} (+{}s)", name, action, elapsed.as_secs()),
        }
    }
}

pub trait Observer: fmt::Debug {
    fn on_event(&self, event: &Event);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &Event) {
        match event {
            Event::WaitingForIp { .. } => debug!("{}", event),
            _ => info!("{}", event),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Event;

    #[test]
    fn timing_lines() {
        let event = Event::HardwareUp {
            name: "devbox".to_string(),
            ip: "10.0.0.5".to_string(),
            elapsed: Duration::from_millis(42_600),
        };
        assert_eq!(event.to_string(), "📦 devbox hardware up at 10.0.0.5 (+42s)");

        let event = Event::Configured {
            ip: "10.0.0.5".to_string(),
            elapsed: Duration::from_secs(3),
        };
        assert_eq!(
            event.to_string(),
            "📦 devbox configured and ready to use at 10.0.0.5 (+3s)"
        );
    }
}

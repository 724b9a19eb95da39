use std::time::Duration;
use std::time::Instant;

use crate::ZPath;

/// Upper bound for waiting on an asynchronous notification
pub(crate) const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to watch for notifications that must not arrive
pub(crate) const QUIET_PERIOD: Duration = Duration::from_millis(200);

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

pub(crate) fn zpath(path: &str) -> ZPath {
    ZPath::parse(path).unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses
pub(crate) fn wait_until<F>(
    timeout: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

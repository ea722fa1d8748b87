//! Session lock through systemd-logind (`org.freedesktop.login1`).
//!
//! Root locks every active session; an unprivileged user can only ask for one session.

use std::time::Duration;

use dbus::blocking::Connection;
use tracing::{info, warn};

use crate::error::GyroLockResult;

const LOGIN1_DESTINATION: &str = "org.freedesktop.login1";
const LOGIN1_PATH: &str = "/org/freedesktop/login1";
const LOGIN1_MANAGER: &str = "org.freedesktop.login1.Manager";

/// Timeout for a single login1 method call.
pub const LOCK_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// What to lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockTarget {
    /// One session by login1 id.
    Session(String),
    /// Every active session (needs root).
    AllSessions,
}

impl LockTarget {
    pub fn for_privilege(privileged: bool, session_id: &str) -> Self {
        if privileged {
            Self::AllSessions
        } else {
            Self::Session(session_id.to_string())
        }
    }
}

/// The lock action invoked on a shake.
pub trait SessionLocker {
    /// Make sure the lock service is reachable. Runs before every trigger, debug mode included.
    fn connect(&mut self) -> GyroLockResult<()> {
        Ok(())
    }

    /// Lock `target`. Only an unreachable lock service is an error.
    fn lock(&mut self, target: &LockTarget) -> GyroLockResult<()>;
}

/// Locks through the login1 manager on the system bus.
///
/// The bus connection is opened at the first trigger and reused afterwards.
pub struct Login1Locker {
    conn: Option<Connection>,
    timeout: Duration,
}

impl Login1Locker {
    pub fn new() -> Self {
        Self {
            conn: None,
            timeout: LOCK_CALL_TIMEOUT,
        }
    }

    fn connection(&mut self) -> GyroLockResult<&Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => Connection::new_system()?,
        };
        Ok(self.conn.insert(conn))
    }
}

impl Default for Login1Locker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLocker for Login1Locker {
    fn connect(&mut self) -> GyroLockResult<()> {
        self.connection().map(|_| ())
    }

    fn lock(&mut self, target: &LockTarget) -> GyroLockResult<()> {
        let timeout = self.timeout;
        let proxy = self
            .connection()?
            .with_proxy(LOGIN1_DESTINATION, LOGIN1_PATH, timeout);

        let result: Result<(), dbus::Error> = match target {
            LockTarget::AllSessions => proxy.method_call(LOGIN1_MANAGER, "LockSessions", ()),
            LockTarget::Session(id) => {
                proxy.method_call(LOGIN1_MANAGER, "LockSession", (id.as_str(),))
            }
        };

        match (result, target) {
            (Ok(()), LockTarget::AllSessions) => info!("GyroLock lock sessions !"),
            (Ok(()), LockTarget::Session(id)) => info!(session = %id, "GyroLock lock session !"),
            (Err(e), _) => warn!(error = %e, lock_target = ?target, "login1 lock call failed"),
        }
        Ok(())
    }
}

/// True when running with effective uid 0.
pub fn is_privileged() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

// System V message queue backend for Linux
// Uses msgget/msgsnd/msgrcv; whole-message enqueue and dequeue are atomic in
// the kernel, so no locking is layered on top.

use crate::Output::Structs::WireMessage;
use std::io;

/// Queue occupancy as reported by `IPC_STAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Messages currently queued.
    pub messages: u64,
    /// Payload bytes currently queued, type words excluded.
    pub queued_bytes: u64,
    /// Maximum bytes the queue may hold before senders see it as full.
    pub capacity_bytes: u64,
}

/// Handle to one System V message queue.
///
/// Plain value object: copying it does not duplicate the queue, and dropping
/// it does not remove the queue. The queue outlives both processes until
/// something calls [`QueueHandle::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueHandle {
    key: libc::key_t,
    msqid: libc::c_int,
}

#[cfg(target_os = "linux")]
impl QueueHandle {
    /// Create the queue for `key` if absent, otherwise attach to it.
    pub fn open(key: libc::key_t) -> io::Result<Self> {
        let msqid = unsafe { libc::msgget(key, libc::IPC_CREAT | 0o666) };
        if msqid == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { key, msqid })
    }

    /// Create a fresh queue no other process can look up by key.
    pub fn private() -> io::Result<Self> {
        Self::open(libc::IPC_PRIVATE)
    }

    /// Enqueue one whole message.
    ///
    /// With `nowait` a full queue fails with `ErrorKind::WouldBlock` instead of
    /// suspending the caller.
    pub fn send<M: WireMessage>(&self, msg: &M, nowait: bool) -> io::Result<()> {
        let flags = if nowait { libc::IPC_NOWAIT } else { 0 };
        let rc = unsafe {
            libc::msgsnd(
                self.msqid,
                msg as *const M as *const libc::c_void,
                M::PAYLOAD_BYTES,
                flags,
            )
        };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Dequeue the oldest message into `msg`.
    ///
    /// Returns `Ok(None)` when `wait` is false and nothing is queued. With
    /// `wait` the call suspends until a message arrives; signal interruptions
    /// are retried. A queued message larger than `M` fails with `E2BIG` and
    /// stays in the queue.
    pub fn recv<M: WireMessage>(&self, msg: &mut M, wait: bool) -> io::Result<Option<usize>> {
        let flags = if wait { 0 } else { libc::IPC_NOWAIT };
        loop {
            let got = unsafe {
                libc::msgrcv(
                    self.msqid,
                    msg as *mut M as *mut libc::c_void,
                    M::PAYLOAD_BYTES,
                    0,
                    flags,
                )
            };
            if got >= 0 {
                return Ok(Some(got as usize));
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::ENOMSG) if !wait => return Ok(None),
                Some(libc::EINTR) if wait => continue,
                _ => return Err(err),
            }
        }
    }

    pub fn stats(&self) -> io::Result<QueueStats> {
        let ds = self.stat()?;
        Ok(QueueStats {
            messages: ds.msg_qnum as u64,
            queued_bytes: ds.__msg_cbytes as u64,
            capacity_bytes: ds.msg_qbytes as u64,
        })
    }

    /// Change the byte capacity of the queue.
    ///
    /// Lowering it needs no privilege; raising it past the system limit does.
    pub fn set_capacity(&self, bytes: u64) -> io::Result<()> {
        let mut ds = self.stat()?;
        ds.msg_qbytes = bytes as _;
        if unsafe { libc::msgctl(self.msqid, libc::IPC_SET, &mut ds) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Destroy the queue. Blocked readers wake with `EIDRM`.
    pub fn remove(self) -> io::Result<()> {
        if unsafe { libc::msgctl(self.msqid, libc::IPC_RMID, std::ptr::null_mut()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn stat(&self) -> io::Result<libc::msqid_ds> {
        let mut ds: libc::msqid_ds = unsafe { std::mem::zeroed() };
        if unsafe { libc::msgctl(self.msqid, libc::IPC_STAT, &mut ds) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(ds)
    }
}

#[cfg(not(target_os = "linux"))]
impl QueueHandle {
    pub fn open(_key: libc::key_t) -> io::Result<Self> {
        Err(unsupported())
    }

    pub fn private() -> io::Result<Self> {
        Err(unsupported())
    }

    pub fn send<M: WireMessage>(&self, _msg: &M, _nowait: bool) -> io::Result<()> {
        Err(unsupported())
    }

    pub fn recv<M: WireMessage>(&self, _msg: &mut M, _wait: bool) -> io::Result<Option<usize>> {
        Err(unsupported())
    }

    pub fn stats(&self) -> io::Result<QueueStats> {
        Err(unsupported())
    }

    pub fn set_capacity(&self, _bytes: u64) -> io::Result<()> {
        Err(unsupported())
    }

    pub fn remove(self) -> io::Result<()> {
        Err(unsupported())
    }
}

#[cfg(not(target_os = "linux"))]
fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "System V message queues only supported on Linux",
    )
}

impl QueueHandle {
    pub fn key(&self) -> libc::key_t {
        self.key
    }

    pub fn id(&self) -> libc::c_int {
        self.msqid
    }
}

//! Windows named pipes (`\\.\pipe\<name>`), opened for synchronous byte-mode I/O.

use std::fs::File;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::io::{AsRawHandle, FromRawHandle};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, info};
use windows_sys::Win32::Foundation::{
    ERROR_PIPE_BUSY, ERROR_PIPE_CONNECTED, GENERIC_READ, GENERIC_WRITE, HANDLE,
    INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{CreateFileW, OPEN_EXISTING, PIPE_ACCESS_DUPLEX};
use windows_sys::Win32::System::Pipes::{
    ConnectNamedPipe, CreateNamedPipeW, WaitNamedPipeW, PIPE_READMODE_BYTE, PIPE_TYPE_BYTE,
    PIPE_UNLIMITED_INSTANCES, PIPE_WAIT,
};
use windows_sys::Win32::System::IO::CancelIoEx;

use crate::error::{Result, TransportError};
use crate::name::PipeName;
use crate::stream::PipeStream;

/// In/out buffer size requested for server instances: one pin record.
const PIPE_BUFFER_SIZE: u32 = 40;

fn to_wide(path: &Path) -> Vec<u16> {
    path.as_os_str().encode_wide().chain(Some(0)).collect()
}

pub(crate) fn is_pipe_busy(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(ERROR_PIPE_BUSY as i32)
}

/// Open the client end, waiting on `WaitNamedPipeW` while every server
/// instance is busy.
pub(crate) fn open_client(address: &Path, deadline: Instant) -> std::io::Result<PipeStream> {
    let wide = to_wide(address);
    loop {
        // SAFETY: `wide` is a NUL-terminated UTF-16 string that outlives the
        // call; all pointer arguments are either valid or null as documented.
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                0,
                std::ptr::null(),
                OPEN_EXISTING,
                0,
                std::ptr::null_mut(),
            )
        };
        if handle != INVALID_HANDLE_VALUE {
            // SAFETY: `handle` is a freshly opened, exclusively owned handle.
            let file = unsafe { File::from_raw_handle(handle as _) };
            return Ok(PipeStream::from_file(file));
        }

        let err = std::io::Error::last_os_error();
        if !is_pipe_busy(&err) {
            return Err(err);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(err);
        }
        let wait_ms = remaining.as_millis().clamp(1, u32::MAX as u128) as u32;
        // SAFETY: `wide` is NUL-terminated and valid for the duration of the call.
        unsafe { WaitNamedPipeW(wide.as_ptr(), wait_ms) };
    }
}

/// Cancel every pending I/O request on the pipe handle, from any thread.
///
/// False when nothing was pending to cancel.
pub(crate) fn cancel_io(file: &File) -> bool {
    // SAFETY: the handle stays open for as long as `file` is borrowed.
    unsafe { CancelIoEx(file.as_raw_handle() as HANDLE, std::ptr::null()) != 0 }
}

/// Controller end of the pipe on Windows.
///
/// One server instance is created up front so that panels can connect as
/// soon as `bind` returns; each `accept` hands it out and prepares the next.
pub struct PipeListener {
    name: PipeName,
    wide: Vec<u16>,
    pending: Mutex<Option<File>>,
}

impl PipeListener {
    /// Create the first server instance of the named pipe.
    pub fn bind(name: &PipeName) -> Result<Self> {
        let wide = to_wide(&name.address());
        let first = create_instance(&wide).map_err(|source| TransportError::Bind {
            name: name.to_string(),
            source,
        })?;
        info!(pipe = %name, "controller pipe listening");
        Ok(Self {
            name: name.clone(),
            wide,
            pending: Mutex::new(Some(first)),
        })
    }

    /// Accept the next panel connection (blocking).
    pub fn accept(&self) -> Result<PipeStream> {
        let pending = self
            .pending
            .lock()
            .map_err(|_| TransportError::Accept(std::io::Error::other("listener poisoned")))?
            .take();
        let instance = match pending {
            Some(file) => file,
            None => create_instance(&self.wide).map_err(TransportError::Accept)?,
        };

        // SAFETY: the handle is a valid server instance; null OVERLAPPED
        // selects a blocking connect.
        let ok = unsafe {
            ConnectNamedPipe(instance.as_raw_handle() as HANDLE, std::ptr::null_mut())
        };
        if ok == 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(ERROR_PIPE_CONNECTED as i32) {
                return Err(TransportError::Accept(err));
            }
        }
        debug!(pipe = %self.name, "accepted panel connection");
        Ok(PipeStream::from_file(instance))
    }

    /// The pipe address this listener serves.
    pub fn path(&self) -> std::path::PathBuf {
        self.name.address()
    }
}

fn create_instance(wide: &[u16]) -> std::io::Result<File> {
    // SAFETY: `wide` is NUL-terminated; a null security descriptor selects
    // the default DACL.
    let handle = unsafe {
        CreateNamedPipeW(
            wide.as_ptr(),
            PIPE_ACCESS_DUPLEX,
            PIPE_TYPE_BYTE | PIPE_READMODE_BYTE | PIPE_WAIT,
            PIPE_UNLIMITED_INSTANCES,
            PIPE_BUFFER_SIZE,
            PIPE_BUFFER_SIZE,
            0,
            std::ptr::null(),
        )
    };
    if handle == INVALID_HANDLE_VALUE {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: `handle` is a freshly created, exclusively owned handle.
    Ok(unsafe { File::from_raw_handle(handle as _) })
}

//! Memory reader backed by procfs
//!
//! Finds the game by executable name, takes the image base from
//! `/proc/<pid>/maps` and reads values through `/proc/<pid>/mem`. This
//! also covers Windows games running under Wine/Proton, whose PE image is
//! mapped from the `.exe` file.

use super::{AttachError, MemoryReader, ReadError};

/// Find the load address of `process_name` in a `/proc/<pid>/maps` listing
///
/// Returns the start of the first mapping whose file name matches,
/// ignoring ASCII case.
pub fn parse_image_base(maps: &str, process_name: &str) -> Option<u64> {
    maps.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let range = fields.next()?;
        // permissions, offset, device, inode
        let path = fields.skip(4).collect::<Vec<_>>().join(" ");
        let file_name = path.rsplit(['/', '\\']).next()?;
        if !file_name.eq_ignore_ascii_case(process_name) {
            return None;
        }
        let start = range.split('-').next()?;
        u64::from_str_radix(start, 16).ok()
    })
}

#[cfg(target_os = "linux")]
mod imp {
    use std::ffi::OsStr;
    use std::fs::File;
    use std::os::unix::fs::FileExt;

    use sysinfo::{ProcessesToUpdate, System};
    use tracing::debug;

    use super::*;

    /// Handle to an attached process
    pub struct ProcHandle {
        pid: u32,
        base: u64,
        mem: File,
    }

    /// Reads process memory through `/proc`
    pub struct ProcReader {
        system: System,
    }

    impl ProcReader {
        pub fn new() -> Self {
            Self {
                system: System::new(),
            }
        }
    }

    impl Default for ProcReader {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryReader for ProcReader {
        type Handle = ProcHandle;

        fn attach(&mut self, process_name: &str) -> Result<ProcHandle, AttachError> {
            self.system.refresh_processes(ProcessesToUpdate::All, true);
            let pid = self
                .system
                .processes_by_exact_name(OsStr::new(process_name))
                .next()
                .map(|process| process.pid().as_u32())
                .ok_or_else(|| AttachError::ProcessNotFound(process_name.to_string()))?;

            let maps = std::fs::read_to_string(format!("/proc/{pid}/maps"))?;
            let base = parse_image_base(&maps, process_name)
                .ok_or_else(|| AttachError::ImageNotFound(process_name.to_string()))?;
            let mem = File::open(format!("/proc/{pid}/mem"))?;

            debug!(pid, base = format_args!("{:#x}", base), "attached to process");
            Ok(ProcHandle { pid, base, mem })
        }

        fn image_base(&self, handle: &ProcHandle) -> u64 {
            handle.base
        }

        fn read_i32(&mut self, handle: &ProcHandle, address: u64) -> Result<i32, ReadError> {
            let mut buf = [0u8; 4];
            handle.mem.read_exact_at(&mut buf, address).map_err(|e| {
                debug!(pid = handle.pid, error = %e, "memory read failed");
                ReadError::Io(e)
            })?;
            Ok(i32::from_le_bytes(buf))
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use super::*;

    /// Placeholder reader: attaching always fails, so the tuner keeps retrying
    #[derive(Default)]
    pub struct ProcReader;

    impl ProcReader {
        pub fn new() -> Self {
            Self
        }
    }

    impl MemoryReader for ProcReader {
        type Handle = ();

        fn attach(&mut self, _process_name: &str) -> Result<(), AttachError> {
            Err(AttachError::Unsupported)
        }

        fn image_base(&self, _handle: &()) -> u64 {
            0
        }

        fn read_i32(&mut self, _handle: &(), _address: u64) -> Result<i32, ReadError> {
            Err(ReadError::NotConnected)
        }
    }
}

pub use imp::ProcReader;

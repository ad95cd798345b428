use std::io::{self, Read};

use super::{PendingFault, read_window};
use crate::boundary::{ForeignSource, MethodId};
use crate::error::BoundaryFault;

/// A forward-only source over any [`Read`], such as stdin or a pipe.
///
/// Skips discard through the reader. Marks are accepted and ignored, and
/// reset always faults.
pub struct SequentialSource<R> {
    reader: R,
    faults: PendingFault,
}

impl<R: Read> SequentialSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            faults: PendingFault::default(),
        }
    }

    pub fn pending_fault(&self) -> Option<&BoundaryFault> {
        self.faults.get()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ForeignSource for SequentialSource<R> {
    fn call_read(
        &mut self,
        _method: MethodId,
        dest: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<i32, BoundaryFault> {
        self.faults.check()?;
        let window = read_window(&mut self.faults, dest.len(), offset, count)?;
        if count == 0 {
            return Ok(0);
        }

        loop {
            match self.reader.read(&mut dest[window.clone()]) {
                Ok(0) => return Ok(-1),
                Ok(n) => return Ok(n as i32),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.faults.raise("read", e.to_string())),
            }
        }
    }

    fn call_skip(&mut self, _method: MethodId, count: i64) -> Result<i64, BoundaryFault> {
        self.faults.check()?;
        if count <= 0 {
            return Ok(0);
        }
        let mut limited = self.reader.by_ref().take(count as u64);
        match io::copy(&mut limited, &mut io::sink()) {
            Ok(n) => Ok(n as i64),
            Err(e) => Err(self.faults.raise("skip", e.to_string())),
        }
    }

    fn call_reset(&mut self, _method: MethodId) -> Result<(), BoundaryFault> {
        self.faults.check()?;
        Err(self.faults.raise("reset", "mark/reset not supported"))
    }

    fn call_mark(&mut self, _method: MethodId, _read_limit: i32) -> Result<(), BoundaryFault> {
        self.faults.check()
    }

    fn call_mark_supported(&mut self, _method: MethodId) -> Result<bool, BoundaryFault> {
        self.faults.check()?;
        Ok(false)
    }

    fn clear_fault(&mut self) {
        self.faults.clear();
    }
}

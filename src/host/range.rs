use std::sync::Arc;

use log::trace;
use tokio::runtime::Handle;

use super::{PendingFault, read_window};
use crate::boundary::{ForeignSource, MethodId};
use crate::error::BoundaryFault;
use crate::io::ReadAt;

/// A sequential cursor over a random-access [`ReadAt`] reader.
///
/// Reads are driven to completion on `runtime`, so calls block the current
/// thread. Use it from a blocking context such as
/// [`tokio::task::spawn_blocking`], never from inside an async task.
///
/// Skips are exact up to the end of the data, and mark/reset are always
/// honoured because any offset can be read again.
pub struct RangeSource<R: ReadAt + ?Sized> {
    reader: Arc<R>,
    runtime: Handle,
    position: u64,
    mark: u64,
    faults: PendingFault,
}

impl<R: ReadAt + ?Sized> RangeSource<R> {
    pub fn new(reader: Arc<R>, runtime: Handle) -> Self {
        Self {
            reader,
            runtime,
            position: 0,
            mark: 0,
            faults: PendingFault::default(),
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn pending_fault(&self) -> Option<&BoundaryFault> {
        self.faults.get()
    }

    fn remaining(&self) -> u64 {
        self.reader.size().saturating_sub(self.position)
    }
}

impl<R: ReadAt + ?Sized> ForeignSource for RangeSource<R> {
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
        if self.remaining() == 0 {
            return Ok(-1);
        }

        let reader = Arc::clone(&self.reader);
        let position = self.position;
        let result = self
            .runtime
            .block_on(async move { reader.read_at(position, &mut dest[window]).await });

        match result {
            Ok(0) => Ok(-1),
            Ok(n) => {
                self.position += n as u64;
                trace!("range read {} bytes at {}", n, position);
                Ok(n as i32)
            }
            Err(e) => Err(self.faults.raise("read", format!("{:#}", e))),
        }
    }

    fn call_skip(&mut self, _method: MethodId, count: i64) -> Result<i64, BoundaryFault> {
        self.faults.check()?;
        if count <= 0 {
            return Ok(0);
        }
        let n = (count as u64).min(self.remaining());
        self.position += n;
        Ok(n as i64)
    }

    fn call_reset(&mut self, _method: MethodId) -> Result<(), BoundaryFault> {
        self.faults.check()?;
        self.position = self.mark;
        Ok(())
    }

    fn call_mark(&mut self, _method: MethodId, _read_limit: i32) -> Result<(), BoundaryFault> {
        self.faults.check()?;
        self.mark = self.position;
        Ok(())
    }

    fn call_mark_supported(&mut self, _method: MethodId) -> Result<bool, BoundaryFault> {
        self.faults.check()?;
        Ok(true)
    }

    fn clear_fault(&mut self) {
        self.faults.clear();
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, bail};
    use async_trait::async_trait;

    use super::*;
    use crate::boundary::Operation;
    use crate::io::MemoryReader;

    struct Broken;

    #[async_trait]
    impl ReadAt for Broken {
        async fn read_at(&self, _offset: u64, _buf: &mut [u8]) -> Result<usize> {
            bail!("connection reset")
        }

        fn size(&self) -> u64 {
            100
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    fn method(op: Operation) -> MethodId {
        MethodId::new(op, 0)
    }

    #[test]
    fn reads_sequentially_until_end() {
        let rt = runtime();
        let reader = Arc::new(MemoryReader::new(b"abcdef".to_vec()));
        let mut source = RangeSource::new(reader, rt.handle().clone());
        let mut relay = [0u8; 4];
        let read = method(Operation::Read);

        assert_eq!(source.call_read(read, &mut relay, 0, 4).unwrap(), 4);
        assert_eq!(&relay, b"abcd");
        assert_eq!(source.call_read(read, &mut relay, 0, 4).unwrap(), 2);
        assert_eq!(&relay[..2], b"ef");
        assert_eq!(source.call_read(read, &mut relay, 0, 4).unwrap(), -1);
    }

    #[test]
    fn skip_clamps_to_remaining() {
        let rt = runtime();
        let reader = Arc::new(MemoryReader::new(vec![0u8; 10]));
        let mut source = RangeSource::new(reader, rt.handle().clone());
        let skip = method(Operation::Skip);

        assert_eq!(source.call_skip(skip, 7).unwrap(), 7);
        assert_eq!(source.call_skip(skip, 7).unwrap(), 3);
        assert_eq!(source.call_skip(skip, 7).unwrap(), 0);
        assert_eq!(source.position(), 10);
    }

    #[test]
    fn reset_returns_to_mark() {
        let rt = runtime();
        let reader = Arc::new(MemoryReader::new(b"0123456789".to_vec()));
        let mut source = RangeSource::new(reader, rt.handle().clone());
        let mut relay = [0u8; 3];

        source.call_skip(method(Operation::Skip), 5).unwrap();
        source.call_mark(method(Operation::Mark), 0).unwrap();
        source.call_read(method(Operation::Read), &mut relay, 0, 3).unwrap();
        source.call_reset(method(Operation::Reset)).unwrap();
        assert_eq!(source.position(), 5);
        assert!(source.call_mark_supported(method(Operation::MarkSupported)).unwrap());
    }

    #[test]
    fn reader_errors_become_pending_faults() {
        let rt = runtime();
        let mut source = RangeSource::new(Arc::new(Broken), rt.handle().clone());
        let mut relay = [0u8; 3];

        let fault = source
            .call_read(method(Operation::Read), &mut relay, 0, 3)
            .unwrap_err();
        assert!(fault.message().contains("connection reset"));
        assert_eq!(source.pending_fault(), Some(&fault));
        assert!(source.call_skip(method(Operation::Skip), 1).is_err());
        source.clear_fault();
        assert!(source.pending_fault().is_none());
        assert_eq!(source.call_skip(method(Operation::Skip), 1).unwrap(), 1);
    }
}

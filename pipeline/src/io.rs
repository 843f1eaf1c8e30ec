//! Where items come from and where they go.

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::io::{self, BufWriter, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::vec;
use tracing::{debug, warn};

use crate::halt::Halt;
use crate::{PipelineError, Result};

/// Supplies items to the producer. `None` means the source is exhausted.
pub trait ItemSource<T> {
    fn next_item(&mut self) -> Option<T>;
}

/// Receives items from the consumer.
pub trait ItemSink<T> {
    fn emit(&mut self, item: T) -> io::Result<()>;

    /// Called once when the consumer loop ends.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<I: Iterator> ItemSource<I::Item> for I {
    fn next_item(&mut self) -> Option<I::Item> {
        self.next()
    }
}

impl<T> ItemSink<T> for Vec<T> {
    fn emit(&mut self, item: T) -> io::Result<()> {
        self.push(item);
        Ok(())
    }
}

/// Bytes of a reader, one item per byte.
///
/// The reader runs on its own detached thread and hands chunks over a
/// bounded channel, so a read that never returns (an idle terminal or pipe)
/// cannot hold the producer past halt: `next_item` waits at most `poll`
/// between halt checks. End of input and read errors both end the stream.
pub struct ReadSource {
    chunks: Receiver<Vec<u8>>,
    current: vec::IntoIter<u8>,
    halt: Arc<Halt>,
    poll: Duration,
}

const READ_CHUNK: usize = 8 * 1024;
const CHUNKS_IN_FLIGHT: usize = 16;

impl ReadSource {
    pub fn spawn<R>(reader: R, halt: Arc<Halt>, poll: Duration) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = bounded(CHUNKS_IN_FLIGHT);
        thread::Builder::new()
            .name("backflow-reader".to_string())
            .spawn(move || read_chunks(reader, tx))
            .map_err(|e| PipelineError::Spawn("reader", e))?;

        Ok(ReadSource {
            chunks: rx,
            current: Vec::new().into_iter(),
            halt,
            poll,
        })
    }
}

fn read_chunks<R: Read>(mut reader: R, chunks: Sender<Vec<u8>>) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("input reached end of stream");
                return;
            }
            Ok(n) => {
                if chunks.send(buf[..n].to_vec()).is_err() {
                    // Source dropped, nobody wants the rest.
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "input read failed, ending item stream");
                return;
            }
        }
    }
}

impl ItemSource<u8> for ReadSource {
    fn next_item(&mut self) -> Option<u8> {
        loop {
            if let Some(byte) = self.current.next() {
                return Some(byte);
            }
            if self.halt.is_raised() {
                return None;
            }
            match self.chunks.recv_timeout(self.poll) {
                Ok(chunk) => self.current = chunk.into_iter(),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

/// Writes each byte item to a buffered writer.
pub struct WriteSink<W: Write> {
    out: BufWriter<W>,
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        WriteSink {
            out: BufWriter::new(writer),
        }
    }
}

impl<W: Write> ItemSink<u8> for WriteSink<W> {
    fn emit(&mut self, item: u8) -> io::Result<()> {
        self.out.write_all(&[item])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Endless counter for synthetic load.
#[derive(Debug, Default, Clone)]
pub struct Sequence {
    next: u64,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemSource<u64> for Sequence {
    fn next_item(&mut self) -> Option<u64> {
        let item = self.next;
        self.next = self.next.wrapping_add(1);
        Some(item)
    }
}

impl ItemSource<u8> for Sequence {
    fn next_item(&mut self) -> Option<u8> {
        ItemSource::<u64>::next_item(self).map(|n| n as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::sync::mpsc;
    use std::time::Instant;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device gone"))
        }
    }

    /// Blocks in `read` until the paired sender is dropped.
    struct StalledReader(mpsc::Receiver<()>);

    impl Read for StalledReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    const POLL: Duration = Duration::from_millis(1);

    #[rstest]
    fn test_read_source_yields_bytes_then_ends() {
        let mut source = ReadSource::spawn(&b"abc"[..], Arc::new(Halt::new()), POLL).unwrap();
        let items: Vec<u8> = std::iter::from_fn(|| source.next_item()).collect();
        assert_eq!(items, b"abc");
        assert_eq!(source.next_item(), None);
    }

    #[rstest]
    fn test_read_source_spans_chunks() {
        let input: Vec<u8> = (0..3 * READ_CHUNK + 17).map(|i| (i % 253) as u8).collect();
        let mut source =
            ReadSource::spawn(io::Cursor::new(input.clone()), Arc::new(Halt::new()), POLL)
                .unwrap();
        let items: Vec<u8> = std::iter::from_fn(|| source.next_item()).collect();
        assert_eq!(items, input);
    }

    #[rstest]
    fn test_read_error_ends_stream() {
        let mut source = ReadSource::spawn(FailingReader, Arc::new(Halt::new()), POLL).unwrap();
        assert_eq!(source.next_item(), None);
    }

    #[rstest]
    fn test_stalled_reader_released_by_halt() {
        let (unblock, stalled) = mpsc::channel::<()>();
        let halt = Arc::new(Halt::new());
        let mut source = ReadSource::spawn(StalledReader(stalled), halt.clone(), POLL).unwrap();

        let waiter = thread::spawn(move || {
            let start = Instant::now();
            (source.next_item(), start.elapsed())
        });
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        halt.raise();
        let (item, waited) = waiter.join().unwrap();
        assert_eq!(item, None);
        assert!(waited < Duration::from_secs(5));
        drop(unblock);
    }

    #[rstest]
    fn test_write_sink_buffers_until_flush() {
        let mut buffer = Vec::new();
        {
            let mut sink = WriteSink::new(&mut buffer);
            for byte in b"xyz" {
                sink.emit(*byte).unwrap();
            }
            sink.flush().unwrap();
        }
        assert_eq!(buffer, b"xyz");
    }

    #[rstest]
    fn test_sequence_counts_up() {
        let mut sequence = Sequence::new();
        let numbers: Vec<u64> = (0..3)
            .filter_map(|_| ItemSource::<u64>::next_item(&mut sequence))
            .collect();
        assert_eq!(numbers, vec![0, 1, 2]);

        let mut bytes = Sequence { next: 255 };
        assert_eq!(ItemSource::<u8>::next_item(&mut bytes), Some(255));
        assert_eq!(ItemSource::<u8>::next_item(&mut bytes), Some(0));
        assert_eq!(bytes.next, 257);
    }

    #[rstest]
    fn test_iterators_and_vecs_plug_in() {
        let mut source = vec![1u32, 2].into_iter();
        let mut sink = Vec::new();
        while let Some(item) = source.next_item() {
            sink.emit(item).unwrap();
        }
        assert_eq!(sink, vec![1, 2]);
    }
}

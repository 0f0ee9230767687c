//! Output handling for the write syscall.
//!
//! The interface for output sinks is defined with the [`IODevice`] trait.
//! This is exposed to the simulator with the [`SimIO`] enum.
//!
//! Besides those two key items, this module also includes:
//! - [`EmptyIO`]: An `IODevice` which discards all output.
//! - [`BufferedIO`]: An `IODevice` which collects output in shared buffers.
//! - [`ChannelIO`]: An `IODevice` which forwards output to a writer thread through a channel.
//! - [`CustomIO`]: An `IODevice` that can be used to wrap around custom IO implementations.

use std::sync::{Arc, RwLock, RwLockWriteGuard, TryLockError};
use std::thread::JoinHandle;

use crossbeam_channel as cbc;

/// An output stream of the write syscall.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stream {
    /// Standard output (file descriptor 1).
    Stdout,
    /// Standard error (file descriptor 2).
    Stderr,
}
impl Stream {
    /// Gets the stream corresponding to a file descriptor, if there is one.
    ///
    /// ```
    /// use riscvm::sim::io::Stream;
    ///
    /// assert_eq!(Stream::from_fd(1), Some(Stream::Stdout));
    /// assert_eq!(Stream::from_fd(2), Some(Stream::Stderr));
    /// assert_eq!(Stream::from_fd(0), None);
    /// ```
    pub fn from_fd(fd: u32) -> Option<Self> {
        match fd {
            1 => Some(Stream::Stdout),
            2 => Some(Stream::Stderr),
            _ => None
        }
    }
}

/// An output device that the write syscall can send bytes to.
pub trait IODevice {
    /// Writes bytes to the given stream.
    ///
    /// This returns whether the write was successful or not.
    fn io_write(&self, stream: Stream, bytes: &[u8]) -> bool;

    /// Tries to close this IO device.
    fn close(self);
}
impl dyn IODevice {} // assert IODevice is dyn safe

/// No IO. All writes are discarded.
pub struct EmptyIO;
impl IODevice for EmptyIO {
    fn io_write(&self, _stream: Stream, _bytes: &[u8]) -> bool {
        false
    }

    fn close(self) {}
}

/// IO that appends the bytes of each stream to its own output buffer.
///
/// The buffers can be accessed in code via [`BufferedIO::get_stdout`] and [`BufferedIO::get_stderr`].
/// Since `BufferedIO` is cheaply cloneable (its buffers are shared),
/// a clone can be kept to inspect the output after the original is handed to the simulator.
///
/// Note that if a lock guard is acquired from one of the buffers of this IO,
/// that buffer becomes temporarily inaccessible to the simulator (and writes to it are dropped).
/// Thus, a lock guard should never be leaked otherwise the simulator loses access to the output.
///
/// ```
/// use riscvm::sim::io::{BufferedIO, IODevice, Stream};
///
/// let io = BufferedIO::new();
/// assert!(io.io_write(Stream::Stdout, b"Hello"));
/// assert_eq!(&*io.get_stdout().read().unwrap(), b"Hello");
/// assert!(io.get_stderr().read().unwrap().is_empty());
/// ```
#[derive(Clone)]
pub struct BufferedIO {
    stdout: Arc<RwLock<Vec<u8>>>,
    stderr: Arc<RwLock<Vec<u8>>>
}
impl BufferedIO {
    /// Creates a new BufferedIO.
    pub fn new() -> Self {
        Self { stdout: Default::default(), stderr: Default::default() }
    }
    /// Creates a new BufferedIO from already defined buffers.
    pub fn with_bufs(stdout: Arc<RwLock<Vec<u8>>>, stderr: Arc<RwLock<Vec<u8>>>) -> Self {
        Self { stdout, stderr }
    }

    fn try_output(&self, stream: Stream) -> Option<RwLockWriteGuard<'_, Vec<u8>>> {
        let buf = match stream {
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        };

        match buf.try_write() {
            Ok(g) => Some(g),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Gets a reference to the stdout buffer.
    pub fn get_stdout(&self) -> &Arc<RwLock<Vec<u8>>> {
        &self.stdout
    }
    /// Gets a reference to the stderr buffer.
    pub fn get_stderr(&self) -> &Arc<RwLock<Vec<u8>>> {
        &self.stderr
    }
}
impl Default for BufferedIO {
    fn default() -> Self {
        Self::new()
    }
}
impl IODevice for BufferedIO {
    fn io_write(&self, stream: Stream, bytes: &[u8]) -> bool {
        match self.try_output(stream) {
            Some(mut out) => {
                out.extend_from_slice(bytes);
                true
            },
            None => false
        }
    }

    fn close(self) {}
}

/// A helper struct for [`ChannelIO::new`],
/// indicating the writer is closed and no more writes should be sent to it.
#[derive(Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Stop;

/// An IO that sends each write through a channel to a writer thread.
///
/// The simulator never blocks on the writer itself.
/// It only blocks if the channel is full (i.e., the writer thread is still busy with earlier writes).
pub struct ChannelIO {
    write_data:    cbc::Sender<(Stream, Vec<u8>)>,
    write_handler: JoinHandle<()>
}
impl ChannelIO {
    /// Creates a new channel IO device with the given writer.
    ///
    /// This calls the writer function (on a separate thread)
    /// every time the write syscall produces output.
    /// The writer can return [`Stop`] to refuse any further output.
    ///
    /// ```
    /// use std::sync::{Arc, Mutex};
    /// use riscvm::sim::io::{ChannelIO, IODevice, Stream};
    ///
    /// let seen = Arc::new(Mutex::new(vec![]));
    /// let sink = Arc::clone(&seen);
    /// let io = ChannelIO::new(move |stream, bytes| {
    ///     sink.lock().unwrap().push((stream, bytes));
    ///     Ok(())
    /// });
    ///
    /// assert!(io.io_write(Stream::Stderr, b"oops"));
    /// io.close(); // waits for the writer to finish
    /// assert_eq!(*seen.lock().unwrap(), [(Stream::Stderr, b"oops".to_vec())]);
    /// ```
    pub fn new(mut writer: impl FnMut(Stream, Vec<u8>) -> Result<(), Stop> + Send + 'static) -> Self {
        let (write_tx, write_rx) = cbc::bounded::<(Stream, Vec<u8>)>(16);

        // Writer thread:
        let write_handler = std::thread::spawn(move || {
            for (stream, bytes) in write_rx {
                let Ok(()) = writer(stream, bytes) else { return };
            }
        });

        Self { write_data: write_tx, write_handler }
    }

    /// Creates a channel IO device which forwards output to the process's stdout and stderr.
    ///
    /// This flushes the stream after every write.
    pub fn stdio() -> Self {
        use std::io::{self, Write};

        Self::new(|stream, bytes| {
            let result = match stream {
                Stream::Stdout => {
                    let mut out = io::stdout().lock();
                    out.write_all(&bytes).and_then(|_| out.flush())
                },
                Stream::Stderr => {
                    let mut err = io::stderr().lock();
                    err.write_all(&bytes).and_then(|_| err.flush())
                },
            };
            result.map_err(|_| Stop)
        })
    }
}
impl IODevice for ChannelIO {
    fn io_write(&self, stream: Stream, bytes: &[u8]) -> bool {
        // this fails if the writer thread stopped
        self.write_data.send((stream, bytes.to_vec())).is_ok()
    }

    fn close(self) {
        let Self { write_data, write_handler } = self;

        // Drop the channel, so the writer thread sees it is disconnected
        // once it has drained everything that was sent.
        std::mem::drop(write_data);

        // A panicked writer has nothing left for us to do, so its error is ignored.
        let _ = write_handler.join();
    }
}

// `Box<dyn IODevice>` does not work.
// It doesn't implement IODevice because it doesn't implement close
// (because you can't close on an unsized dyn IODevice).
//
// So, this puts the device in an Option
// and closes it by taking it out and closing it without consuming the entire object,
// making close only require &mut Self instead of Self.
trait IODeviceMutClosable {
    fn io_write(&self, stream: Stream, bytes: &[u8]) -> bool;

    /// Closes but doesn't consume the object.
    ///
    /// Writes after this point are discarded.
    fn take_close(&mut self);
}
impl<D: IODevice> IODeviceMutClosable for Option<D> {
    fn io_write(&self, stream: Stream, bytes: &[u8]) -> bool {
        self.as_ref().is_some_and(|d| d.io_write(stream, bytes))
    }
    fn take_close(&mut self) {
        if let Some(d) = self.take() {
            d.close();
        }
    }
}

/// An opaque box that holds custom defined IO.
///
/// This can be used to use a different implementation of IO
/// than the ones implemented in this module.
pub struct CustomIO(Box<dyn IODeviceMutClosable + Send + Sync>);
impl CustomIO {
    /// Creates a new custom IO.
    pub fn new(device: impl IODevice + Send + Sync + 'static) -> Self {
        CustomIO(Box::new(Some(device)))
    }
}
impl IODevice for CustomIO {
    fn io_write(&self, stream: Stream, bytes: &[u8]) -> bool {
        self.0.io_write(stream, bytes)
    }

    fn close(mut self) {
        self.0.take_close();
    }
}

/// All the variants of IO accepted by the simulator.
#[derive(Default)]
pub enum SimIO {
    /// No IO. This corresponds to the implementation of [`EmptyIO`].
    #[default]
    Empty,
    /// A buffered implementation. See [`BufferedIO`].
    Buffered(BufferedIO),
    /// A channel implementation. See [`ChannelIO`].
    Channel(ChannelIO),
    /// A custom IO implementation. See [`CustomIO`].
    Custom(CustomIO)
}
impl std::fmt::Debug for SimIO {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            SimIO::Empty => "Empty",
            SimIO::Buffered(_) => "Buffered",
            SimIO::Channel(_) => "Channel",
            SimIO::Custom(_) => "Custom",
        };
        f.debug_tuple("SimIO")
            .field(&kind)
            .finish()
    }
}
impl From<EmptyIO> for SimIO {
    fn from(_value: EmptyIO) -> Self {
        SimIO::Empty
    }
}
impl From<BufferedIO> for SimIO {
    fn from(value: BufferedIO) -> Self {
        SimIO::Buffered(value)
    }
}
impl From<ChannelIO> for SimIO {
    fn from(value: ChannelIO) -> Self {
        SimIO::Channel(value)
    }
}
impl From<CustomIO> for SimIO {
    fn from(value: CustomIO) -> Self {
        SimIO::Custom(value)
    }
}
impl IODevice for SimIO {
    fn io_write(&self, stream: Stream, bytes: &[u8]) -> bool {
        match self {
            SimIO::Empty => EmptyIO.io_write(stream, bytes),
            SimIO::Buffered(io) => io.io_write(stream, bytes),
            SimIO::Channel(io) => io.io_write(stream, bytes),
            SimIO::Custom(io) => io.io_write(stream, bytes),
        }
    }

    fn close(self) {
        match self {
            SimIO::Empty => EmptyIO.close(),
            SimIO::Buffered(io) => io.close(),
            SimIO::Channel(io) => io.close(),
            SimIO::Custom(io) => io.close()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{BufferedIO, ChannelIO, CustomIO, IODevice, SimIO, Stop, Stream};

    #[test]
    fn test_buffered_streams() {
        let io = BufferedIO::new();
        let handle = io.clone();
        let sim_io = SimIO::from(io);

        assert!(sim_io.io_write(Stream::Stdout, b"out "));
        assert!(sim_io.io_write(Stream::Stderr, b"err"));
        assert!(sim_io.io_write(Stream::Stdout, b"more"));
        sim_io.close();

        assert_eq!(&*handle.get_stdout().read().unwrap(), b"out more");
        assert_eq!(&*handle.get_stderr().read().unwrap(), b"err");
    }

    #[test]
    fn test_buffered_locked() {
        let io = BufferedIO::new();
        let guard = io.get_stdout().write().unwrap();
        assert!(!io.io_write(Stream::Stdout, b"dropped"));
        assert!(io.io_write(Stream::Stderr, b"kept"));
        drop(guard);

        assert!(io.get_stdout().read().unwrap().is_empty());
    }

    #[test]
    fn test_channel_stop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let io = ChannelIO::new(move |_, bytes| {
            let mut seen = sink.lock().unwrap();
            seen.extend(bytes);
            match seen.len() >= 4 {
                true  => Err(Stop),
                false => Ok(()),
            }
        });

        assert!(io.io_write(Stream::Stdout, b"ab"));
        assert!(io.io_write(Stream::Stdout, b"cd"));
        io.close();

        assert_eq!(*seen.lock().unwrap(), b"abcd");
    }

    #[test]
    fn test_custom() {
        struct Counter(Arc<Mutex<usize>>);
        impl IODevice for Counter {
            fn io_write(&self, _stream: Stream, bytes: &[u8]) -> bool {
                *self.0.lock().unwrap() += bytes.len();
                true
            }
            fn close(self) {}
        }

        let count = Arc::new(Mutex::new(0));
        let io = SimIO::from(CustomIO::new(Counter(Arc::clone(&count))));
        assert!(io.io_write(Stream::Stdout, b"12345"));
        assert!(io.io_write(Stream::Stderr, b"678"));
        io.close();

        assert_eq!(*count.lock().unwrap(), 8);
    }
}

//! Descriptor handles.
//!
//! A handle is anything that can name a platform descriptor. The probe works
//! on raw descriptors internally but always hands the caller's own handles
//! back, so identity survives the round trip.

use crate::tracing_compat::warn;
use hashbrown::HashMap;
use std::fs::File;
use std::io;
use std::net::{TcpListener, TcpStream, UdpSocket};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::os::unix::net::{UnixDatagram, UnixListener, UnixStream};
use std::process::{ChildStderr, ChildStdin, ChildStdout};
use std::rc::Rc;
use std::sync::Arc;

/// Something that resolves to a platform-native numeric descriptor.
pub trait Descriptor {
    /// Returns the raw descriptor this handle refers to.
    fn raw_descriptor(&self) -> RawFd;
}

impl Descriptor for RawFd {
    fn raw_descriptor(&self) -> RawFd {
        *self
    }
}

impl<T: Descriptor + ?Sized> Descriptor for &T {
    fn raw_descriptor(&self) -> RawFd {
        (**self).raw_descriptor()
    }
}

impl<T: Descriptor + ?Sized> Descriptor for &mut T {
    fn raw_descriptor(&self) -> RawFd {
        (**self).raw_descriptor()
    }
}

impl<T: Descriptor + ?Sized> Descriptor for Box<T> {
    fn raw_descriptor(&self) -> RawFd {
        (**self).raw_descriptor()
    }
}

impl<T: Descriptor + ?Sized> Descriptor for Rc<T> {
    fn raw_descriptor(&self) -> RawFd {
        (**self).raw_descriptor()
    }
}

impl<T: Descriptor + ?Sized> Descriptor for Arc<T> {
    fn raw_descriptor(&self) -> RawFd {
        (**self).raw_descriptor()
    }
}

macro_rules! impl_descriptor_via_as_raw_fd {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Descriptor for $ty {
                fn raw_descriptor(&self) -> RawFd {
                    self.as_raw_fd()
                }
            }
        )*
    };
}

impl_descriptor_via_as_raw_fd!(
    File,
    OwnedFd,
    BorrowedFd<'_>,
    TcpStream,
    TcpListener,
    UdpSocket,
    UnixStream,
    UnixListener,
    UnixDatagram,
    io::Stdin,
    ChildStdin,
    ChildStdout,
    ChildStderr,
);

/// Adapter for any [`AsFd`] type without its own [`Descriptor`] impl,
/// including borrowed handles such as `&File`.
///
/// ```
/// use readyprobe::SourceFd;
/// use readyprobe::Descriptor;
/// use std::os::unix::net::UnixStream;
///
/// let (left, _right) = UnixStream::pair().unwrap();
/// let handle = SourceFd(left);
/// assert!(handle.raw_descriptor() >= 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceFd<T>(pub T);

impl<T: AsFd> Descriptor for SourceFd<T> {
    fn raw_descriptor(&self) -> RawFd {
        self.0.as_fd().as_raw_fd()
    }
}

/// Maps resolved descriptors back to positions in the caller's handle slice.
#[derive(Debug, Default)]
pub(crate) struct DescriptorMap {
    by_fd: HashMap<RawFd, usize>,
    fds: Vec<RawFd>,
}

impl DescriptorMap {
    /// Resolves every handle once.
    ///
    /// Negative descriptors are rejected. A descriptor shared by several
    /// handles is registered once and maps to the first of them.
    pub(crate) fn resolve<H: Descriptor>(handles: &[H]) -> io::Result<Self> {
        let mut map = Self {
            by_fd: HashMap::with_capacity(handles.len()),
            fds: Vec::with_capacity(handles.len()),
        };
        for (index, handle) in handles.iter().enumerate() {
            let fd = handle.raw_descriptor();
            if fd < 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("handle {index} resolved to negative descriptor {fd}"),
                ));
            }
            if map.by_fd.contains_key(&fd) {
                warn!(fd, index, "descriptor supplied more than once, keeping first handle");
                continue;
            }
            map.by_fd.insert(fd, index);
            map.fds.push(fd);
        }
        Ok(map)
    }

    /// The unique descriptors, in first-seen order.
    pub(crate) fn descriptors(&self) -> &[RawFd] {
        &self.fds
    }

    /// Turns ready descriptors back into references to the caller's handles.
    ///
    /// Keeps the order of `ready`. Unknown or repeated descriptors are
    /// dropped, so the result never holds a handle twice.
    pub(crate) fn restore<'a, H>(
        &self,
        handles: &'a [H],
        ready: impl IntoIterator<Item = RawFd>,
    ) -> Vec<&'a H> {
        let mut seen = vec![false; handles.len()];
        let mut out = Vec::new();
        for fd in ready {
            let Some(&index) = self.by_fd.get(&fd) else {
                continue;
            };
            if !seen[index] {
                seen[index] = true;
                out.push(&handles[index]);
            }
        }
        out
    }
}

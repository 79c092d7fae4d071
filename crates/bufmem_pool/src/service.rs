//! # Allocator Service
//!
//! One arena owned by a dedicated thread. Clients send requests over a
//! crossbeam channel and wait for the reply on a per-request channel, so
//! every operation on the arena is serialized without a lock.
//!
//! ```text
//!   AllocatorClient ──┐
//!   AllocatorClient ──┼──► requests ──► [bufmem-allocator thread] owns Arena
//!   AllocatorClient ──┘                        │
//!          ▲                                   │
//!          └──────────── reply (bounded 1) ◄───┘
//! ```
//!
//! Unlike [`Arena::free`], a bad free sent to the service is reported back
//! to the caller as
//! [`ArenaError::InvalidFree`](bufmem_core::ArenaError::InvalidFree) and the
//! thread keeps running.

use std::thread::{self, JoinHandle};

use bufmem_core::{Arena, ArenaResult};
use crossbeam_channel::{Receiver, Sender};

use crate::error::{PoolError, PoolResult};

/// Messages understood by the service thread.
enum Request {
    Allocate {
        size: usize,
        alignment: usize,
        reply: Sender<ArenaResult<usize>>,
    },
    AllocateAt {
        offset: usize,
        size: usize,
        reply: Sender<ArenaResult<usize>>,
    },
    Free {
        offset: usize,
        reply: Sender<ArenaResult<()>>,
    },
    NumBlocks {
        reply: Sender<usize>,
    },
    DebugDump {
        block_size: usize,
        reply: Sender<String>,
    },
    Reset {
        capacity: usize,
        reply: Sender<()>,
    },
    Shutdown,
}

/// Owner of the allocator thread. Stops and joins the thread on drop.
#[derive(Debug)]
pub struct AllocatorService {
    client: AllocatorClient,
    thread: Option<JoinHandle<Arena>>,
}

impl AllocatorService {
    /// Starts a thread owning an arena of `capacity` bytes.
    ///
    /// # Errors
    ///
    /// [`PoolError::ServiceSpawn`] if the OS refuses to create the thread.
    pub fn spawn(capacity: usize) -> PoolResult<Self> {
        let (requests, receiver) = crossbeam_channel::unbounded();

        let thread = thread::Builder::new()
            .name("bufmem-allocator".into())
            .spawn(move || serve(Arena::new(capacity), &receiver))
            .map_err(|e| PoolError::ServiceSpawn(e.to_string()))?;

        tracing::info!("Allocator service started: {} bytes", capacity);

        Ok(Self {
            client: AllocatorClient { requests },
            thread: Some(thread),
        })
    }

    /// A new handle for sending requests, usable from any thread.
    #[must_use]
    pub fn client(&self) -> AllocatorClient {
        self.client.clone()
    }

    /// Stops the thread and returns its arena for inspection.
    ///
    /// # Errors
    ///
    /// [`PoolError::ServiceStopped`] if the thread already died.
    pub fn shutdown(mut self) -> PoolResult<Arena> {
        self.stop().ok_or(PoolError::ServiceStopped)
    }

    fn stop(&mut self) -> Option<Arena> {
        let thread = self.thread.take()?;
        // A send error means the thread is already gone; join tells us how.
        let _ = self.client.requests.send(Request::Shutdown);
        thread.join().ok()
    }
}

impl Drop for AllocatorService {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn serve(mut arena: Arena, requests: &Receiver<Request>) -> Arena {
    // Reply send errors mean the client gave up waiting; nothing to do.
    for request in requests {
        match request {
            Request::Allocate { size, alignment, reply } => {
                let _ = reply.send(arena.allocate(size, alignment));
            }
            Request::AllocateAt { offset, size, reply } => {
                let _ = reply.send(arena.allocate_at(offset, size));
            }
            Request::Free { offset, reply } => {
                let result = arena.try_free(offset);
                if let Err(err) = result {
                    tracing::error!("Allocator service rejected free: {}", err);
                }
                let _ = reply.send(result);
            }
            Request::NumBlocks { reply } => {
                let _ = reply.send(arena.num_blocks());
            }
            Request::DebugDump { block_size, reply } => {
                let _ = reply.send(arena.debug_dump(block_size));
            }
            Request::Reset { capacity, reply } => {
                arena.reset(capacity);
                let _ = reply.send(());
            }
            Request::Shutdown => break,
        }
    }

    tracing::info!("Allocator service stopped: {} blocks live", arena.num_blocks());
    arena
}

/// Cloneable handle to an [`AllocatorService`].
#[derive(Clone, Debug)]
pub struct AllocatorClient {
    requests: Sender<Request>,
}

impl AllocatorClient {
    /// See [`Arena::allocate`].
    ///
    /// # Errors
    ///
    /// [`PoolError::Arena`] from the arena, or [`PoolError::ServiceStopped`].
    pub fn allocate(&self, size: usize, alignment: usize) -> PoolResult<usize> {
        self.call(|reply| Request::Allocate { size, alignment, reply })?
            .map_err(PoolError::from)
    }

    /// See [`Arena::allocate_at`].
    ///
    /// # Errors
    ///
    /// [`PoolError::Arena`] from the arena, or [`PoolError::ServiceStopped`].
    pub fn allocate_at(&self, offset: usize, size: usize) -> PoolResult<usize> {
        self.call(|reply| Request::AllocateAt { offset, size, reply })?
            .map_err(PoolError::from)
    }

    /// See [`Arena::try_free`].
    ///
    /// # Errors
    ///
    /// [`PoolError::Arena`] with `ArenaError::InvalidFree` for a bad
    /// offset, or [`PoolError::ServiceStopped`].
    pub fn free(&self, offset: usize) -> PoolResult<()> {
        self.call(|reply| Request::Free { offset, reply })?
            .map_err(PoolError::from)
    }

    /// See [`Arena::num_blocks`].
    ///
    /// # Errors
    ///
    /// [`PoolError::ServiceStopped`].
    pub fn num_blocks(&self) -> PoolResult<usize> {
        self.call(|reply| Request::NumBlocks { reply })
    }

    /// See [`Arena::debug_dump`].
    ///
    /// # Errors
    ///
    /// [`PoolError::ServiceStopped`].
    pub fn debug_dump(&self, block_size: usize) -> PoolResult<String> {
        self.call(|reply| Request::DebugDump { block_size, reply })
    }

    /// See [`Arena::reset`].
    ///
    /// # Errors
    ///
    /// [`PoolError::ServiceStopped`].
    pub fn reset(&self, capacity: usize) -> PoolResult<()> {
        self.call(|reply| Request::Reset { capacity, reply })
    }

    fn call<T>(&self, request: impl FnOnce(Sender<T>) -> Request) -> PoolResult<T> {
        let (reply, response) = crossbeam_channel::bounded(1);
        self.requests
            .send(request(reply))
            .map_err(|_| PoolError::ServiceStopped)?;
        response.recv().map_err(|_| PoolError::ServiceStopped)
    }
}

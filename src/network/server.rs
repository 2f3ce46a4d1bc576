//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError};
use parking_lot::Mutex;

use crate::bus::SharedBus;
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;

use super::Connection;

/// Stops a running [`Server`] from another thread
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Stop accepting and close open sessions; `run` then returns
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Sockets of the sessions workers are currently serving
///
/// Closing them on shutdown wakes workers blocked in a read, so an idle
/// client cannot hold `run` open until its read timeout.
#[derive(Debug, Default)]
struct Sessions {
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, TcpStream>>,
}

impl Sessions {
    fn register(&self, stream: TcpStream) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.open.lock().insert(id, stream);
        id
    }

    fn remove(&self, id: u64) {
        self.open.lock().remove(&id);
    }

    fn close_all(&self) {
        let open = self.open.lock();
        for stream in open.values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if !open.is_empty() {
            tracing::info!("Closed {} open session(s)", open.len());
        }
    }
}

/// TCP server for the I2C bridge
///
/// ## Threads
/// - The caller of `run` is the acceptor
/// - `config.workers` threads each serve one connection at a time
/// - Bus access is serialized by [`SharedBus`], not by the thread layout
/// - While every worker is busy the acceptor waits, re-checking shutdown
///   every `accept_poll_ms`
pub struct Server {
    config: ServerConfig,
    dispatcher: Dispatcher,
    listener: TcpListener,
    shutdown: ShutdownHandle,
    sessions: Arc<Sessions>,
}

impl Server {
    /// Bind the listen address; the bus must already be open
    pub fn bind(config: ServerConfig, bus: Arc<SharedBus>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;
        tracing::info!("I2C server listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            dispatcher: Dispatcher::new(bus),
            listener,
            shutdown: ShutdownHandle::default(),
            sessions: Arc::new(Sessions::default()),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Start the server (blocking)
    ///
    /// Returns after shutdown was requested. Open sessions are closed,
    /// connections still queued for a worker are dropped, and the bus is
    /// closed on the way out.
    pub fn run(&self) -> Result<()> {
        let (sender, receiver) = channel::bounded::<TcpStream>(self.config.workers);

        let workers = (0..self.config.workers)
            .map(|id| self.spawn_worker(id, receiver.clone()))
            .collect::<std::io::Result<Vec<_>>>()?;
        drop(receiver);

        let poll = Duration::from_millis(self.config.accept_poll_ms.max(1));

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::info!("Client connected from {}", addr);
                    if !self.hand_off(&sender, stream, addr, poll) {
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(poll);
                }
            }
        }

        tracing::info!("Server shutting down...");
        self.shutdown.shutdown();
        drop(sender);
        self.sessions.close_all();
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        self.dispatcher.bus().close();
        Ok(())
    }

    /// Queue an accepted stream for the workers
    ///
    /// Returns false when the acceptor should stop: no worker is left, or
    /// shutdown was requested while the queue was full.
    fn hand_off(
        &self,
        sender: &channel::Sender<TcpStream>,
        mut stream: TcpStream,
        addr: SocketAddr,
        poll: Duration,
    ) -> bool {
        loop {
            match sender.send_timeout(stream, poll) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(pending)) => {
                    if self.shutdown.is_shutdown() {
                        tracing::info!("Dropping queued client {} on shutdown", addr);
                        return false;
                    }
                    stream = pending;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    tracing::error!("All workers exited; stopping acceptor");
                    return false;
                }
            }
        }
    }

    fn spawn_worker(
        &self,
        id: usize,
        connections: Receiver<TcpStream>,
    ) -> std::io::Result<JoinHandle<()>> {
        let dispatcher = self.dispatcher.clone();
        let sessions = Arc::clone(&self.sessions);
        let shutdown = self.shutdown.clone();
        let read_timeout_ms = self.config.read_timeout_ms;
        let write_timeout_ms = self.config.write_timeout_ms;

        thread::Builder::new()
            .name(format!("i2c-worker-{}", id))
            .spawn(move || {
                for stream in connections.iter() {
                    let session = match stream.try_clone() {
                        Ok(handle) => sessions.register(handle),
                        Err(e) => {
                            tracing::warn!("Cannot track connection: {}", e);
                            continue;
                        }
                    };

                    // Checked after registering so close_all cannot miss us
                    if shutdown.is_shutdown() {
                        sessions.remove(session);
                        continue;
                    }

                    Self::serve(stream, &dispatcher, read_timeout_ms, write_timeout_ms);
                    sessions.remove(session);
                }
            })
    }

    /// Run one client session to completion on the calling worker
    fn serve(
        stream: TcpStream,
        dispatcher: &Dispatcher,
        read_timeout_ms: u64,
        write_timeout_ms: u64,
    ) {
        let mut connection = match Connection::new(stream, dispatcher.clone()) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!("Cannot set up connection: {}", e);
                return;
            }
        };

        if let Err(e) = connection.set_timeouts(read_timeout_ms, write_timeout_ms) {
            tracing::warn!("Cannot set timeouts for {}: {}", connection.peer_addr(), e);
            return;
        }

        if let Err(e) = connection.handle() {
            tracing::error!("Error handling client {}: {}", connection.peer_addr(), e);
        }
        tracing::info!("Client {} closed", connection.peer_addr());
    }
}

//! Lock-free, DMA-friendly SPSC FIFO over caller-owned storage.
//!
//! `dma-fifo` is the buffering primitive beneath a higher-level transport
//! (for example a USB endpoint pipe). It decouples the timing of data
//! production from data consumption in places where one side runs inside an
//! interrupt or DMA-completion handler and must never block or take a lock.
//!
//! # Architecture
//!
//! ```text
//! Transport layer (endpoint pipe, stream driver)
//!         ↓
//! Fifo (this crate - index model + bulk paths)
//!         ↓ linear spans / unchecked cursor moves
//! DMA engine / peripheral FIFO register
//! ```
//!
//! The engine keeps *unmasked* write and read cursors that each advance
//! modulo `2 × depth` rather than `depth`. Because emptiness and fullness
//! fall out of the cursor difference alone, neither side ever performs a
//! read-modify-write on shared state: the writer owns the write cursor, the
//! reader owns the read cursor, and a single-writer/single-reader pair may
//! run from independent execution contexts (task + ISR) with no lock at all.
//!
//! # What this crate does not do
//!
//! - No allocation: backing storage is a caller-owned `&mut [u8]`.
//! - No blocking or wakeup signalling: a full/empty FIFO reports failure or
//!   a zero count immediately; callers poll.
//! - No variable-length items: every slot is a fixed-size record.
//! - No multi-producer/multi-consumer correctness beyond the optional
//!   injected lock (see [`lock`]).
//!
//! # Features
//!
//! - `defmt`: derive `defmt::Format` on public types
//! - `critical-section`: provide [`lock::CriticalSectionLock`] for callers
//!   with more than one non-ISR context
//!
//! # Example
//!
//! ```
//! use dma_fifo::Fifo;
//!
//! let mut storage = [0u8; 8];
//! let fifo = Fifo::new(&mut storage, 1, false).unwrap();
//! assert_eq!(fifo.write_n(&[1, 2, 3], 3), 3);
//! let mut out = [0u8; 3];
//! assert_eq!(fifo.read_n(&mut out, 3), 3);
//! assert_eq!(out, [1, 2, 3]);
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in ISR-reachable code
#![deny(clippy::expect_used)] // no .expect() in ISR-reachable code
#![deny(clippy::panic)] // no panic!() in ISR-reachable code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block

pub mod copy;
pub mod dma;
pub mod fifo;
pub mod lock;

pub use copy::CopyMode;
pub use dma::{LinearRead, LinearWrite};
pub use fifo::{ConfigError, Fifo};
pub use lock::{Lock, NoopLock};

#[cfg(feature = "critical-section")]
pub use lock::CriticalSectionLock;

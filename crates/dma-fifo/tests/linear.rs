//! Linear-access law and DMA-style span/advance round trips.
//!
//! These tests drive the FIFO the way a DMA engine does: request a
//! contiguous span, move bytes through the raw pointer, then advance the
//! matching cursor from "completion" code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]

use dma_fifo::Fifo;

/// Fill a write span through its raw pointer, as a DMA transfer would.
///
/// # Safety contract exercised
/// The span lies inside the ring's storage and the cursor is advanced by
/// exactly the number of items written.
fn dma_write(fifo: &Fifo<'_>, data: &[u8]) -> usize {
    let mut written = 0;
    while written < data.len() {
        let span = fifo.linear_write_info(0, (data.len() - written) as u16);
        if span.items == 0 {
            break;
        }
        let chunk = usize::from(span.items);
        // SAFETY: the span is a valid writable run of `chunk` items.
        unsafe {
            core::ptr::copy_nonoverlapping(data[written..].as_ptr(), span.ptr, chunk);
            fifo.advance_write_index(span.items);
        }
        written += chunk;
    }
    written
}

/// Drain a read span through its raw pointer, as a DMA transfer would.
fn dma_read(fifo: &Fifo<'_>, out: &mut [u8]) -> usize {
    let mut read = 0;
    while read < out.len() {
        let span = fifo.linear_read_info(0, (out.len() - read) as u16);
        if span.items == 0 {
            break;
        }
        let chunk = usize::from(span.items);
        // SAFETY: the span is a valid readable run of `chunk` items.
        unsafe {
            core::ptr::copy_nonoverlapping(span.ptr, out[read..].as_mut_ptr(), chunk);
            fifo.advance_read_index(span.items);
        }
        read += chunk;
    }
    read
}

#[test]
fn spans_never_cross_the_physical_end() {
    let mut storage = [0u8; 6];
    let fifo = Fifo::new(&mut storage, 1, false).unwrap();
    // Put the cursors at slot 4 of a depth-6 ring.
    assert_eq!(fifo.write_n(&[1, 2, 3, 4], 4), 4);
    let mut scratch = [0u8; 4];
    assert_eq!(fifo.read_n(&mut scratch, 4), 4);

    // Free space is 6 but only 2 slots remain before the wrap.
    let span = fifo.linear_write_info(0, 6);
    assert_eq!(span.items, 2);

    // Occupy all six slots, then check the read side the same way.
    assert_eq!(fifo.write_n(&[10, 11, 12, 13, 14, 15], 6), 6);
    let span = fifo.linear_read_info(0, 6);
    assert_eq!(span.items, 2);
}

#[test]
fn spans_are_clamped_by_request_and_availability() {
    let mut storage = [0u8; 6];
    let fifo = Fifo::new(&mut storage, 1, false).unwrap();
    assert_eq!(fifo.write_n(&[1, 2, 3], 3), 3);

    // Request less than what is linearly available.
    assert_eq!(fifo.linear_read_info(0, 2).items, 2);
    // Request more than the occupancy.
    assert_eq!(fifo.linear_read_info(0, 6).items, 3);
    // Write side: 3 free, all linear (slots 3..6).
    assert_eq!(fifo.linear_write_info(0, 6).items, 3);
    assert_eq!(fifo.linear_write_info(2, 6).items, 1);
}

#[test]
fn read_span_honors_the_offset() {
    let mut storage = [0u8; 6];
    let fifo = Fifo::new(&mut storage, 1, false).unwrap();
    assert_eq!(fifo.write_n(&[1, 2, 3, 4, 5], 5), 5);

    let span = fifo.linear_read_info(2, 6);
    assert_eq!(span.items, 3);
    // SAFETY: the span is a valid readable run of 3 items.
    let bytes = unsafe { core::slice::from_raw_parts(span.ptr, 3) };
    assert_eq!(bytes, &[3, 4, 5]);
    // Peeking through spans moves nothing.
    assert_eq!(fifo.count(), 5);
}

#[test]
fn dma_round_trip_across_the_wrap_point() {
    let mut storage = [0u8; 6];
    let fifo = Fifo::new(&mut storage, 1, false).unwrap();

    // Walk the cursors to slot 4 so the next transfer wraps.
    assert_eq!(fifo.write_n(&[0, 0, 0, 0], 4), 4);
    let mut scratch = [0u8; 4];
    assert_eq!(fifo.read_n(&mut scratch, 4), 4);

    // A 6-item DMA write needs two spans: 2 items to the end, 4 from the
    // start.
    let data = [7, 8, 9, 10, 11, 12];
    assert_eq!(dma_write(&fifo, &data), 6);
    assert!(fifo.is_full());

    let mut out = [0u8; 6];
    assert_eq!(dma_read(&fifo, &mut out), 6);
    assert_eq!(out, data);
    assert!(fifo.is_empty());
}

#[test]
fn dma_spans_interoperate_with_checked_reads() {
    let mut storage = [0u8; 5];
    let fifo = Fifo::new(&mut storage, 1, false).unwrap();

    assert_eq!(dma_write(&fifo, &[1, 2, 3]), 3);
    let mut out = [0u8; 3];
    assert_eq!(fifo.read_n(&mut out, 3), 3);
    assert_eq!(out, [1, 2, 3]);
}

#[test]
fn dma_write_stops_when_the_ring_is_full() {
    let mut storage = [0u8; 3];
    let fifo = Fifo::new(&mut storage, 1, false).unwrap();
    assert_eq!(dma_write(&fifo, &[1, 2, 3, 4, 5]), 3);
    assert_eq!(fifo.count(), 3);
}

#[test]
fn backward_write_index_retracts_uncommitted_items() {
    let mut storage = [0u8; 4];
    let fifo = Fifo::new(&mut storage, 1, false).unwrap();
    assert_eq!(fifo.write_n(&[1, 2, 3], 3), 3);

    // An aborted transfer hands back its final item.
    // SAFETY: the writer side is exclusively ours; one produced item is
    // retracted.
    unsafe { fifo.backward_write_index(1) };
    assert_eq!(fifo.count(), 2);

    let mut out = [0u8; 2];
    assert_eq!(fifo.read_n(&mut out, 2), 2);
    assert_eq!(out, [1, 2]);
}

#[test]
fn backward_read_index_rewinds_to_intact_items() {
    let mut storage = [0u8; 4];
    let fifo = Fifo::new(&mut storage, 1, false).unwrap();
    assert_eq!(fifo.write_n(&[1, 2, 3], 3), 3);
    let mut out = [0u8; 2];
    assert_eq!(fifo.read_n(&mut out, 2), 2);

    // Rewind one item: it has not been overwritten, so it is readable again.
    // SAFETY: the reader side is exclusively ours; the item is intact.
    unsafe { fifo.backward_read_index(1) };
    assert_eq!(fifo.count(), 2);
    assert_eq!(fifo.read_n(&mut out, 2), 2);
    assert_eq!(out, [2, 3]);
}

#[test]
fn read_spans_resynchronize_after_an_overwrite() {
    let mut storage = [0u8; 4];
    let fifo = Fifo::new(&mut storage, 1, true).unwrap();
    assert_eq!(fifo.write_n(&[1, 2, 3, 4], 4), 4);
    assert_eq!(fifo.write_n(&[5, 6], 2), 2);
    assert!(fifo.overflowed());

    // The span must start at the oldest surviving item and the correction
    // must stick: a span-by-span drain yields each item exactly once.
    let mut out = [0u8; 4];
    assert_eq!(dma_read(&fifo, &mut out), 4);
    assert_eq!(out, [3, 4, 5, 6]);
    assert!(fifo.is_empty());
    assert!(!fifo.overflowed());
}

#[test]
fn linear_write_spans_never_evict_on_an_overwritable_ring() {
    let mut storage = [0u8; 3];
    let fifo = Fifo::new(&mut storage, 1, true).unwrap();
    assert_eq!(fifo.write_n(&[1, 2, 3], 3), 3);
    // write_n would evict here; the DMA span must refuse instead.
    assert_eq!(fifo.linear_write_info(0, 1).items, 0);
}

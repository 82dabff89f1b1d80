//! Property-based laws for the pipe using proptest.
//!
//! These tests verify the conservation and ordering guarantees for
//! arbitrary append shapes:
//!
//! - every byte appended before the write end closes is drained before
//!   end of stream, in order;
//! - the law holds under back-pressure, when the producer repeatedly
//!   blocks on a small capacity;
//! - the buffered count tracks appended-minus-drained exactly;
//! - byte-at-a-time drains observe the same stream as bulk drains.

use pipe::{pipe, PipeOptions};
use proptest::prelude::*;
use std::io::Read;
use std::num::NonZeroUsize;
use std::thread;

fn nz(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).expect("non-zero value required")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn drained_bytes_equal_appended_bytes(
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..512), 0..16),
    ) {
        let (writer, mut reader) = pipe(PipeOptions::new());
        let expected: Vec<u8> = chunks.iter().flatten().copied().collect();

        let producer = thread::spawn(move || {
            for chunk in &chunks {
                writer.append(chunk).expect("append succeeds");
            }
            // Dropping the writer closes the write end.
        });

        let mut received = Vec::new();
        reader.read_to_end(&mut received).expect("read to end succeeds");
        producer.join().expect("producer thread");
        prop_assert_eq!(received, expected);
    }

    #[test]
    fn bounded_pipe_preserves_order_under_backpressure(
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..8), 1..32),
    ) {
        let (writer, reader) = pipe(PipeOptions::new().capacity(nz(8)));
        let expected: Vec<u8> = chunks.iter().flatten().copied().collect();

        let producer = thread::spawn(move || {
            for chunk in &chunks {
                writer.append(chunk).expect("append succeeds");
            }
        });

        let mut received = Vec::new();
        while let Some(chunk) = reader.read_available(5).expect("read succeeds") {
            received.extend_from_slice(&chunk);
        }
        producer.join().expect("producer thread");
        prop_assert_eq!(received, expected);
    }

    #[test]
    fn count_matches_appended_minus_drained(
        appends in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..8),
        drain in 0usize..256,
    ) {
        let (writer, reader) = pipe(PipeOptions::new());
        let total: usize = appends.iter().map(Vec::len).sum();
        for chunk in &appends {
            writer.append(chunk).expect("append succeeds");
        }
        prop_assert_eq!(reader.len(), total);

        let mut buf = vec![0u8; drain.min(total)];
        if !buf.is_empty() {
            let drained = reader.read(&mut buf).expect("read succeeds");
            prop_assert_eq!(drained, buf.len());
        }
        prop_assert_eq!(reader.len(), total - buf.len());
        prop_assert_eq!(reader.is_empty(), total == buf.len());
    }

    #[test]
    fn single_byte_reads_preserve_stream_order(
        data in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let (writer, reader) = pipe(PipeOptions::new());
        for chunk in data.chunks(7) {
            writer.append(chunk).expect("append succeeds");
        }
        writer.close();

        let mut received = Vec::new();
        while let Some(byte) = reader.read_byte().expect("read succeeds") {
            received.push(byte);
        }
        prop_assert_eq!(received, data);
    }
}

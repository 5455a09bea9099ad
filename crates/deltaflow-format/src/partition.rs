// SPDX-License-Identifier: Apache-2.0
//! The masked reader/writer primitives blocks use to produce and consume
//! their payload partitions.
//!
//! A block's payload is one or more independently byte-addressable
//! "partitions" (§4.3's chunk/partition model). A Rust byte slice or
//! `Vec<u8>` is already a zero-offset virtual file by construction, so the
//! masking this module performs is simpler than a streaming file-object
//! wrapper would need to be: [`PartitionWriter`] just remembers where the
//! current partition started, and a parsed block's partitions are handed
//! to its `parse` method as plain `&[u8]` slices.

/// Accumulates a block's payload bytes across one or more partitions.
///
/// Call [`PartitionWriter::next`] between partitions; the writer measures
/// the just-finished partition's length and appends it to the partition
/// list. [`PartitionWriter::finish`] closes out any still-open partition
/// and returns the full payload alongside the per-partition lengths.
#[derive(Default)]
pub struct PartitionWriter {
    buf: Vec<u8>,
    partition_start: usize,
    partitions: Vec<u64>,
}

impl PartitionWriter {
    /// Start a new, empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the current partition, recording its length, and start a new
    /// one.
    pub fn next(&mut self) {
        let len = (self.buf.len() - self.partition_start) as u64;
        self.partitions.push(len);
        self.partition_start = self.buf.len();
    }

    /// Close out any open partition and return the accumulated payload
    /// bytes plus the per-partition length list.
    #[must_use]
    pub fn finish(mut self) -> (Vec<u8>, Vec<u64>) {
        if self.buf.len() > self.partition_start || self.partitions.is_empty() {
            self.next();
        }
        (self.buf, self.partitions)
    }
}

impl std::io::Write for PartitionWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Split a block's raw payload bytes into partitions according to its
/// recorded chunk lengths.
#[must_use]
pub fn split_partitions(payload: &[u8], partition_lens: &[u64]) -> Vec<&[u8]> {
    let mut offset = 0usize;
    let mut out = Vec::with_capacity(partition_lens.len());
    for &len in partition_lens {
        let len = len as usize;
        out.push(&payload[offset..offset + len]);
        offset += len;
    }
    out
}

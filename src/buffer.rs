use crate::error::ClientError;
use crate::types::TimeSeriesPoint;

/// A bounded, ordered staging area for points waiting to be written.
///
/// The capacity is fixed at construction and the buffer never grows past it. A push onto a
/// full buffer is rejected with [`ClientError::BufferFull`] and leaves the buffer untouched;
/// callers are expected to poll [`PointBuffer::is_full`] and flush proactively.
///
/// The buffer holds no lock. Concurrent producers must serialize access themselves (or keep
/// one buffer per worker).
#[derive(Debug)]
pub struct PointBuffer {
    points: Vec<TimeSeriesPoint>,
    capacity: usize,
}

impl PointBuffer {
    /// Creates an empty buffer that can hold up to `capacity` points.
    pub fn new(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a point in arrival order.
    pub fn push(&mut self, point: TimeSeriesPoint) -> Result<(), ClientError> {
        if self.is_full() {
            return Err(ClientError::BufferFull {
                capacity: self.capacity,
            });
        }
        self.points.push(point);
        Ok(())
    }

    /// Number of live (unflushed) points.
    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drops every live point. The allocation is kept for the next batch.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Read-only view of the live points, in insertion order.
    ///
    /// The count is unchanged; the writer calls [`PointBuffer::clear`] once the batch has
    /// been accepted.
    pub fn drain(&self) -> &[TimeSeriesPoint] {
        &self.points
    }
}

//! Short Window Module
//!
//! Provides the decoder's fixed-size staging window and the pull contract.
//!
//! The window holds the most recently fetched bytes. `pull(n)` guarantees at least
//! `n` contiguous unread bytes starting at the read index, fetching more from the
//! source (one read per call) and compacting when the free tail gets small.
//!
//! To make decoding resumable, the window also remembers where the current
//! top-level term started (the mark). Bytes of that pending term that compaction
//! pushes out of the window are kept in a journal. If the term cannot be finished
//! yet, `rewind` moves the journal and everything after the mark into a replay
//! queue that is served before the source, so the next attempt re-reads the term
//! from its first byte.
//!
//! A failed attempt also records how many bytes the term is known to need. Until
//! that many are buffered, `prefetch` only queues new source bytes and the
//! decoder reports `Short` without parsing the term again.

use crate::decoding::DecodeError;
use crate::source::ByteSource;
use infrastructure_chunk_buffer::CHUNK_SIZE;
use tracing::trace;

/// Capacity of the short window
pub const SHORT_WINDOW_SIZE: usize = CHUNK_SIZE;

#[derive(Debug)]
pub(crate) struct ShortWindow {
    buf: Box<[u8]>,
    /// Next unread byte
    index: usize,
    /// Bytes currently valid in `buf`
    len: usize,
    /// Start of the pending top-level term
    mark: usize,
    /// Bytes of the pending term already compacted out of `buf`
    journal: Vec<u8>,
    /// Bytes to serve before the source after a rewind
    replay: Vec<u8>,
    replay_pos: usize,
    /// Lower bound on the pending term's size, counted from its first byte
    needed: usize,
    /// Rewinds that moved bytes into the replay queue
    rewinds: usize,
}

impl ShortWindow {
    pub(crate) fn new() -> Self {
        Self {
            buf: vec![0u8; SHORT_WINDOW_SIZE].into_boxed_slice(),
            index: 0,
            len: 0,
            mark: 0,
            journal: Vec::new(),
            replay: Vec::new(),
            replay_pos: 0,
            needed: 0,
            rewinds: 0,
        }
    }

    /// Largest pull the window can always satisfy
    pub(crate) fn max_pull(&self) -> usize {
        self.buf.len() / 2
    }

    /// Unread bytes staged in the window
    pub(crate) fn unread(&self) -> usize {
        self.len - self.index
    }

    /// Bytes staged or queued for replay that no decode has consumed yet
    pub(crate) fn buffered(&self) -> usize {
        self.unread() + (self.replay.len() - self.replay_pos)
    }

    /// Bytes of the pending term consumed so far
    fn offset(&self) -> usize {
        self.journal.len() + (self.index - self.mark)
    }

    /// Record that the pending term runs at least `n` bytes past the read index
    pub(crate) fn expect(&mut self, n: usize) {
        self.needed = self.needed.max(self.offset().saturating_add(n));
    }

    /// Ensure at least `n` contiguous unread bytes are staged
    pub(crate) fn pull<S>(&mut self, source: &mut S, n: usize) -> Result<(), DecodeError>
    where
        S: ByteSource + ?Sized,
    {
        debug_assert!(n <= self.max_pull());

        let unread = self.unread();
        if n <= unread {
            return Ok(());
        }

        if self.buf.len() - self.len < self.max_pull() {
            self.compact()?;
        }

        let fetched = self.fill(source)?;
        if fetched == 0 && unread == 0 {
            self.expect(n);
            return Err(DecodeError::Empty);
        }

        if self.unread() < n {
            trace!(needed = n, available = self.unread(), "short window underrun");
            self.expect(n);
            return Err(DecodeError::Short);
        }
        Ok(())
    }

    /// Queue source bytes until the pending term's known size is buffered
    ///
    /// Returns `false` if the source runs dry first. Queued bytes stay in the
    /// replay queue for the next attempt.
    pub(crate) fn prefetch<S>(&mut self, source: &mut S) -> Result<bool, DecodeError>
    where
        S: ByteSource + ?Sized,
    {
        while self.buffered() < self.needed {
            if self.replay_pos == self.replay.len() {
                self.replay.clear();
                self.replay_pos = 0;
            }

            let want = (self.needed - self.buffered()).min(SHORT_WINDOW_SIZE);
            let start = self.replay.len();
            self.replay
                .try_reserve(want)
                .map_err(|_| DecodeError::OutOfMemory)?;
            self.replay.resize(start + want, 0);

            let count = match source.read_into(&mut self.replay[start..]) {
                Ok(count) => count,
                Err(err) => {
                    self.replay.truncate(start);
                    return Err(err);
                }
            };
            self.replay.truncate(start + count);
            if count == 0 {
                trace!(
                    needed = self.needed,
                    buffered = self.buffered(),
                    "pending term still incomplete"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Consume `n` staged bytes, returning them
    ///
    /// Callers must have pulled at least `n` bytes first.
    pub(crate) fn take(&mut self, n: usize) -> &[u8] {
        let start = self.index;
        self.index += n;
        &self.buf[start..start + n]
    }

    /// Start a new top-level term at the current read index
    pub(crate) fn begin(&mut self) {
        self.mark = self.index;
        self.journal.clear();
        self.needed = 0;
    }

    /// Whether any byte of the current top-level term has been consumed
    pub(crate) fn is_pending(&self) -> bool {
        self.index != self.mark || !self.journal.is_empty()
    }

    /// Accept everything consumed since `begin`
    pub(crate) fn commit(&mut self) {
        self.mark = self.index;
        self.needed = 0;
        if self.journal.capacity() > SHORT_WINDOW_SIZE * 4 {
            self.journal = Vec::new();
        } else {
            self.journal.clear();
        }
    }

    /// Un-consume everything read since `begin`
    ///
    /// The known size of the pending term is kept for `prefetch`. If the replay
    /// queue cannot be allocated the term is abandoned instead.
    pub(crate) fn rewind(&mut self) -> Result<(), DecodeError> {
        if self.journal.is_empty() {
            self.index = self.mark;
            return Ok(());
        }

        let staged = self.len - self.mark;
        let queued = self.replay.len() - self.replay_pos;
        if self.journal.try_reserve(staged + queued).is_err() {
            self.abandon();
            return Err(DecodeError::OutOfMemory);
        }

        let mut replay = std::mem::take(&mut self.journal);
        replay.extend_from_slice(&self.buf[self.mark..self.len]);
        replay.extend_from_slice(&self.replay[self.replay_pos..]);
        self.rewinds += 1;
        trace!(
            bytes = replay.len(),
            rewinds = self.rewinds,
            "rewound pending term into replay queue"
        );

        self.replay = replay;
        self.replay_pos = 0;
        self.index = 0;
        self.len = 0;
        self.mark = 0;
        Ok(())
    }

    /// Give up on the pending term after a failed rewind
    ///
    /// Journaled bytes are dropped and the read index goes back to the mark, so
    /// the window is never left pointing into the middle of a term it still
    /// holds.
    fn abandon(&mut self) {
        self.index = self.mark;
        self.journal = Vec::new();
        self.needed = 0;
    }

    #[cfg(test)]
    pub(crate) fn rewinds(&self) -> usize {
        self.rewinds
    }

    /// Move unread bytes to the front of the window
    ///
    /// Consumed bytes of the pending term are journaled rather than dropped.
    fn compact(&mut self) -> Result<(), DecodeError> {
        if self.index > self.mark {
            self.journal
                .try_reserve(self.index - self.mark)
                .map_err(|_| DecodeError::OutOfMemory)?;
            self.journal
                .extend_from_slice(&self.buf[self.mark..self.index]);
        }

        let unread = self.unread();
        self.buf.copy_within(self.index..self.len, 0);
        trace!(discarded = self.index, kept = unread, "compacted short window");
        self.len = unread;
        self.index = 0;
        self.mark = 0;
        Ok(())
    }

    /// Append bytes to the free tail: replay queue first, then one source read
    fn fill<S>(&mut self, source: &mut S) -> Result<usize, DecodeError>
    where
        S: ByteSource + ?Sized,
    {
        let mut fetched = 0;

        if self.replay_pos < self.replay.len() {
            let count = (self.replay.len() - self.replay_pos).min(self.buf.len() - self.len);
            self.buf[self.len..self.len + count]
                .copy_from_slice(&self.replay[self.replay_pos..self.replay_pos + count]);
            self.replay_pos += count;
            self.len += count;
            fetched += count;

            if self.replay_pos == self.replay.len() {
                self.replay = Vec::new();
                self.replay_pos = 0;
            }
        }

        if self.replay.is_empty() && self.len < self.buf.len() {
            let count = source.read_into(&mut self.buf[self.len..])?;
            self.len += count;
            fetched += count;
        }

        Ok(fetched)
    }
}

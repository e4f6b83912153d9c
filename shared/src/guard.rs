use std::rc::Rc;

/// Page-wide side effects held for the duration of a drawing gesture.
pub trait PageLock {
    fn suspend_scroll(&self);
    fn restore_scroll(&self);
    fn block_palm(&self);
    fn unblock_palm(&self);
}

/// Holds the page lock while a gesture is in progress and releases it when dropped.
///
/// Every way out of the drawing state (end, cancel, lost capture, teardown)
/// goes through `Drop`, so the page can never be left scroll-locked.
pub struct DrawingGuard {
    lock: Rc<dyn PageLock>,
    palm: bool,
}

impl DrawingGuard {
    pub fn acquire(lock: Rc<dyn PageLock>, palm: bool) -> Self {
        lock.suspend_scroll();
        if palm {
            lock.block_palm();
        }
        tracing::trace!(palm, "drawing guard acquired");
        Self { lock, palm }
    }

    #[cfg(test)]
    pub fn blocks_palm(&self) -> bool {
        self.palm
    }
}

impl Drop for DrawingGuard {
    fn drop(&mut self) {
        if self.palm {
            self.lock.unblock_palm();
        }
        self.lock.restore_scroll();
        tracing::trace!("drawing guard released");
    }
}

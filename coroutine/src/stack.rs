//! 协程栈

use alloc::alloc::{Layout, alloc, dealloc, handle_alloc_error};
use core::ops::Range;
use core::ptr::NonNull;

use task_switch::STACK_ALIGN;

use crate::config::{MIN_STACK_SIZE, STACK_CANARY};
use crate::error::Error;

/// 堆上分配的一段协程栈，栈底（最低地址）放有金丝雀
pub struct CoroutineStack {
    base: NonNull<u8>,
    layout: Layout,
}

impl CoroutineStack {
    pub fn new(size: usize) -> Result<Self, Error> {
        if size < MIN_STACK_SIZE {
            return Err(Error::StackTooSmall(size));
        }
        let layout = size
            .checked_next_multiple_of(STACK_ALIGN)
            .and_then(|size| Layout::from_size_align(size, STACK_ALIGN).ok())
            .ok_or(Error::StackTooLarge(size))?;

        let Some(base) = NonNull::new(unsafe { alloc(layout) }) else {
            handle_alloc_error(layout);
        };
        unsafe {
            base.cast::<u64>().write(STACK_CANARY);
        }

        Ok(Self { base, layout })
    }

    pub fn top(&self) -> usize {
        self.range().end
    }

    pub fn range(&self) -> Range<usize> {
        let bottom = self.base.as_ptr() as usize;
        bottom..bottom + self.layout.size()
    }

    pub fn canary_intact(&self) -> bool {
        unsafe { self.base.cast::<u64>().read_volatile() == STACK_CANARY }
    }
}

impl Drop for CoroutineStack {
    fn drop(&mut self) {
        unsafe { dealloc(self.base.as_ptr(), self.layout) }
    }
}

//! 任务的上下文，包含：
//! - 任务恢复执行时的指令地址
//! - 任务当前使用栈的栈顶
//! - 需由被调用者保存的寄存器

use core::mem::{offset_of, size_of};

use crate::arch::CALLEE_SAVED_REGS;
use crate::entry::{EntryFn, EntryFrame};
use crate::switch::__task_entry;

/// 栈顶的对齐要求，三种架构的调用约定均为 16 字节
pub const STACK_ALIGN: usize = 16;

// |  s[K-1]  |
// |   ...    |
// |   s[0]   |
// |    sp    |
// |    ra    |
//
// 切换例程按此布局以固定偏移读写，勿调整字段顺序。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskContext {
    pub ra: usize,
    pub sp: usize,
    pub s: [usize; CALLEE_SAVED_REGS],
}

const _: () = {
    assert!(offset_of!(TaskContext, ra) == 0);
    assert!(offset_of!(TaskContext, sp) == size_of::<usize>());
    assert!(offset_of!(TaskContext, s) == 2 * size_of::<usize>());
    assert!(size_of::<TaskContext>() == (2 + CALLEE_SAVED_REGS) * size_of::<usize>());
    assert!(size_of::<EntryFrame>() == STACK_ALIGN);
};

impl TaskContext {
    /// 全零的上下文，仅可作为切换时的保存位置
    pub const fn zero_init() -> Self {
        Self {
            ra: 0,
            sp: 0,
            s: [0; CALLEE_SAVED_REGS],
        }
    }

    /// 首次切入时从 `ra` 开始执行，栈顶为 `sp`
    pub const fn new(ra: usize, sp: usize) -> Self {
        Self {
            ra,
            sp,
            s: [0; CALLEE_SAVED_REGS],
        }
    }

    /// 在新栈的顶端放置引导帧，返回首次切入即执行 `entry(frame)` 的上下文。
    ///
    /// 引导帧位于向下对齐后的栈顶之下，上下文的栈指针即引导帧的地址。
    ///
    /// # Safety
    ///
    /// `stack_top` 须是一块可写栈区的顶端（高地址），
    /// 其下方有足够 `entry` 运行的空间，且在该任务结束前一直有效。
    pub unsafe fn bootstrap(stack_top: usize, entry: EntryFn, arg: usize) -> Self {
        let frame = (stack_top & !(STACK_ALIGN - 1)) - size_of::<EntryFrame>();
        unsafe {
            (frame as *mut EntryFrame).write(EntryFrame { entry, arg });
        }
        Self::new(__task_entry as *const () as usize, frame)
    }

    pub fn return_address(&self) -> usize {
        self.ra
    }

    pub fn stack_pointer(&self) -> usize {
        self.sp
    }

    pub fn saved_registers(&self) -> &[usize; CALLEE_SAVED_REGS] {
        &self.s
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::zero_init()
    }
}

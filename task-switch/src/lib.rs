//! 协作式任务切换。
//!
//! 调度器为每个任务保存一份 [`TaskContext`]，并通过 [`switch`] 在两个任务之间转移处理器：
//! 当前任务的返回地址、栈顶与被调用者保存寄存器写入 `current`，
//! 再从 `next` 载入同样的状态并跳往 `next` 的返回地址。
//!
//! 对发起切换的一方而言，[`switch`] 并不按常规方式返回：
//! 只有在之后某次切换重新载入它的上下文时，执行才从这次调用之后继续。
//!
//! 本 crate 不做任何调度决策，也不检查传入的上下文。

#![no_std]

mod arch;
mod context;
mod entry;
mod switch;

pub use self::{
    arch::{CALLEE_SAVED_REGS, current_stack_pointer},
    context::{STACK_ALIGN, TaskContext},
    entry::{EntryFn, EntryFrame},
    switch::{__task_entry, __task_switch, switch},
};

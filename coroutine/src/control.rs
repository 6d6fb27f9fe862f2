//! 协程控制块

use alloc::boxed::Box;
use core::cell::UnsafeCell;

use task_switch::{EntryFn, TaskContext};

use crate::Cid;
use crate::scheduler::Scheduler;
use crate::stack::CoroutineStack;
use crate::sync::UpCell;

/// 协程体，返回值即退出码
pub type Body = Box<dyn FnOnce(&Scheduler) -> i32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineStatus {
    /// 在就绪队列中等待运行
    Ready,
    /// 正在运行，同一时刻至多一个
    Running,
    /// 等待 [`Scheduler::wake`]
    Blocked,
    /// 已结束，栈已归还
    Exited,
}

pub struct CoroutineControlBlock {
    // immutable
    pub cid: Cid,
    // 仅在该协程未运行时有意义，切换例程直接读写
    ctx: UnsafeCell<TaskContext>,
    // mutable
    inner: UpCell<CoroutineInner>,
}

pub struct CoroutineInner {
    pub status: CoroutineStatus,
    pub stack: Option<CoroutineStack>,
    /// 尚未开始运行的协程体
    pub body: Option<Body>,
    pub exit_code: Option<i32>,
}

impl CoroutineControlBlock {
    /// 新协程首次被切入时执行 `entry`，引导帧中携带 `arg`
    pub fn new(cid: Cid, stack: CoroutineStack, body: Body, entry: EntryFn, arg: usize) -> Self {
        let ctx = unsafe { TaskContext::bootstrap(stack.top(), entry, arg) };

        Self {
            cid,
            ctx: UnsafeCell::new(ctx),
            inner: UpCell::new(CoroutineInner {
                status: CoroutineStatus::Ready,
                stack: Some(stack),
                body: Some(body),
                exit_code: None,
            }),
        }
    }

    pub fn inner(&self) -> &UpCell<CoroutineInner> {
        &self.inner
    }

    pub fn ctx_ptr(&self) -> *mut TaskContext {
        self.ctx.get()
    }

    pub fn status(&self) -> CoroutineStatus {
        self.inner.exclusive_access().status
    }

    pub fn set_status(&self, status: CoroutineStatus) {
        self.inner.exclusive_access().status = status;
    }
}

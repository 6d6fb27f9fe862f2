//! 建立在 [`task_switch`] 之上的协作式协程运行时。
//!
//! [`Scheduler`] 持有全部协程、FIFO 就绪队列以及“当前协程”，
//! 协程体通过传入的 `&Scheduler` 让出、阻塞、唤醒或直接切换到其它协程。
//! 调用 [`Scheduler::run`] 或 [`Scheduler::resume`] 的一方称为驱动方，
//! 协程让出时控制权回到驱动方。

#![no_std]

extern crate alloc;

mod config;
mod control;
mod error;
mod id;
mod manager;
mod scheduler;
mod stack;
mod sync;

pub use self::{
    config::{DEFAULT_STACK_SIZE, MIN_STACK_SIZE},
    control::CoroutineStatus,
    error::Error,
    scheduler::Scheduler,
};

/// 协程 ID
pub type Cid = usize;

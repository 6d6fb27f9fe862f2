//! 协程调度
//!
//! 协程总是切回驱动方（调用 `run`/`resume` 的一方）的上下文，
//! 由驱动方决定下一个运行的协程；[`Scheduler::switch_to`] 是唯一的例外，
//! 它在两个协程之间直接切换。

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::UnsafeCell;
use core::mem::ManuallyDrop;
use core::ops::Range;

use task_switch::{EntryFrame, TaskContext, switch};

use crate::Cid;
use crate::config::DEFAULT_STACK_SIZE;
use crate::control::{CoroutineControlBlock, CoroutineStatus};
use crate::error::Error;
use crate::manager::CoroutineManager;
use crate::stack::CoroutineStack;
use crate::sync::UpCell;

/// 单个处理器上的协程调度器。
///
/// 不可跨线程传递，也不可在协程内部运行自身的 [`run`](Self::run)。
/// 被丢弃时仍挂起的协程不会再运行，其栈上变量的析构函数也不会执行。
/// 协程体中的 panic 无法越过协程入口向外展开，整个进程会因此中止。
pub struct Scheduler {
    shared: Rc<Shared>,
}

struct Shared {
    /// 驱动方的上下文
    idle_ctx: UnsafeCell<TaskContext>,
    inner: UpCell<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    manager: CoroutineManager,
    current: Option<Rc<CoroutineControlBlock>>,
    /// 最近一个切回驱动方的协程，等待驱动方检查与回收
    returned: Option<Rc<CoroutineControlBlock>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                idle_ctx: UnsafeCell::new(TaskContext::zero_init()),
                inner: UpCell::new(SchedulerInner::default()),
            }),
        }
    }

    /// 以默认大小的栈创建协程，加入就绪队列末尾
    pub fn spawn<F>(&self, f: F) -> Result<Cid, Error>
    where
        F: FnOnce(&Scheduler) -> i32 + 'static,
    {
        self.spawn_with_stack_size(f, DEFAULT_STACK_SIZE)
    }

    pub fn spawn_with_stack_size<F>(&self, f: F, stack_size: usize) -> Result<Cid, Error>
    where
        F: FnOnce(&Scheduler) -> i32 + 'static,
    {
        let stack = CoroutineStack::new(stack_size)?;
        let arg = Rc::as_ptr(&self.shared) as usize;

        let cid = self.shared.inner.exclusive_session(|inner| {
            let cid = inner.manager.alloc_cid();
            let task = CoroutineControlBlock::new(cid, stack, Box::new(f), coroutine_entry, arg);
            inner.manager.insert(Rc::new(task));
            cid
        });

        log::debug!("coroutine {cid} spawned with a {stack_size:#x}-byte stack");
        Ok(cid)
    }

    /// 依次运行就绪队列中的协程，直到队列为空
    pub fn run(&self) -> Result<(), Error> {
        self.ensure_driver()?;

        loop {
            let Some(task) = self.shared.inner.exclusive_session(|inner| inner.manager.fetch())
            else {
                break;
            };
            self.run_task(task);
        }

        let blocked = self.shared.inner.exclusive_session(|inner| {
            inner.manager.count(CoroutineStatus::Blocked)
        });
        if blocked > 0 {
            log::warn!("no ready coroutine left, {blocked} still blocked");
        }

        Ok(())
    }

    /// 运行指定协程直到它交还控制权，返回此时它的状态。
    ///
    /// 阻塞中的协程会被直接唤醒。
    pub fn resume(&self, cid: Cid) -> Result<CoroutineStatus, Error> {
        self.ensure_driver()?;

        let task = self.shared.inner.exclusive_session(|inner| {
            let task = inner.manager.get(cid).ok_or(Error::NotFound(cid))?;
            match task.status() {
                CoroutineStatus::Ready => {
                    inner.manager.take_ready(cid);
                }
                CoroutineStatus::Blocked => {}
                CoroutineStatus::Running | CoroutineStatus::Exited => {
                    return Err(Error::NotReady(cid));
                }
            }
            Ok(task)
        })?;

        self.run_task(task.clone());
        Ok(task.status())
    }

    /// 当前协程回到就绪队列末尾，控制权交还驱动方
    pub fn yield_now(&self) -> Result<(), Error> {
        let current_ctx = self.suspend_current(CoroutineStatus::Ready)?;
        unsafe {
            switch(current_ctx, self.shared.idle_ctx.get());
        }
        Ok(())
    }

    /// 阻塞当前协程，直到被 [`wake`](Self::wake) 或 [`resume`](Self::resume) 后重新调度
    pub fn block_current(&self) -> Result<(), Error> {
        let current_ctx = self.suspend_current(CoroutineStatus::Blocked)?;
        unsafe {
            switch(current_ctx, self.shared.idle_ctx.get());
        }
        Ok(())
    }

    /// 唤醒阻塞中的协程，将其放入就绪队列末尾
    pub fn wake(&self, cid: Cid) -> bool {
        self.shared.inner.exclusive_session(|inner| {
            let Some(task) = inner.manager.get(cid) else {
                return false;
            };
            if task.status() != CoroutineStatus::Blocked {
                return false;
            }
            task.set_status(CoroutineStatus::Ready);
            inner.manager.add(task);
            true
        })
    }

    /// 从当前协程直接切换到就绪的 `cid`，当前协程回到就绪队列末尾。
    ///
    /// `cid` 即当前协程时什么也不改变。
    pub fn switch_to(&self, cid: Cid) -> Result<(), Error> {
        let (current_ctx, next_ctx) = self.shared.inner.exclusive_session(|inner| {
            let current = inner.current.clone().ok_or(Error::NotInCoroutine)?;
            if current.cid == cid {
                let ctx = current.ctx_ptr();
                return Ok((ctx, ctx.cast_const()));
            }

            let next = inner.manager.get(cid).ok_or(Error::NotFound(cid))?;
            if next.status() != CoroutineStatus::Ready {
                return Err(Error::NotReady(cid));
            }
            inner.manager.take_ready(cid);

            current.set_status(CoroutineStatus::Ready);
            next.set_status(CoroutineStatus::Running);
            let ctxs = (current.ctx_ptr(), next.ctx_ptr().cast_const());
            inner.manager.add(current);
            inner.current = Some(next);
            Ok(ctxs)
        })?;

        log::trace!("switch to coroutine {cid}");
        unsafe {
            switch(current_ctx, next_ctx);
        }
        Ok(())
    }

    /// 以退出码 `code` 结束当前协程。
    ///
    /// 协程体返回时也经由此处。
    ///
    /// # Panics
    ///
    /// 不在协程中调用时 panic。
    pub fn exit(&self, code: i32) -> ! {
        let cid = self.shared.inner.exclusive_session(|inner| {
            let task = inner
                .current
                .take()
                .expect("exit must be called from a coroutine");
            let cid = task.cid;
            task.inner().exclusive_session(|task| {
                task.status = CoroutineStatus::Exited;
                task.exit_code = Some(code);
            });
            inner.returned = Some(task);
            cid
        });
        log::debug!("coroutine {cid} exited with code {code}");

        // 不再切回，无需保存上下文
        let mut unused = TaskContext::zero_init();
        unsafe {
            switch(&raw mut unused, self.shared.idle_ctx.get());
        }
        unreachable!("exited coroutine {cid} was switched back in");
    }

    /// 移除已结束的协程并回收其 ID，返回退出码
    pub fn reap(&self, cid: Cid) -> Option<i32> {
        let task = self
            .shared
            .inner
            .exclusive_session(|inner| inner.manager.remove_exited(cid))?;
        log::debug!("coroutine {cid} reaped");
        task.inner().exclusive_access().exit_code
    }

    pub fn current(&self) -> Option<Cid> {
        self.shared
            .inner
            .exclusive_session(|inner| inner.current.as_ref().map(|task| task.cid))
    }

    pub fn status(&self, cid: Cid) -> Option<CoroutineStatus> {
        self.task(cid).map(|task| task.status())
    }

    pub fn exit_code(&self, cid: Cid) -> Option<i32> {
        self.task(cid)
            .and_then(|task| task.inner().exclusive_access().exit_code)
    }

    /// 协程栈的地址范围，已结束的协程没有栈
    pub fn stack_range(&self, cid: Cid) -> Option<Range<usize>> {
        self.task(cid)?
            .inner()
            .exclusive_access()
            .stack
            .as_ref()
            .map(CoroutineStack::range)
    }

    /// 尚未回收的协程数
    pub fn len(&self) -> usize {
        self.shared.inner.exclusive_access().manager.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ready_count(&self) -> usize {
        self.shared.inner.exclusive_access().manager.ready_len()
    }

    fn task(&self, cid: Cid) -> Option<Rc<CoroutineControlBlock>> {
        self.shared.inner.exclusive_access().manager.get(cid)
    }

    fn ensure_driver(&self) -> Result<(), Error> {
        if self.shared.inner.exclusive_access().current.is_some() {
            return Err(Error::InCoroutine);
        }
        Ok(())
    }

    /// 从驱动方切入 `task`，待控制权回来后检查并回收切回的协程
    fn run_task(&self, task: Rc<CoroutineControlBlock>) {
        let cid = task.cid;
        let next_ctx = task.ctx_ptr().cast_const();
        task.set_status(CoroutineStatus::Running);
        self.shared.inner.exclusive_access().current = Some(task);

        log::trace!("switch to coroutine {cid}");
        unsafe {
            switch(self.shared.idle_ctx.get(), next_ctx);
        }
        // 回到驱动方

        self.reclaim();
    }

    fn reclaim(&self) {
        let Some(task) = self.shared.inner.exclusive_access().returned.take() else {
            return;
        };
        let mut inner = task.inner().exclusive_access();

        if cfg!(debug_assertions) {
            if let Some(stack) = &inner.stack {
                assert!(
                    stack.canary_intact(),
                    "stack overflow in coroutine {}",
                    task.cid
                );
            }
        }

        if inner.status == CoroutineStatus::Exited {
            // 此时已不在该协程的栈上
            inner.stack = None;
            inner.body = None;
        }
    }

    /// 把当前协程置为 `status` 并交给驱动方检查，返回其上下文的保存位置
    fn suspend_current(&self, status: CoroutineStatus) -> Result<*mut TaskContext, Error> {
        self.shared.inner.exclusive_session(|inner| {
            let task = inner.current.take().ok_or(Error::NotInCoroutine)?;
            task.set_status(status);
            let ctx = task.ctx_ptr();
            if status == CoroutineStatus::Ready {
                inner.manager.add(task.clone());
            }
            inner.returned = Some(task);
            Ok(ctx)
        })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// 所有协程的入口，由 `__task_entry` 跳板调用
extern "C" fn coroutine_entry(frame: &EntryFrame) -> ! {
    // 驱动方正持有调度器，借用其共享部分即可，不能增加引用计数
    let scheduler = ManuallyDrop::new(Scheduler {
        shared: unsafe { Rc::from_raw(frame.arg as *const Shared) },
    });

    let body = scheduler.shared.inner.exclusive_session(|inner| {
        inner
            .current
            .as_ref()
            .and_then(|task| task.inner().exclusive_access().body.take())
    });
    let code = match body {
        Some(body) => body(&*scheduler),
        None => unreachable!("coroutine started without a body"),
    };

    scheduler.exit(code)
}

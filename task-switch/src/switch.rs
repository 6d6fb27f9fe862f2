use super::TaskContext;

unsafe extern "C" {
    /// 切换例程本体，由 `arch` 下的汇编给出。
    ///
    /// 供需要在汇编中直接发起切换的调用者使用，其余情况请用 [`switch`]。
    pub fn __task_switch(current: *mut TaskContext, next: *const TaskContext);

    /// 新任务的入口跳板。
    ///
    /// 进入时栈顶即一个 [`EntryFrame`](crate::EntryFrame)，
    /// 跳板以该帧的地址为唯一参数调用其中的入口函数，入口函数不得返回。
    pub fn __task_entry() -> !;
}

/// 保存当前任务的状态至 `current`，再从 `next` 恢复另一个任务。
///
/// 处理的状态仅有：返回地址、栈指针、被调用者保存寄存器。
/// 调用者保存寄存器在调用点本就已由编译器妥善处理，无需保存。
///
/// 本函数不会在调用之后立即返回：
/// 只有当其它任务把控制权切回 `current` 时，执行才从此调用之后继续，
/// 此时的栈指针与寄存器恰为切出时的值。
///
/// 若 `next` 是新任务的上下文，则跳往其入口跳板，
/// 被调用者保存寄存器的内容不被依赖。
///
/// `current` 与 `next` 可以相同，此时等同于空操作。
///
/// # Safety
///
/// - `current` 可写、`next` 可读，且在切换期间没有其它代码访问它们；
/// - `next` 的返回地址与栈指针有效：或是此前某次切换所保存的，
///   或是指向入口跳板与新分配的栈顶；
/// - 同一处理器上不得重入：在本任务被切回之前不得再次以它为 `current` 调用；
/// - 同一上下文不得同时被两个处理器使用；
/// - x86_64 上的 MXCSR 控制位与 x87 控制字不在上下文中，由同一线程上的任务共享，
///   改动它们的任务须在切出前自行恢复。
#[inline(always)]
pub unsafe fn switch(current: *mut TaskContext, next: *const TaskContext) {
    unsafe {
        __task_switch(current, next);
    }
}

//! 新任务首次运行时的栈上引导帧

/// 新任务的入口函数，参数为其引导帧
pub type EntryFn = extern "C" fn(frame: &EntryFrame) -> !;

// 新栈的顶端：
// |   arg   |
// |  entry  | <- sp
#[repr(C)]
#[derive(Clone, Copy)]
pub struct EntryFrame {
    pub entry: EntryFn,
    pub arg: usize,
}

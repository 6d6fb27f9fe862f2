//! Constants used by the coroutine runtime

/// 协程栈的默认大小
pub const DEFAULT_STACK_SIZE: usize = 4096 * 16;
/// 协程栈的最小大小
pub const MIN_STACK_SIZE: usize = 4096;

/// 写在协程栈最低处的金丝雀，被改写即说明栈已溢出
pub const STACK_CANARY: u64 = 0x5354_4143_4b5f_454e;

use core::arch::{asm, global_asm};

/// 是否另需保存 d8-d15
const SAVE_FP: bool = cfg!(target_feature = "neon");

/// x19-x29，启用浮点时后接 d8-d15
#[cfg(not(target_feature = "neon"))]
pub const CALLEE_SAVED_REGS: usize = 11;
#[cfg(target_feature = "neon")]
pub const CALLEE_SAVED_REGS: usize = 19;

global_asm!(include_str!("aarch64.S"), fp = const SAVE_FP as usize);

#[inline(always)]
pub fn current_stack_pointer() -> usize {
    let sp: usize;
    unsafe {
        asm!("mov {}, sp", out(reg) sp, options(nomem, nostack, preserves_flags));
    }
    sp
}

use core::arch::{asm, global_asm};

/// 是否另需保存 fs0-fs11
const SAVE_FP: bool = cfg!(target_feature = "d");

/// s0-s11，带 D 扩展时后接 fs0-fs11
#[cfg(not(target_feature = "d"))]
pub const CALLEE_SAVED_REGS: usize = 12;
#[cfg(target_feature = "d")]
pub const CALLEE_SAVED_REGS: usize = 24;

global_asm!(include_str!("riscv64.S"), fp = const SAVE_FP as usize);

#[inline(always)]
pub fn current_stack_pointer() -> usize {
    let sp: usize;
    unsafe {
        asm!("mv {}, sp", out(reg) sp, options(nomem, nostack, preserves_flags));
    }
    sp
}

use core::arch::{asm, global_asm};

/// rbx, rbp, r12-r15
///
/// MXCSR 与 x87 控制字不保存，见 [`switch`](crate::switch)
pub const CALLEE_SAVED_REGS: usize = 6;

global_asm!(include_str!("x86_64.S"));

#[inline(always)]
pub fn current_stack_pointer() -> usize {
    let sp: usize;
    unsafe {
        asm!("mov {}, rsp", out(reg) sp, options(nomem, nostack, preserves_flags));
    }
    sp
}

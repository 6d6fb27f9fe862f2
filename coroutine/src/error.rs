use derive_more::Display;

use crate::Cid;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "coroutine {} not found", _0)]
    NotFound(Cid),
    #[display(fmt = "coroutine {} is not ready", _0)]
    NotReady(Cid),
    #[display(fmt = "not inside a coroutine")]
    NotInCoroutine,
    #[display(fmt = "inside a coroutine")]
    InCoroutine,
    #[display(fmt = "stack size {:#x} is too small", _0)]
    StackTooSmall(usize),
    #[display(fmt = "stack size {:#x} is too large", _0)]
    StackTooLarge(usize),
}

impl core::error::Error for Error {}

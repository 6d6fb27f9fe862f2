use core::cell::{RefCell, RefMut};

/// 单处理器上的独占单元。
///
/// 借用须在任务切换之前释放，否则切回来的一方再次借用时会 panic。
#[derive(Debug, Default)]
pub struct UpCell<T> {
    inner: RefCell<T>,
}

impl<T> UpCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
        }
    }

    /// Panic if the data has been borrowed.
    pub fn exclusive_access(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    pub fn exclusive_session<F, V>(&self, f: F) -> V
    where
        F: FnOnce(&mut T) -> V,
    {
        let mut inner = self.exclusive_access();
        f(&mut inner)
    }
}

//! 协程表与 FIFO 就绪队列

use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;

use crate::Cid;
use crate::control::{CoroutineControlBlock, CoroutineStatus};
use crate::id::CidAllocator;

#[derive(Default)]
pub struct CoroutineManager {
    coroutines: BTreeMap<Cid, Rc<CoroutineControlBlock>>,
    ready_queue: VecDeque<Rc<CoroutineControlBlock>>,
    cid_allocator: CidAllocator,
}

impl CoroutineManager {
    pub fn alloc_cid(&mut self) -> Cid {
        self.cid_allocator.alloc()
    }

    /// 登记新协程并放入就绪队列
    pub fn insert(&mut self, task: Rc<CoroutineControlBlock>) {
        self.coroutines.insert(task.cid, task.clone());
        self.add(task);
    }

    pub fn get(&self, cid: Cid) -> Option<Rc<CoroutineControlBlock>> {
        self.coroutines.get(&cid).cloned()
    }

    pub fn add(&mut self, task: Rc<CoroutineControlBlock>) {
        self.ready_queue.push_back(task);
    }

    pub fn fetch(&mut self) -> Option<Rc<CoroutineControlBlock>> {
        self.ready_queue.pop_front()
    }

    /// 从就绪队列中取出指定协程
    pub fn take_ready(&mut self, cid: Cid) -> Option<Rc<CoroutineControlBlock>> {
        let id = self.ready_queue.iter().position(|task| task.cid == cid)?;
        self.ready_queue.remove(id)
    }

    /// 移除已结束的协程并回收其 ID
    pub fn remove_exited(&mut self, cid: Cid) -> Option<Rc<CoroutineControlBlock>> {
        if self.coroutines.get(&cid)?.status() != CoroutineStatus::Exited {
            return None;
        }
        let task = self.coroutines.remove(&cid)?;
        self.cid_allocator.dealloc(cid);
        Some(task)
    }

    pub fn len(&self) -> usize {
        self.coroutines.len()
    }

    pub fn ready_len(&self) -> usize {
        self.ready_queue.len()
    }

    pub fn count(&self, status: CoroutineStatus) -> usize {
        self.coroutines
            .values()
            .filter(|task| task.status() == status)
            .count()
    }
}

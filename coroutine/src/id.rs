use alloc::vec::Vec;

use crate::Cid;

/// 协程 ID 分配器，回收的 ID 优先复用
#[derive(Default)]
pub struct CidAllocator {
    current: Cid,
    recycled: Vec<Cid>,
}

impl CidAllocator {
    pub fn alloc(&mut self) -> Cid {
        self.recycled.pop().unwrap_or_else(|| {
            let cid = self.current;
            self.current += 1;
            cid
        })
    }

    pub fn dealloc(&mut self, cid: Cid) {
        assert!(cid < self.current, "cid={cid} was never allocated");
        assert!(
            !self.recycled.contains(&cid),
            "cid={cid} has been deallocated!"
        );
        self.recycled.push(cid);
    }
}

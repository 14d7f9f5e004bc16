//! # Scheduler 模块
//!
//! 单线程、协作式的定时器队列。
//!
//! ## 设计说明
//!
//! - 虚拟时钟：时间只随宿主调用 [`Scheduler::advance`] 前进，测试中完全可控
//! - 每个定时器返回一个 [`TimerHandle`] 作为取消令牌，句柄被丢弃时自动取消
//! - 同一时刻到期的定时器按注册顺序触发
//! - 回调在不持有队列借用的情况下执行，回调内可以继续注册/取消定时器
//!
//! ```text
//! let handle = scheduler.schedule(300, move || { ... });
//! scheduler.advance(16);   // 宿主每帧推进
//! drop(handle);            // 尚未触发则取消
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::timing::Millis;

type Callback = Box<dyn FnOnce()>;

/// 定时器 ID（单调递增，同时决定同一时刻的触发顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// 队列键：(到期时间, ID)
type TimerKey = (u64, TimerId);

#[derive(Default)]
struct TimerQueue {
    now: u64,
    next_id: u64,
    entries: BTreeMap<TimerKey, Callback>,
    fired: u64,
    cancelled: u64,
}

impl TimerQueue {
    /// 取出下一个在 `deadline` 之前到期的回调，并把时钟推进到它的到期时间
    fn pop_due(&mut self, deadline: u64) -> Option<Callback> {
        let key = *self.entries.keys().next()?;
        if key.0 > deadline {
            return None;
        }
        self.now = key.0;
        self.entries.remove(&key)
    }
}

/// 定时器调度器
///
/// 可廉价克隆，所有克隆共享同一个队列。
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<RefCell<TimerQueue>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue.borrow();
        f.debug_struct("Scheduler")
            .field("now", &queue.now)
            .field("pending", &queue.entries.len())
            .field("fired", &queue.fired)
            .field("cancelled", &queue.cancelled)
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前虚拟时间（毫秒）
    pub fn now(&self) -> u64 {
        self.queue.borrow().now
    }

    /// 在 `delay` 毫秒后执行 `callback`
    ///
    /// 返回的句柄被丢弃时定时器自动取消，因此必须持有它直到不再需要。
    #[must_use = "丢弃 TimerHandle 会立即取消定时器"]
    pub fn schedule(&self, delay: Millis, callback: impl FnOnce() + 'static) -> TimerHandle {
        let mut queue = self.queue.borrow_mut();
        let id = TimerId(queue.next_id);
        queue.next_id += 1;
        let key = (queue.now + u64::from(delay), id);
        queue.entries.insert(key, Box::new(callback));

        TimerHandle {
            key,
            queue: Rc::downgrade(&self.queue),
        }
    }

    /// 推进时钟 `dt` 毫秒，按顺序触发所有到期的定时器
    ///
    /// 回调中新注册且在本次推进范围内到期的定时器也会被触发。
    ///
    /// # 返回
    /// 本次触发的定时器数量
    pub fn advance(&self, dt: Millis) -> usize {
        let deadline = self.now() + u64::from(dt);
        let mut fired = 0;

        loop {
            // 借用只在取回调期间持有
            let next = self.queue.borrow_mut().pop_due(deadline);
            match next {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }

        let mut queue = self.queue.borrow_mut();
        queue.now = deadline;
        queue.fired += fired as u64;
        fired
    }

    /// 尚未触发的定时器数量
    pub fn pending(&self) -> usize {
        self.queue.borrow().entries.len()
    }

    /// 累计触发数
    pub fn fired_total(&self) -> u64 {
        self.queue.borrow().fired
    }

    /// 累计取消数
    pub fn cancelled_total(&self) -> u64 {
        self.queue.borrow().cancelled
    }

    /// 下一个定时器的到期时间
    pub fn next_due(&self) -> Option<u64> {
        self.queue.borrow().entries.keys().next().map(|key| key.0)
    }
}

/// 定时器句柄（取消令牌）
///
/// 丢弃时若定时器尚未触发则取消它。
#[must_use = "丢弃 TimerHandle 会立即取消定时器"]
pub struct TimerHandle {
    key: TimerKey,
    queue: Weak<RefCell<TimerQueue>>,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.key.1
    }

    /// 到期时间（虚拟时钟毫秒）
    pub fn due(&self) -> u64 {
        self.key.0
    }

    /// 定时器是否仍在等待触发
    pub fn is_pending(&self) -> bool {
        self.queue
            .upgrade()
            .and_then(|queue| queue.try_borrow().ok().map(|q| q.entries.contains_key(&self.key)))
            .unwrap_or(false)
    }

    /// 取消定时器
    ///
    /// # 返回
    /// - `true`: 定时器尚未触发，已取消
    /// - `false`: 定时器已经触发或已被取消
    pub fn cancel(self) -> bool {
        self.cancel_in_place()
    }

    fn cancel_in_place(&self) -> bool {
        let Some(queue) = self.queue.upgrade() else {
            return false;
        };
        let Ok(mut queue) = queue.try_borrow_mut() else {
            return false;
        };
        if queue.entries.remove(&self.key).is_some() {
            queue.cancelled += 1;
            true
        } else {
            false
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel_in_place();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.key.1)
            .field("due", &self.key.0)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, Rc<RefCell<Vec<&'static str>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (log.clone(), log)
    }

    #[test]
    fn test_fires_in_time_order() {
        let scheduler = Scheduler::new();
        let (log, seen) = recorder();

        let l1 = log.clone();
        let _late = scheduler.schedule(200, move || l1.borrow_mut().push("late"));
        let l2 = log.clone();
        let _early = scheduler.schedule(100, move || l2.borrow_mut().push("early"));

        assert_eq!(scheduler.advance(99), 0);
        assert_eq!(scheduler.advance(1), 1);
        assert_eq!(scheduler.advance(500), 1);
        assert_eq!(*seen.borrow(), vec!["early", "late"]);
        assert_eq!(scheduler.now(), 600);
    }

    #[test]
    fn test_same_due_fires_in_registration_order() {
        let scheduler = Scheduler::new();
        let (log, seen) = recorder();

        let mut handles = Vec::new();
        for name in ["a", "b", "c"] {
            let l = log.clone();
            handles.push(scheduler.schedule(50, move || l.borrow_mut().push(name)));
        }
        scheduler.advance(50);
        assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let scheduler = Scheduler::new();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let handle = scheduler.schedule(10, move || h.set(h.get() + 1));
        assert!(handle.is_pending());
        assert!(handle.cancel());

        scheduler.advance(100);
        assert_eq!(hits.get(), 0);
        assert_eq!(scheduler.cancelled_total(), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_drop_cancels() {
        let scheduler = Scheduler::new();
        let hits = Rc::new(Cell::new(0));

        {
            let h = hits.clone();
            let _handle = scheduler.schedule(10, move || h.set(h.get() + 1));
            assert_eq!(scheduler.pending(), 1);
        }

        assert_eq!(scheduler.pending(), 0);
        scheduler.advance(100);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_cancel_after_fire_is_false() {
        let scheduler = Scheduler::new();
        let handle = scheduler.schedule(5, || {});
        scheduler.advance(5);
        assert!(!handle.is_pending());
        assert!(!handle.cancel());
        assert_eq!(scheduler.cancelled_total(), 0);
        assert_eq!(scheduler.fired_total(), 1);
    }

    #[test]
    fn test_callback_can_schedule_within_same_advance() {
        let scheduler = Scheduler::new();
        let (log, seen) = recorder();
        let chained: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));

        let inner_scheduler = scheduler.clone();
        let slot = chained.clone();
        let l = log.clone();
        let _first = scheduler.schedule(10, move || {
            l.borrow_mut().push("first");
            let l2 = l.clone();
            // 相对触发时刻 10ms 再延迟 20ms
            *slot.borrow_mut() = Some(inner_scheduler.schedule(20, move || l2.borrow_mut().push("second")));
        });

        assert_eq!(scheduler.advance(30), 2);
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_handle_outlives_scheduler() {
        let scheduler = Scheduler::new();
        let handle = scheduler.schedule(10, || {});
        drop(scheduler);
        assert!(!handle.is_pending());
        assert!(!handle.cancel());
    }

    #[test]
    fn test_next_due() {
        let scheduler = Scheduler::new();
        assert_eq!(scheduler.next_due(), None);
        let _a = scheduler.schedule(70, || {});
        let _b = scheduler.schedule(30, || {});
        assert_eq!(scheduler.next_due(), Some(30));
    }
}

//! Deferred, coalesced geometry and redraw requests.
//!
//! Requests are idempotent: scheduling one that is already pending is a
//! no-op, and a whole-menu redraw absorbs pending per-entry redraws. Nothing
//! runs until the owner drains the queue, and the owner re-checks that the
//! menu is still live before acting on a request.

use super::MenuId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTask {
    Recompute(MenuId),
    /// Redraw one entry, or the whole menu for `None`.
    Redraw(MenuId, Option<usize>),
}

impl IdleTask {
    pub fn menu(&self) -> MenuId {
        match self {
            IdleTask::Recompute(menu) | IdleTask::Redraw(menu, _) => *menu,
        }
    }
}

#[derive(Debug, Default)]
pub struct IdleQueue {
    pending: Vec<IdleTask>,
}

impl IdleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a task unless an equivalent one is pending. Returns whether it
    /// was newly queued.
    pub fn schedule(&mut self, task: IdleTask) -> bool {
        if self.pending.contains(&task) {
            return false;
        }
        match task {
            IdleTask::Redraw(menu, Some(_)) if self.pending.contains(&IdleTask::Redraw(menu, None)) => {
                return false;
            }
            IdleTask::Redraw(menu, None) => {
                self.pending
                    .retain(|t| !matches!(t, IdleTask::Redraw(m, Some(_)) if *m == menu));
            }
            _ => {}
        }
        self.pending.push(task);
        true
    }

    /// Drops every pending request for a menu that is going away.
    pub fn cancel_menu(&mut self, menu: MenuId) {
        self.pending.retain(|task| task.menu() != menu);
    }

    pub fn is_pending(&self, task: &IdleTask) -> bool {
        self.pending.contains(task)
    }

    /// Takes all pending tasks in scheduling order.
    pub fn drain(&mut self) -> Vec<IdleTask> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arena::Arena;

    fn two_menus() -> (MenuId, MenuId) {
        let mut arena: Arena<MenuId, ()> = Arena::new();
        (arena.insert(()), arena.insert(()))
    }

    #[test]
    fn test_schedule_coalesces_duplicates() {
        let (a, b) = two_menus();
        let mut queue = IdleQueue::new();
        assert!(queue.schedule(IdleTask::Recompute(a)));
        assert!(!queue.schedule(IdleTask::Recompute(a)));
        assert!(queue.schedule(IdleTask::Recompute(b)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_whole_menu_redraw_absorbs_entry_redraws() {
        let (a, _) = two_menus();
        let mut queue = IdleQueue::new();
        queue.schedule(IdleTask::Redraw(a, Some(1)));
        queue.schedule(IdleTask::Redraw(a, Some(2)));
        queue.schedule(IdleTask::Redraw(a, None));
        assert_eq!(queue.drain(), vec![IdleTask::Redraw(a, None)]);

        queue.schedule(IdleTask::Redraw(a, None));
        assert!(!queue.schedule(IdleTask::Redraw(a, Some(3))));
    }

    #[test]
    fn test_cancel_menu_only_drops_that_menu() {
        let (a, b) = two_menus();
        let mut queue = IdleQueue::new();
        queue.schedule(IdleTask::Recompute(a));
        queue.schedule(IdleTask::Redraw(b, None));
        queue.schedule(IdleTask::Redraw(a, Some(0)));
        queue.cancel_menu(a);
        assert_eq!(queue.drain(), vec![IdleTask::Redraw(b, None)]);
        assert!(queue.is_empty());
    }
}

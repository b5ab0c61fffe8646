//! The client record and the per-desktop client store.
//!
//! monsterwm links clients with a singly linked list and has famously fiddly
//! pointer surgery for `move_up`/`move_down` (see the original's comments).
//! Here the list is a `Vec<Client>` in insertion order — arena-style, per
//! the alternative the spec's Design Notes call out — so cross-desktop moves
//! are a plain `remove`+`push` and `current`/`prev_focus` are stored as
//! window handles rather than raw pointers, sidestepping the aliasing
//! headaches entirely.

use crate::display::WindowId;

bitflags! {
    /// Orthogonal per-client state. Mirrors monsterwm's bitfields, kept as
    /// named booleans on `Client` below rather than a bitflags field so call
    /// sites read `c.is_floating` instead of `c.flags.contains(...)`; the
    /// flags type stays here for any downstream code that wants a compact
    /// summary (e.g. logging).
    pub struct ClientFlags: u32 {
        const NONE        = 0;
        const URGENT      = 1 << 0;
        const TRANSIENT   = 1 << 1;
        const FULLSCREEN  = 1 << 2;
        const FLOATING    = 1 << 3;
    }
}

/// The manager's record for one managed top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Client {
    pub win: WindowId,
    pub monitor: usize,
    pub is_urgent: bool,
    pub is_transient: bool,
    pub is_fullscreen: bool,
    pub is_floating: bool,
}

impl Client {
    pub fn new(win: WindowId, monitor: usize) -> Self {
        Client {
            win,
            monitor,
            is_urgent: false,
            is_transient: false,
            is_fullscreen: false,
            is_floating: false,
        }
    }

    /// A client is excluded from tiling if it is fullscreen, floating, or
    /// transient (ISFFT in the original).
    pub fn is_isfft(&self) -> bool {
        self.is_fullscreen || self.is_floating || self.is_transient
    }

    pub fn flags(&self) -> ClientFlags {
        let mut f = ClientFlags::NONE;
        if self.is_urgent {
            f |= ClientFlags::URGENT;
        }
        if self.is_transient {
            f |= ClientFlags::TRANSIENT;
        }
        if self.is_fullscreen {
            f |= ClientFlags::FULLSCREEN;
        }
        if self.is_floating {
            f |= ClientFlags::FLOATING;
        }
        f
    }
}

/// Insertion-ordered list of clients for one desktop.
#[derive(Debug, Clone, Default)]
pub struct ClientStore {
    clients: Vec<Client>,
}

impl ClientStore {
    pub fn new() -> Self {
        ClientStore {
            clients: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.clients.iter_mut()
    }

    pub fn head(&self) -> Option<&Client> {
        self.clients.first()
    }

    pub fn index_of(&self, win: WindowId) -> Option<usize> {
        self.clients.iter().position(|c| c.win == win)
    }

    pub fn get(&self, win: WindowId) -> Option<&Client> {
        self.index_of(win).map(|i| &self.clients[i])
    }

    pub fn get_mut(&mut self, win: WindowId) -> Option<&mut Client> {
        self.index_of(win).map(move |i| &mut self.clients[i])
    }

    /// Count of clients for which `ISFFT` does not hold — the tileable set.
    pub fn tileable_count(&self) -> usize {
        self.clients.iter().filter(|c| !c.is_isfft()).count()
    }

    /// `add(win)`: insert at head (prepend) or at the tail, depending on
    /// `attach_aside`. Returns the new client.
    pub fn add(&mut self, win: WindowId, monitor: usize, attach_aside: bool) -> Client {
        let c = Client::new(win, monitor);
        if attach_aside || self.clients.is_empty() {
            self.clients.push(c);
        } else {
            self.clients.insert(0, c);
        }
        c
    }

    /// `remove(c)`: unlink by window handle. Caller must update focus
    /// afterwards (the store has no notion of `current`/`prev_focus`).
    pub fn remove(&mut self, win: WindowId) -> Option<Client> {
        self.index_of(win).map(|i| self.clients.remove(i))
    }

    /// `prev(c)`: the cyclic predecessor. `prev(head) == tail`. `None` if
    /// the store has 0 or 1 clients, or `win` isn't present.
    pub fn prev(&self, win: WindowId) -> Option<WindowId> {
        if self.clients.len() < 2 {
            return None;
        }
        let idx = self.index_of(win)?;
        let prev_idx = if idx == 0 {
            self.clients.len() - 1
        } else {
            idx - 1
        };
        Some(self.clients[prev_idx].win)
    }

    /// Appends an already-built client verbatim (used by cross-desktop
    /// moves, which preserve flags but reset linkage).
    pub fn push_back(&mut self, c: Client) {
        self.clients.push(c);
    }

    pub fn insert_front(&mut self, c: Client) {
        self.clients.insert(0, c);
    }

    /// Swap the client at `win` with its list-order neighbor at `other`.
    /// Used by `move_up`/`move_down`, which compute the neighbor via
    /// `prev`/list order and then just swap positions — the arena
    /// representation turns the four boundary cases from the original's
    /// pointer surgery into one `Vec::swap`.
    pub fn swap(&mut self, a: WindowId, b: WindowId) {
        if let (Some(ia), Some(ib)) = (self.index_of(a), self.index_of(b)) {
            self.clients.swap(ia, ib);
        }
    }

    pub fn next_of(&self, win: WindowId) -> Option<WindowId> {
        let idx = self.index_of(win)?;
        let next_idx = (idx + 1) % self.clients.len();
        Some(self.clients[next_idx].win)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_head_vs_aside() {
        let mut s = ClientStore::new();
        s.add(1, 0, true);
        s.add(2, 0, true);
        s.add(3, 0, true);
        assert_eq!(s.iter().map(|c| c.win).collect::<Vec<_>>(), vec![1, 2, 3]);

        let mut s2 = ClientStore::new();
        s2.add(1, 0, false);
        s2.add(2, 0, false);
        s2.add(3, 0, false);
        assert_eq!(s2.iter().map(|c| c.win).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn prev_is_cyclic() {
        let mut s = ClientStore::new();
        s.add(1, 0, true);
        s.add(2, 0, true);
        s.add(3, 0, true);
        assert_eq!(s.prev(1), Some(3));
        assert_eq!(s.prev(2), Some(1));
        assert_eq!(s.prev(3), Some(2));
    }

    #[test]
    fn prev_none_when_alone() {
        let mut s = ClientStore::new();
        s.add(1, 0, true);
        assert_eq!(s.prev(1), None);
    }

    #[test]
    fn remove_then_readd_preserves_flags() {
        let mut s = ClientStore::new();
        let mut c = s.add(1, 0, true);
        c.is_floating = true;
        *s.get_mut(1).unwrap() = c;

        let removed = s.remove(1).unwrap();
        assert!(removed.is_floating);
        assert!(s.is_empty());
    }
}

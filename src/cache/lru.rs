//! LRU List Module
//!
//! Index-addressed doubly linked list that keeps cache records in recency order.
//!
//! All records live in an arena of slots owned by the list. Links between
//! records are slot indices, never references, so unlinking or reusing a slot
//! cannot leave a dangling back-pointer behind.

/// Slot index inside the arena.
pub type SlotId = usize;

// == Node ==
/// A single record stored in the list.
#[derive(Debug)]
pub struct Node {
    /// Record key
    pub key: String,
    /// Record payload
    pub value: Vec<u8>,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

impl Node {
    /// Bytes charged against the cache budget for this record.
    pub fn size(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

// == LRU List ==
/// Recency-ordered list of cache records.
///
/// - Head = least recently used (next eviction victim)
/// - Tail = most recently used
#[derive(Debug, Default)]
pub struct LruList {
    /// Arena; `None` marks a free slot
    slots: Vec<Option<Node>>,
    /// Free slot indices available for reuse
    free: Vec<SlotId>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl LruList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Back ==
    /// Appends a record at the most-recently-used end and returns its slot.
    pub fn push_back(&mut self, key: String, value: Vec<u8>) -> SlotId {
        let node = Node {
            key,
            value,
            prev: self.tail,
            next: None,
        };

        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    // == Remove ==
    /// Unlinks the record in `id`, frees its slot and returns it.
    ///
    /// Returns None if the slot is already free.
    pub fn remove(&mut self, id: SlotId) -> Option<Node> {
        if self.get(id).is_none() {
            return None;
        }
        self.unlink(id);
        let node = self.slots[id].take()?;
        self.free.push(id);
        self.len -= 1;
        Some(node)
    }

    // == Pop Front ==
    /// Removes and returns the least recently used record with its old slot.
    pub fn pop_front(&mut self) -> Option<(SlotId, Node)> {
        let id = self.head?;
        self.remove(id).map(|node| (id, node))
    }

    // == Move To Back ==
    /// Promotes a record to the most-recently-used end.
    pub fn move_to_back(&mut self, id: SlotId) {
        if self.tail == Some(id) || self.get(id).is_none() {
            return;
        }
        self.unlink(id);

        let old_tail = self.tail;
        {
            let node = self.node_mut(id);
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.node_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    /// Returns the slot at the least-recently-used end.
    pub fn front(&self) -> Option<SlotId> {
        self.head
    }

    /// Returns the slot at the most-recently-used end.
    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }

    pub fn get(&self, id: SlotId) -> Option<&Node> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut Node> {
        self.slots.get_mut(id).and_then(Option::as_mut)
    }

    // == Length ==
    /// Returns the number of live records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Iter ==
    /// Iterates records from least to most recently used.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Detaches `id` from its neighbours, leaving its own links cleared.
    fn unlink(&mut self, id: SlotId) {
        let (prev, next) = {
            let node = self.node_mut(id);
            (node.prev.take(), node.next.take())
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    /// Linked slots are always occupied.
    fn node_mut(&mut self, id: SlotId) -> &mut Node {
        match self.slots[id].as_mut() {
            Some(node) => node,
            None => unreachable!("linked slot {id} is free"),
        }
    }
}

// == Iterator ==
/// Iterator over records in recency order (oldest first).
pub struct Iter<'a> {
    list: &'a LruList,
    cursor: Option<SlotId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.get(self.cursor?)?;
        self.cursor = node.next;
        Some(node)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &LruList) -> Vec<&str> {
        list.iter().map(|n| n.key.as_str()).collect()
    }

    fn push(list: &mut LruList, key: &str) -> SlotId {
        list.push_back(key.to_string(), key.as_bytes().to_vec())
    }

    #[test]
    fn test_list_new() {
        let list = LruList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
    }

    #[test]
    fn test_push_back_keeps_insertion_order() {
        let mut list = LruList::new();
        let a = push(&mut list, "a");
        push(&mut list, "b");
        let c = push(&mut list, "c");

        assert_eq!(list.len(), 3);
        assert_eq!(list.front(), Some(a));
        assert_eq!(list.back(), Some(c));
        assert_eq!(keys(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_move_to_back() {
        let mut list = LruList::new();
        let a = push(&mut list, "a");
        let b = push(&mut list, "b");
        let c = push(&mut list, "c");

        list.move_to_back(a);
        assert_eq!(keys(&list), vec!["b", "c", "a"]);

        // Middle element
        list.move_to_back(c);
        assert_eq!(keys(&list), vec!["b", "a", "c"]);

        // Already at the back is a no-op
        list.move_to_back(c);
        assert_eq!(keys(&list), vec!["b", "a", "c"]);
        assert_eq!(list.front(), Some(b));
    }

    #[test]
    fn test_pop_front_returns_oldest() {
        let mut list = LruList::new();
        push(&mut list, "a");
        push(&mut list, "b");

        let (_, node) = list.pop_front().unwrap();
        assert_eq!(node.key, "a");
        let (_, node) = list.pop_front().unwrap();
        assert_eq!(node.key, "b");
        assert!(list.pop_front().is_none());
        assert!(list.is_empty());
        assert_eq!(list.back(), None);
    }

    #[test]
    fn test_remove_middle_relinks_neighbours() {
        let mut list = LruList::new();
        push(&mut list, "a");
        let b = push(&mut list, "b");
        push(&mut list, "c");

        let node = list.remove(b).unwrap();
        assert_eq!(node.key, "b");
        assert_eq!(keys(&list), vec!["a", "c"]);

        // Reverse walk through prev links matches
        let tail = list.back().unwrap();
        assert_eq!(list.get(tail).unwrap().key, "c");
        assert!(list.remove(b).is_none());
    }

    #[test]
    fn test_freed_slot_is_reused() {
        let mut list = LruList::new();
        push(&mut list, "a");
        let b = push(&mut list, "b");
        list.remove(b);

        let d = push(&mut list, "d");
        assert_eq!(d, b);
        assert_eq!(keys(&list), vec!["a", "d"]);
    }

    #[test]
    fn test_single_element_move_and_remove() {
        let mut list = LruList::new();
        let a = push(&mut list, "a");
        list.move_to_back(a);
        assert_eq!(list.front(), Some(a));
        assert_eq!(list.back(), Some(a));

        list.remove(a);
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
    }

    #[test]
    fn test_node_size() {
        let mut list = LruList::new();
        let id = list.push_back("ab".to_string(), b"1234".to_vec());
        assert_eq!(list.get(id).unwrap().size(), 6);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

const MAX_LEVEL: usize = 16;
const HEADER: usize = 0;

/// One `(member, score)` pair as handed to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub member: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Link {
    forward: Option<usize>,
    /// Number of level-0 hops this forward pointer skips.
    span: i64,
}

#[derive(Debug)]
struct Node {
    member: String,
    score: f64,
    backward: Option<usize>,
    links: Vec<Link>,
}

impl Node {
    fn tombstone() -> Self {
        Self {
            member: String::new(),
            score: 0.0,
            backward: None,
            links: Vec::new(),
        }
    }
}

/// Sorted set: a skip list ordered by `(score asc, member asc)` plus a
/// member → score index so member-keyed operations land on the exact
/// `(score, member)` position in one descent.
///
/// Nodes live in an index-linked arena owned by the set, so forward and
/// backward links never form shared ownership and dropping the set drops
/// every node.
#[derive(Debug)]
pub struct SortedSet {
    nodes: Vec<Node>,
    free: Vec<usize>,
    tail: Option<usize>,
    length: i64,
    level: usize,
    scores: HashMap<String, f64>,
}

impl Default for SortedSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Level draw with P(L >= k+1) = 0.25 * P(L >= k), capped at 16.
fn random_level() -> usize {
    let mut level = 1;
    while (f32::from(rand::random::<u16>())) < 0.25 * f32::from(u16::MAX) {
        level += 1;
        if level >= MAX_LEVEL {
            return MAX_LEVEL;
        }
    }
    level
}

impl SortedSet {
    pub fn new() -> Self {
        let mut header = Node::tombstone();
        header.links = vec![Link::default(); MAX_LEVEL];
        Self {
            nodes: vec![header],
            free: Vec::new(),
            tail: None,
            length: 0,
            level: 1,
            scores: HashMap::new(),
        }
    }

    pub fn len(&self) -> i64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn exists(&self, member: &str) -> bool {
        self.scores.contains_key(member)
    }

    pub fn get_score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Inserts or re-scores a member. Returns `true` iff the member
    /// already existed (an update): the old node is unlinked and the pair
    /// reinserted at its new position.
    pub fn add(&mut self, member: &str, score: f64) -> bool {
        let existed = self.scores.insert(member.to_string(), score);
        if let Some(old_score) = existed {
            self.unlink(old_score, member);
        }
        self.insert(member.to_string(), score);
        existed.is_some()
    }

    /// Removes at most one member; reports whether anything was removed.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => self.unlink(score, member),
            None => false,
        }
    }

    /// 0-based rank of a member, from the tail when `reverse` is set.
    pub fn get_rank(&self, member: &str, reverse: bool) -> Option<i64> {
        let score = self.get_score(member)?;
        let mut rank = 0i64;
        let mut curr = HEADER;
        for i in (0..self.level).rev() {
            loop {
                let link = self.nodes[curr].links[i];
                match link.forward {
                    Some(next) if self.precedes(next, score, member) => {
                        rank += link.span;
                        curr = next;
                    },
                    _ => break,
                }
            }
        }
        // the member is indexed, so the next level-0 node is the target
        debug_assert!(
            self.nodes[curr].links[0]
                .forward
                .is_some_and(|n| self.nodes[n].member == member)
        );
        if reverse {
            Some(self.length - rank - 1)
        } else {
            Some(rank)
        }
    }

    /// Random access by rank in O(log N): descends the lanes consuming
    /// spans until the traversed count hits the target.
    pub fn get_by_rank(&self, rank: i64, reverse: bool) -> Option<Element> {
        let rank = if reverse { self.length - rank - 1 } else { rank };
        if rank < 0 || rank >= self.length {
            return None;
        }
        let target = rank + 1; // header occupies traversal position 0
        let mut traversed = 0i64;
        let mut curr = HEADER;
        for i in (0..self.level).rev() {
            loop {
                let link = self.nodes[curr].links[i];
                match link.forward {
                    Some(next) if traversed + link.span <= target => {
                        traversed += link.span;
                        curr = next;
                        if traversed == target {
                            return Some(self.element(curr));
                        }
                    },
                    _ => break,
                }
            }
        }
        None
    }

    /// Visits the inclusive index range `[start, stop]`. Negative indices
    /// count from the tail; out-of-range indices clamp; an empty range
    /// after clamping visits nothing. With `reverse`, indices address the
    /// reversed sequence (0 = highest-ranked element).
    pub fn range(
        &self,
        start: i64,
        stop: i64,
        reverse: bool,
        mut f: impl FnMut(&Element) -> bool,
    ) {
        let len = self.length;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let mut stop = if stop < 0 { (len + stop).max(0) } else { stop };
        if stop >= len {
            stop = len - 1;
        }
        if len == 0 || start > stop || start >= len {
            return;
        }
        let mut remaining = stop - start + 1;

        if reverse {
            let mut cursor = self.tail;
            for _ in 0..start {
                cursor = cursor.and_then(|idx| self.nodes[idx].backward);
            }
            while let Some(idx) = cursor {
                if remaining == 0 || !f(&self.element(idx)) {
                    break;
                }
                remaining -= 1;
                cursor = self.nodes[idx].backward;
            }
        } else {
            let mut cursor = self.nodes[HEADER].links[0].forward;
            for _ in 0..start {
                cursor = cursor.and_then(|idx| self.nodes[idx].links[0].forward);
            }
            while let Some(idx) = cursor {
                if remaining == 0 || !f(&self.element(idx)) {
                    break;
                }
                remaining -= 1;
                cursor = self.nodes[idx].links[0].forward;
            }
        }
    }

    /// Members with `min <= score <= max`, skipping `offset` matches;
    /// `limit < 0` means unlimited.
    pub fn get_by_score_range(
        &self,
        min: f64,
        max: f64,
        offset: i64,
        limit: i64,
        reverse: bool,
    ) -> Vec<Element> {
        let mut result = Vec::new();
        let mut limit = limit;
        if reverse {
            let mut cursor = self.tail;
            while let Some(idx) = cursor {
                if self.nodes[idx].score <= max {
                    break;
                }
                cursor = self.nodes[idx].backward;
            }
            let mut offset = offset;
            while let Some(idx) = cursor {
                if offset == 0 {
                    break;
                }
                offset -= 1;
                cursor = self.nodes[idx].backward;
            }
            while let Some(idx) = cursor {
                if self.nodes[idx].score < min || limit == 0 {
                    break;
                }
                result.push(self.element(idx));
                if limit > 0 {
                    limit -= 1;
                }
                cursor = self.nodes[idx].backward;
            }
        } else {
            // descend to the last node with score < min, then step once
            let mut curr = HEADER;
            for i in (0..self.level).rev() {
                while let Some(next) = self.nodes[curr].links[i].forward {
                    if self.nodes[next].score < min {
                        curr = next;
                    } else {
                        break;
                    }
                }
            }
            let mut cursor = self.nodes[curr].links[0].forward;
            let mut offset = offset;
            while let Some(idx) = cursor {
                if offset == 0 {
                    break;
                }
                offset -= 1;
                cursor = self.nodes[idx].links[0].forward;
            }
            while let Some(idx) = cursor {
                if self.nodes[idx].score > max || limit == 0 {
                    break;
                }
                result.push(self.element(idx));
                if limit > 0 {
                    limit -= 1;
                }
                cursor = self.nodes[idx].links[0].forward;
            }
        }
        result
    }

    /// Member-lexicographic counterpart of [`Self::get_by_score_range`].
    /// Meaningful when every member carries the same score, which is the
    /// only ordering the lexicographic traversal assumes.
    pub fn get_by_lex_range(
        &self,
        min: &str,
        max: &str,
        offset: i64,
        limit: i64,
        reverse: bool,
    ) -> Vec<Element> {
        let mut result = Vec::new();
        let mut limit = limit;
        if reverse {
            let mut cursor = self.tail;
            while let Some(idx) = cursor {
                if self.nodes[idx].member.as_str() <= max {
                    break;
                }
                cursor = self.nodes[idx].backward;
            }
            let mut offset = offset;
            while let Some(idx) = cursor {
                if offset == 0 {
                    break;
                }
                offset -= 1;
                cursor = self.nodes[idx].backward;
            }
            while let Some(idx) = cursor {
                if self.nodes[idx].member.as_str() < min || limit == 0 {
                    break;
                }
                result.push(self.element(idx));
                if limit > 0 {
                    limit -= 1;
                }
                cursor = self.nodes[idx].backward;
            }
        } else {
            let mut curr = HEADER;
            for i in (0..self.level).rev() {
                while let Some(next) = self.nodes[curr].links[i].forward {
                    if self.nodes[next].member.as_str() < min {
                        curr = next;
                    } else {
                        break;
                    }
                }
            }
            let mut cursor = self.nodes[curr].links[0].forward;
            let mut offset = offset;
            while let Some(idx) = cursor {
                if offset == 0 {
                    break;
                }
                offset -= 1;
                cursor = self.nodes[idx].links[0].forward;
            }
            while let Some(idx) = cursor {
                if self.nodes[idx].member.as_str() > max || limit == 0 {
                    break;
                }
                result.push(self.element(idx));
                if limit > 0 {
                    limit -= 1;
                }
                cursor = self.nodes[idx].links[0].forward;
            }
        }
        result
    }

    pub fn count(&self, min: f64, max: f64) -> i64 {
        self.get_by_score_range(min, max, 0, -1, false).len() as i64
    }

    pub fn range_count(&self, min: &str, max: &str) -> i64 {
        self.get_by_lex_range(min, max, 0, -1, false).len() as i64
    }

    /// Visits every element in `(score, member)` order until the callback
    /// returns `false`.
    pub fn for_each(&self, mut f: impl FnMut(&Element) -> bool) {
        let mut cursor = self.nodes[HEADER].links[0].forward;
        while let Some(idx) = cursor {
            if !f(&self.element(idx)) {
                break;
            }
            cursor = self.nodes[idx].links[0].forward;
        }
    }

    // --- internals ---

    fn element(&self, idx: usize) -> Element {
        Element {
            member: self.nodes[idx].member.clone(),
            score: self.nodes[idx].score,
        }
    }

    /// Whether the node at `idx` orders strictly before `(score, member)`.
    fn precedes(&self, idx: usize, score: f64, member: &str) -> bool {
        let node = &self.nodes[idx];
        node.score < score
            || (node.score == score && node.member.as_str() < member)
    }

    fn alloc(&mut self, member: String, score: f64, level: usize) -> usize {
        let node = Node {
            member,
            score,
            backward: None,
            links: vec![Link::default(); level],
        };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            },
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            },
        }
    }

    fn insert(&mut self, member: String, score: f64) {
        let mut update = [HEADER; MAX_LEVEL];
        let mut rank = [0i64; MAX_LEVEL];

        let mut curr = HEADER;
        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            loop {
                let link = self.nodes[curr].links[i];
                match link.forward {
                    Some(next) if self.precedes(next, score, &member) => {
                        rank[i] += link.span;
                        curr = next;
                    },
                    _ => break,
                }
            }
            update[i] = curr;
        }

        let level = random_level();
        if level > self.level {
            for i in self.level..level {
                rank[i] = 0;
                update[i] = HEADER;
                self.nodes[HEADER].links[i].span = self.length;
            }
            self.level = level;
        }

        let new_idx = self.alloc(member, score, level);
        for i in 0..level {
            let prev_link = self.nodes[update[i]].links[i];
            self.nodes[new_idx].links[i] = Link {
                forward: prev_link.forward,
                span: prev_link.span - (rank[0] - rank[i]),
            };
            self.nodes[update[i]].links[i] = Link {
                forward: Some(new_idx),
                span: rank[0] - rank[i] + 1,
            };
        }
        for i in level..self.level {
            self.nodes[update[i]].links[i].span += 1;
        }

        self.nodes[new_idx].backward =
            if update[0] == HEADER { None } else { Some(update[0]) };
        match self.nodes[new_idx].links[0].forward {
            Some(next) => self.nodes[next].backward = Some(new_idx),
            None => self.tail = Some(new_idx),
        }
        self.length += 1;
    }

    /// Unlinks the node holding exactly `(score, member)`.
    fn unlink(&mut self, score: f64, member: &str) -> bool {
        let mut update = [HEADER; MAX_LEVEL];
        let mut curr = HEADER;
        for i in (0..self.level).rev() {
            while let Some(next) = self.nodes[curr].links[i].forward {
                if self.precedes(next, score, member) {
                    curr = next;
                } else {
                    break;
                }
            }
            update[i] = curr;
        }
        match self.nodes[curr].links[0].forward {
            Some(target)
                if self.nodes[target].member == member
                    && self.nodes[target].score == score =>
            {
                self.delete_node(target, &update);
                true
            },
            _ => false,
        }
    }

    fn delete_node(&mut self, target: usize, update: &[usize; MAX_LEVEL]) {
        for i in 0..self.level {
            if self.nodes[update[i]].links[i].forward == Some(target) {
                let gone = self.nodes[target].links[i];
                let link = &mut self.nodes[update[i]].links[i];
                link.span += gone.span - 1;
                link.forward = gone.forward;
            } else {
                self.nodes[update[i]].links[i].span -= 1;
            }
        }

        match self.nodes[target].links[0].forward {
            Some(next) => self.nodes[next].backward = self.nodes[target].backward,
            None => self.tail = self.nodes[target].backward,
        }

        while self.level > 1
            && self.nodes[HEADER].links[self.level - 1].forward.is_none()
        {
            self.level -= 1;
        }
        self.length -= 1;

        self.nodes[target] = Node::tombstone();
        self.free.push(target);
    }
}

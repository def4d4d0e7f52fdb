// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Streaming Top-K - ORDER BY generation DESC LIMIT k without a full sort
//!
//! Maintains only the K best rows using a min-heap instead of sorting the
//! entire fact scan.
//!
//! # Algorithm
//!
//! Uses a min-heap where:
//! - Smallest rank key is at the root
//! - When heap size > K, remove minimum
//! - Result: heap contains the K greatest keys
//!
//! - **Time complexity**: O(N log K) where N = scanned facts, K = limit
//! - **Space complexity**: O(K)

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Ordering key for a generation fact.
///
/// Greater means "ranks earlier": higher net generation first, then the more
/// recent year, then the lower plant id. Plant ids are handed out in
/// ingestion order, so ties resolve to insertion order.
#[derive(Debug, Clone, Copy)]
pub struct FactRank {
    pub net_generation: f64,
    pub year: i32,
    pub plant_id: u64,
}

impl Ord for FactRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.net_generation
            .total_cmp(&other.net_generation)
            .then_with(|| self.year.cmp(&other.year))
            .then_with(|| other.plant_id.cmp(&self.plant_id))
    }
}

impl PartialOrd for FactRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FactRank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FactRank {}

struct Ranked<T> {
    rank: FactRank,
    item: T,
}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank)
    }
}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank
    }
}

impl<T> Eq for Ranked<T> {}

/// Streaming top-K over ranked items
pub struct StreamingTopK<T> {
    /// Min-heap; root holds the weakest kept item
    heap: BinaryHeap<Reverse<Ranked<T>>>,

    /// Maximum size (K)
    k: usize,

    /// Total items offered (for statistics)
    processed_count: usize,
}

impl<T> StreamingTopK<T> {
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            k,
            processed_count: 0,
        }
    }

    /// Offer an item; it is kept only if it beats the current minimum
    pub fn add(&mut self, rank: FactRank, item: T) {
        self.processed_count += 1;
        if self.k == 0 {
            return;
        }

        if self.heap.len() < self.k {
            self.heap.push(Reverse(Ranked { rank, item }));
            return;
        }

        let beats_min = self
            .heap
            .peek()
            .map(|Reverse(min)| rank > min.rank)
            .unwrap_or(true);
        if beats_min {
            self.heap.push(Reverse(Ranked { rank, item }));
            self.heap.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    /// Consume into items sorted best-first
    pub fn into_sorted(self) -> Vec<T> {
        let mut ranked: Vec<Ranked<T>> = self.heap.into_iter().map(|Reverse(r)| r).collect();
        ranked.sort_by(|a, b| b.rank.cmp(&a.rank));
        ranked.into_iter().map(|r| r.item).collect()
    }
}

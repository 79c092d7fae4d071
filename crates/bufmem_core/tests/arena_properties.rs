//! # Arena Property Tests
//!
//! Randomized allocate/free workloads checked against the partition
//! invariants after every step. Seeds are fixed so failures reproduce.
//!
//! Run with: cargo test -p bufmem_core --test arena_properties

use bufmem_core::{Arena, ArenaError, Block};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;

/// Checks every property the arena promises about its block list.
fn assert_partition(arena: &Arena) {
    if let Err(violation) = arena.validate() {
        panic!("partition broken: {violation}\n{}", arena.debug_dump(1));
    }

    let blocks: Vec<Block> = arena.blocks().copied().collect();
    let total: usize = blocks.iter().map(|block| block.size).sum();
    assert_eq!(total, arena.capacity());
    assert!(blocks.windows(2).all(|pair| pair[0].end() == pair[1].offset));
    assert!(blocks.windows(2).all(|pair| pair[0].allocated || pair[1].allocated));

    let used: usize = blocks.iter().filter(|block| block.allocated).map(|block| block.size).sum();
    assert_eq!(used, arena.used());
}

#[test]
fn random_workload_keeps_partition() {
    for seed in 0..8 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut arena = Arena::new(64 * KIB);
        let mut live: Vec<(usize, usize)> = Vec::new();

        for _ in 0..2_000 {
            if live.is_empty() || rng.gen_bool(0.6) {
                let size = rng.gen_range(1..=2 * KIB);
                let alignment = *[1, 4, 16, 256].choose(&mut rng).unwrap();
                let before = arena.clone();

                match arena.allocate(size, alignment) {
                    Ok(offset) => {
                        assert_eq!(offset % alignment, 0);
                        assert!(offset + size <= arena.capacity());
                        // The range was free before the call.
                        assert!(before
                            .blocks()
                            .any(|block| !block.allocated && block.contains_range(offset, size)));
                        live.push((offset, size));
                    }
                    Err(ArenaError::OutOfSpace { .. }) => {
                        assert_eq!(arena.num_blocks(), before.num_blocks());
                        assert_eq!(arena.used(), before.used());
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            } else {
                let index = rng.gen_range(0..live.len());
                let (offset, _) = live.swap_remove(index);
                arena.free(offset);
            }
            assert_partition(&arena);
        }

        live.shuffle(&mut rng);
        for (offset, _) in live {
            arena.free(offset);
            assert_partition(&arena);
        }
        assert_eq!(arena.num_blocks(), 1);
    }
}

#[test]
fn live_allocations_never_overlap() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xB0FF);
    let mut arena = Arena::new(16 * KIB);
    let mut live: Vec<(usize, usize)> = Vec::new();

    for _ in 0..1_000 {
        if rng.gen_bool(0.7) {
            let size = rng.gen_range(1..=512);
            if let Ok(offset) = arena.allocate(size, 8) {
                live.push((offset, size));
            }
        } else if !live.is_empty() {
            let (offset, _) = live.swap_remove(rng.gen_range(0..live.len()));
            arena.free(offset);
        }

        let mut sorted = live.clone();
        sorted.sort_unstable();
        assert!(sorted.windows(2).all(|pair| pair[0].0 + pair[0].1 <= pair[1].0));
    }
}

#[test]
fn exhaustion_is_idempotent_until_free() {
    let mut arena = Arena::new(4 * KIB);
    let mut live = Vec::new();
    while let Ok(offset) = arena.allocate(300, 1) {
        live.push(offset);
    }

    for _ in 0..10 {
        assert_eq!(
            arena.allocate(300, 1),
            Err(ArenaError::OutOfSpace { size: 300, alignment: 1 })
        );
    }
    assert_partition(&arena);

    arena.free(live[3]);
    assert_eq!(arena.allocate(300, 1), Ok(live[3]));
}

#[test]
fn exhaust_ten_mib_then_free_in_random_order() {
    for seed in [1, 7, 42] {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut arena = Arena::new(10 * MIB);
        let mut live = Vec::new();

        loop {
            let size = rng.gen_range(KIB..=5 * KIB);
            match arena.allocate(size, 1) {
                Ok(offset) => live.push(offset),
                Err(ArenaError::OutOfSpace { .. }) => break,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(arena.free_bytes() < 5 * KIB);
        assert_partition(&arena);

        live.shuffle(&mut rng);
        for offset in live {
            arena.free(offset);
        }
        assert_eq!(arena.num_blocks(), 1);
        assert_eq!(arena.blocks().next(), Some(&Block::free(0, 10 * MIB)));
    }
}

#[test]
fn placement_and_search_interleave() {
    let mut arena = Arena::new(1024);
    assert_eq!(arena.allocate_at(512, 256), Ok(512));
    assert_eq!(arena.allocate(512, 1), Ok(0));
    assert_eq!(arena.allocate(256, 1), Ok(768));
    assert!(arena.allocate(1, 1).is_err());
    assert_eq!(arena.num_blocks(), 3);

    arena.free(512);
    assert_eq!(arena.allocate_at(600, 16), Ok(600));
    assert_eq!(arena.debug_dump(8), "64#11.2#19.32#");
    assert_partition(&arena);
}

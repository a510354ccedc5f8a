// Each benchmark prepares its map with Bencher::iter_batched so only the
// operation in its name is timed. Fills use 10000 keys; lookups search a
// random permutation of the inserted keys.

extern crate criterion;
extern crate cursormap;
extern crate rand;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use cursormap::{ChainedHashMap, TreeMap};
use rand::seq::SliceRandom;

const FILL_COUNT: usize = 10_000;

fn value_for(i: usize) -> char {
    (i % 92 + 33) as u8 as char
}

fn shuffled_keys(count: usize) -> Vec<usize> {
    let mut keys: Vec<usize> = (0..count).collect();
    keys.shuffle(&mut rand::rng());
    keys
}

fn filled_hashmap(count: usize) -> ChainedHashMap<usize, char> {
    let mut map = ChainedHashMap::new();
    for i in 0..count {
        *map.get_or_default(i) = value_for(i);
    }
    map
}

fn filled_treemap(count: usize) -> TreeMap<usize, char> {
    let mut map = TreeMap::new();
    for i in shuffled_keys(count) {
        *map.get_or_default(i) = value_for(i);
    }
    map
}

pub fn hashmap_fill(c: &mut Criterion) {
    c.bench_function("hashmap_fill", |b| {
        b.iter_batched(
            ChainedHashMap::<usize, char>::new,
            |mut map| {
                for i in 0..FILL_COUNT {
                    *map.get_or_default(i) = value_for(i);
                }
                map
            },
            BatchSize::SmallInput,
        )
    });
}

pub fn hashmap_search(c: &mut Criterion) {
    c.bench_function("hashmap_search", |b| {
        b.iter_batched(
            || (filled_hashmap(FILL_COUNT), shuffled_keys(FILL_COUNT)),
            |(map, keys)| {
                for k in keys.iter() {
                    black_box(map.value_of(k).ok());
                }
            },
            BatchSize::LargeInput,
        )
    });
}

pub fn hashmap_remove(c: &mut Criterion) {
    c.bench_function("hashmap_remove", |b| {
        b.iter_batched(
            || (filled_hashmap(FILL_COUNT), shuffled_keys(FILL_COUNT)),
            |(mut map, keys)| {
                for k in keys.iter() {
                    black_box(map.remove(k).ok());
                }
                map
            },
            BatchSize::LargeInput,
        )
    });
}

pub fn treemap_fill(c: &mut Criterion) {
    c.bench_function("treemap_fill", |b| {
        b.iter_batched(
            || shuffled_keys(FILL_COUNT),
            |keys| {
                let mut map = TreeMap::new();
                for i in keys {
                    *map.get_or_default(i) = value_for(i);
                }
                map
            },
            BatchSize::LargeInput,
        )
    });
}

pub fn treemap_search(c: &mut Criterion) {
    c.bench_function("treemap_search", |b| {
        b.iter_batched(
            || (filled_treemap(FILL_COUNT), shuffled_keys(FILL_COUNT)),
            |(map, keys)| {
                for k in keys.iter() {
                    black_box(map.find(k));
                }
            },
            BatchSize::LargeInput,
        )
    });
}

pub fn treemap_walk(c: &mut Criterion) {
    c.bench_function("treemap_walk", |b| {
        b.iter_batched(
            || filled_treemap(FILL_COUNT),
            |map| {
                let mut cur = map.begin();
                while !cur.is_end() {
                    black_box(map.entry_at(cur).ok());
                    cur = match map.advance(cur) {
                        Ok(next) => next,
                        Err(_) => break,
                    };
                }
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    hashmap,
    hashmap_fill,
    hashmap_search,
    hashmap_remove
);
criterion_group!(treemap, treemap_fill, treemap_search, treemap_walk);
criterion_main!(hashmap, treemap);

//! Contract tests for the three allocators.
//!
//! Each test drives an allocator through a realistic scenario and checks the
//! externally observable state afterwards.

use std::ptr::NonNull;

use ember_memory::{AllocError, LinearAllocator, PoolAllocator, StackAllocator};

fn addr(address: NonNull<u8>) -> usize {
    address.as_ptr() as usize
}

// ---------------------------------------------------------------------------
// Linear
// ---------------------------------------------------------------------------

#[test]
fn test_linear_ranges_are_increasing_and_disjoint() {
    let mut linear = LinearAllocator::new(100).unwrap();
    let sizes = [10, 1, 33, 7, 49];

    let mut previous_end = None;
    for size in sizes {
        let start = addr(linear.allocate(size).unwrap());
        if let Some(end) = previous_end {
            assert_eq!(start, end);
        }
        previous_end = Some(start + size);
    }
    assert_eq!(linear.size(), 100);

    // The first request past capacity fails and changes nothing.
    assert_eq!(
        linear.allocate(1),
        Err(AllocError::OutOfMemory {
            requested: 1,
            available: 0
        })
    );
    assert_eq!(linear.size(), 100);
}

#[test]
fn test_linear_reset_reuses_base() {
    let mut linear = LinearAllocator::new(64).unwrap();
    let base = linear.allocate(16).unwrap();
    linear.allocate(16).unwrap();

    linear.reset();
    linear.reset();

    assert!(linear.is_empty());
    assert_eq!(linear.allocate(32).unwrap(), base);
}

#[test]
fn test_linear_survives_move() {
    let mut linear = LinearAllocator::new(32).unwrap();
    let a = linear.allocate(4).unwrap();
    linear.bytes_mut(a, 4).unwrap().copy_from_slice(b"move");

    let mut moved = Box::new(linear);
    assert_eq!(moved.bytes_mut(a, 4).unwrap(), b"move");
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

#[test]
fn test_pool_fill_free_refill() {
    const BLOCK: usize = 32;
    const COUNT: usize = 10;

    let mut pool = PoolAllocator::new(BLOCK, COUNT).unwrap();
    let blocks: Vec<_> = (0..COUNT).map(|_| pool.allocate(BLOCK).unwrap()).collect();
    assert_eq!(pool.free_blocks(), 0);
    assert!(pool.allocate(1).is_none());

    pool.free(blocks[6], BLOCK);
    let reused = pool.allocate(BLOCK).unwrap();
    assert_eq!(reused, blocks[6]);
    assert!(pool.allocate(1).is_none());
}

#[test]
fn test_pool_fragmentation_blocks_multi_block_requests() {
    let mut pool = PoolAllocator::new(16, 8).unwrap();
    let blocks: Vec<_> = (0..8).map(|_| pool.allocate(16).unwrap()).collect();

    // Free every other block: 4 free blocks, none adjacent.
    for block in blocks.iter().step_by(2) {
        pool.free(*block, 16);
    }
    assert_eq!(pool.free_blocks(), 4);

    assert!(pool.allocate(32).is_none());
    assert_eq!(
        pool.try_allocate(32),
        Err(AllocError::AllocationFailed { blocks_needed: 2 })
    );

    // Single blocks still fit, lowest index first.
    assert_eq!(pool.allocate(16).unwrap(), blocks[0]);
}

#[test]
fn test_pool_round_trip_returns_to_empty() {
    let mut pool = PoolAllocator::new(24, 100).unwrap();
    for size in [1, 24, 25, 240, 2400] {
        let address = pool.allocate(size).unwrap();
        assert!(!pool.is_empty());
        pool.free(address, size);
        assert!(pool.is_empty(), "size {size} did not round trip");
    }
}

#[test]
fn test_pool_foreign_free_leaves_bitmap_untouched() {
    let mut pool = PoolAllocator::new(8, 100).unwrap();
    let kept = pool.allocate(8).unwrap();
    pool.allocate(40).unwrap();
    let before = pool.bitmap().words().to_vec();

    // An address from another allocator.
    let mut other = PoolAllocator::new(8, 4).unwrap();
    let foreign = other.allocate(8).unwrap();
    pool.free(foreign, 8);

    // A stack variable.
    let mut local = 0u8;
    pool.free(NonNull::from(&mut local), 8);

    // Inside the pool but not on a block boundary.
    let misaligned = NonNull::new(kept.as_ptr().wrapping_add(3)).unwrap();
    pool.free(misaligned, 8);

    // One past the last block.
    let end = NonNull::new(kept.as_ptr().wrapping_add(pool.capacity())).unwrap();
    pool.free(end, 8);

    assert_eq!(pool.bitmap().words(), before.as_slice());
}

#[test]
fn test_pool_last_word_padding() {
    // 65 blocks: the second word has 63 padding bits.
    let mut pool = PoolAllocator::new(4, 65).unwrap();
    let all = pool.allocate(4 * 65).unwrap();
    assert_eq!(pool.bitmap().words(), &[u64::MAX, 1]);
    assert!(pool.is_block_allocated(64));
    assert!(!pool.is_block_allocated(65));
    assert!(pool.is_block_free(65));
    assert!(pool.allocate(1).is_none());

    pool.free(all, 4 * 65);
    assert!(pool.is_empty());
}

#[test]
fn test_pool_reset_twice() {
    let mut pool = PoolAllocator::new(8, 8).unwrap();
    pool.allocate(20).unwrap();
    pool.reset();
    let once = pool.bitmap().words().to_vec();
    pool.reset();
    assert_eq!(pool.bitmap().words(), once.as_slice());
    assert!(pool.is_empty());
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

#[test]
fn test_stack_lifo_scenario() {
    let mut stack = StackAllocator::new(64).unwrap();
    let first = stack.allocate(8).unwrap();
    let second = stack.allocate(16).unwrap();
    let third = stack.allocate(4).unwrap();

    assert_eq!([first.offset, second.offset, third.offset], [0, 8, 24]);
    assert_eq!(addr(second.address) - addr(first.address), 8);
    assert_eq!(addr(third.address) - addr(first.address), 24);

    assert!(matches!(
        stack.deallocate(first.id),
        Err(AllocError::InvalidFree { .. })
    ));
    assert!(stack.deallocate_handle(&second).is_err());
    assert_eq!(stack.top_offset(), 28);

    stack.deallocate(third.id).unwrap();
    assert_eq!(stack.top_offset(), 24);
    stack.deallocate_handle(&second).unwrap();
    assert_eq!(stack.top_offset(), 8);
    stack.deallocate(first.id).unwrap();
    assert_eq!(stack.top_offset(), 0);
    assert!(stack.is_empty());
}

#[test]
fn test_stack_handle_from_other_allocator_rejected() {
    let mut a = StackAllocator::new(32).unwrap();
    let mut b = StackAllocator::new(32).unwrap();
    a.allocate(8).unwrap();
    let foreign = b.allocate(16).unwrap();

    assert!(a.deallocate_handle(&foreign).is_err());
    assert_eq!(a.len(), 1);
}

#[test]
fn test_stack_reset_twice() {
    let mut stack = StackAllocator::new(32).unwrap();
    stack.allocate(8).unwrap();
    stack.allocate(8).unwrap();

    stack.reset();
    stack.reset();

    assert!(stack.is_empty());
    assert_eq!(stack.top_offset(), 0);
    assert_eq!(stack.remaining(), 32);
}

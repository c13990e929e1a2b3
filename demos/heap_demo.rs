use std::io::Read;
use std::ptr;

use libc::sbrk;
use segalloc::{Heap, SbrkRegion};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how the region grows as allocations happen.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  env_logger::init();

  // Our segregated-free-list allocator, backed by the real process heap.
  // Unlike the bump allocator this replaces, released blocks are reused:
  // the buckets underneath `Heap` track every free block by size class.
  let mut heap = Heap::new(SbrkRegion::new());

  unsafe {
    print_program_break("start");
  }
  assert_eq!(heap.init(), 0, "heap initialization failed");
  unsafe {
    print_program_break("after init");
  }
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Allocate 4 bytes and write a u32 through the raw pointer.
  // --------------------------------------------------------------------
  let first = heap.allocate(4);
  println!("\n[1] Allocate 4 bytes -> {:?}", first);
  unsafe {
    (first as *mut u32).write(0xDEADBEEF);
    println!("[1] Value written = 0x{:X}", (first as *mut u32).read());
  }
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Allocate 12 bytes and fill it with a byte pattern.
  // --------------------------------------------------------------------
  let second = heap.allocate(12);
  println!("\n[2] Allocate 12 bytes -> {:?}", second);
  unsafe { ptr::write_bytes(second, 0xAB, 12) };
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Release [1] and re-allocate the same size: the block comes back out
  //    of the same bucket instead of growing the region further.
  // --------------------------------------------------------------------
  heap.release(first);
  let reused = heap.allocate(4);
  println!(
    "\n[3] Released [1] and re-allocated 4 bytes -> {:?} (reused same block: {})",
    reused,
    reused == first
  );
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Grow [2] well past its current block via resize, observing the
  //    region extend to satisfy it.
  // --------------------------------------------------------------------
  let grown = heap.resize(second, 4096);
  println!("\n[4] Resized 12 -> 4096 bytes -> {:?}", grown);
  unsafe {
    print_program_break("after resize");
  }
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Zero-allocate an array of 8 u64s and confirm it's zeroed.
  // --------------------------------------------------------------------
  let zeroed = heap.zero_allocate(8, 8);
  println!("\n[5] zero_allocate(8, 8) -> {:?}", zeroed);
  let bytes = unsafe { std::slice::from_raw_parts(zeroed, 64) };
  println!("[5] all zero: {}", bytes.iter().all(|&b| b == 0));

  // --------------------------------------------------------------------
  // Final consistency check over the whole region and every bucket.
  // --------------------------------------------------------------------
  println!("\n[check] heap consistent: {}", heap.check(true));

  heap.release(reused);
  heap.release(grown);
  heap.release(zeroed);
  unsafe {
    print_program_break("end");
  }
}

#![no_main]

use lflist::{Operation, Queue};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|ops: Vec<Operation<i32>>| {
    let queue: Arc<Queue<Arc<i32>>> = Arc::new(Queue::new());

    let inserted = ops
        .iter()
        .map(|op| match op {
            Operation::Insert { .. } => 1,
            Operation::Append { items } => items.len(),
            _ => 0,
        })
        .sum::<usize>();

    let mut threads = vec![];

    let len = ops.len();

    for sub_ops in ops.chunks(std::cmp::max(len / 20, 1)) {
        let sub_ops = sub_ops.to_vec();
        let queue = queue.clone();

        threads.push(std::thread::spawn(move || {
            let mut removed = 0;

            sub_ops.into_iter().for_each(|op| match op {
                Operation::Insert { item } => queue.enqueue(Arc::new(item)),
                Operation::Remove => {
                    if queue.dequeue().is_some() {
                        removed += 1;
                    }
                }
                Operation::Peek => {
                    if let Some(e) = queue.peek() {
                        let _ = **e;
                    }
                }
                Operation::RemoveInsert => {
                    if let Some(e) = queue.dequeue() {
                        queue.enqueue(Arc::new(e.wrapping_mul(**e)))
                    }
                }
                Operation::Append { items } => {
                    queue.append(items.into_iter().map(Arc::new).collect());
                }
                Operation::Len => {
                    queue.len();
                }
            });

            removed
        }))
    }

    let removed = threads
        .into_iter()
        .map(|thread| thread.join().unwrap())
        .sum::<usize>();

    let queue = Arc::try_unwrap(queue).unwrap();
    assert_eq!(queue.len(), inserted - removed);
    assert_eq!(queue.into_iter().count(), inserted - removed);
});

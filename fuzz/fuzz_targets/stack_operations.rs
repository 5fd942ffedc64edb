#![no_main]

use lflist::{Operation, Stack};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|ops: Vec<Operation<i32>>| {
    let stack: Arc<Stack<Arc<i32>>> = Arc::new(Stack::new());

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
        let stack = stack.clone();

        threads.push(std::thread::spawn(move || {
            let mut removed = 0;

            sub_ops.into_iter().for_each(|op| match op {
                Operation::Insert { item } => stack.push(Arc::new(item)),
                Operation::Remove => {
                    if stack.pop().is_some() {
                        removed += 1;
                    }
                }
                Operation::Peek => {
                    if let Some(e) = stack.peek() {
                        let _ = **e;
                    }
                }
                Operation::RemoveInsert => {
                    if let Some(e) = stack.pop() {
                        stack.push(Arc::new(e.wrapping_mul(**e)))
                    }
                }
                Operation::Append { items } => {
                    stack.append(items.into_iter().map(Arc::new).collect());
                }
                Operation::Len => {
                    stack.len();
                }
            });

            removed
        }))
    }

    let removed = threads
        .into_iter()
        .map(|thread| thread.join().unwrap())
        .sum::<usize>();

    let stack = Arc::try_unwrap(stack).unwrap();
    assert_eq!(stack.len(), inserted - removed);
    assert_eq!(stack.into_iter().count(), inserted - removed);
});

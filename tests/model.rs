use lflist::{Queue, Stack};
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Operation {
    Insert(u16),
    Remove,
    Peek,
    Append(Vec<u16>),
}

fn operations() -> impl Strategy<Value = Vec<Operation>> {
    proptest::collection::vec(
        prop_oneof![
            4 => any::<u16>().prop_map(Operation::Insert),
            3 => Just(Operation::Remove),
            2 => Just(Operation::Peek),
            1 => proptest::collection::vec(any::<u16>(), 0..8).prop_map(Operation::Append),
        ],
        1..200,
    )
}

proptest! {
    #[test]
    fn test_stack_matches_vec(ops in operations()) {
        let stack = Stack::new();
        let mut model = Vec::new();

        for op in ops {
            match op {
                Operation::Insert(v) => {
                    stack.push(v);
                    model.push(v);
                }
                Operation::Remove => {
                    prop_assert_eq!(stack.pop().map(|e| *e), model.pop());
                }
                Operation::Peek => {
                    prop_assert_eq!(stack.peek().map(|e| *e), model.last().copied());
                }
                Operation::Append(items) => {
                    let other: Stack<u16> = items.iter().copied().collect();
                    stack.append(other);
                    model.extend(items);
                }
            }

            prop_assert_eq!(stack.len(), model.len());
            prop_assert_eq!(stack.is_empty(), model.is_empty());
        }

        let drained: Vec<u16> = stack.into_iter().collect();
        model.reverse();
        prop_assert_eq!(drained, model);
    }

    #[test]
    fn test_queue_matches_vec_deque(ops in operations()) {
        let queue = Queue::new();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Operation::Insert(v) => {
                    queue.enqueue(v);
                    model.push_back(v);
                }
                Operation::Remove => {
                    prop_assert_eq!(queue.dequeue().map(|e| *e), model.pop_front());
                }
                Operation::Peek => {
                    prop_assert_eq!(queue.peek().map(|e| *e), model.front().copied());
                }
                Operation::Append(items) => {
                    let other: Queue<u16> = items.iter().copied().collect();
                    queue.append(other);
                    model.extend(items);
                }
            }

            prop_assert_eq!(queue.len(), model.len());
            prop_assert_eq!(queue.is_empty(), model.is_empty());
        }

        let drained: Vec<u16> = queue.into_iter().collect();
        prop_assert_eq!(drained, Vec::from(model));
    }

    #[test]
    fn test_peek_is_idempotent(items in proptest::collection::vec(any::<u16>(), 1..50), peeks in 0usize..10) {
        let stack: Stack<u16> = items.iter().copied().collect();
        let queue: Queue<u16> = items.iter().copied().collect();

        for _ in 0..peeks {
            prop_assert_eq!(stack.peek().map(|e| *e), items.last().copied());
            prop_assert_eq!(queue.peek().map(|e| *e), items.first().copied());
        }

        prop_assert_eq!(stack.pop().map(|e| *e), items.last().copied());
        prop_assert_eq!(queue.dequeue().map(|e| *e), items.first().copied());
        prop_assert_eq!(stack.len(), items.len() - 1);
        prop_assert_eq!(queue.len(), items.len() - 1);
    }
}

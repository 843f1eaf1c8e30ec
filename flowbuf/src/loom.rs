#[cfg(all(test, feature = "loom"))]
mod tests {
    use crate::RingQueue;
    use loom::{model::Builder, sync::Arc, thread};

    fn builder() -> Builder {
        let mut builder = Builder::new();
        if builder.preemption_bound.is_none() {
            builder.preemption_bound = Some(3);
        }
        builder
    }

    #[test]
    fn test_claim_then_store_is_never_popped_early() {
        builder().check(|| {
            let ring = Arc::new(RingQueue::new(2).unwrap());

            let producer = {
                let ring = ring.clone();
                thread::spawn(move || {
                    ring.try_push(1u32).unwrap();
                    ring.try_push(2u32).unwrap();
                })
            };

            let mut received = Vec::new();
            for _ in 0..2 {
                if let Some(item) = ring.try_pop() {
                    received.push(item);
                }
                assert!(ring.len() <= ring.capacity());
            }

            producer.join().unwrap();
            while let Some(item) = ring.try_pop() {
                received.push(item);
            }

            assert_eq!(received, vec![1, 2]);
        });
    }

    #[test]
    fn test_wraparound_on_single_slot() {
        builder().check(|| {
            let ring = Arc::new(RingQueue::new(1).unwrap());

            let producer = {
                let ring = ring.clone();
                thread::spawn(move || {
                    for value in 0..2u32 {
                        let mut item = value;
                        while let Err(rejected) = ring.try_push(item) {
                            item = rejected;
                            thread::yield_now();
                        }
                    }
                })
            };

            let mut received = Vec::new();
            while received.len() < 2 {
                match ring.try_pop() {
                    Some(item) => received.push(item),
                    None => thread::yield_now(),
                }
            }

            producer.join().unwrap();
            assert_eq!(received, vec![0, 1]);
            assert!(ring.is_empty());
        });
    }

    #[test]
    fn test_full_ring_rejects_until_popped() {
        builder().check(|| {
            let ring = Arc::new(RingQueue::new(1).unwrap());
            ring.try_push(10u32).unwrap();

            let consumer = {
                let ring = ring.clone();
                thread::spawn(move || ring.try_pop())
            };

            let pushed = ring.try_push(20u32);
            let popped = consumer.join().unwrap();

            assert_eq!(popped, Some(10));
            match pushed {
                Ok(()) => assert_eq!(ring.try_pop(), Some(20)),
                Err(item) => {
                    assert_eq!(item, 20);
                    assert!(ring.is_empty());
                }
            }
        });
    }
}

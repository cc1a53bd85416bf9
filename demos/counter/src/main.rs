use std::time::Duration;

use rxflow_core::prelude::*;
use rxflow_core::runtime;

fn main() {
    env_logger::init();

    let count = rx(0i64);
    let parity = computed({
        let count = count.clone();
        move || if count.get() % 2 == 0 { "even" } else { "odd" }
    });

    let _render = Observer::bind({
        let (count, parity) = (count.clone(), parity.clone());
        move || println!("count = {} ({})", count.get(), parity.get())
    });

    // Coalesced: one re-render for the whole batch.
    batch(|| {
        count.increment();
        count.increment();
        count.increment();
    });

    // A background worker posts mutations home through the runtime mailbox.
    let rt = runtime::current();
    let cell = rt.register(&count);
    let worker = std::thread::spawn(move || {
        for _ in 0..3 {
            cell.update(|v| *v += 10);
            std::thread::sleep(Duration::from_millis(20));
        }
    });

    for _ in 0..10 {
        runtime::pump();
        std::thread::sleep(Duration::from_millis(10));
    }
    worker.join().expect("worker thread");
    runtime::pump();

    log::info!("final count: {}", count.get());
}

use std::sync::Mutex;

use criterion::{criterion_group, criterion_main, Criterion};
use weather_app::chat::ChatRoom;

pub fn criterion_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let room = ChatRoom::new();
    let receivers = Mutex::new(runtime.block_on(async {
        let mut receivers = Vec::new();
        for _ in 0..64 {
            receivers.push(room.join().await.1);
        }
        receivers
    }));

    let room = &room;
    let receivers = &receivers;
    c.bench_function("broadcast to 64 clients", move |b| {
        b.to_async(&runtime).iter(move || async move {
            room.broadcast("joey: hello, world").await;
            // Drain so the queues stay empty between iterations.
            for rx in receivers.lock().unwrap().iter_mut() {
                while rx.try_recv().is_ok() {}
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

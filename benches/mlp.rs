use criterion::{Criterion, black_box, criterion_group, criterion_main};

use digit_mlp::{Activation, Network, NetworkBuilder};

fn digit_network() -> Network {
    NetworkBuilder::new(784, 10)
        .and_then(|b| b.add_layer(16, Activation::ReLU))
        .and_then(|b| b.add_layer(10, Activation::Softmax))
        .and_then(|b| b.build_with_seed(0))
        .unwrap()
}

fn network_forward_bench(c: &mut Criterion) {
    let mut net = digit_network();
    let input = vec![0.1_f64; net.input_dim()];

    c.bench_function("network_forward_784_16_10", |b| {
        b.iter(|| {
            let out = net.forward_propagate(black_box(&input)).unwrap();
            black_box(out);
        })
    });
}

fn network_activations_bench(c: &mut Criterion) {
    let net = digit_network();
    let input = vec![0.1_f64; net.input_dim()];

    c.bench_function("network_activations_784_16_10", |b| {
        b.iter(|| {
            let acts = net.get_all_activations(black_box(&input)).unwrap();
            black_box(acts);
        })
    });
}

fn network_train_single_bench(c: &mut Criterion) {
    let mut net = digit_network();
    let input = vec![0.1_f64; net.input_dim()];
    let target = net.label_to_target(3);

    c.bench_function("network_train_single_784_16_10", |b| {
        b.iter(|| {
            let loss = net
                .train_single(black_box(&input), black_box(&target))
                .unwrap();
            black_box(loss);
        })
    });
}

criterion_group!(
    benches,
    network_forward_bench,
    network_activations_bench,
    network_train_single_bench
);
criterion_main!(benches);

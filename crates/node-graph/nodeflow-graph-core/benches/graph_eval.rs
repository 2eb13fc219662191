use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nodeflow_graph_core::{
    Frame, NodeKey, NodeRegistry, NodeTreeEvaluator, NodeTreeModel, NullRenderer,
};

fn linear_chain(registry: &NodeRegistry, len: usize) -> NodeTreeModel {
    let mut model = NodeTreeModel::new();
    let mut prev: NodeKey = model.add_node(registry.create("time").expect("time node"));
    for _ in 0..len {
        let next = model.add_node(registry.create("add").expect("add node"));
        let out = model.socket(prev, "out").expect("out");
        let lhs = model.socket(next, "lhs").expect("lhs");
        model.connect(lhs, out).expect("connect");
        prev = next;
    }
    model
}

fn fan_in(registry: &NodeRegistry, width: usize) -> NodeTreeModel {
    let mut model = NodeTreeModel::new();
    let sum = model.add_node(registry.create("sum").expect("sum node"));
    let values = model.socket(sum, "values").expect("values");
    for _ in 0..width {
        let src = model.add_node(registry.create("time").expect("time node"));
        let out = model.socket(src, "out").expect("out");
        model.connect(values, out).expect("connect");
    }
    model
}

fn bench_graph_eval(c: &mut Criterion) {
    let registry = NodeRegistry::with_builtins();

    for len in [16usize, 256] {
        let mut model = linear_chain(&registry, len);
        let mut evaluator = NodeTreeEvaluator::new();
        let renderer = NullRenderer;
        let mut t = 0.0f32;
        c.bench_function(&format!("eval_linear_{len}"), |b| {
            b.iter(|| {
                let mut sink = Vec::new();
                let mut frame = Frame::new(t, &renderer, &mut sink);
                evaluator.evaluate(&mut model, &mut frame).expect("evaluate");
                t += 1.0 / 60.0;
                black_box(sink.len())
            })
        });
    }

    let mut model = fan_in(&registry, 128);
    let mut evaluator = NodeTreeEvaluator::new();
    let renderer = NullRenderer;
    c.bench_function("eval_fan_in_128", |b| {
        b.iter(|| {
            let mut sink = Vec::new();
            let mut frame = Frame::new(0.5, &renderer, &mut sink);
            evaluator.evaluate(&mut model, &mut frame).expect("evaluate");
        })
    });

    c.bench_function("build_linear_256", |b| {
        let mut model = linear_chain(&registry, 256);
        let mut evaluator = NodeTreeEvaluator::new();
        b.iter(|| {
            evaluator.mark_dirty();
            evaluator.build(&mut model);
            black_box(evaluator.plan().len())
        })
    });

    c.bench_function("roundtrip_json_256", |b| {
        let model = linear_chain(&registry, 256);
        b.iter(|| {
            let json = model.to_json().expect("to_json");
            let loaded = NodeTreeModel::from_json(&json, &registry).expect("from_json");
            black_box(loaded.connection_count())
        })
    });
}

criterion_group!(benches, bench_graph_eval);
criterion_main!(benches);

//! Counter application wiring actions and subscriptions together

use cistern::{create, Field, State, Value};

fn main() {
    tracing_subscriber::fmt().init();

    let container = create(|writer| {
        let increment_writer = writer.clone();
        let reset_writer = writer;
        State::new()
            .set("count", Field::value(0))
            .set("step", Field::value(1))
            .set(
                "increment",
                Field::action(move |_| {
                    increment_writer.update(|state| {
                        let count = state.value("count").and_then(Value::as_i64).unwrap_or(0);
                        let step = state.value("step").and_then(Value::as_i64).unwrap_or(1);
                        State::new().set("count", Field::value(count + step))
                    })
                }),
            )
            .set(
                "reset",
                Field::action(move |_| {
                    reset_writer.write(State::new().set("count", Field::value(0)))
                }),
            )
    });

    let sub = container.subscribe(|state, previous| {
        println!(
            "count: {} -> {}",
            previous.to_json()["count"],
            state.to_json()["count"]
        );
    });

    container.call("increment");
    container.call("increment");

    // Widen the step mid-run; untouched fields survive the merge.
    container.write(State::new().set("step", Field::value(10)));
    container.call("increment");

    container.call("reset");

    sub.unsubscribe();
    container.call("increment"); // silent: no listeners left

    println!("final state: {}", container.read().to_json());
}

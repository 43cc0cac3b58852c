//! Populating container state from an HTTP source

use cistern::{create, Field, RequestClient, RequestOptions, State, Value};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let container = create(|_| {
        State::new()
            .set("todo", Field::value(Value::Null))
            .set("loading", Field::value(true))
    });
    let writer = container.writer();

    let _sub = container.subscribe(|state, _| {
        println!("state: {}", state.to_json());
    });

    let client = RequestClient::new();
    match client
        .get(
            "https://jsonplaceholder.typicode.com/todos/1",
            RequestOptions::default(),
        )
        .await
    {
        Ok(body) => writer.write(
            State::new()
                .set("todo", Field::value(body))
                .set("loading", Field::value(false)),
        ),
        Err(err) => writer.write(
            State::new()
                .set("error", Field::value(err.to_string()))
                .set("loading", Field::value(false)),
        ),
    }
}

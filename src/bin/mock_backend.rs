//! Bundled mock backend used for local testing when no real upstream is
//! configured. Mirrors the original Go `testserver` package: a hello route
//! and a `/leak` route that deliberately returns a credit card number, for
//! exercising the DLP interceptor end-to-end.

use axum::routing::get;
use axum::Router;
use clap::Parser;

#[derive(Parser)]
struct Args {
    #[clap(long, default_value_t = 9000)]
    port: u16,
}

async fn hello(axum::extract::State(port): axum::extract::State<u16>) -> String {
    format!("Hello from Backend Server on port {port}!")
}

async fn leak() -> &'static str {
    "Oops! Here is a credit card: 4111-1111-1111-1111"
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let app = Router::new()
        .route("/", get(hello))
        .route("/leak", get(leak))
        .with_state(args.port);

    let addr = format!("0.0.0.0:{}", args.port);
    println!("mock backend listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("bind failed");
    axum::serve(listener, app).await.expect("server error");
}

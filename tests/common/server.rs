// Test web server for integration tests

use std::net::SocketAddr;
use tokio::sync::OnceCell;

include!("../test_server_app.rs");

static TEST_SERVER: OnceCell<TestServerHandle> = OnceCell::const_new();

pub struct TestServerHandle {
    pub addr: SocketAddr,
    pub base_url: String,
}

/// Start the test server once for all tests
pub async fn ensure_test_server() -> &'static TestServerHandle {
    TEST_SERVER
        .get_or_init(|| async {
            let std_listener =
                std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
            let addr = std_listener.local_addr().unwrap();
            let base_url = format!("http://{}", addr);
            drop(std_listener);

            // Own runtime so the server outlives each test's runtime
            let server_handle = std::thread::spawn(move || {
                let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
                runtime.block_on(async {
                    let listener = tokio::net::TcpListener::bind(addr)
                        .await
                        .expect("Failed to bind in thread");
                    let app = create_app().await;
                    axum::serve(listener, app).await.expect("Test server failed");
                });
            });

            let client = reqwest::Client::new();
            for i in 0..30 {
                tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
                if let Ok(response) = client.get(&base_url).send().await
                    && response.status().is_success()
                {
                    eprintln!("Test server ready at {} after {} attempts", base_url, i + 1);
                    break;
                }
                if i == 29 {
                    panic!("Test server failed to start after 30 attempts");
                }
            }

            // Not joined; the thread ends with the test process
            drop(server_handle);

            TestServerHandle { addr, base_url }
        })
        .await
}

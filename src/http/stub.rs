//! A throwaway local HTTP server for exercising the outbound clients.

use std::{
    sync::{Arc, Mutex, mpsc::Sender},
    thread::JoinHandle,
};

use rouille::{Request, Response, Server};

pub struct StubServer {
    pub url: String,
    /// Raw query strings of every request received, in arrival order
    pub queries: Arc<Mutex<Vec<String>>>,
    stop: Option<(JoinHandle<()>, Sender<()>)>,
}

impl StubServer {
    /// Binds an ephemeral port on localhost and answers every request with `handler`.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&queries);
        let server = Server::new("127.0.0.1:0", move |request: &Request| {
            seen.lock()
                .unwrap()
                .push(request.raw_query_string().to_string());
            handler(request)
        })
        .expect("bind stub server");
        let url = format!("http://{}", server.server_addr());
        Self {
            url,
            queries,
            stop: Some(server.stoppable()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some((handle, stop)) = self.stop.take() {
            let _ = stop.send(());
            let _ = handle.join();
        }
    }
}

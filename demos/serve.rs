use webhook_rendezvous::{
    OneshotWaiter, RegistrationRequest, Rendezvous, RendezvousConfig, WaitEvent, WaitReply,
};

#[tokio::main]
async fn main() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let rendezvous = Rendezvous::new(RendezvousConfig {
        base_url: Some(format!("http://{addr}/")),
        ..Default::default()
    });

    let registration = rendezvous
        .registrar()
        .register(RegistrationRequest::new())
        .await
        .expect("register");
    println!("waiting for: curl -X POST -d '{{}}' {}", registration.url);

    let (waiter, outcome) = OneshotWaiter::channel();
    rendezvous
        .broker()
        .register_wait(&registration.token, waiter, true)
        .await;

    let router = rendezvous.callback_router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });

    match outcome.await {
        Ok(WaitEvent::Notified(WaitReply::Envelope(envelope))) => {
            println!("received: {}", envelope.body_as_text());
            for (name, value) in envelope.headers.iter() {
                println!("  {name}: {value}");
            }
        }
        other => println!("wait resolved with {other:?}"),
    }
}

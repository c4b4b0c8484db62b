use webhook_rendezvous::{
    CallbackEnvelope, OneshotWaiter, RegistrationRequest, Rendezvous, RendezvousConfig, WaitEvent,
};

#[tokio::main]
async fn main() {
    let rendezvous = Rendezvous::new(RendezvousConfig {
        base_url: Some("https://ci.example.com/".to_string()),
        ..Default::default()
    });

    let registration = rendezvous
        .registrar()
        .register(RegistrationRequest::new().with_secret("s3cret"))
        .await
        .expect("register");
    println!("external systems POST to {}", registration.url);

    let (waiter, outcome) = OneshotWaiter::channel();
    rendezvous
        .broker()
        .register_wait(&registration.token, waiter, false)
        .await;

    // Normally the POST arrives over HTTP; hand it to the broker directly here.
    rendezvous
        .broker()
        .deliver(
            &registration.token,
            CallbackEnvelope::from_body(r#"{"action":"done"}"#),
        )
        .await;

    match outcome.await {
        Ok(WaitEvent::Notified(reply)) => {
            println!("callback body: {}", String::from_utf8_lossy(reply.body()));
        }
        other => println!("wait resolved with {other:?}"),
    }
}

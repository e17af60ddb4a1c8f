use carefront_errors::{
    ClassifiedError, ErrorDispatcher, ErrorLogger, Settings, classify_http_status, init_logging,
};

fn main() {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("invalid settings: {}", e);
            Settings::default()
        }
    };
    if let Err(e) = init_logging(&settings.log_level) {
        eprintln!("{}", e);
    }

    println!("--- Dispatch Pipeline Example ---\n");

    let dispatcher = ErrorDispatcher::new();
    let logger = ErrorLogger::new();
    let history = settings.history();

    let _logging = dispatcher.add_shared_listener(logger.observer());
    let _history = dispatcher.add_shared_listener(history.observer("appointments"));
    let toast = dispatcher.add_listener(|err| {
        println!("   [toast] {}", err.message());
    });

    println!("1. Failures from the network client:");
    let _ = dispatcher.handle(classify_http_status(409, Some("Slot already booked")));
    let _ = dispatcher.handle(classify_http_status(503, None));
    let _ = dispatcher.handle(std::io::Error::other("connection reset by peer"));

    println!("\n2. Toast unsubscribed on page leave:");
    toast.dispose();
    let _ = dispatcher.handle(ClassifiedError::authentication("Session expired"));

    println!("\n3. History (newest first):");
    for entry in history.get_recent(10) {
        println!("   {} {} from {}: {}", entry.code, entry.status, entry.origin, entry.message);
    }

    println!(
        "\nhandled={} logged={} listeners={}",
        dispatcher.handled_count(),
        logger.logged_count(),
        dispatcher.listener_count()
    );
}

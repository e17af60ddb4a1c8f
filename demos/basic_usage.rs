use carefront_errors::{ClassifiedError, Result, classify, classify_http_status};

fn load_patient(id: &str) -> Result<String> {
    // Simulate the backend answering 404 for an unknown patient
    if id == "p-404" {
        return Err(classify_http_status(404, Some("Patient not found")).with_detail("patientId", id));
    }
    Ok(format!("patient {}", id))
}

fn main() {
    println!("--- Basic Usage Example ---\n");

    match load_patient("p-404") {
        Ok(patient) => println!("Loaded {}", patient),
        Err(err) => {
            // SCENARIO 1: The page
            // Shows the message and decides whether it can recover locally.
            println!("1. [PAGE] What the user sees:");
            println!("   \"{}\" (recoverable: {})", err, err.is_recoverable());

            // SCENARIO 2: The wire shape
            println!("\n2. [JSON] What gets reported:");
            println!("   {}", err.to_json());
        }
    }

    // SCENARIO 3: Foreign failures
    // Anything that is not already classified ends up as UNKNOWN_ERROR.
    println!("\n3. [CLASSIFY] Foreign failures:");
    let io = classify(std::io::Error::other("connection reset by peer"));
    println!("   io error  -> {} {}: {}", io.code(), io.status_code(), io.message());
    let opaque = classify(serde_json::json!({"unexpected": true}));
    println!("   opaque    -> {} {}: {}", opaque.code(), opaque.status_code(), opaque.message());

    // SCENARIO 4: Debug output never shows detail values
    let err = ClassifiedError::conflict("Slot already booked").with_detail("patientId", "p-17");
    println!("\n4. [DEBUG] {:?}", err);
}

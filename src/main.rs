fn main() {
    if let Err(e) = querybridge_lib::run() {
        eprintln!("querybridge: {}", e);
        std::process::exit(1);
    }
}

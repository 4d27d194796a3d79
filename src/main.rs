fn main() {
    if let Err(err) = binauralconv::run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

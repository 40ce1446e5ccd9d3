fn main() {
    if let Err(err) = demistifi_idps::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

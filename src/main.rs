fn main() {
    if let Err(err) = table_align::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

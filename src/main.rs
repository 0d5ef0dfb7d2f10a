fn main() {
    if let Err(err) = dotlayout::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

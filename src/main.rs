fn main() {
    if let Err(err) = ase_extract::run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn main() {
    if let Err(err) = abusedash::cli::run() {
        abusedash::ui::eprintln_error(&err);
        std::process::exit(abusedash::exit::exit_code(&err));
    }
}

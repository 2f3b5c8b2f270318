use sigrelay::cli::{print_error, Cli};

fn main() {
    match Cli::run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            print_error(&e.to_string());
            std::process::exit(1);
        }
    }
}

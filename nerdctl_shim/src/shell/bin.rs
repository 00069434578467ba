// Binary entry point for nerdctl_shim
// This is a thin wrapper that delegates to the library implementation

use nerdctl_shim::shell::{EXIT_INIT_FAILURE, run};

fn main() {
    let code = match run(std::env::args().skip(1)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("nerdctl_shim fatal error: {:#}", e);
            EXIT_INIT_FAILURE
        }
    };
    std::process::exit(code);
}

use std::io::{self, Write};
use std::panic;

pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        flush_output();
        default_hook(panic_info);
        std::process::exit(1);
    }));
}

/// Flush the log file and stdout so the trace lands after any partial output
pub fn flush_output() {
    log::logger().flush();
    let _ = io::stdout().flush();
}

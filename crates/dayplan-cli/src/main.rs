use std::process::ExitCode;

fn main() -> ExitCode {
    match dayplan_core::run(std::env::args_os().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dayplan: {err:#}");
            ExitCode::FAILURE
        }
    }
}
